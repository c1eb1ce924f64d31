//! Receiver side of a connection.
//!
//! A [`Trackable`] owns the registrations pointing back at it and tears all
//! of them down when it is dropped, so no emitter is ever left holding a
//! connection to a dead receiver. Emitter internals are reached only through
//! the crate-private [`AnchorHost`] severing trait; node layout on either
//! side is not part of any contract between the two.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_list::{NodeId, WalkList};
use tracing::trace;

use crate::ident::{EdgeIdent, MethodKey, TrackableId};

/// Emitter-side entry point for receiver-initiated teardown.
///
/// `sever_anchor` removes exactly the named anchor (redirecting any walks
/// parked on it) and must not recurse back into the receiver: the caller has
/// already unlinked its own half of the pair. The removed node is returned
/// boxed rather than dropped in place: its callback may own other
/// receivers, and dropping those cascades back into the host, which must
/// not still be borrowed when that happens.
pub(crate) trait AnchorHost {
    fn sever_anchor(&mut self, anchor: NodeId) -> Option<Box<dyn std::any::Any>>;
}

/// Receiver-side node of one edge pair.
pub(crate) struct Registration {
    pub(crate) ident: EdgeIdent,
    /// Identity of the emitting notifier (its embedded trackable).
    pub(crate) source: TrackableId,
    /// The emitter core holding the paired anchor.
    pub(crate) host: Weak<RefCell<dyn AnchorHost>>,
    /// Paired anchor in the emitter's list.
    pub(crate) anchor: NodeId,
}

pub(crate) struct TrackableCore {
    pub(crate) id: TrackableId,
    pub(crate) registrations: WalkList<Registration>,
}

/// An object that can be the target of connections.
///
/// Embed one in any struct that should receive notifications; pass it to
/// [`Notifier::connect`](crate::Notifier::connect). Dropping the `Trackable`
/// detaches every inbound connection, cascading into the emitters' lists.
pub struct Trackable {
    core: Rc<RefCell<TrackableCore>>,
}

impl Default for Trackable {
    fn default() -> Self {
        Self::new()
    }
}

impl Trackable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: Rc::new(RefCell::new(TrackableCore {
                id: TrackableId::fresh(),
                registrations: WalkList::new(),
            })),
        }
    }

    /// Process-unique identity of this receiver.
    #[must_use]
    pub fn id(&self) -> TrackableId {
        self.core.borrow().id
    }

    pub(crate) fn core(&self) -> &Rc<RefCell<TrackableCore>> {
        &self.core
    }

    /// Number of inbound connections, of any kind.
    #[must_use]
    pub fn count_registrations(&self) -> usize {
        self.core.borrow().registrations.len()
    }

    /// Number of inbound bound-method connections matching `method`.
    #[must_use]
    pub fn count_registrations_to(&self, method: MethodKey) -> usize {
        let core = self.core.borrow();
        let id = core.id;
        core.registrations
            .iter()
            .filter(|(_, reg)| reg.ident.matches_method(id, method))
            .count()
    }

    /// Detach every inbound connection, severing each paired anchor on its
    /// emitter. Also runs on drop.
    pub fn detach_all(&self) {
        loop {
            let reg = {
                let mut core = self.core.borrow_mut();
                match core.registrations.head() {
                    Some(head) => core.registrations.remove(head),
                    None => None,
                }
            };
            match reg {
                Some(reg) => sever(reg),
                None => break,
            }
        }
    }

    /// Detach every inbound bound-method connection matching `method`.
    pub fn detach_all_to(&self, method: MethodKey) {
        let id = self.id();
        let mut at = { self.core.borrow().registrations.tail() };
        while let Some(node) = at {
            let (prev, hit) = {
                let core = self.core.borrow();
                let prev = core.registrations.prev(node);
                let hit = core
                    .registrations
                    .get(node)
                    .is_some_and(|reg| reg.ident.matches_method(id, method));
                (prev, hit)
            };
            if hit {
                let reg = { self.core.borrow_mut().registrations.remove(node) };
                if let Some(reg) = reg {
                    sever(reg);
                }
            }
            at = prev;
        }
    }
}

/// Tell the emitter to drop its half of an already-unlinked pair.
fn sever(reg: Registration) {
    trace!(ident = ?reg.ident, "severing anchor from receiver side");
    if let Some(host) = reg.host.upgrade() {
        let severed = host.borrow_mut().sever_anchor(reg.anchor);
        // The `RefMut` died with the statement above; only now may the
        // anchor (and whatever its callback owns) be dropped.
        drop(severed);
    }
}

impl Drop for Trackable {
    fn drop(&mut self) {
        self.detach_all();
    }
}

impl std::fmt::Debug for Trackable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("Trackable")
            .field("id", &core.id)
            .field("registrations", &core.registrations.len())
            .finish()
    }
}
