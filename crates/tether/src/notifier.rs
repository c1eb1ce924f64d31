//! Emitter side: the notification point and its fire loop.
//!
//! # Design
//!
//! A [`Notifier<A>`] owns an ordered [`WalkList`] of anchors, one per
//! outbound connection. Each anchor pairs 1:1 with a registration on the
//! receiver's [`Trackable`]; either node is a valid teardown entry point and
//! the protocol in [`remove_anchor`] / [`AnchorHost::sever_anchor`] ensures
//! the pair is dismantled exactly once from whichever side dies first.
//!
//! [`fire`](Notifier::fire) walks the anchor list with a registered walk, so
//! a callback may disconnect itself, disconnect any other connection,
//! connect new ones, drop receivers, or recursively fire — the walk registry
//! in `tether-list` reparks the traversal whenever the node it stands on is
//! removed. No `RefCell` borrow is held while a callback runs.
//!
//! # Invariants
//!
//! 1. Anchors are visited head to tail in current list order.
//! 2. A connection appended during a fire pass is reached by that pass.
//! 3. A connection removed during a fire pass is never invoked afterward
//!    by that pass.
//! 4. Connect and disconnect are total: no-match disconnects return 0 and
//!    out-of-range scan positions simply stop.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_list::{NodeId, WalkList};
use tracing::trace;

use crate::cursor::Cursor;
use crate::ident::{EdgeIdent, MethodKey, TrackableId};
use crate::trackable::{AnchorHost, Registration, Trackable, TrackableCore};

/// How many matches a filtered disconnect may remove.
///
/// `Count(0)` removes nothing and returns 0; `All` removes every remaining
/// match in scan direction. (The predecessor of this API expressed "all"
/// as a negative count; the boundary is explicit here.)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Count(usize),
    All,
}

/// What an anchor does when fired: run a bound callback, or re-fire a
/// downstream notifier with the same payload.
pub(crate) enum Callable<A: 'static> {
    Method(Rc<dyn Fn(&A, &mut Cursor<A>)>),
    Forward(Weak<RefCell<NotifierCore<A>>>),
}

impl<A: 'static> Clone for Callable<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Method(f) => Self::Method(Rc::clone(f)),
            Self::Forward(target) => Self::Forward(Weak::clone(target)),
        }
    }
}

/// Emitter-side node of one edge pair.
pub(crate) struct Anchor<A: 'static> {
    pub(crate) ident: EdgeIdent,
    pub(crate) callable: Callable<A>,
    /// Receiver core holding the paired registration.
    pub(crate) peer: Weak<RefCell<TrackableCore>>,
    /// Paired registration in the receiver's list. `None` only inside
    /// `insert_edge`, before the pair link is completed.
    pub(crate) registration: Option<NodeId>,
}

pub(crate) struct NotifierCore<A: 'static> {
    pub(crate) id: TrackableId,
    /// The notifier's own trackable, for handle construction.
    pub(crate) tracker: Weak<RefCell<TrackableCore>>,
    pub(crate) anchors: WalkList<Anchor<A>>,
}

impl<A: 'static> AnchorHost for NotifierCore<A> {
    fn sever_anchor(&mut self, anchor: NodeId) -> Option<Box<dyn std::any::Any>> {
        // Receiver already unlinked its half; unlink ours, reparking any
        // walks standing on it, and hand the node back to be dropped once
        // the caller's borrow on this core is gone.
        self.anchors
            .remove(anchor)
            .map(|a| Box::new(a) as Box<dyn std::any::Any>)
    }
}

/// A typed notification point.
///
/// Fires a payload `&A` to every connected callback in connection order.
/// A `Notifier` is itself a receiver (it embeds a [`Trackable`]), which is
/// what makes notifier-to-notifier forwarding edges tear down automatically
/// when either end dies.
pub struct Notifier<A: 'static> {
    tracker: Trackable,
    core: Rc<RefCell<NotifierCore<A>>>,
}

impl<A: 'static> Default for Notifier<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Notifier<A> {
    #[must_use]
    pub fn new() -> Self {
        let tracker = Trackable::new();
        let core = Rc::new(RefCell::new(NotifierCore {
            id: tracker.id(),
            tracker: Rc::downgrade(tracker.core()),
            anchors: WalkList::new(),
        }));
        Self { tracker, core }
    }

    /// Identity shared with the embedded trackable.
    #[must_use]
    pub fn id(&self) -> TrackableId {
        self.tracker.id()
    }

    /// The receiver half of this notifier.
    #[must_use]
    pub fn trackable(&self) -> &Trackable {
        &self.tracker
    }

    /// Clonable weak handle for use inside callbacks.
    #[must_use]
    pub fn handle(&self) -> NotifierRef<A> {
        NotifierRef {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Connect a bound callback, appended at the end of the dispatch order.
    ///
    /// The callback receives the fired payload and a [`Cursor`] it can use
    /// to detach the connection being invoked.
    pub fn connect(
        &self,
        receiver: &Trackable,
        method: MethodKey,
        f: impl Fn(&A, &mut Cursor<A>) + 'static,
    ) {
        self.connect_at(-1, receiver, method, f);
    }

    /// Connect at a signed emitter-side position: non-negative counts from
    /// the head (0 = first to run), negative from the tail (-1 = append).
    /// The receiver-side registration is always appended.
    pub fn connect_at(
        &self,
        index: isize,
        receiver: &Trackable,
        method: MethodKey,
        f: impl Fn(&A, &mut Cursor<A>) + 'static,
    ) {
        let ident = EdgeIdent::Method {
            receiver: receiver.id(),
            method,
        };
        insert_edge(
            &self.core,
            index,
            ident,
            Callable::Method(Rc::new(f)),
            receiver.core(),
        );
    }

    /// Forward every fire of `self` into `other`, appended at the end of
    /// the dispatch order. `other` is tracked as the receiver of the edge,
    /// so dropping it removes the forwarding connection.
    pub fn connect_notifier(&self, other: &Notifier<A>) {
        self.connect_notifier_at(-1, other);
    }

    /// [`connect_notifier`](Self::connect_notifier) at a signed position.
    pub fn connect_notifier_at(&self, index: isize, other: &Notifier<A>) {
        let ident = EdgeIdent::Forward { target: other.id() };
        insert_edge(
            &self.core,
            index,
            ident,
            Callable::Forward(Rc::downgrade(&other.core)),
            other.tracker.core(),
        );
    }

    /// Remove up to `limit` connections to `(receiver, method)`, scanning
    /// from the signed position `start` (non-negative: forward from head;
    /// negative: backward from tail, -1 = last). Returns the number removed.
    pub fn disconnect_method(
        &self,
        receiver: &Trackable,
        method: MethodKey,
        start: isize,
        limit: Limit,
    ) -> usize {
        let id = receiver.id();
        disconnect_matching(&self.core, start, limit, |a| {
            a.ident.matches_method(id, method)
        })
    }

    /// Remove up to `limit` forwarding connections to `other`, scanning
    /// from `start`. Returns the number removed.
    pub fn disconnect_notifier(&self, other: &Notifier<A>, start: isize, limit: Limit) -> usize {
        let id = other.id();
        disconnect_matching(&self.core, start, limit, |a| a.ident.matches_forward(id))
    }

    /// Remove up to `limit` connections of any kind, scanning from `start`.
    pub fn disconnect_span(&self, start: isize, limit: Limit) -> usize {
        disconnect_matching(&self.core, start, limit, |_| true)
    }

    /// Remove every connection.
    pub fn disconnect_all(&self) -> usize {
        self.disconnect_span(0, Limit::All)
    }

    /// Remove every connection to `(receiver, method)`.
    pub fn disconnect_all_method(&self, receiver: &Trackable, method: MethodKey) -> usize {
        self.disconnect_method(receiver, method, -1, Limit::All)
    }

    /// Remove every forwarding connection to `other`.
    pub fn disconnect_all_notifier(&self, other: &Notifier<A>) -> usize {
        self.disconnect_notifier(other, -1, Limit::All)
    }

    #[must_use]
    pub fn is_connected_to_method(&self, receiver: &Trackable, method: MethodKey) -> bool {
        let id = receiver.id();
        scan_any(&self.core, |a| a.ident.matches_method(id, method))
    }

    #[must_use]
    pub fn is_connected_to_notifier(&self, other: &Notifier<A>) -> bool {
        let id = other.id();
        scan_any(&self.core, |a| a.ident.matches_forward(id))
    }

    /// Symmetric existence check against any trackable: walks this
    /// notifier's anchors and the trackable's registrations in lockstep,
    /// short-circuiting on the first cross-reference found from either
    /// side. Reaches a hit in at most min(positions-in-either-list) steps.
    #[must_use]
    pub fn is_connected_to(&self, trackable: &Trackable) -> bool {
        is_linked(&self.core, trackable.core())
    }

    #[must_use]
    pub fn count_connections(&self) -> usize {
        self.core.borrow().anchors.len()
    }

    #[must_use]
    pub fn count_connections_method(&self, receiver: &Trackable, method: MethodKey) -> usize {
        let id = receiver.id();
        scan_count(&self.core, |a| a.ident.matches_method(id, method))
    }

    #[must_use]
    pub fn count_connections_notifier(&self, other: &Notifier<A>) -> usize {
        let id = other.id();
        scan_count(&self.core, |a| a.ident.matches_forward(id))
    }

    /// Inbound connections of the notifier itself (its receiver half).
    #[must_use]
    pub fn count_registrations(&self) -> usize {
        self.tracker.count_registrations()
    }

    #[must_use]
    pub fn count_registrations_to(&self, method: MethodKey) -> usize {
        self.tracker.count_registrations_to(method)
    }

    /// Deliver `args` to every connection, in order, synchronously.
    ///
    /// Never fails; an empty connection list is a zero-iteration pass.
    /// Callbacks may freely mutate the connection graph, including the
    /// connection being invoked, and may re-fire this notifier.
    pub fn fire(&self, args: &A) {
        fire_core(&self.core, args);
    }
}

impl<A: 'static> Drop for Notifier<A> {
    fn drop(&mut self) {
        // Emitter death: dismantle every outbound edge pair. The embedded
        // trackable then detaches the inbound ones.
        disconnect_matching(&self.core, 0, Limit::All, |_| true);
    }
}

impl<A: 'static> std::fmt::Debug for Notifier<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("id", &self.id())
            .field("connections", &self.count_connections())
            .field("registrations", &self.count_registrations())
            .finish()
    }
}

/// Clonable weak handle to a [`Notifier`].
///
/// This is what callbacks capture to mutate the connection graph or re-fire
/// from inside a delivery. Every operation on a dead referent is a no-op
/// returning `0`/`false`.
pub struct NotifierRef<A: 'static> {
    pub(crate) core: Weak<RefCell<NotifierCore<A>>>,
}

impl<A: 'static> Clone for NotifierRef<A> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<A: 'static> NotifierRef<A> {
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }

    #[must_use]
    pub fn id(&self) -> Option<TrackableId> {
        self.core.upgrade().map(|core| core.borrow().id)
    }

    pub fn connect(
        &self,
        receiver: &Trackable,
        method: MethodKey,
        f: impl Fn(&A, &mut Cursor<A>) + 'static,
    ) {
        self.connect_at(-1, receiver, method, f);
    }

    pub fn connect_at(
        &self,
        index: isize,
        receiver: &Trackable,
        method: MethodKey,
        f: impl Fn(&A, &mut Cursor<A>) + 'static,
    ) {
        if let Some(core) = self.core.upgrade() {
            let ident = EdgeIdent::Method {
                receiver: receiver.id(),
                method,
            };
            insert_edge(
                &core,
                index,
                ident,
                Callable::Method(Rc::new(f)),
                receiver.core(),
            );
        }
    }

    pub fn connect_notifier(&self, other: &Notifier<A>) {
        self.connect_notifier_at(-1, other);
    }

    pub fn connect_notifier_at(&self, index: isize, other: &Notifier<A>) {
        if let Some(core) = self.core.upgrade() {
            let ident = EdgeIdent::Forward { target: other.id() };
            insert_edge(
                &core,
                index,
                ident,
                Callable::Forward(Rc::downgrade(&other.core)),
                other.tracker.core(),
            );
        }
    }

    pub fn disconnect_method(
        &self,
        receiver: &Trackable,
        method: MethodKey,
        start: isize,
        limit: Limit,
    ) -> usize {
        let id = receiver.id();
        match self.core.upgrade() {
            Some(core) => {
                disconnect_matching(&core, start, limit, |a| a.ident.matches_method(id, method))
            }
            None => 0,
        }
    }

    pub fn disconnect_notifier(&self, other: &Notifier<A>, start: isize, limit: Limit) -> usize {
        let id = other.id();
        match self.core.upgrade() {
            Some(core) => disconnect_matching(&core, start, limit, |a| a.ident.matches_forward(id)),
            None => 0,
        }
    }

    pub fn disconnect_span(&self, start: isize, limit: Limit) -> usize {
        match self.core.upgrade() {
            Some(core) => disconnect_matching(&core, start, limit, |_| true),
            None => 0,
        }
    }

    pub fn disconnect_all(&self) -> usize {
        self.disconnect_span(0, Limit::All)
    }

    pub fn disconnect_all_method(&self, receiver: &Trackable, method: MethodKey) -> usize {
        self.disconnect_method(receiver, method, -1, Limit::All)
    }

    pub fn disconnect_all_notifier(&self, other: &Notifier<A>) -> usize {
        self.disconnect_notifier(other, -1, Limit::All)
    }

    #[must_use]
    pub fn count_connections(&self) -> usize {
        match self.core.upgrade() {
            Some(core) => core.borrow().anchors.len(),
            None => 0,
        }
    }

    #[must_use]
    pub fn count_connections_method(&self, receiver: &Trackable, method: MethodKey) -> usize {
        let id = receiver.id();
        match self.core.upgrade() {
            Some(core) => scan_count(&core, |a| a.ident.matches_method(id, method)),
            None => 0,
        }
    }

    #[must_use]
    pub fn count_connections_notifier(&self, other: &Notifier<A>) -> usize {
        let id = other.id();
        match self.core.upgrade() {
            Some(core) => scan_count(&core, |a| a.ident.matches_forward(id)),
            None => 0,
        }
    }

    #[must_use]
    pub fn is_connected_to_method(&self, receiver: &Trackable, method: MethodKey) -> bool {
        let id = receiver.id();
        match self.core.upgrade() {
            Some(core) => scan_any(&core, |a| a.ident.matches_method(id, method)),
            None => false,
        }
    }

    #[must_use]
    pub fn is_connected_to_notifier(&self, other: &Notifier<A>) -> bool {
        let id = other.id();
        match self.core.upgrade() {
            Some(core) => scan_any(&core, |a| a.ident.matches_forward(id)),
            None => false,
        }
    }

    /// Symmetric lockstep query, as [`Notifier::is_connected_to`].
    #[must_use]
    pub fn is_connected_to(&self, trackable: &Trackable) -> bool {
        match self.core.upgrade() {
            Some(core) => is_linked(&core, trackable.core()),
            None => false,
        }
    }

    /// Inbound connections of the referent's receiver half.
    #[must_use]
    pub fn count_registrations(&self) -> usize {
        match self.tracker_core() {
            Some(tracker) => tracker.borrow().registrations.len(),
            None => 0,
        }
    }

    #[must_use]
    pub fn count_registrations_to(&self, method: MethodKey) -> usize {
        match self.tracker_core() {
            Some(tracker) => {
                let tracker = tracker.borrow();
                let id = tracker.id;
                tracker
                    .registrations
                    .iter()
                    .filter(|(_, reg)| reg.ident.matches_method(id, method))
                    .count()
            }
            None => 0,
        }
    }

    fn tracker_core(&self) -> Option<Rc<RefCell<TrackableCore>>> {
        let core = self.core.upgrade()?;
        let tracker = core.borrow().tracker.upgrade();
        tracker
    }

    /// Fire through the handle. A dead referent is a silent no-op.
    pub fn fire(&self, args: &A) {
        if let Some(core) = self.core.upgrade() {
            fire_core(&core, args);
        }
    }
}

impl<A: 'static> std::fmt::Debug for NotifierRef<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierRef")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Edge plumbing shared by Notifier, NotifierRef, and Cursor
// ---------------------------------------------------------------------------

/// Create one edge pair: anchor at the signed emitter-side position,
/// registration appended on the receiver, linked 1:1.
pub(crate) fn insert_edge<A: 'static>(
    core: &Rc<RefCell<NotifierCore<A>>>,
    index: isize,
    ident: EdgeIdent,
    callable: Callable<A>,
    receiver: &Rc<RefCell<TrackableCore>>,
) {
    let source = core.borrow().id;
    let anchor = core.borrow_mut().anchors.insert(
        index,
        Anchor {
            ident,
            callable,
            peer: Rc::downgrade(receiver),
            registration: None,
        },
    );
    // Coerce to the unsized host type before downgrading; the coercion
    // cannot happen through the `&Rc` that `downgrade` takes.
    let host_rc: Rc<RefCell<dyn AnchorHost>> = core.clone();
    let host = Rc::downgrade(&host_rc);
    let registration = receiver.borrow_mut().registrations.push_back(Registration {
        ident,
        source,
        host,
        anchor,
    });
    if let Some(a) = core.borrow_mut().anchors.get_mut(anchor) {
        a.registration = Some(registration);
    }
    trace!(?ident, index, "connected");
}

/// Emitter-initiated pair teardown: remove the anchor (reparking walks),
/// then the paired registration. Stale ids and dead receivers are no-ops.
pub(crate) fn remove_anchor<A: 'static>(core: &Rc<RefCell<NotifierCore<A>>>, id: NodeId) -> bool {
    let anchor = { core.borrow_mut().anchors.remove(id) };
    let Some(anchor) = anchor else {
        return false;
    };
    trace!(ident = ?anchor.ident, "disconnected");
    if let (Some(registration), Some(peer)) = (anchor.registration, anchor.peer.upgrade()) {
        peer.borrow_mut().registrations.remove(registration);
    }
    true
}

/// Scan from `start` in its signed direction, removing matches up to
/// `limit`. The successor is captured before each removal so the scan
/// survives its own mutations.
pub(crate) fn disconnect_matching<A: 'static>(
    core: &Rc<RefCell<NotifierCore<A>>>,
    start: isize,
    limit: Limit,
    matches: impl Fn(&Anchor<A>) -> bool,
) -> usize {
    if limit == Limit::Count(0) {
        return 0;
    }
    let forward = start >= 0;
    let mut at = { core.borrow().anchors.seek(start) };
    let mut removed = 0usize;
    while let Some(id) = at {
        let (step, hit) = {
            let c = core.borrow();
            let step = if forward {
                c.anchors.next(id)
            } else {
                c.anchors.prev(id)
            };
            (step, c.anchors.get(id).is_some_and(&matches))
        };
        if hit {
            remove_anchor(core, id);
            removed += 1;
            if let Limit::Count(n) = limit {
                if removed >= n {
                    break;
                }
            }
        }
        at = step;
    }
    removed
}

pub(crate) fn scan_any<A: 'static>(
    core: &Rc<RefCell<NotifierCore<A>>>,
    matches: impl Fn(&Anchor<A>) -> bool,
) -> bool {
    core.borrow().anchors.iter().any(|(_, a)| matches(a))
}

pub(crate) fn scan_count<A: 'static>(
    core: &Rc<RefCell<NotifierCore<A>>>,
    matches: impl Fn(&Anchor<A>) -> bool,
) -> usize {
    core.borrow()
        .anchors
        .iter()
        .filter(|(_, a)| matches(a))
        .count()
}

/// Lockstep symmetric scan of an emitter's anchors and a receiver's
/// registrations for any cross-reference between the two.
fn is_linked<A: 'static>(core: &Rc<RefCell<NotifierCore<A>>>, tcore: &Rc<RefCell<TrackableCore>>) -> bool {
    let c = core.borrow();
    let t = tcore.borrow();
    let my_id = c.id;
    let their_id = t.id;
    let mut a = c.anchors.head();
    let mut r = t.registrations.head();
    while let (Some(ai), Some(ri)) = (a, r) {
        if c.anchors
            .get(ai)
            .is_some_and(|x| x.ident.receiver_id() == their_id)
        {
            return true;
        }
        if t.registrations.get(ri).is_some_and(|x| x.source == my_id) {
            return true;
        }
        a = c.anchors.next(ai);
        r = t.registrations.next(ri);
    }
    false
}

/// The fire loop. Shared by [`Notifier::fire`], [`NotifierRef::fire`], and
/// forwarding anchors.
///
/// Per step: read the current anchor and clone its callable under a short
/// borrow, release every borrow, invoke, then advance the walk. The walk
/// registry in `tether-list` keeps the position valid across any removals
/// the callback performs, including of the anchor being invoked.
pub(crate) fn fire_core<A: 'static>(core: &Rc<RefCell<NotifierCore<A>>>, args: &A) {
    let walk = {
        let mut c = core.borrow_mut();
        trace!(connections = c.anchors.len(), "fire");
        c.anchors.begin_walk()
    };
    loop {
        let step = {
            let c = core.borrow();
            c.anchors
                .walk_at(walk)
                .and_then(|id| c.anchors.get(id).map(|a| (id, a.callable.clone())))
        };
        let Some((id, callable)) = step else {
            break;
        };
        match callable {
            Callable::Method(f) => {
                let mut cursor = Cursor::new(Rc::clone(core), id);
                f(args, &mut cursor);
            }
            Callable::Forward(target) => {
                if let Some(target) = target.upgrade() {
                    fire_core(&target, args);
                }
            }
        }
        core.borrow_mut().anchors.advance(walk);
    }
    core.borrow_mut().anchors.end_walk(walk);
}
