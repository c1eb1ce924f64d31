//! Per-invocation handle passed to every callback during a fire.

use std::cell::RefCell;
use std::rc::Rc;

use tether_list::NodeId;

use crate::ident::TrackableId;
use crate::notifier::{NotifierCore, NotifierRef, remove_anchor};

/// Handle to the connection currently being invoked.
///
/// A `Cursor` lives on the fire call frame and is lent to the callback as
/// `&mut`, so it cannot be stored past the invocation. Through it a callback
/// can tear down its own connection (the classic "run once, then
/// unsubscribe" pattern) or grab a [`NotifierRef`] to the firing notifier
/// for broader surgery.
pub struct Cursor<A: 'static> {
    core: Rc<RefCell<NotifierCore<A>>>,
    anchor: NodeId,
}

impl<A: 'static> Cursor<A> {
    pub(crate) fn new(core: Rc<RefCell<NotifierCore<A>>>, anchor: NodeId) -> Self {
        Self { core, anchor }
    }

    /// Tear down the connection currently executing.
    ///
    /// Idempotent: once the connection is gone (by this call or by any other
    /// disconnect that raced it within this invocation) further calls are
    /// no-ops. The fire loop continues with the next connection.
    pub fn detach(&mut self) {
        remove_anchor(&self.core, self.anchor);
    }

    /// Whether the executing connection has already been torn down.
    #[must_use]
    pub fn detached(&self) -> bool {
        !self.core.borrow().anchors.contains(self.anchor)
    }

    /// Receiver identity of the executing connection, if it still exists.
    #[must_use]
    pub fn receiver_id(&self) -> Option<TrackableId> {
        self.core
            .borrow()
            .anchors
            .get(self.anchor)
            .map(|a| a.ident.receiver_id())
    }

    /// Handle to the notifier whose fire is delivering this invocation.
    #[must_use]
    pub fn source(&self) -> NotifierRef<A> {
        NotifierRef {
            core: Rc::downgrade(&self.core),
        }
    }
}

impl<A: 'static> std::fmt::Debug for Cursor<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("detached", &self.detached())
            .finish()
    }
}
