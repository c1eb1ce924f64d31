//! Connection identity: who is connected to what.
//!
//! Filtered disconnects and queries match connections by an explicit
//! comparable key instead of inspecting the callable itself. Each edge
//! carries an [`EdgeIdent`] on *both* of its nodes, so either endpoint can
//! answer identity questions without reaching across to its pair.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Trackable`](crate::Trackable).
///
/// Never reused, so a stale id held past an object's death can only ever
/// fail to match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackableId(u64);

impl TrackableId {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Caller-supplied identity of a receiver method.
///
/// Plays the role a bound method pointer would: connections made with the
/// same `(receiver, MethodKey)` pair are the same logical target for
/// disconnect and count operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodKey(pub &'static str);

/// Closed set of connection kinds, with the identity key each one carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EdgeIdent {
    /// Bound receiver method.
    Method {
        receiver: TrackableId,
        method: MethodKey,
    },
    /// Forwarding edge: invoking it re-fires the target notifier.
    Forward { target: TrackableId },
}

impl EdgeIdent {
    /// The receiver-side trackable of this edge.
    pub(crate) fn receiver_id(self) -> TrackableId {
        match self {
            Self::Method { receiver, .. } => receiver,
            Self::Forward { target } => target,
        }
    }

    pub(crate) fn matches_method(self, receiver: TrackableId, method: MethodKey) -> bool {
        matches!(self, Self::Method { receiver: r, method: m } if r == receiver && m == method)
    }

    pub(crate) fn matches_forward(self, target: TrackableId) -> bool {
        matches!(self, Self::Forward { target: t } if t == target)
    }
}
