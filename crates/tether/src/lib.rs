#![forbid(unsafe_code)]

//! In-process typed notifications with automatic connection teardown.
//!
//! # Model
//!
//! A [`Notifier<A>`] is a typed notification point: callbacks register
//! against it on behalf of a [`Trackable`] receiver, and
//! [`fire`](Notifier::fire) invokes every registered callback in connection
//! order with a payload `&A`. Each connection is a pair of nodes, one owned
//! by each endpoint, and **destroying either endpoint dismantles the pair**:
//! drop a receiver and every notifier forgets it; drop a notifier and every
//! receiver's registration to it disappears. Notifiers can forward into
//! other notifiers ([`connect_notifier`](Notifier::connect_notifier)), and
//! since a notifier is itself a receiver, forwarding edges obey the same
//! lifetime rules.
//!
//! # Reentrancy
//!
//! Delivery is synchronous and single-threaded, and the connection graph may
//! be rewired *while a fire is in progress*: a callback may detach itself
//! through its [`Cursor`], disconnect or add any other connection through a
//! [`NotifierRef`], drop whole receivers, or fire recursively. The walk
//! registry in `tether-list` reparks in-flight traversals around every
//! removal, so no callback is skipped, double-invoked, or invoked after its
//! connection was removed.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tether::{MethodKey, Notifier, Trackable};
//!
//! let clicks = Notifier::new();
//! let listener = Trackable::new();
//! let hits = Rc::new(Cell::new(0u32));
//!
//! let seen = Rc::clone(&hits);
//! clicks.connect(&listener, MethodKey("once"), move |n: &u32, cursor| {
//!     seen.set(seen.get() + n);
//!     cursor.detach(); // run once, then unsubscribe
//! });
//!
//! clicks.fire(&3);
//! clicks.fire(&5);
//! assert_eq!(hits.get(), 3);
//! assert_eq!(clicks.count_connections(), 0);
//! ```
//!
//! # Non-goals
//!
//! No thread-safety (`Rc`/`RefCell`; the types are `!Send` by
//! construction), no queuing or transport: a fire runs every callback to
//! completion on the calling stack before returning.

pub mod cursor;
pub mod ident;
pub mod notifier;
pub mod trackable;

pub use cursor::Cursor;
pub use ident::{MethodKey, TrackableId};
pub use notifier::{Limit, Notifier, NotifierRef};
pub use trackable::Trackable;
