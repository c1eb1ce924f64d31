#![forbid(unsafe_code)]

//! Ordered list that stays safe to traverse while it is being mutated.
//!
//! # Design
//!
//! [`WalkList<T>`] is a doubly-linked list stored in a [`slab::Slab`]. Nodes
//! are addressed by [`NodeId`] handles that carry a generation stamp, so a
//! handle to a removed node resolves to `None` forever, even after the slab
//! slot is reused.
//!
//! The part that earns this crate its own existence is the **walk registry**:
//! any number of walks (live traversals) can be open on a list at once, and
//! every removal consults the registry. If a walk is parked on the node being
//! removed, the walk is reparked on that node's successor and its *hold* flag
//! is set; the next [`advance`](WalkList::advance) consumes the flag instead
//! of stepping. A loop of the form
//!
//! ```text
//! let walk = list.begin_walk();
//! while let Some(node) = list.walk_at(walk) {
//!     // ... anything may remove `node`, its neighbors, or everything ...
//!     list.advance(walk);
//! }
//! list.end_walk(walk);
//! ```
//!
//! therefore visits each surviving node exactly once, in list order, no
//! matter what the loop body removes — including the node it is standing on.
//!
//! # Performance
//!
//! | Operation            | Complexity                    |
//! |----------------------|-------------------------------|
//! | `push_back/front`    | O(1)                          |
//! | `insert(index, ..)`  | O(index from nearer end)      |
//! | `remove`             | O(W) where W = open walks     |
//! | `walk_at`/`advance`  | O(1)                          |
//!
//! W is bounded by traversal nesting depth in practice, so removals are
//! effectively O(1).
//!
//! # Invariants
//!
//! 1. A walk's position is always `None` (finished) or a live node.
//! 2. Removing a walk's current node reparks it on the successor that
//!    existed at removal time; the following `advance` does not step again.
//! 3. Order is insertion order; walks and `iter` go head to tail.
//! 4. `NodeId`s never alias across node lifetimes.

use slab::Slab;

/// Generation-stamped handle to a list node.
///
/// Stale handles (after the node was removed) are harmless: every operation
/// taking a `NodeId` treats them as "not found".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    idx: u32,
    stamp: u64,
}

/// Handle to an open walk. Stale after [`WalkList::end_walk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WalkId {
    idx: u32,
    stamp: u64,
}

struct Node<T> {
    value: T,
    stamp: u64,
    prev: Option<u32>,
    next: Option<u32>,
}

struct Walk {
    at: Option<u32>,
    hold: bool,
    stamp: u64,
}

/// Doubly-linked list with stable handles and removal-safe walks.
pub struct WalkList<T> {
    nodes: Slab<Node<T>>,
    walks: Slab<Walk>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    stamp: u64,
}

impl<T> Default for WalkList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WalkList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            walks: Slab::new(),
            head: None,
            tail: None,
            len: 0,
            stamp: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of walks currently open on this list.
    #[must_use]
    pub fn open_walks(&self) -> usize {
        self.walks.len()
    }

    fn next_stamp(&mut self) -> u64 {
        self.stamp += 1;
        self.stamp
    }

    fn alloc(&mut self, value: T) -> u32 {
        let stamp = self.next_stamp();
        self.len += 1;
        self.nodes.insert(Node {
            value,
            stamp,
            prev: None,
            next: None,
        }) as u32
    }

    fn resolve(&self, id: NodeId) -> Option<u32> {
        match self.nodes.get(id.idx as usize) {
            Some(node) if node.stamp == id.stamp => Some(id.idx),
            _ => None,
        }
    }

    fn id_of(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            stamp: self.nodes[idx as usize].stamp,
        }
    }

    pub fn push_back(&mut self, value: T) -> NodeId {
        let idx = self.alloc(value);
        match self.tail {
            Some(tail) => {
                self.nodes[tail as usize].next = Some(idx);
                self.nodes[idx as usize].prev = Some(tail);
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.id_of(idx)
    }

    pub fn push_front(&mut self, value: T) -> NodeId {
        let idx = self.alloc(value);
        match self.head {
            Some(head) => {
                self.nodes[head as usize].prev = Some(idx);
                self.nodes[idx as usize].next = Some(head);
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.id_of(idx)
    }

    /// Insert at a signed position.
    ///
    /// Non-negative `index` counts from the head: 0 prepends, `k` inserts
    /// before the current k-th node, and anything past the end appends.
    /// Negative `index` counts from the tail: -1 appends (after the last
    /// node), -2 inserts before the last node, and anything past the front
    /// prepends.
    pub fn insert(&mut self, index: isize, value: T) -> NodeId {
        if self.head.is_none() {
            return self.push_back(value);
        }
        if index >= 0 {
            let mut steps = index;
            let mut at = self.head;
            while let Some(cur) = at {
                if steps == 0 {
                    break;
                }
                at = self.nodes[cur as usize].next;
                steps -= 1;
            }
            match at {
                Some(before) => self.insert_before_idx(before, value),
                None => self.push_back(value),
            }
        } else {
            let mut steps = index;
            let mut at = self.tail;
            while let Some(cur) = at {
                if steps == -1 {
                    break;
                }
                at = self.nodes[cur as usize].prev;
                steps += 1;
            }
            match at {
                Some(after) => self.insert_after_idx(after, value),
                None => self.push_front(value),
            }
        }
    }

    fn insert_before_idx(&mut self, before: u32, value: T) -> NodeId {
        let prev = self.nodes[before as usize].prev;
        let idx = self.alloc(value);
        self.nodes[idx as usize].prev = prev;
        self.nodes[idx as usize].next = Some(before);
        self.nodes[before as usize].prev = Some(idx);
        match prev {
            Some(prev) => self.nodes[prev as usize].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.id_of(idx)
    }

    fn insert_after_idx(&mut self, after: u32, value: T) -> NodeId {
        let next = self.nodes[after as usize].next;
        let idx = self.alloc(value);
        self.nodes[idx as usize].next = next;
        self.nodes[idx as usize].prev = Some(after);
        self.nodes[after as usize].next = Some(idx);
        match next {
            Some(next) => self.nodes[next as usize].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.id_of(idx)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.resolve(id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        let idx = self.resolve(id)?;
        Some(&self.nodes[idx as usize].value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        let idx = self.resolve(id)?;
        Some(&mut self.nodes[idx as usize].value)
    }

    /// Remove a node, redirecting every walk parked on it to its successor.
    ///
    /// Stale handles return `None` and leave the list untouched.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let idx = self.resolve(id)?;
        let (prev, next) = {
            let node = &self.nodes[idx as usize];
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.nodes[prev as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next as usize].prev = prev,
            None => self.tail = prev,
        }
        // Repark walks standing on the removed node before it is freed.
        for (_, walk) in self.walks.iter_mut() {
            if walk.at == Some(idx) {
                walk.at = next;
                walk.hold = true;
            }
        }
        self.len -= 1;
        Some(self.nodes.remove(idx as usize).value)
    }

    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        self.head.map(|idx| self.id_of(idx))
    }

    #[must_use]
    pub fn tail(&self) -> Option<NodeId> {
        self.tail.map(|idx| self.id_of(idx))
    }

    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.resolve(id)?;
        self.nodes[idx as usize].next.map(|n| self.id_of(n))
    }

    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.resolve(id)?;
        self.nodes[idx as usize].prev.map(|p| self.id_of(p))
    }

    /// Scan start position for a signed offset: non-negative walks forward
    /// from the head (0 = first), negative walks backward from the tail
    /// (-1 = last). `None` if the offset runs off either end.
    #[must_use]
    pub fn seek(&self, start: isize) -> Option<NodeId> {
        if start >= 0 {
            let mut at = self.head?;
            for _ in 0..start {
                at = self.nodes[at as usize].next?;
            }
            Some(self.id_of(at))
        } else {
            let mut at = self.tail?;
            for _ in 0..(-1 - start) {
                at = self.nodes[at as usize].prev?;
            }
            Some(self.id_of(at))
        }
    }

    /// Head-to-tail iterator. Do not mutate the list while holding it; use a
    /// walk for that.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            at: self.head,
        }
    }

    /// Open a walk positioned at the head. Must be paired with
    /// [`end_walk`](Self::end_walk).
    pub fn begin_walk(&mut self) -> WalkId {
        let stamp = self.next_stamp();
        let at = self.head;
        let idx = self.walks.insert(Walk {
            at,
            hold: false,
            stamp,
        }) as u32;
        WalkId { idx, stamp }
    }

    fn resolve_walk(&self, id: WalkId) -> Option<u32> {
        match self.walks.get(id.idx as usize) {
            Some(walk) if walk.stamp == id.stamp => Some(id.idx),
            _ => None,
        }
    }

    /// Current node of a walk; `None` once the walk ran off the tail.
    #[must_use]
    pub fn walk_at(&self, id: WalkId) -> Option<NodeId> {
        let idx = self.resolve_walk(id)?;
        self.walks[idx as usize].at.map(|at| self.id_of(at))
    }

    /// Step a walk to the next node, unless a removal already reparked it
    /// (then the hold flag is consumed and the walk stays put).
    pub fn advance(&mut self, id: WalkId) {
        let Some(idx) = self.resolve_walk(id) else {
            debug_assert!(false, "advance on a closed walk");
            return;
        };
        if self.walks[idx as usize].hold {
            self.walks[idx as usize].hold = false;
            return;
        }
        let next = self.walks[idx as usize]
            .at
            .and_then(|at| self.nodes[at as usize].next);
        self.walks[idx as usize].at = next;
    }

    /// Close a walk and free its registry slot.
    pub fn end_walk(&mut self, id: WalkId) {
        let Some(idx) = self.resolve_walk(id) else {
            debug_assert!(false, "end_walk on a closed walk");
            return;
        };
        self.walks.remove(idx as usize);
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for WalkList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|(_, v)| v)).finish()
    }
}

/// Borrowed head-to-tail iterator over `(NodeId, &T)`.
pub struct Iter<'a, T> {
    list: &'a WalkList<T>,
    at: Option<u32>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.at?;
        self.at = self.list.nodes[idx as usize].next;
        Some((self.list.id_of(idx), &self.list.nodes[idx as usize].value))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
