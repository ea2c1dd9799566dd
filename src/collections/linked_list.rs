//! # Ordered sequence with O(1) append and O(1) removal by handle.
//!
//! [`LinkedList`] is a doubly linked list whose nodes live in a slab (`Vec`)
//! and are addressed by index. Every insertion returns a [`NodeHandle`] that
//! removes exactly that item later, without scanning.
//!
//! ## Layout
//! ```text
//!   head                              tail
//!    │                                 │
//!    ▼                                 ▼
//! ┌──────┐    ┌──────┐    ┌──────┐    ┌──────┐
//! │slot 2│◄──►│slot 0│◄──►│slot 3│◄──►│slot 1│
//! └──────┘    └──────┘    └──────┘    └──────┘
//!   free: [4, 5]   (vacated slots, reused by the next push)
//! ```
//!
//! ## Rules
//! - Iteration follows insertion order (`push` appends, `unshift` prepends).
//! - Each occupied slot carries a generation stamp; a handle only matches the
//!   exact item it was issued for, so removing twice or after [`LinkedList::clear`]
//!   is a no-op that returns `None`.
//! - `clear` drops items without running any per-item logic.

use std::fmt;

/// Removal handle for one item of a [`LinkedList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: usize,
    generation: u64,
}

struct Node<T> {
    value: Option<T>,
    prev: Option<usize>,
    next: Option<usize>,
    generation: u64,
}

/// Slab-backed doubly linked list.
pub struct LinkedList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    stamp: u64,
}

impl<T> LinkedList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            stamp: 0,
        }
    }

    /// Number of items currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `value` and returns its removal handle.
    pub fn push(&mut self, value: T) -> NodeHandle {
        let index = self.alloc(value);
        self.nodes[index].prev = self.tail;
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.handle(index)
    }

    /// Prepends `value` and returns its removal handle.
    pub fn unshift(&mut self, value: T) -> NodeHandle {
        let index = self.alloc(value);
        self.nodes[index].next = self.head;
        match self.head {
            Some(head) => self.nodes[head].prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.handle(index)
    }

    /// Removes and returns the first item.
    pub fn shift(&mut self) -> Option<T> {
        self.head.map(|index| self.unlink(index))
    }

    /// Removes and returns the last item.
    pub fn pop(&mut self) -> Option<T> {
        self.tail.map(|index| self.unlink(index))
    }

    /// Removes the item `handle` was issued for.
    ///
    /// Returns `None` if that item is already gone.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        Some(self.unlink(handle.index))
    }

    /// Returns true if the item `handle` was issued for is still stored.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes
            .get(handle.index)
            .is_some_and(|n| n.value.is_some() && n.generation == handle.generation)
    }

    /// Drops every item. Outstanding handles become inert.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates items in insertion order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn handle(&self, index: usize) -> NodeHandle {
        NodeHandle {
            index,
            generation: self.nodes[index].generation,
        }
    }

    fn alloc(&mut self, value: T) -> usize {
        let node = Node {
            value: Some(value),
            prev: None,
            next: None,
            generation: self.stamp,
        };
        self.stamp += 1;
        self.len += 1;

        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn unlink(&mut self, index: usize) -> T {
        let (prev, next) = {
            let node = &self.nodes[index];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut self.nodes[index];
        node.prev = None;
        node.next = None;
        self.free.push(index);
        self.len -= 1;

        // Only occupied, linked slots reach here.
        node.value
            .take()
            .unwrap_or_else(|| unreachable!("linked slot {index} has no value"))
    }
}

impl<T> Default for LinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Borrowing iterator over a [`LinkedList`], in insertion order.
pub struct Iter<'a, T> {
    list: &'a LinkedList<T>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = &self.list.nodes[index];
        self.cursor = node.next;
        self.remaining -= 1;
        node.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a LinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
