//! Container primitives shared by the event layer.
//!
//! - [`LinkedList`] ordered sequence with O(1) removal by [`NodeHandle`]

mod linked_list;

pub use linked_list::{Iter, LinkedList, NodeHandle};
