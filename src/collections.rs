//! Core data structures: id-tagged singly linked list, open-addressing
//! dictionary with its thread-safe wrapper, and the blocking queue backing
//! the event dispatchers.

mod async_queue;
mod dictionary;
mod linked_list;
mod tsafe;

pub use self::{
    async_queue::AsyncQueue,
    dictionary::Dictionary,
    linked_list::{Iter as LinkedListIter, LinkedList},
    tsafe::{LockedValue, TSafeDictionary},
};
