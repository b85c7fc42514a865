use parking_lot::{Condvar, Mutex};

use crate::collections::LinkedList;
use crate::{Error, Result};

/// Blocking multi-producer multi-consumer queue.
///
/// Storage is a [`LinkedList`] guarded by a mutex, with a condition variable
/// waking blocked consumers. [`enqueue_last()`] is the FIFO path;
/// [`enqueue_first()`] bypasses the queue for priority elements and is
/// dequeued before anything already queued. Events are never coalesced.
///
/// [`enqueue_last()`]: Self::enqueue_last
/// [`enqueue_first()`]: Self::enqueue_first
#[derive(Debug)]
pub struct AsyncQueue<T> {
    name: &'static str,
    list: Mutex<LinkedList<T>>,
    available: Condvar,
}

impl<T> AsyncQueue<T> {
    /// Creates an unbounded queue; the name shows up in log output.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            list: Mutex::new(LinkedList::new(0)),
            available: Condvar::new(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Appends an element (FIFO path). Only ever blocks on the mutex.
    pub fn enqueue_last(&self, value: T) {
        let mut list = self.list.lock();
        list.append(0, value)
            .expect("unbounded list accepts append");
        self.available.notify_all();
    }

    /// Prepends an element, bypassing everything already queued. Documented
    /// order-breaker: only for priority handling.
    pub fn enqueue_first(&self, value: T) {
        let mut list = self.list.lock();
        list.prepend(0, value)
            .expect("unbounded list accepts prepend");
        self.available.notify_all();
    }

    /// Removes and returns the head element, waiting for one to arrive if
    /// the queue is empty.
    pub fn dequeue_blocking(&self) -> T {
        let mut list = self.list.lock();
        loop {
            if let Some(value) = list.pop_head() {
                return value;
            }
            self.available.wait(&mut list);
        }
    }

    /// Removes and returns the head element without waiting.
    ///
    /// # Errors
    ///
    /// Fails with `WouldBlock` when the queue is empty.
    pub fn dequeue_nonblocking(&self) -> Result<T> {
        self.list.lock().pop_head().ok_or(Error::WouldBlock)
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.list.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn fifo_order() {
        let queue = AsyncQueue::new("test");
        for i in 0..10 {
            queue.enqueue_last(i);
        }
        for i in 0..10 {
            assert_eq!(queue.dequeue_nonblocking().unwrap(), i);
        }
    }

    #[test]
    fn prepended_element_is_dequeued_first() {
        let queue = AsyncQueue::new("test");
        queue.enqueue_last(1);
        queue.enqueue_last(2);
        queue.enqueue_first(99);
        assert_eq!(queue.dequeue_nonblocking().unwrap(), 99);
        assert_eq!(queue.dequeue_nonblocking().unwrap(), 1);
        assert_eq!(queue.dequeue_nonblocking().unwrap(), 2);
    }

    #[test]
    fn nonblocking_dequeue_on_empty_would_block() {
        let queue: AsyncQueue<i32> = AsyncQueue::new("test");
        assert!(matches!(
            queue.dequeue_nonblocking(),
            Err(Error::WouldBlock)
        ));
    }

    #[test]
    fn blocking_dequeue_wakes_on_enqueue() {
        let queue = Arc::new(AsyncQueue::new("test"));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue_blocking())
        };
        thread::sleep(Duration::from_millis(20));
        queue.enqueue_last(42);
        assert_eq!(consumer.join().unwrap(), 42);
    }

    #[test]
    fn multiple_consumers_each_get_one() {
        let queue = Arc::new(AsyncQueue::new("test"));
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.dequeue_blocking())
            })
            .collect();
        for i in 0..4 {
            queue.enqueue_last(i);
        }
        let mut values: Vec<i32> = consumers
            .into_iter()
            .map(|consumer| consumer.join().unwrap())
            .collect();
        values.sort_unstable();
        assert_eq!(values, [0, 1, 2, 3]);
    }
}
