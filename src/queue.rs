//! Bounded producer/consumer queue built on `std::sync::{Mutex, Condvar}`, with an
//! EOF flag so waiting consumers wake up and exit once the producer closes it.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    eof: bool,
}

/// A fixed-capacity FIFO shared between one producer (the transport's listening
/// thread) and a pool of consumers (the worker threads). `push` blocks while full,
/// `pop` blocks while empty, and `close` raises a one-shot EOF flag that wakes every
/// blocked consumer so they can exit instead of waiting forever.
pub struct Queue<T> {
    state: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> Queue<T> {
    pub fn new(capacity: usize) -> Self {
        Queue {
            state: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                eof: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Blocks until there is room in the queue, then enqueues `item`. A no-op if the
    /// queue has already been closed.
    pub fn push(&self, item: T) {
        let mut guard = self.state.lock().unwrap();
        while guard.items.len() == guard.capacity && !guard.eof {
            guard = self.not_full.wait(guard).unwrap();
        }
        if guard.eof {
            return;
        }
        guard.items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Blocks until an item is available, or returns `None` once the queue is both
    /// closed and drained. Every consumer observing EOF re-notifies the others so
    /// a pool of workers all wake up and exit rather than one at a time.
    pub fn pop(&self) -> Option<T> {
        let mut guard = self.state.lock().unwrap();
        loop {
            if let Some(item) = guard.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if guard.eof {
                self.not_empty.notify_all();
                return None;
            }
            guard = self.not_empty.wait(guard).unwrap();
        }
    }

    /// Marks the queue finished: no further items will be produced. Wakes every
    /// thread blocked in `push` or `pop`.
    pub fn close(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.eof = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_then_pop_preserves_fifo_order() {
        let q = Queue::new(4);
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[test]
    fn pop_on_closed_empty_queue_returns_none() {
        let q: Queue<i32> = Queue::new(4);
        q.close();
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn pop_drains_before_observing_eof() {
        let q = Queue::new(4);
        q.push(42);
        q.close();
        assert_eq!(q.pop(), Some(42));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn blocked_consumer_wakes_on_close() {
        let q = Arc::new(Queue::<i32>::new(1));
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop())
        };
        // give the consumer a chance to block in pop() before closing
        thread::sleep(std::time::Duration::from_millis(20));
        q.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn blocked_producer_wakes_on_pop() {
        let q = Arc::new(Queue::new(1));
        q.push(1);
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.push(2))
        };
        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(q.pop(), Some(1));
        producer.join().unwrap();
        assert_eq!(q.pop(), Some(2));
    }
}
