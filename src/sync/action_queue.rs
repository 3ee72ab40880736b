use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;

use crate::error::QueueClosed;

/// Number of move requests a player may have pending.
pub const ACTION_QUEUE_CAPACITY: usize = 3;

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded blocking FIFO feeding a single player's move loop.
///
/// `put` blocks while full and `take` blocks while empty. Closing the queue
/// wakes every blocked party: producers get `Err(QueueClosed)`, consumers get
/// `None`.
#[derive(Debug)]
pub struct ActionQueue<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> ActionQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(ACTION_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "action queue capacity must be positive");
        ActionQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock()
    }

    /// Append a request, blocking while the queue is at capacity.
    pub fn put(&self, item: T) -> Result<(), QueueClosed> {
        let mut inner = self.lock();
        while inner.items.len() >= self.capacity && !inner.closed {
            self.not_full.wait(&mut inner);
        }
        if inner.closed {
            return Err(QueueClosed);
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append a request only if there is room. Returns whether it was queued.
    pub fn try_put(&self, item: T) -> bool {
        let mut inner = self.lock();
        if inner.closed || inner.items.len() >= self.capacity {
            return false;
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Pop the oldest request, blocking while empty. `None` once closed.
    pub fn take(&self) -> Option<T> {
        let mut inner = self.lock();
        loop {
            if inner.closed {
                return None;
            }
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Discard every pending request. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let dropped = inner.items.len();
        inner.items.clear();
        self.not_full.notify_all();
        dropped
    }

    /// Close the queue and wake all waiters.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for ActionQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
