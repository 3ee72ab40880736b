use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::QueueClosed;

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded FIFO shared by all players and drained by the dealer.
///
/// Submission order is validation order: whoever completes a candidate first
/// is examined first.
#[derive(Debug)]
pub struct CandidateQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> CandidateQueue<T> {
    pub fn new() -> Self {
        CandidateQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock()
    }

    /// Append a candidate. Never blocks.
    pub fn put(&self, item: T) -> Result<(), QueueClosed> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(QueueClosed);
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pop the oldest candidate, blocking while empty. `None` once closed.
    pub fn take(&self) -> Option<T> {
        let mut inner = self.lock();
        loop {
            if inner.closed {
                return None;
            }
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Like [`take`](Self::take) but gives up after `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if inner.closed {
                return None;
            }
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if Instant::now() >= deadline {
                return None;
            }
            self.not_empty.wait_until(&mut inner, deadline);
        }
    }

    /// Pop the oldest candidate without waiting.
    pub fn try_take(&self) -> Option<T> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }
        inner.items.pop_front()
    }

    /// Close the queue and wake the consumer. Pending candidates are dropped.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.items.clear();
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
}

impl<T> Default for CandidateQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_across_producers() {
        let queue = Arc::new(CandidateQueue::new());
        // Producers submit one after another; order must be preserved.
        for player in 0..4 {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.put(player).unwrap())
                .join()
                .unwrap();
        }
        let drained: Vec<_> = std::iter::from_fn(|| queue.try_take()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_put_never_blocks() {
        let queue = CandidateQueue::new();
        for i in 0..1000 {
            queue.put(i).unwrap();
        }
        assert_eq!(queue.len(), 1000);
    }

    #[test]
    fn test_take_timeout_expires_when_empty() {
        let queue = CandidateQueue::<u8>::new();
        let start = Instant::now();
        assert_eq!(queue.take_timeout(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_take_timeout_wakes_on_put() {
        let queue = Arc::new(CandidateQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take_timeout(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.put("candidate").unwrap();
        assert_eq!(consumer.join().unwrap(), Some("candidate"));
    }

    #[test]
    fn test_close_wakes_blocked_take() {
        let queue = Arc::new(CandidateQueue::<u8>::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(consumer.join().unwrap(), None);
        assert_eq!(queue.put(1), Err(QueueClosed));
    }
}
