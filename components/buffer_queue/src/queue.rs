//! Bounded blocking queue implementation

use crate::error::{PopError, PushError};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

struct Inner<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/// A bounded FIFO with blocking producers and consumers
///
/// Capacity is fixed at construction. `push` blocks while the queue is
/// full, `pop` blocks while it is empty; both wake immediately on
/// [`stop`](BlockingQueue::stop). After stop, pushes fail, while pops
/// drain any residual items before failing. Any number of producers and
/// consumers may operate concurrently; operations are linearizable under
/// the internal lock.
///
/// # Examples
///
/// ```
/// use zenplay_buffer_queue::BlockingQueue;
///
/// let queue = BlockingQueue::new(4);
/// queue.push(1).unwrap();
/// queue.push(2).unwrap();
/// assert_eq!(queue.pop().unwrap(), 1);
///
/// queue.stop();
/// assert!(queue.push(3).is_err());
/// assert_eq!(queue.pop().unwrap(), 2); // residual item drains
/// assert!(queue.pop().is_err());
/// ```
pub struct BlockingQueue<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BlockingQueue<T> {
    /// Creates a queue holding at most `capacity` items
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                stopped: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Appends an item, blocking while the queue is full
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Stopped`] with the item when the queue has
    /// been stopped.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut inner = self.inner.lock();
        loop {
            if inner.stopped {
                return Err(PushError::Stopped(item));
            }
            if inner.items.len() < self.capacity {
                inner.items.push_back(item);
                self.not_empty.notify_one();
                return Ok(());
            }
            self.not_full.wait(&mut inner);
        }
    }

    /// Appends an item, blocking at most `timeout` while the queue is full
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Stopped`] when stopped, or
    /// [`PushError::TimedOut`] when the timeout elapses first. Both carry
    /// the rejected item.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), PushError<T>> {
        let deadline = std::time::Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.stopped {
                return Err(PushError::Stopped(item));
            }
            if inner.items.len() < self.capacity {
                inner.items.push_back(item);
                self.not_empty.notify_one();
                return Ok(());
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return Err(PushError::TimedOut(item));
            }
            if self
                .not_full
                .wait_for(&mut inner, deadline - now)
                .timed_out()
                && inner.items.len() >= self.capacity
                && !inner.stopped
            {
                return Err(PushError::TimedOut(item));
            }
        }
    }

    /// Removes the oldest item, blocking while the queue is empty
    ///
    /// After [`stop`](BlockingQueue::stop), residual items continue to be
    /// returned until the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PopError::Stopped`] once the queue is stopped and
    /// drained.
    pub fn pop(&self) -> Result<T, PopError> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Ok(item);
            }
            if inner.stopped {
                return Err(PopError::Stopped);
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Removes the oldest item, blocking at most `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`PopError::Stopped`] once stopped and drained, or
    /// [`PopError::TimedOut`] when the timeout elapses first.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, PopError> {
        let deadline = std::time::Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Ok(item);
            }
            if inner.stopped {
                return Err(PopError::Stopped);
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return Err(PopError::TimedOut);
            }
            if self
                .not_empty
                .wait_for(&mut inner, deadline - now)
                .timed_out()
                && inner.items.is_empty()
                && !inner.stopped
            {
                return Err(PopError::TimedOut);
            }
        }
    }

    /// Stops the queue and wakes every waiter
    ///
    /// The flag latches; a stopped queue never accepts items again.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.stopped = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Empties the queue, running `release` on every drained item
    ///
    /// Used during seek to return hardware-surface-backed frames to their
    /// pool before the demuxer repositions.
    pub fn clear_with<F: FnMut(T)>(&self, mut release: F) {
        let drained: Vec<T> = {
            let mut inner = self.inner.lock();
            let drained = inner.items.drain(..).collect();
            self.not_full.notify_all();
            drained
        };
        // Run the hook outside the lock; release may be arbitrarily slow.
        for item in drained {
            release(item);
        }
    }

    /// Number of items currently queued
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// True when no items are queued
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// The fixed capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once [`stop`](BlockingQueue::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }
}
