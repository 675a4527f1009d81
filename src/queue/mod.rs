//! Bounded blocking queues connecting the clinic stages.
//!
//! One [`PriorityQueue`] type serves both roles in the clinic:
//!
//! - the intake queue, filled with [`PriorityQueue::enqueue_fifo`]
//! - the post-classification queues, filled with [`PriorityQueue::enqueue`],
//!   which keeps items ordered by priority with FIFO tie-breaking
//!
//! Each queue owns its own lock and condition variable; no operation ever
//! holds two queue locks at once.

mod priority;

pub use priority::PriorityQueue;

use std::fmt;

/// Items that can be ordered inside a [`PriorityQueue`].
///
/// Lower values are more urgent.
pub trait Prioritized {
    /// Urgency rank of this item
    fn priority(&self) -> u8;
}

/// Outcome of a timed dequeue
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue<T> {
    /// The front item
    Ready(T),
    /// Nothing arrived before the timeout
    TimedOut,
    /// The queue was closed and is empty
    Closed,
}

impl<T> Dequeue<T> {
    /// Returns the item, if one was dequeued
    pub fn into_item(self) -> Option<T> {
        match self {
            Dequeue::Ready(item) => Some(item),
            Dequeue::TimedOut | Dequeue::Closed => None,
        }
    }
}

/// Insertion rejected because the queue was at capacity.
///
/// The rejected item is handed back to the caller; the queue has already
/// counted the drop.
pub struct QueueFull<T> {
    queue: String,
    capacity: usize,
    item: T,
}

impl<T> QueueFull<T> {
    pub(crate) fn new(queue: &str, capacity: usize, item: T) -> Self {
        Self {
            queue: queue.to_string(),
            capacity,
            item,
        }
    }

    /// Name of the saturated queue
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Capacity of the saturated queue
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take back the rejected item
    pub fn into_item(self) -> T {
        self.item
    }
}

impl<T> fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueFull")
            .field("queue", &self.queue)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "queue '{}' is full ({} items), item dropped",
            self.queue, self.capacity
        )
    }
}

impl<T> std::error::Error for QueueFull<T> {}

impl<T> From<QueueFull<T>> for crate::core::ClinicError {
    fn from(full: QueueFull<T>) -> Self {
        crate::core::ClinicError::queue_full(full.queue, full.capacity)
    }
}
