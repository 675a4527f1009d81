//! Bounded priority queue with blocking dequeue.

use super::{Dequeue, Prioritized, QueueFull};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A fixed-capacity, thread-safe queue ordered by priority.
///
/// Items are kept front to back in non-decreasing priority order. Among equal
/// priorities the earlier arrival stays in front. Inserting into a full queue
/// drops the item and increments [`dropped`](Self::dropped).
///
/// # Example
///
/// ```rust
/// use clinic_sim::queue::{Prioritized, PriorityQueue};
///
/// #[derive(Debug)]
/// struct Ticket(u8);
///
/// impl Prioritized for Ticket {
///     fn priority(&self) -> u8 {
///         self.0
///     }
/// }
///
/// let queue = PriorityQueue::new("triage", 4);
/// queue.enqueue(Ticket(3)).unwrap();
/// queue.enqueue(Ticket(1)).unwrap();
///
/// assert_eq!(queue.dequeue().unwrap().0, 1);
/// assert_eq!(queue.depth(), 1);
/// ```
pub struct PriorityQueue<T> {
    name: String,
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl<T> std::fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("depth", &self.depth())
            .field("dropped", &self.dropped())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T: Prioritized> PriorityQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0. The clinic validates capacities before
    /// building its queues.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        Self {
            name: name.into(),
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// Inserts `item` behind every queued item of equal or higher urgency.
    ///
    /// Scans from the back and stops at the first item whose priority is
    /// less than or equal to the new one, so equal priorities stay FIFO.
    pub fn enqueue(&self, item: T) -> Result<(), QueueFull<T>> {
        {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                drop(items);
                return Err(self.reject(item));
            }

            let priority = item.priority();
            let position = items
                .iter()
                .rposition(|queued| queued.priority() <= priority)
                .map_or(0, |i| i + 1);
            let displaced = items.len() - position;
            items.insert(position, item);

            if displaced > 0 {
                log::trace!(
                    "queue '{}': priority {} item placed ahead of {} waiting",
                    self.name,
                    priority,
                    displaced
                );
            }
        }

        self.not_empty.notify_one();
        Ok(())
    }

    /// Appends `item` at the back regardless of priority.
    pub fn enqueue_fifo(&self, item: T) -> Result<(), QueueFull<T>> {
        {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                drop(items);
                return Err(self.reject(item));
            }
            items.push_back(item);
        }

        self.not_empty.notify_one();
        Ok(())
    }

    fn reject(&self, item: T) -> QueueFull<T> {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        QueueFull::new(&self.name, self.capacity, item)
    }
}

impl<T> PriorityQueue<T> {
    /// Blocks until an item is available or the queue is closed.
    ///
    /// Returns `None` only when the queue has been closed and holds nothing.
    /// Items still queued at close time remain dequeueable.
    pub fn dequeue(&self) -> Option<T> {
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if self.is_closed() {
                return None;
            }
            self.not_empty.wait(&mut items);
        }
    }

    /// Waits at most `timeout` for an item.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Dequeue<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Dequeue::Ready(item);
            }
            if self.is_closed() {
                return Dequeue::Closed;
            }
            match deadline {
                Some(deadline) => {
                    if self.not_empty.wait_until(&mut items, deadline).timed_out() {
                        return match items.pop_front() {
                            Some(item) => Dequeue::Ready(item),
                            None if self.is_closed() => Dequeue::Closed,
                            None => Dequeue::TimedOut,
                        };
                    }
                }
                None => self.not_empty.wait(&mut items),
            }
        }
    }

    /// Waits at most `timeout` until the queue holds an item, without taking it.
    ///
    /// `Ready(())` only says an item was present; another consumer may take it
    /// first, so callers follow up with [`try_dequeue`](Self::try_dequeue).
    /// Lets a consumer take the item under a lock of its own choosing.
    pub fn wait_for_item(&self, timeout: Duration) -> Dequeue<()> {
        let deadline = Instant::now().checked_add(timeout);
        let mut items = self.items.lock();
        loop {
            if !items.is_empty() {
                return Dequeue::Ready(());
            }
            if self.is_closed() {
                return Dequeue::Closed;
            }
            match deadline {
                Some(deadline) => {
                    if self.not_empty.wait_until(&mut items, deadline).timed_out() {
                        return if !items.is_empty() {
                            Dequeue::Ready(())
                        } else if self.is_closed() {
                            Dequeue::Closed
                        } else {
                            Dequeue::TimedOut
                        };
                    }
                }
                None => self.not_empty.wait(&mut items),
            }
        }
    }

    /// Removes the front item without blocking.
    pub fn try_dequeue(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Marks the queue closed and wakes every blocked consumer.
    ///
    /// Producers may still enqueue afterwards; closing only guarantees that
    /// no consumer blocks forever on an empty queue.
    pub fn close(&self) {
        {
            let _items = self.items.lock();
            self.closed.store(true, Ordering::SeqCst);
        }
        self.not_empty.notify_all();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Current number of queued items
    pub fn depth(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items rejected because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue name used in logs and snapshots
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priorities currently queued, front to back
    pub fn priorities(&self) -> Vec<u8>
    where
        T: Prioritized,
    {
        self.items.lock().iter().map(Prioritized::priority).collect()
    }
}
