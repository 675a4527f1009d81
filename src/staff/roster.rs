//! Activation gate for the admin pool.
//!
//! All admin threads exist for the whole run. The roster decides how many of
//! them may classify: slot `i` is active while `i < active_count`. Inactive
//! classifiers park on the roster's condition variable instead of exiting.

use super::worker::WorkerState;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared count of active admin slots
#[derive(Debug)]
pub struct AdminRoster {
    slots: Vec<Arc<WorkerState>>,
    active: Mutex<usize>,
    changed: Condvar,
}

impl AdminRoster {
    /// Create a roster over `slots` with the first `initial` active.
    ///
    /// `initial` is clamped into `[1, slots.len()]`.
    pub fn new(slots: Vec<Arc<WorkerState>>, initial: usize) -> Self {
        let initial = initial.clamp(1, slots.len().max(1));
        for (index, slot) in slots.iter().enumerate() {
            slot.set_active(index < initial);
        }
        Self {
            slots,
            active: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    /// Number of admin slots
    pub fn max(&self) -> usize {
        self.slots.len()
    }

    /// Number of active admin slots
    pub fn active_count(&self) -> usize {
        *self.active.lock()
    }

    /// Admin slot states, in slot order
    pub fn slots(&self) -> &[Arc<WorkerState>] {
        &self.slots
    }

    /// Set the active count, clamped into `[1, max]`; returns the new count.
    ///
    /// Newly activated slots are woken. Deactivated slots finish the patient
    /// they hold and then park.
    pub fn set_active(&self, count: usize) -> usize {
        let count = count.clamp(1, self.max().max(1));
        {
            let mut active = self.active.lock();
            *active = count;
            for (index, slot) in self.slots.iter().enumerate() {
                slot.set_active(index < count);
            }
        }
        self.changed.notify_all();
        count
    }

    /// Whether `slot` may take work right now
    pub fn is_active(&self, slot: usize) -> bool {
        slot < *self.active.lock()
    }

    /// Block until `slot` is active or `timeout` passes.
    ///
    /// Returns whether the slot is active on return.
    pub fn wait_until_active(&self, slot: usize, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut active = self.active.lock();
        while slot >= *active {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut active, deadline).timed_out() {
                        return slot < *active;
                    }
                }
                None => self.changed.wait(&mut active),
            }
        }
        true
    }

    /// Wake every parked admin so it can observe shutdown
    pub fn wake_all(&self) {
        let _active = self.active.lock();
        self.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staff::StaffRole;
    use std::thread;

    fn roster(max: usize, initial: usize) -> AdminRoster {
        let slots = (1..=max)
            .map(|id| Arc::new(WorkerState::new(id, StaffRole::Admin, false)))
            .collect();
        AdminRoster::new(slots, initial)
    }

    #[test]
    fn test_initial_activation() {
        let roster = roster(4, 2);
        assert_eq!(roster.active_count(), 2);
        let flags: Vec<bool> = roster.slots().iter().map(|s| s.is_active()).collect();
        assert_eq!(flags, vec![true, true, false, false]);
        assert!(roster.is_active(1));
        assert!(!roster.is_active(2));
    }

    #[test]
    fn test_set_active_clamps() {
        let roster = roster(3, 1);
        assert_eq!(roster.set_active(10), 3);
        assert_eq!(roster.set_active(0), 1);
        assert_eq!(roster.active_count(), 1);
        assert!(roster.slots()[0].is_active());
        assert!(!roster.slots()[2].is_active());
    }

    #[test]
    fn test_wait_times_out_when_inactive() {
        let roster = roster(2, 1);
        assert!(!roster.wait_until_active(1, Duration::from_millis(10)));
        assert!(roster.wait_until_active(0, Duration::from_millis(10)));
    }

    #[test]
    fn test_activation_wakes_waiter() {
        let roster = Arc::new(roster(2, 1));
        let waiter = {
            let roster = Arc::clone(&roster);
            thread::spawn(move || roster.wait_until_active(1, Duration::from_secs(5)))
        };

        thread::sleep(Duration::from_millis(20));
        roster.set_active(2);

        assert!(waiter.join().unwrap());
    }
}
