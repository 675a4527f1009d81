//! The queues of one clinic: intake plus one queue per service line

use crate::core::{Category, Patient, Specialty};
use crate::queue::PriorityQueue;
use serde::{Deserialize, Serialize};

/// Serializable view of one queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Queue name
    pub name: String,
    /// Patients waiting
    pub depth: usize,
    /// Maximum patients waiting
    pub capacity: usize,
    /// Patients rejected because the queue was full
    pub dropped: u64,
}

impl QueueSnapshot {
    fn of(queue: &PriorityQueue<Patient>) -> Self {
        Self {
            name: queue.name().to_string(),
            depth: queue.depth(),
            capacity: queue.capacity(),
            dropped: queue.dropped(),
        }
    }
}

/// Intake queue and post-classification queues
#[derive(Debug)]
pub struct Facility {
    intake: PriorityQueue<Patient>,
    general: PriorityQueue<Patient>,
    secondary: PriorityQueue<Patient>,
    specialties: [PriorityQueue<Patient>; 4],
}

impl Facility {
    /// Build every queue; capacities must be non-zero
    pub fn new(intake_capacity: usize, service_capacity: usize) -> Self {
        Self {
            intake: PriorityQueue::new("intake", intake_capacity),
            general: PriorityQueue::new("general", service_capacity),
            secondary: PriorityQueue::new("secondary", service_capacity),
            specialties: Specialty::ALL
                .map(|specialty| PriorityQueue::new(specialty.as_str(), service_capacity)),
        }
    }

    /// The FIFO intake queue
    pub fn intake(&self) -> &PriorityQueue<Patient> {
        &self.intake
    }

    /// Service queue for a category
    pub fn destination(&self, category: Category) -> &PriorityQueue<Patient> {
        match category {
            Category::General => &self.general,
            Category::Secondary => &self.secondary,
            Category::Specialized(specialty) => &self.specialties[specialty.index()],
        }
    }

    /// Every service queue
    pub fn destinations(&self) -> impl Iterator<Item = &PriorityQueue<Patient>> {
        [&self.general, &self.secondary]
            .into_iter()
            .chain(self.specialties.iter())
    }

    /// Every queue, intake first
    pub fn queues(&self) -> impl Iterator<Item = &PriorityQueue<Patient>> {
        std::iter::once(&self.intake).chain(self.destinations())
    }

    /// Sum of all queue depths.
    ///
    /// Each depth is read under its own lock, one queue at a time.
    pub fn backlog(&self) -> usize {
        self.queues().map(PriorityQueue::depth).sum()
    }

    /// Patients waiting in service queues
    pub fn destination_depth(&self) -> usize {
        self.destinations().map(PriorityQueue::depth).sum()
    }

    /// Patients rejected by full service queues
    pub fn destination_dropped(&self) -> u64 {
        self.destinations().map(PriorityQueue::dropped).sum()
    }

    /// Close every queue, waking all blocked consumers
    pub fn close_all(&self) {
        for queue in self.queues() {
            queue.close();
        }
    }

    /// Snapshot of every queue, intake first
    pub fn snapshot(&self) -> Vec<QueueSnapshot> {
        self.queues().map(QueueSnapshot::of).collect()
    }
}
