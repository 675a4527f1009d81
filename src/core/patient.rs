//! Patients and the service categories they are routed to

use crate::queue::Prioritized;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Most urgent priority rank
pub const HIGHEST_PRIORITY: u8 = 1;
/// Least urgent priority rank
pub const LOWEST_PRIORITY: u8 = 5;

/// Specialist service lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    /// Heart
    Cardiology,
    /// Nervous system
    Neurology,
    /// Children
    Pediatrics,
    /// Skin
    Dermatology,
}

impl Specialty {
    /// Every specialty, in queue order
    pub const ALL: [Specialty; 4] = [
        Specialty::Cardiology,
        Specialty::Neurology,
        Specialty::Pediatrics,
        Specialty::Dermatology,
    ];

    /// Position of this specialty in [`Specialty::ALL`]
    pub fn index(self) -> usize {
        match self {
            Specialty::Cardiology => 0,
            Specialty::Neurology => 1,
            Specialty::Pediatrics => 2,
            Specialty::Dermatology => 3,
        }
    }

    /// Lowercase name, also used as the queue name
    pub fn as_str(self) -> &'static str {
        match self {
            Specialty::Cardiology => "cardiology",
            Specialty::Neurology => "neurology",
            Specialty::Pediatrics => "pediatrics",
            Specialty::Dermatology => "dermatology",
        }
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service class a patient is routed to after classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// General practitioner
    General,
    /// Nursing
    Secondary,
    /// A specialist
    Specialized(Specialty),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::General => f.write_str("general"),
            Category::Secondary => f.write_str("secondary"),
            Category::Specialized(specialty) => write!(f, "specialized({})", specialty),
        }
    }
}

/// A unit of work flowing through the clinic.
///
/// Patients move by value: each queue hand-off transfers ownership, so at
/// most one stage can touch a patient at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    id: u64,
    category: Category,
    priority: u8,
    arrived_at: Instant,
    classified_at: Option<Instant>,
    service_started_at: Option<Instant>,
    completed_at: Option<Instant>,
    abandoned: bool,
}

impl Patient {
    /// Create a patient arriving now.
    ///
    /// `priority` is clamped into `HIGHEST_PRIORITY..=LOWEST_PRIORITY`.
    pub fn new(id: u64, category: Category, priority: u8) -> Self {
        Self {
            id,
            category,
            priority: priority.clamp(HIGHEST_PRIORITY, LOWEST_PRIORITY),
            arrived_at: Instant::now(),
            classified_at: None,
            service_started_at: None,
            completed_at: None,
            abandoned: false,
        }
    }

    /// Unique, monotonically assigned identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Destination service class
    pub fn category(&self) -> Category {
        self.category
    }

    /// Urgency rank (1 = most urgent)
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// When the patient arrived at intake
    pub fn arrived_at(&self) -> Instant {
        self.arrived_at
    }

    /// When intake classification finished
    pub fn classified_at(&self) -> Option<Instant> {
        self.classified_at
    }

    /// When a practitioner picked the patient up
    pub fn service_started_at(&self) -> Option<Instant> {
        self.service_started_at
    }

    /// When service completed
    pub fn completed_at(&self) -> Option<Instant> {
        self.completed_at
    }

    /// Whether the patient was classified
    pub fn is_classified(&self) -> bool {
        self.classified_at.is_some()
    }

    /// Whether service completed
    pub fn was_served(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Whether the patient left without service
    pub fn was_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Instant from which post-classification waiting is measured
    pub fn waiting_since(&self) -> Instant {
        self.classified_at.unwrap_or(self.arrived_at)
    }

    pub(crate) fn mark_classified(&mut self, at: Instant) {
        self.classified_at = Some(at);
    }

    pub(crate) fn mark_service_started(&mut self, at: Instant) {
        self.service_started_at = Some(at);
    }

    pub(crate) fn mark_served(&mut self, at: Instant) {
        self.completed_at = Some(at);
    }

    pub(crate) fn mark_abandoned(&mut self) {
        self.abandoned = true;
    }
}

impl Prioritized for Patient {
    fn priority(&self) -> u8 {
        self.priority
    }
}
