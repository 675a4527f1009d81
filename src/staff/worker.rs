//! Per-staff statistics and the thread handle shared by every clinic role

use crate::core::{Category, ClinicError, Result, Specialty};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// What a staff member does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Intake classifier
    Admin,
    /// Serves the general queue
    GeneralPractitioner,
    /// Serves the secondary queue
    Nurse,
    /// Serves one specialty queue
    Specialist(Specialty),
}

impl StaffRole {
    /// Service queue this role draws from; admins draw from intake
    pub fn serves(self) -> Option<Category> {
        match self {
            StaffRole::Admin => None,
            StaffRole::GeneralPractitioner => Some(Category::General),
            StaffRole::Nurse => Some(Category::Secondary),
            StaffRole::Specialist(specialty) => Some(Category::Specialized(specialty)),
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaffRole::Admin => f.write_str("admin"),
            StaffRole::GeneralPractitioner => f.write_str("general"),
            StaffRole::Nurse => f.write_str("nurse"),
            StaffRole::Specialist(specialty) => write!(f, "{}", specialty),
        }
    }
}

/// Live state of one staff slot.
///
/// Written by the owning worker thread and read racily by snapshots.
#[derive(Debug)]
pub struct WorkerState {
    id: usize,
    role: StaffRole,
    busy: AtomicBool,
    active: AtomicBool,
    handled: AtomicU64,
    busy_time_us: AtomicU64,
}

impl WorkerState {
    /// Create the state of a slot
    pub fn new(id: usize, role: StaffRole, active: bool) -> Self {
        Self {
            id,
            role,
            busy: AtomicBool::new(false),
            active: AtomicBool::new(active),
            handled: AtomicU64::new(0),
            busy_time_us: AtomicU64::new(0),
        }
    }

    /// Slot identifier, unique within a role
    pub fn id(&self) -> usize {
        self.id
    }

    /// Role of this slot
    pub fn role(&self) -> StaffRole {
        self.role
    }

    /// Thread name for this slot
    pub fn thread_name(&self) -> String {
        format!("clinic-{}-{}", self.role, self.id)
    }

    /// Whether the worker is holding a patient
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    /// Whether the slot is allowed to take work
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub(crate) fn set_busy(&self) {
        self.busy.store(true, Ordering::Relaxed);
    }

    /// Clear the busy flag and account the time spent busy
    pub(crate) fn set_idle(&self, busy_for: Duration) {
        self.busy.store(false, Ordering::Relaxed);
        let micros = u64::try_from(busy_for.as_micros()).unwrap_or(u64::MAX);
        self.busy_time_us.fetch_add(micros, Ordering::Relaxed);
    }

    pub(crate) fn increment_handled(&self) {
        self.handled.fetch_add(1, Ordering::Relaxed);
    }

    /// Patients completed by this slot
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Real time spent busy
    pub fn busy_time(&self) -> Duration {
        Duration::from_micros(self.busy_time_us.load(Ordering::Relaxed))
    }

    /// Point-in-time copy for reporting
    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            role: self.role,
            busy: self.is_busy(),
            active: self.is_active(),
            handled: self.handled(),
            busy_secs: self.busy_time().as_secs_f64(),
        }
    }
}

/// Serializable view of a [`WorkerState`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Slot identifier
    pub id: usize,
    /// Role of the slot
    pub role: StaffRole,
    /// Holding a patient at snapshot time
    pub busy: bool,
    /// Allowed to take work at snapshot time
    pub active: bool,
    /// Patients completed
    pub handled: u64,
    /// Real seconds spent busy
    pub busy_secs: f64,
}

/// Handle to a named clinic thread.
///
/// The thread reports its name on `exited` when it finishes, whether it
/// returned or panicked, so the owner can wait on one channel instead of
/// polling every handle.
#[derive(Debug)]
pub struct WorkerThread {
    name: String,
    thread: Option<thread::JoinHandle<()>>,
}

struct ExitNotice {
    name: String,
    exited: Sender<String>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.exited.send(std::mem::take(&mut self.name));
    }
}

impl WorkerThread {
    /// Spawn `body` on a thread called `name`
    pub fn spawn<F>(name: String, exited: Sender<String>, body: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let notice = ExitNotice {
            name: name.clone(),
            exited,
        };
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _notice = notice;
                body();
            })
            .map_err(|e| ClinicError::spawn_with_source(name.clone(), e.to_string(), e))?;

        Ok(Self {
            name,
            thread: Some(thread),
        })
    }

    /// Thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the thread body has returned
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Join the thread, reporting a panic as `JoinError`
    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|panic_info| {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                ClinicError::join(self.name.clone(), panic_msg)
            })?;
        }
        Ok(())
    }

    /// Let the thread run on without an owner
    pub fn detach(mut self) {
        self.thread.take();
    }
}
