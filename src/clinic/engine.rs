//! Run lifecycle: spawning every clinic thread, reporting, and shutdown

use super::{ClinicConfig, ClinicMetrics, ClinicSnapshot, Facility};
use crate::core::{CancellationReason, CancellationToken, ClinicError, Result, SimClock};
use crate::staff::{
    worker_rng, AdminRoster, Classifier, Generator, ServiceAgent, StaffRole, StaffingController,
    StaffingPolicy, StageContext, WorkerState, WorkerThread,
};
use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A running clinic simulation.
///
/// [`Clinic::start`] spawns one generator, every admin slot, every service
/// agent and the staffing controller. The run continues until
/// [`Clinic::shutdown`] is called or the clinic is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use clinic_sim::prelude::*;
///
/// # fn main() -> clinic_sim::core::Result<()> {
/// let clinic = Clinic::start(ClinicConfig::default().with_speed_factor(600.0))?;
/// clinic.run_for(3600.0)?;
/// clinic.shutdown()?;
/// println!("{}", clinic.snapshot());
/// # Ok(())
/// # }
/// ```
pub struct Clinic {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    config: ClinicConfig,
    clock: SimClock,
    token: CancellationToken,
    facility: Arc<Facility>,
    metrics: Arc<ClinicMetrics>,
    roster: Arc<AdminRoster>,
    staff: Vec<Arc<WorkerState>>,
    threads: Mutex<Vec<WorkerThread>>,
    exited: Receiver<String>,
    running: AtomicBool,
    stopped_after: Mutex<Option<Duration>>,
}

impl std::fmt::Debug for Clinic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clinic")
            .field("run_id", &self.run_id)
            .field("running", &self.is_running())
            .field("active_admins", &self.active_admins())
            .field("backlog", &self.facility.backlog())
            .finish()
    }
}

impl Clinic {
    /// Validate `config`, build the queues and spawn every thread.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` before anything is spawned; `SpawnError` if a thread
    /// cannot be created, after stopping the threads already started.
    pub fn start(config: ClinicConfig) -> Result<Self> {
        config.validate()?;
        let clock = SimClock::new(config.speed_factor)?;

        let roster = Arc::new(AdminRoster::new(
            (1..=config.max_admins)
                .map(|id| Arc::new(WorkerState::new(id, StaffRole::Admin, false)))
                .collect(),
            config.initial_admins,
        ));

        let mut staff: Vec<Arc<WorkerState>> = roster.slots().to_vec();
        let agent_roles = std::iter::repeat(StaffRole::GeneralPractitioner)
            .take(config.general_agents)
            .enumerate()
            .chain(
                std::iter::repeat(StaffRole::Nurse)
                    .take(config.secondary_agents)
                    .enumerate(),
            )
            .chain(
                config
                    .specialist_assignments()
                    .into_iter()
                    .map(StaffRole::Specialist)
                    .enumerate(),
            );
        staff.extend(
            agent_roles.map(|(index, role)| Arc::new(WorkerState::new(index + 1, role, true))),
        );

        let (exit_tx, exit_rx) = crossbeam_channel::unbounded();
        let clinic = Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            facility: Arc::new(Facility::new(
                config.intake_capacity,
                config.service_capacity,
            )),
            metrics: Arc::new(ClinicMetrics::new()),
            token: CancellationToken::new(),
            clock,
            roster,
            staff,
            threads: Mutex::new(Vec::new()),
            exited: exit_rx,
            running: AtomicBool::new(true),
            stopped_after: Mutex::new(None),
            config,
        };

        {
            let facility = Arc::clone(&clinic.facility);
            let roster = Arc::clone(&clinic.roster);
            clinic.token.on_cancel(move || {
                facility.close_all();
                roster.wake_all();
            });
        }

        if let Err(e) = clinic.spawn_all(&exit_tx) {
            return Err(clinic.abort_start(e));
        }

        log::info!(
            "clinic run {} started: {} admins ({} active), {} agents, speed x{}",
            clinic.run_id,
            clinic.roster.max(),
            clinic.roster.active_count(),
            clinic.staff.len() - clinic.roster.max(),
            clinic.clock.speed_factor()
        );
        #[cfg(feature = "tracing")]
        crate::tracing::events::record_run_start(
            &clinic.run_id.to_string(),
            clinic.threads.lock().len(),
            clinic.clock.speed_factor(),
        );

        Ok(clinic)
    }

    /// Stop the threads already spawned and hand back the spawn failure
    fn abort_start(&self, error: ClinicError) -> ClinicError {
        log::error!("clinic run {} failed to start: {}", self.run_id, error);
        if let Err(stop_err) = self.stop(CancellationReason::SpawnFailed) {
            log::error!(
                "clinic run {}: stopping after failed start: {}",
                self.run_id,
                stop_err
            );
        }
        error
    }

    fn context(&self) -> StageContext {
        StageContext {
            facility: Arc::clone(&self.facility),
            metrics: Arc::clone(&self.metrics),
            clock: self.clock,
            token: self.token.clone(),
            timings: self.config.timings,
            poll_interval: self.config.poll_interval(),
        }
    }

    fn spawn<F>(&self, name: String, exited: &Sender<String>, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread = WorkerThread::spawn(name, exited.clone(), body)?;
        self.threads.lock().push(thread);
        Ok(())
    }

    fn spawn_all(&self, exited: &Sender<String>) -> Result<()> {
        let ctx = self.context();
        let seed = self.config.seed;
        let mut streams = 0u64..;
        let mut next_rng = || worker_rng(seed, streams.next().unwrap_or_default());

        let generator = Generator::new(ctx.clone(), next_rng());
        self.spawn("clinic-generator".to_string(), exited, move || {
            generator.run()
        })?;

        for (slot, state) in self.roster.slots().iter().enumerate() {
            let classifier = Classifier::new(slot, Arc::clone(&self.roster), ctx.clone(), next_rng())
                .ok_or_else(|| ClinicError::invalid_config("max_admins", "roster slot missing"))?;
            self.spawn(state.thread_name(), exited, move || classifier.run())?;
        }

        for state in &self.staff {
            let Some(serves) = state.role().serves() else {
                continue;
            };
            let agent = ServiceAgent::new(
                Arc::clone(state),
                serves,
                ctx.clone(),
                self.config.abandonment.clone(),
                next_rng(),
            );
            self.spawn(state.thread_name(), exited, move || agent.run())?;
        }

        let cooldown = self
            .clock
            .scaled(f64::from(self.config.timings.staffing_cooldown_secs));
        let controller = StaffingController::new(
            StaffingPolicy::new(self.config.staffing, cooldown),
            Arc::clone(&self.roster),
            ctx,
            self.clock.started(),
        );
        self.spawn("clinic-staffing".to_string(), exited, move || {
            controller.run()
        })
    }

    /// Identifier of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Configuration the run was started with
    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    /// Whether shutdown has not been requested yet
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Admin slots currently allowed to classify
    pub fn active_admins(&self) -> usize {
        self.roster.active_count()
    }

    /// Block the caller for `simulated_secs` of clinic time.
    ///
    /// Returns early with `Ok(false)` if the run is shut down meanwhile.
    ///
    /// # Errors
    ///
    /// `NotRunning` if the run has already been shut down.
    pub fn run_for(&self, simulated_secs: f64) -> Result<bool> {
        if !self.is_running() {
            return Err(ClinicError::not_running(self.run_id.to_string()));
        }
        Ok(self.clock.wait(simulated_secs, &self.token))
    }

    /// Stop every thread and wait for them up to the grace period.
    ///
    /// Idempotent: only the first call does anything. Threads still running
    /// when the grace period ends are detached with a warning.
    ///
    /// # Errors
    ///
    /// `JoinError` if a clinic thread panicked.
    pub fn shutdown(&self) -> Result<()> {
        self.stop(CancellationReason::Shutdown)
    }

    /// Why the run was stopped, once it has been
    pub fn stop_reason(&self) -> Option<CancellationReason> {
        self.token.reason()
    }

    fn stop(&self, reason: CancellationReason) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        *self.stopped_after.lock() = Some(self.clock.elapsed_real());

        log::info!("clinic run {} stopping: {}", self.run_id, reason);
        // Closes every queue and wakes parked admins
        self.token.cancel_with_reason(reason);

        let threads = std::mem::take(&mut *self.threads.lock());
        let grace = self.config.grace_period();
        let deadline = Instant::now().checked_add(grace);
        let mut exited = HashSet::with_capacity(threads.len());
        while exited.len() < threads.len() {
            let notice = match deadline {
                Some(deadline) => self.exited.recv_deadline(deadline).ok(),
                None => self.exited.recv().ok(),
            };
            match notice {
                Some(name) => {
                    exited.insert(name);
                }
                None => break,
            }
        }

        let mut first_error = None;
        let mut stragglers = Vec::new();
        for thread in threads {
            if exited.contains(thread.name()) || thread.is_finished() {
                if let Err(e) = thread.join() {
                    log::error!("clinic run {}: {}", self.run_id, e);
                    first_error.get_or_insert(e);
                }
            } else {
                stragglers.push(thread.name().to_string());
                thread.detach();
            }
        }

        if !stragglers.is_empty() {
            log::warn!(
                "clinic run {}: {} threads still running after {:?}, detached: {}",
                self.run_id,
                stragglers.len(),
                grace,
                stragglers.join(", ")
            );
        }

        let totals = self.metrics.snapshot();
        log::info!(
            "clinic run {} stopped: {} generated, {} served, {} abandoned",
            self.run_id,
            totals.generated,
            totals.served,
            totals.abandoned
        );
        #[cfg(feature = "tracing")]
        crate::tracing::events::record_run_shutdown(
            &self.run_id.to_string(),
            totals.generated,
            totals.served,
            totals.abandoned,
        );

        first_error.map_or(Ok(()), Err)
    }

    /// Report the current state of the run.
    ///
    /// Queue depths, drop counts and totals are read with every patient
    /// transition held off, so the conservation equations hold in every
    /// snapshot. Per-worker fields are read as they are. Elapsed time stops
    /// advancing once the run is shut down.
    pub fn snapshot(&self) -> ClinicSnapshot {
        let stopped_after = *self.stopped_after.lock();
        let elapsed = stopped_after.unwrap_or_else(|| self.clock.elapsed_real());

        let (queues, totals) = {
            let _frozen = self.metrics.freeze();
            (self.facility.snapshot(), self.metrics.snapshot())
        };

        ClinicSnapshot {
            run_id: self.run_id,
            started_at: self.started_at,
            taken_at: Utc::now(),
            running: self.is_running(),
            speed_factor: self.clock.speed_factor(),
            elapsed_real_secs: elapsed.as_secs_f64(),
            elapsed_simulated_secs: self.clock.to_simulated(elapsed),
            active_admins: self.roster.active_count(),
            max_admins: self.roster.max(),
            queues,
            staff: self.staff.iter().map(|s| s.snapshot()).collect(),
            totals,
        }
    }
}

impl Drop for Clinic {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop(CancellationReason::Dropped) {
                log::error!(
                    "clinic run {}: shutdown during drop failed: {}",
                    self.run_id,
                    e
                );
            }
        }
    }
}
