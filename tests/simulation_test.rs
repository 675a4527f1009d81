//! End-to-end tests for clinic runs

use clinic_sim::prelude::*;
use std::thread;
use std::time::{Duration, Instant};

fn fast_config(seed: u64) -> ClinicConfig {
    ClinicConfig::default()
        .with_speed_factor(3000.0)
        .with_poll_interval(Duration::from_millis(5))
        .with_grace_period(Duration::from_secs(5))
        .with_seed(seed)
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_start_and_shutdown() {
    let clinic = Clinic::start(fast_config(1)).expect("Failed to start clinic");
    assert!(clinic.is_running());
    assert_eq!(clinic.active_admins(), 2);

    clinic.run_for(1800.0).expect("Clinic stopped early");
    clinic.shutdown().expect("Failed to shutdown clinic");
    assert!(!clinic.is_running());

    let snapshot = clinic.snapshot();
    assert!(!snapshot.running);
    assert!(snapshot.totals.generated > 0);
}

#[test]
fn test_patients_flow_through_every_stage() {
    let clinic = Clinic::start(fast_config(2)).expect("Failed to start clinic");

    let served = wait_until(Duration::from_secs(10), || {
        clinic.snapshot().totals.served >= 5
    });
    clinic.shutdown().expect("Failed to shutdown clinic");

    assert!(served, "no patients served: {}", clinic.snapshot());
    let snapshot = clinic.snapshot();
    assert!(snapshot.totals.classified >= snapshot.totals.served);
    assert!(snapshot.staff_in(StaffRole::Admin).any(|w| w.handled > 0));
    assert!(snapshot.efficiency() > 0.0);
}

#[test]
fn test_conservation_after_shutdown() {
    // Small queues so drops happen on both sides
    let config = fast_config(3)
        .with_capacities(5, 3)
        .with_admins(4, 4)
        .with_agents(1, 1, 1);
    let clinic = Clinic::start(config).expect("Failed to start clinic");
    clinic.run_for(10_000.0).expect("Clinic stopped early");
    clinic.shutdown().expect("Failed to shutdown clinic");

    let snapshot = clinic.snapshot();
    assert_eq!(snapshot.intake_imbalance(), 0, "{:#?}", snapshot.totals);
    assert_eq!(snapshot.service_imbalance(), 0, "{:#?}", snapshot.totals);
    assert_eq!(snapshot.totals.in_classification, 0);
    assert_eq!(snapshot.totals.in_service, 0);
    assert!(snapshot.dropped_intake() + snapshot.dropped_destination() > 0);
    for queue in &snapshot.queues {
        assert!(queue.depth <= queue.capacity, "{} overflowed", queue.name);
    }
}

#[test]
fn test_conservation_holds_mid_run() {
    let config = ClinicConfig::default()
        .with_speed_factor(5000.0)
        .with_poll_interval(Duration::from_millis(2))
        .with_capacities(20, 10)
        .with_agents(2, 1, 1)
        .with_seed(12);
    let clinic = Clinic::start(config).expect("Failed to start clinic");

    let deadline = Instant::now() + Duration::from_millis(1500);
    let mut samples = 0u64;
    while Instant::now() < deadline {
        let snapshot = clinic.snapshot();
        assert_eq!(snapshot.intake_imbalance(), 0, "{:#?}", snapshot.totals);
        assert_eq!(snapshot.service_imbalance(), 0, "{:#?}", snapshot.totals);
        samples += 1;
    }
    clinic.shutdown().expect("Failed to shutdown clinic");

    let snapshot = clinic.snapshot();
    assert!(samples > 100);
    assert!(snapshot.totals.generated > 0);
    assert_eq!(snapshot.intake_imbalance(), 0);
    assert_eq!(snapshot.service_imbalance(), 0);
}

#[test]
fn test_shutdown_is_idempotent() {
    let clinic = Clinic::start(fast_config(4)).expect("Failed to start clinic");
    clinic.shutdown().expect("First shutdown failed");
    let first = clinic.snapshot();

    clinic.shutdown().expect("Second shutdown failed");
    let second = clinic.snapshot();
    assert_eq!(first.totals, second.totals);
    assert_eq!(first.queues, second.queues);
}

#[test]
fn test_shutdown_is_prompt_with_long_delays() {
    // Real time, so every thread is parked in a multi-minute wait
    let config = ClinicConfig::default()
        .with_speed_factor(1.0)
        .with_poll_interval(Duration::from_millis(20));
    let clinic = Clinic::start(config).expect("Failed to start clinic");
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    clinic.shutdown().expect("Failed to shutdown clinic");
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "shutdown took {:?}",
        started.elapsed()
    );

    let started = Instant::now();
    let _ = clinic.snapshot();
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_drop_shuts_down() {
    let clinic = Clinic::start(fast_config(5)).expect("Failed to start clinic");
    clinic.run_for(100.0).expect("Clinic stopped early");
    drop(clinic);
}

#[test]
fn test_invalid_config_is_rejected() {
    let cases = [
        ClinicConfig::default().with_agents(0, 0, 0),
        ClinicConfig::default().with_agents(0, 0, 1),
        ClinicConfig::default().with_agents(0, 2, 2),
        ClinicConfig::default().with_agents(4, 0, 2),
        ClinicConfig::default().with_admins(0, 0),
        ClinicConfig::default().with_admins(2, 3),
        ClinicConfig::default().with_capacities(0, 10),
        ClinicConfig::default().with_speed_factor(0.0),
        ClinicConfig::default().with_speed_factor(f64::NAN),
    ];
    for config in cases {
        let result = Clinic::start(config.clone());
        assert!(
            matches!(result, Err(ClinicError::InvalidConfig { .. })),
            "accepted {:?}",
            config
        );
    }
}

#[test]
fn test_admin_pool_stays_within_bounds() {
    let timings = SimTimings {
        arrival_interval: DelayRange::new(1, 2),
        classification: DelayRange::new(300, 300),
        staffing_period_secs: 30,
        staffing_cooldown_secs: 30,
        ..SimTimings::default()
    };
    let clinic = Clinic::start(fast_config(6).with_admins(3, 1).with_timings(timings))
        .expect("Failed to start clinic");

    let deadline = Instant::now() + Duration::from_millis(500);
    while Instant::now() < deadline {
        let active = clinic.active_admins();
        assert!((1..=3).contains(&active), "active admins {}", active);
        thread::sleep(Duration::from_millis(2));
    }
    clinic.shutdown().expect("Failed to shutdown clinic");

    let snapshot = clinic.snapshot();
    assert_eq!(snapshot.active_admins, 3);
    let active_flags = snapshot
        .staff_in(StaffRole::Admin)
        .filter(|w| w.active)
        .count();
    assert_eq!(active_flags, snapshot.active_admins);
}

#[test]
fn test_specialist_assignment_controls_service() {
    let config = fast_config(7)
        .with_agents(1, 1, 0)
        .with_specialties(vec![Specialty::Cardiology]);
    let clinic = Clinic::start(config).expect("Failed to start clinic");
    clinic.run_for(3_000.0).expect("Clinic stopped early");
    clinic.shutdown().expect("Failed to shutdown clinic");

    let snapshot = clinic.snapshot();
    let specialists: Vec<&WorkerSnapshot> = snapshot
        .staff
        .iter()
        .filter(|w| matches!(w.role, StaffRole::Specialist(_)))
        .collect();
    assert_eq!(specialists.len(), 1);
    assert_eq!(
        specialists[0].role,
        StaffRole::Specialist(Specialty::Cardiology)
    );
    assert_eq!(snapshot.service_imbalance(), 0);
}

#[test]
fn test_snapshot_serializes_to_json() {
    let clinic = Clinic::start(fast_config(8)).expect("Failed to start clinic");
    clinic.run_for(600.0).expect("Clinic stopped early");
    clinic.shutdown().expect("Failed to shutdown clinic");

    let snapshot = clinic.snapshot();
    let json = snapshot.to_json_pretty().expect("Failed to serialize");
    assert!(json.contains(&snapshot.run_id.to_string()));
    assert!(json.contains("\"intake\""));

    let parsed: ClinicSnapshot = serde_json::from_str(&json).expect("Failed to parse");
    assert_eq!(parsed.run_id, clinic.run_id());
    assert_eq!(parsed.totals.generated, snapshot.totals.generated);
    assert_eq!(parsed.totals.served, snapshot.totals.served);
    assert_eq!(parsed.queues, snapshot.queues);
    assert_eq!(parsed.staff.len(), snapshot.staff.len());
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("clinic-config-{}.json", std::process::id()));
    let config = fast_config(9).with_admins(6, 3);
    std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

    let loaded = ClinicConfig::from_file(&path).expect("Failed to load config");
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, config);

    let missing = ClinicConfig::from_file(path.with_extension("missing"));
    assert!(matches!(missing, Err(ClinicError::Io(_))));
}
