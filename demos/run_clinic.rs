//! Clinic simulation demo
//!
//! Runs a clinic day at high speed, printing a status board periodically and
//! the final snapshot as JSON.
//!
//! Run with: cargo run --example run_clinic [config.json] [simulated-hours]
//!
//! Set `RUST_LOG=clinic_sim=debug` to follow individual patients.

use clinic_sim::prelude::*;
use std::time::Duration;

const REPORT_EVERY_SECS: f64 = 3600.0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path != "-" => ClinicConfig::from_file(&path)?,
        _ => ClinicConfig::default()
            .with_speed_factor(1200.0)
            .with_poll_interval(Duration::from_millis(20)),
    };
    let hours: f64 = args
        .next()
        .and_then(|h| h.parse().ok())
        .filter(|h: &f64| h.is_finite() && *h > 0.0)
        .unwrap_or(8.0);

    println!("=== Clinic Simulation ===\n");
    println!(
        "Simulating {:.1} hours at x{} ({} admin slots, {} active)\n",
        hours, config.speed_factor, config.max_admins, config.initial_admins
    );

    let clinic = Clinic::start(config)?;

    let mut remaining = hours * 3600.0;
    while remaining > 0.0 {
        let step = remaining.min(REPORT_EVERY_SECS);
        if !clinic.run_for(step)? {
            break;
        }
        remaining -= step;
        println!("{}", clinic.snapshot());
    }

    clinic.shutdown()?;

    let snapshot = clinic.snapshot();
    println!("=== Final Report ===\n");
    println!("{}", snapshot);
    println!(
        "Served {:.1}% of arrivals, {:.1}% of pickups abandoned, average wait {:.0}s simulated",
        snapshot.efficiency() * 100.0,
        snapshot.abandonment_rate() * 100.0,
        snapshot.totals.avg_wait_secs * snapshot.speed_factor
    );
    println!("\n{}", snapshot.to_json_pretty()?);

    Ok(())
}
