//! Tests for run cancellation: interruptible waits and shutdown wake-ups

use clinic_sim::core::CancellationReason;
use clinic_sim::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_cancel_interrupts_simulated_waits() {
    let clock = SimClock::new(1.0).expect("Failed to create clock");
    let token = CancellationToken::new();

    let sleepers: Vec<_> = (0..4)
        .map(|_| {
            let token = token.clone();
            // An hour of simulated time at real speed
            thread::spawn(move || clock.wait(3600.0, &token))
        })
        .collect();

    thread::sleep(Duration::from_millis(30));
    let started = Instant::now();
    token.cancel_with_reason(CancellationReason::Shutdown);

    for sleeper in sleepers {
        assert!(!sleeper.join().expect("sleeper panicked"));
    }
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(token.reason(), Some(CancellationReason::Shutdown));
}

#[test]
fn test_completed_wait_reports_success() {
    let clock = SimClock::new(1000.0).expect("Failed to create clock");
    let token = CancellationToken::new();

    let started = Instant::now();
    assert!(clock.wait(50.0, &token));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_wait_after_cancel_returns_immediately() {
    let clock = SimClock::new(1.0).expect("Failed to create clock");
    let token = CancellationToken::new();
    token.cancel();

    let started = Instant::now();
    assert!(!clock.wait(3600.0, &token));
    assert!(!clock.wait(0.0, &token));
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[test]
fn test_cancel_callback_releases_queue_consumers() {
    let token = CancellationToken::new();
    let queue = Arc::new(PriorityQueue::<Patient>::new("general", 8));
    {
        let queue = Arc::clone(&queue);
        token.on_cancel(move || queue.close());
    }

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    token.cancel_with_reason(CancellationReason::Shutdown);

    for consumer in consumers {
        assert!(consumer.join().expect("consumer panicked").is_none());
    }
    assert!(queue.is_closed());
}

#[test]
fn test_polling_loop_observes_cancellation() {
    // Shape of every clinic worker loop: timed dequeue, then re-check the token
    let token = CancellationToken::new();
    let queue = Arc::new(PriorityQueue::<Patient>::new("intake", 8));
    let polls = Arc::new(AtomicUsize::new(0));

    let worker = {
        let token = token.clone();
        let queue = Arc::clone(&queue);
        let polls = Arc::clone(&polls);
        thread::spawn(move || {
            let mut handled = 0;
            while !token.is_cancelled() {
                polls.fetch_add(1, Ordering::Relaxed);
                if let Dequeue::Ready(_) = queue.dequeue_timeout(Duration::from_millis(5)) {
                    handled += 1;
                }
            }
            handled
        })
    };

    queue
        .enqueue_fifo(Patient::new(1, Category::General, 2))
        .expect("intake full");
    thread::sleep(Duration::from_millis(40));
    token.cancel();

    assert_eq!(worker.join().expect("worker panicked"), 1);
    assert!(polls.load(Ordering::Relaxed) > 1);
}

#[test]
fn test_clinic_shutdown_cancels_running_waits() {
    let config = ClinicConfig::default()
        .with_speed_factor(1.0)
        .with_poll_interval(Duration::from_millis(10))
        .with_seed(99);
    let clinic = Arc::new(Clinic::start(config).expect("Failed to start clinic"));

    let waiter = {
        let clinic = Arc::clone(&clinic);
        thread::spawn(move || clinic.run_for(3600.0))
    };

    thread::sleep(Duration::from_millis(30));
    clinic.shutdown().expect("Failed to shutdown clinic");

    let finished = waiter
        .join()
        .expect("waiter panicked")
        .expect("run_for failed");
    assert!(!finished);
}
