//! Retry Patterns Example
//!
//! Demonstrates driving operations through a retry policy while watching the
//! live status. Shows practical patterns including:
//! - Retrying a flaky call a fixed number of times
//! - An explicit per-retry delay schedule
//! - Polling until a value is ready
//! - Delays computed from the status, including aborting
//! - Stopping a cycle from the outside
//!
//! Run with: cargo run --example retry_patterns

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use povtor::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum HttpError {
    ServerError(u16),
    ClientError(u16),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ServerError(code) => write!(f, "server error {}", code),
            HttpError::ClientError(code) => write!(f, "client error {}", code),
        }
    }
}

fn report<T: std::fmt::Debug + Clone, E: std::fmt::Display + Clone>(
    status: &RetryStatus<T, E>,
    outcome: Result<Option<T>, RetryError<E>>,
) {
    match outcome {
        Ok(value) => println!("Finished after {} attempts: {:?}", status.attempt(), value),
        Err(e) => println!("Gave up after {} attempts: {}", status.attempt(), e),
    }
}

// ==================== Fixed Retry Count ====================

/// Example 1: Retry a flaky call up to three times
async fn example_retry_qty() {
    println!("\n=== Example 1: Retry Count ===");

    let calls = Arc::new(AtomicU32::new(0));
    let status = retry(
        RetrySettings::new_async({
            let calls = calls.clone();
            move |status: &RetryStatus<&'static str, HttpError>| {
                let calls = calls.clone();
                println!("  Attempt {}", status.attempt());
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(HttpError::ServerError(503))
                    } else {
                        Ok("payload")
                    }
                }
            }
        })
        .map_policy(|p| {
            p.with_retry_qty(3)
                .with_retry_timeout(Duration::from_millis(50))
                .with_retry_on_error(true)
        }),
    );

    let outcome = status.completion().await;
    report(&status, outcome);
}

// ==================== Explicit Schedule ====================

/// Example 2: One delay per retry; retry only server errors
async fn example_schedule() {
    println!("\n=== Example 2: Explicit Schedule ===");

    for error in [HttpError::ServerError(500), HttpError::ClientError(404)] {
        let status = retry(
            RetrySettings::new(move |status: &RetryStatus<String, HttpError>| {
                println!("  Attempt {} at {:?}", status.attempt(), status.elapsed());
                Err(error.clone())
            })
            .map_policy(|p| {
                p.with_retry_attempts([
                    Duration::from_millis(20),
                    Duration::from_millis(40),
                    Duration::from_millis(80),
                ])
                .with_retry_on_error_fn(|err, _| matches!(err, HttpError::ServerError(_)))
            }),
        );

        let outcome = status.completion().await;
        report(&status, outcome);
    }
}

// ==================== Polling ====================

/// Example 3: Poll a job until it reports completion
async fn example_polling() {
    println!("\n=== Example 3: Polling ===");

    let progress = Arc::new(AtomicU32::new(0));
    let status = retry(
        RetrySettings::new({
            let progress = progress.clone();
            move |_: &RetryStatus<u32, String>| Ok(progress.fetch_add(30, Ordering::SeqCst) + 30)
        })
        .map_policy(|p| {
            p.with_retry_timeout(Duration::from_millis(25))
                .with_retry_test_fn(|percent, _| {
                    println!("  Progress: {}%", percent);
                    *percent < 100
                })
        }),
    );

    let outcome = status.completion().await;
    report(&status, outcome);
}

// ==================== Dynamic Delays ====================

/// Example 4: Grow the delay with each attempt, and abort past a ceiling
async fn example_dynamic_delay() {
    println!("\n=== Example 4: Dynamic Delays ===");

    let status = retry(
        RetrySettings::new(|_: &RetryStatus<(), String>| Err("connection refused".to_string()))
            .map_policy(|p| {
                p.with_extension("base_ms", 10u64)
                    .with_retry_on_error(true)
                    .with_retry_timeout_fn(|status| {
                        let base = status.extensions().get::<u64>("base_ms").copied();
                        let delay = base.map(|ms| Duration::from_millis(ms << status.attempt()));
                        match delay {
                            Some(d) if d <= Duration::from_millis(200) => {
                                println!("  Next attempt in {:?}", d);
                                NextDelay::After(d)
                            }
                            _ => NextDelay::Abort,
                        }
                    })
            }),
    );

    let outcome = status.completion().await;
    report(&status, outcome);
}

// ==================== Stop ====================

/// Example 5: Stop a long-running poll from the outside
async fn example_stop() {
    println!("\n=== Example 5: Stop ===");

    let status = retry(
        RetrySettings::new(|status: &RetryStatus<u64, String>| Ok(status.attempt())).map_policy(
            |p| {
                p.with_retry_timeout(Duration::from_millis(30))
                    .with_retry_test(true)
            },
        ),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    println!(
        "  Waiting: {}, attempts so far: {}",
        status.is_waiting(),
        status.attempt()
    );

    let outcome = status.stop().await;
    println!("  Stopped: {}", status.is_stopped());
    report(&status, outcome);

    for entry in status.history() {
        println!("  {:?}: {:?}", entry.time - status.start_time(), entry.outcome);
    }
}

#[tokio::main]
async fn main() {
    println!("======================================");
    println!("       Retry Patterns Example         ");
    println!("======================================");

    example_retry_qty().await;
    example_schedule().await;
    example_polling().await;
    example_dynamic_delay().await;
    example_stop().await;

    println!("\n======================================");
    println!("           Examples Complete           ");
    println!("======================================");
}
