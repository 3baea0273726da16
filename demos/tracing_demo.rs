//! Demonstrates the tracing events emitted by the retry driver
//!
//! Run with: cargo run --example tracing_demo --features tracing

use std::time::Duration;

use povtor::prelude::*;

#[tokio::main]
async fn main() {
    // Set up tracing subscriber
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    tracing::info!("Starting tracing demo");

    // A cycle that settles on its own
    let status = retry(
        RetrySettings::new(|status: &RetryStatus<u64, String>| match status.attempt() {
            n if n < 3 => Err(format!("attempt {} failed", n)),
            n => Ok(n),
        })
        .map_policy(|p| {
            p.with_retry_qty(5)
                .with_retry_timeout(Duration::from_millis(20))
                .with_retry_on_error(true)
        }),
    );

    match status.completion().await {
        Ok(value) => tracing::info!("Cycle completed: {:?}", value),
        Err(e) => tracing::error!("Cycle failed: {}", e),
    }

    // A cycle stopped from the outside
    let status = retry(
        RetrySettings::new(|status: &RetryStatus<u64, String>| Ok(status.attempt())).map_policy(
            |p| {
                p.with_retry_timeout(Duration::from_millis(50))
                    .with_retry_test(true)
            },
        ),
    );
    tokio::time::sleep(Duration::from_millis(120)).await;
    let outcome = status.stop().await;
    tracing::info!("Stopped cycle result: {:?}", outcome);

    // A panicking predicate abandons the cycle
    let status = retry(
        RetrySettings::new(|_: &RetryStatus<u64, String>| Ok(1))
            .map_policy(|p| p.with_retry_test_fn(|_, _| panic!("predicate failed"))),
    );
    match status.completion().await {
        Ok(value) => tracing::info!("Unexpected success: {:?}", value),
        Err(e) => tracing::error!("Cycle abandoned: {}", e),
    }
}
