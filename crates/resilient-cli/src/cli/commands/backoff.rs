//! `resilient backoff` – show the waits the retry policy would use.

use anyhow::Result;
use resilient_core::config::ResilientConfig;
use resilient_core::retry::Policy;
use std::time::Duration;

use crate::cli::RetryArgs;

/// Wait before each retry, in order.
fn schedule<T, E>(policy: &Policy<T, E>) -> Vec<Duration> {
    (0..policy.retry_max).map(|n| policy.delay(n)).collect()
}

fn print_schedule(waits: &[Duration]) {
    println!("  {:>5}  {:>10}  {:>10}", "Retry", "Wait(s)", "Total(s)");
    println!("  {}  {}  {}", "-----", "----------", "----------");
    let mut total = Duration::ZERO;
    for (i, wait) in waits.iter().enumerate() {
        total = total.saturating_add(*wait);
        println!(
            "  {:>5}  {:>10.3}  {:>10.3}",
            i + 1,
            wait.as_secs_f64(),
            total.as_secs_f64()
        );
    }
}

pub fn run_backoff(cfg: &ResilientConfig, retry: &RetryArgs) -> Result<()> {
    let policy: Policy<(), ()> = retry.apply(cfg.retry()).to_policy()?;
    let waits = schedule(&policy);
    if waits.is_empty() {
        println!("retries disabled (retry_max = 0)");
        return Ok(());
    }
    print_schedule(&waits);
    Ok(())
}
