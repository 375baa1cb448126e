//! Delay between attempts.

use std::sync::Arc;
use std::time::Duration;

/// Computes the wait before retry number `attempt` (0-based: the first retry
/// passes 0) from the policy's `(min, max)` bounds.
pub type Backoff = Arc<dyn Fn(Duration, Duration, u32) -> Duration + Send + Sync>;

/// Exponential backoff: `min * 2^attempt`, clamped to `max`.
///
/// Deterministic (no jitter). `attempt = 0` yields exactly `min`. Any overflow of
/// the power or of the multiplication clamps to `max`, so the result stays in
/// `[min, max]` whenever `min <= max`.
pub fn exponential_backoff(min: Duration, max: Duration, attempt: u32) -> Duration {
    let delay = 2u32
        .checked_pow(attempt)
        .and_then(|factor| min.checked_mul(factor));
    match delay {
        Some(d) if d <= max => d,
        _ => max,
    }
}
