//! Retry predicates: decide from an attempt's outcome whether to go again.

use std::sync::Arc;

/// Boxed error used for terminal predicate failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classifies an attempt outcome.
///
/// `Ok(true)` continues retrying, `Ok(false)` stops with the outcome as-is.
/// `Err` aborts the whole run immediately with that error, regardless of the
/// remaining retry budget.
pub type Check<T, E> = Arc<dyn Fn(&Result<T, E>) -> Result<bool, BoxError> + Send + Sync>;

/// Default predicate: retry on any error, never fail.
pub fn default_check<T, E>(outcome: &Result<T, E>) -> Result<bool, BoxError> {
    Ok(outcome.is_err())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_errors_only() {
        assert!(default_check::<(), &str>(&Err("boom")).unwrap());
        assert!(!default_check::<u8, &str>(&Ok(1)).unwrap());
    }
}
