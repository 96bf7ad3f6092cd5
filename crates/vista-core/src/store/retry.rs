//! Retry classification and backoff for vector store requests.

use crate::error::StoreError;
use std::time::Duration;

/// Determine whether a store error is worth retrying.
///
/// Retryable: transport failures (refused, reset, timed out), rate limits
/// (429) and server errors (5xx). Application errors such as a missing
/// collection or a schema conflict are not.
pub fn is_retryable(error: &StoreError) -> bool {
    match error {
        StoreError::Connection { .. } => true,
        StoreError::Http { status_code, .. } => {
            *status_code == 429 || (500..=599).contains(status_code)
        }
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}
