//! Retry utilities for transient description failures.
//!
//! Provides classification of retryable errors and exponential backoff.

use crate::error::DescribeError;
use std::time::Duration;

/// Determine whether a describe error is worth retrying.
///
/// Retryable: timeouts, throttling, model warm-up, server-side failures.
/// Non-retryable: auth failures, validation errors, unknown models.
pub fn is_retryable(error: &DescribeError) -> bool {
    match error {
        DescribeError::Timeout { .. } => true,
        DescribeError::Api {
            code: Some(code), ..
        } => matches!(
            code.as_str(),
            "ThrottlingException"
                | "ModelTimeoutException"
                | "ModelNotReadyException"
                | "InternalServerException"
                | "ServiceUnavailableException"
        ),
        // Fallback for errors with no service code (connection refused,
        // DNS failure, dispatch timeout)
        DescribeError::Api { code: None, message } => {
            message.contains("timed out")
                || message.contains("connect")
                || message.contains("dispatch failure")
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
