//! Exponential-backoff retry for the top-level generation call.
//!
//! The schedule is `2^attempt` seconds with no jitter, so tests see a
//! deterministic timeline. Retry is kind-agnostic: even authentication
//! failures are retried. The single exception is `config`, which is
//! raised before any network call and cannot heal on its own.

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

use crate::error::{AiError, ErrorKind};
use crate::provider::{GenerationRequest, TextGenerator};

const INITIAL_INTERVAL_SECS: u64 = 2;
const MAX_INTERVAL_SECS: u64 = 60;

fn backoff_schedule() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        multiplier: 2.0,
        randomization_factor: 0.0,
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Call `generate` up to `max_attempts` times with exponential backoff.
///
/// On exhaustion the last error is surfaced with the attempt count appended
/// to its message; its kind is preserved.
pub async fn generate_with_retry(
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
    max_attempts: u32,
) -> Result<String, AiError> {
    let max_attempts = max_attempts.max(1);
    let mut schedule = backoff_schedule();
    let mut last_error: Option<AiError> = None;

    for attempt in 1..=max_attempts {
        match generator.generate(request).await {
            Ok(text) => return Ok(text),
            Err(err) => {
                if err.kind == ErrorKind::Config {
                    return Err(err);
                }
                warn!(
                    attempt,
                    max_attempts,
                    kind = err.kind.as_str(),
                    "generation attempt failed: {}",
                    err.message
                );
                last_error = Some(err);

                if attempt < max_attempts
                    && let Some(wait) = schedule.next_backoff()
                {
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    let last = last_error.expect("at least one attempt was made");
    Err(AiError::new(
        last.kind,
        format!("{} (after {max_attempts} attempts)", last.message),
    ))
}
