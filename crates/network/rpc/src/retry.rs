use std::{future::Future, time::Duration};

use backoff::{future::retry, Error as BackoffError, ExponentialBackoff};
use tracing::{error, warn};

use crate::ChainError;

/// Execute a read-only operation with exponential backoff retries.
///
/// Connection failures and timeouts are retried until `timeout` has elapsed. Errors answered by
/// the node (reverts, bad parameters) are returned immediately. Never use this for writes: a
/// retried submission may land twice.
pub async fn retry_operation<T, F, Fut>(
    operation: F,
    timeout: Option<Duration>,
    operation_name: &str,
) -> Result<T, ChainError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let backoff = ExponentialBackoff {
        initial_interval: Duration::from_millis(500),
        max_interval: Duration::from_secs(10),
        max_elapsed_time: timeout,
        ..Default::default()
    };

    retry(backoff, || async {
        match operation().await {
            Ok(result) => Ok(result),
            Err(e) if e.is_transient() => {
                warn!("Transient error when {}: {}, retrying...", operation_name, e);
                Err(BackoffError::transient(e))
            }
            Err(e) => {
                error!("Permanent error when {}: {}", operation_name, e);
                Err(BackoffError::permanent(e))
            }
        }
    })
    .await
}
