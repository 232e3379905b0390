use std::future::Future;

use crate::config::RetryConfig;
use crate::error::GatewayError;

/// Retry `op` while the backend is unreachable (e.g. a hosted instance
/// still waking up). Every other outcome is returned immediately.
pub async fn with_wakeup_retry<T, F, Fut>(policy: &RetryConfig, mut op: F) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if err.is_unreachable() && attempt < policy.wakeup_attempts => {
                attempt += 1;
                tracing::info!(
                    "Server unreachable, retrying ({}/{}) in {}ms",
                    attempt,
                    policy.wakeup_attempts,
                    policy.wakeup_delay_ms
                );
                tokio::time::sleep(policy.delay()).await;
            }
            result => return result,
        }
    }
}
