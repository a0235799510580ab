use std::future::Future;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::{ErrorKind, Result};

/// Run `op` up to `policy.attempts` times, sleeping `policy.delay` between attempts.
/// Only storage failures are retried; anything else is returned straight away.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.kind() == ErrorKind::Storage && attempt < attempts => {
                warn!("{label}: storage error (attempt {attempt}/{attempts}): {e}");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
