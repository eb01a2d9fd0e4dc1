//! Retry-with-backoff (§4.A, §7): 500ms * 2^k, up to `attempts` tries.

use crate::config::{RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS};
use std::fmt::Display;
use std::future::Future;
use tracing::warn;

pub async fn retry<F, Fut, T, E>(mut op: F, attempts: u32, label: &str) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut delay_ms = RETRY_BASE_DELAY_MS;
    let mut last_err = None;
    for attempt in 1..=attempts.max(1) {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                warn!(label, attempt, error = %e, "operation failed, retrying");
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    delay_ms *= 2;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt was made"))
}

/// Convenience wrapper using the design's default attempt count.
pub async fn retry_default<F, Fut, T, E>(op: F, label: &str) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry(op, RETRY_ATTEMPTS, label).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(42)
                }
            },
            3,
            "test",
        )
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fails_after_exhausting_attempts() {
        let result: Result<u32, String> = retry(|| async { Err("nope".to_string()) }, 3, "test").await;
        assert_eq!(result, Err("nope".to_string()));
    }
}
