//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound how long an upstream read may stay silent
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A zero/absent limit means wait forever

use std::future::Future;
use std::time::Duration;
use tokio::time::error::Elapsed;

/// Await `fut`, failing with [`Elapsed`] if `limit` passes first.
pub async fn with_idle_limit<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await,
        None => Ok(fut.await),
    }
}

/// Seconds from config to an optional limit; `0` disables it.
pub fn limit_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_idle_limit_elapses() {
        let res = with_idle_limit(
            Some(Duration::from_secs(1)),
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert!(res.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_limit_waits() {
        let res = with_idle_limit(None, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            7
        })
        .await;
        assert_eq!(res.unwrap(), 7);
    }

    #[test]
    fn test_limit_from_secs() {
        assert_eq!(limit_from_secs(0), None);
        assert_eq!(limit_from_secs(30), Some(Duration::from_secs(30)));
    }
}
