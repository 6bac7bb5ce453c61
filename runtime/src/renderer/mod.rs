//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` trait that abstracts over the browser engine
//! (currently Chromium via chromiumoxide) and the wait strategies used to
//! decide when client-side rendering has finished.

pub mod chromium;

use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// How long to let the page render before reading its HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Sleep unconditionally. Late content is silently missed.
    Fixed(Duration),
    /// Poll until every selector matches an element, failing with
    /// [`TrackerError::RenderTimeout`] once `timeout` has elapsed.
    Poll {
        selectors: Vec<String>,
        timeout: Duration,
        interval: Duration,
    },
}

/// A browser engine that turns a URL into fully rendered HTML.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url`, wait per `wait`, and return the document source.
    async fn render(&self, url: &str, wait: &WaitStrategy) -> Result<String>;
}

/// Drive `check` according to `strategy`.
///
/// `check` reports whether the page is ready; it is not called at all for
/// [`WaitStrategy::Fixed`]. Check errors abort the wait.
pub async fn wait_until_ready<F, Fut>(strategy: &WaitStrategy, mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    match strategy {
        WaitStrategy::Fixed(delay) => {
            tokio::time::sleep(*delay).await;
            Ok(())
        }
        WaitStrategy::Poll {
            selectors,
            timeout,
            interval,
        } => {
            let deadline = Instant::now() + *timeout;
            loop {
                if check().await? {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(TrackerError::RenderTimeout {
                        selectors: selectors.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                tokio::time::sleep(*interval).await;
            }
        }
    }
}

/// JavaScript expression that is `true` once every selector matches.
pub fn readiness_script(selectors: &[String]) -> Result<String> {
    let list = serde_json::to_string(selectors)?;
    Ok(format!(
        "{list}.every(function (s) {{ return document.querySelector(s) !== null; }})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn poll(timeout_ms: u64) -> WaitStrategy {
        WaitStrategy::Poll {
            selectors: vec!["score-details-critics-deprecated".into()],
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_poll_returns_once_ready() {
        let calls = AtomicUsize::new(0);
        wait_until_ready(&poll(2_000), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(n >= 3) }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_poll_times_out_with_distinct_error() {
        let err = wait_until_ready(&poll(30), || async { Ok(false) })
            .await
            .unwrap_err();
        match err {
            TrackerError::RenderTimeout {
                selectors,
                timeout_ms,
            } => {
                assert_eq!(selectors, vec!["score-details-critics-deprecated"]);
                assert_eq!(timeout_ms, 30);
            }
            other => panic!("expected render timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_error_aborts_wait() {
        let err = wait_until_ready(&poll(2_000), || async {
            Err(TrackerError::fetch("https://example.com", "page crashed"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, TrackerError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_fixed_never_checks() {
        let calls = AtomicUsize::new(0);
        wait_until_ready(&WaitStrategy::Fixed(Duration::from_millis(1)), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(false) }
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_readiness_script_quotes_selectors() {
        let script = readiness_script(&["a-b".to_string(), "c\"d".to_string()]).unwrap();
        assert!(script.starts_with(r#"["a-b","c\"d"].every("#));
    }
}
