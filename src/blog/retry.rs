use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::error::{describe, TransportError};
use super::transport::TransportResult;

/// How remote reads are retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  /// Extra attempts after the first one
  pub retries: u32,
  /// Pause between attempts
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      retries: 2,
      delay: Duration::from_millis(200),
    }
  }
}

impl RetryPolicy {
  /// Run `op`, re-issuing it while it fails with a transient error and
  /// attempts remain. The last error is returned as is.
  pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> TransportResult<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = TransportResult<T>>,
  {
    let mut attempt = 0;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(err) => {
          let retry = err.is_transient() && attempt < self.retries;
          log_failure(what, attempt + 1, retry, &err);
          if !retry {
            return Err(err);
          }
          attempt += 1;
          if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
          }
        }
      }
    }
  }
}

fn log_failure(what: &str, attempt: u32, will_retry: bool, err: &TransportError) {
  warn!(
    request = what,
    attempt,
    will_retry,
    category = %err.category(),
    reason = %describe(err),
    error = %err,
    "remote request failed"
  );
}
