//! Backoff for idempotent collaborator reads.
//!
//! Only connection failures and timeouts are retried; a request that never
//! left the client (bad URL, body encoding) fails on the first attempt, and
//! status codes are left to the caller. Writes (file writes and removals,
//! pin changes, transaction submission) are sent once: a retried
//! `files/rm` whose first attempt landed reports the file as missing, and a
//! retried submit could put a second transaction in the pool.

use std::future::Future;
use std::time::Duration;

/// The collaborator a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Collaborator {
    ContentStore,
    Ledger,
}

impl Collaborator {
    fn as_str(self) -> &'static str {
        match self {
            Self::ContentStore => "content_store",
            Self::Ledger => "ledger",
        }
    }
}

/// Retry schedule for one collaborator's reads.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    collaborator: Collaborator,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Three retries after the first attempt, waiting 200ms, 400ms, 800ms.
    pub(crate) const fn new(collaborator: Collaborator) -> Self {
        Self {
            collaborator,
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }

    #[cfg(test)]
    fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.pow(attempt)
    }

    /// Send a read, retrying transport failures.
    ///
    /// `f` is called at most `max_retries + 1` times.
    pub(crate) async fn send<F, Fut>(
        &self,
        endpoint: &str,
        f: F,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    let delay = self.delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        collaborator = self.collaborator.as_str(),
                        endpoint,
                        attempt,
                        max_retries = self.max_retries,
                        "request failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn closed_port_client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap()
    }

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::new(Collaborator::Ledger);
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(1), Duration::from_millis(400));
        assert_eq!(policy.delay(2), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn connection_failures_use_every_attempt() {
        let policy =
            RetryPolicy::new(Collaborator::ContentStore).with_base_delay(Duration::from_millis(1));
        let calls = Arc::new(AtomicU32::new(0));
        let client = closed_port_client();

        let result = policy
            .send("version", || {
                calls.fetch_add(1, Ordering::SeqCst);
                // Port 1 is closed: connection refused.
                client.post("http://127.0.0.1:1/api/v0/version").send()
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn requests_that_never_left_are_not_retried() {
        let policy = RetryPolicy::new(Collaborator::Ledger);
        let calls = Arc::new(AtomicU32::new(0));
        let client = closed_port_client();

        let result = policy
            .send("GET /wallets", || {
                calls.fetch_add(1, Ordering::SeqCst);
                client.get("not a url").send()
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
