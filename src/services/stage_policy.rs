use std::{future::Future, time::Duration};

use crate::errors::{AppError, AppResult};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry and timeout rules for one pipeline stage.
///
/// Each attempt is bounded by `timeout` when set. Transient failures
/// (rate limits, transport errors, timeouts) are retried up to
/// `max_retries` times with exponential backoff. Malformed replies are
/// re-prompted up to `malformed_retries` times without delay. Anything
/// else is returned immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct StagePolicy {
    pub name: String,
    pub description: Option<String>,
    pub max_retries: u32,
    pub malformed_retries: u32,
    pub timeout: Option<Duration>,
    pub backoff: Duration,
}

impl StagePolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            max_retries: 0,
            malformed_retries: 0,
            timeout: None,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_malformed_retries(mut self, malformed_retries: u32) -> Self {
        self.malformed_retries = malformed_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay before transient retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Runs `attempt` under this policy. `cid` tags log lines.
    ///
    /// `attempt` receives the number of malformed re-prompts issued so far,
    /// so a stage can tighten its prompt after a malformed reply.
    pub async fn execute<T, F, Fut>(&self, cid: &str, mut attempt: F) -> AppResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut transient_retries = 0;
        let mut malformed_retries = 0;

        loop {
            let outcome = match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt(malformed_retries)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Timeout(limit)),
                },
                None => attempt(malformed_retries).await,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && transient_retries < self.max_retries => {
                    let delay = self.delay_for(transient_retries);
                    transient_retries += 1;
                    log::warn!(
                        "[{}] {} attempt failed ({}), retry {}/{} in {:?}",
                        cid,
                        self.name,
                        err,
                        transient_retries,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_malformed() && malformed_retries < self.malformed_retries => {
                    malformed_retries += 1;
                    log::warn!(
                        "[{}] {} reply was malformed ({}), re-prompting {}/{}",
                        cid,
                        self.name,
                        err,
                        malformed_retries,
                        self.malformed_retries
                    );
                }
                Err(err) => {
                    log::error!("[{}] {} failed: {}", cid, self.name, err);
                    return Err(err);
                }
            }
        }
    }
}
