use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::app::ports::HttpClientPort;
use crate::config::FetchSettings;
use crate::error::FetchError;
use crate::pipeline::rate_limiter::RateLimiter;
use crate::types::PageFetch;

/// Per-call knobs for [`Fetcher::fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    /// Cap on the total number of attempts; 0 behaves like 1.
    pub max_retries: u32,
}

impl From<&FetchSettings> for FetchPolicy {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            max_retries: settings.max_retries,
        }
    }
}

pub struct Fetcher {
    http: Arc<dyn HttpClientPort>,
    limiter: RateLimiter,
    initial_backoff: Duration,
}

impl Fetcher {
    pub fn new(http: Arc<dyn HttpClientPort>, limiter: RateLimiter) -> Self {
        Self {
            http,
            limiter,
            initial_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1u32 << exp)
    }

    pub async fn fetch_with(&self, url: &str, policy: FetchPolicy) -> Result<PageFetch, FetchError> {
        self.fetch(url, policy.timeout, policy.max_retries).await
    }

    #[instrument(level = "info", skip(self, timeout))]
    pub async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<PageFetch, FetchError> {
        let parsed = parse_absolute(url)?;
        if timeout.is_zero() {
            return Err(FetchError::InvalidRequest("timeout must be greater than zero".into()));
        }
        let host = parsed.host_str().unwrap_or_default().to_string();
        let max_attempts = max_retries.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.acquire(&host).await;
            debug!(attempt, "Sending request");

            match self.attempt(url, timeout).await {
                Ok(mut page) => {
                    page.attempts = attempt;
                    return Ok(page);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying");
                    sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    error!(attempts = attempt, error = %e, "Exhausted retries");
                    return Err(FetchError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    error!(error = %e, "Non-retriable fetch failure");
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, url: &str, timeout: Duration) -> Result<PageFetch, FetchError> {
        let resp = self.http.get(url, timeout).await?;
        if !(200..300).contains(&resp.status) {
            return Err(FetchError::HttpStatus(resp.status));
        }
        let body = String::from_utf8_lossy(&resp.bytes).into_owned();
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }
        Ok(PageFetch {
            status: resp.status,
            body,
            final_url: resp.final_url,
            attempts: 0,
        })
    }
}

fn parse_absolute(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidRequest(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(parsed),
        _ => Err(FetchError::InvalidRequest(format!(
            "{url}: expected an absolute http(s) URL"
        ))),
    }
}
