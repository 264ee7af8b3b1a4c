
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use crate::{AssistantError, Result};

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;

/// Blocking JSON client shared by the embedding and chat services.
///
/// Every request is bounded by a global timeout. Server errors and transport
/// failures are retried with exponential backoff; client errors are not.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff: Duration,
}

impl HttpClient {
    #[inline]
    pub fn new(timeout: Duration, retry_attempts: u32) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            retry_attempts: retry_attempts.max(1),
            backoff: Duration::from_secs(1),
        }
    }

    /// Base delay before the first retry, doubled on every further attempt
    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts.max(1);
        self
    }

    #[inline]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    #[inline]
    pub fn get_text(&self, url: &Url) -> Result<String> {
        self.request_with_retry(url, || {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    /// POST `body` as JSON and decode the JSON response
    #[inline]
    pub fn post_json<B, R>(&self, url: &Url, headers: &[(&str, &str)], body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let request_json = serde_json::to_string(body)
            .map_err(|e| AssistantError::Network(format!("Failed to serialize request: {}", e)))?;

        let response_text = self.request_with_retry(url, || {
            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            request
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        serde_json::from_str(&response_text)
            .map_err(|e| AssistantError::Network(format!("Failed to parse response: {}", e)))
    }

    fn request_with_retry<F>(&self, url: &Url, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!(
                "HTTP request to {} attempt {}/{}",
                url.path(),
                attempt,
                self.retry_attempts
            );

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) if *status >= 500 => {
                            warn!(
                                "Server error (status {}), attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                            true
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(AssistantError::Network(format!(
                                "Client error: HTTP {}",
                                status
                            )));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    let mapped = map_error(&error);
                    if !should_retry {
                        return Err(mapped);
                    }
                    last_error = Some(mapped);

                    if attempt < self.retry_attempts {
                        let delay = self.backoff * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", url);

        Err(last_error
            .unwrap_or_else(|| AssistantError::Network("Request failed after retries".to_string())))
    }
}

fn map_error(error: &ureq::Error) -> AssistantError {
    match error {
        ureq::Error::Timeout(_) => AssistantError::Timeout(error.to_string()),
        ureq::Error::StatusCode(status) => {
            AssistantError::Network(format!("Server error: HTTP {}", status))
        }
        other => AssistantError::Network(other.to_string()),
    }
}
