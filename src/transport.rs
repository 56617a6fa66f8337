use std::thread;
use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::error::{Error, Result};

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Retry behavior on per-attempt timeouts.
///
/// The service is assumed reliable but occasionally slow: a timeout is
/// retried after a fixed backoff, while any other transport failure aborts
/// immediately so real outages are not masked. The default keeps the
/// retry-forever behavior; set `max_attempts` to bound it.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts allowed per request; `None` retries without limit.
    pub max_attempts: Option<u32>,
    /// Wait between attempts after a timeout.
    pub backoff: Duration,
    /// Per-attempt timeout covering connect and body read.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff: RETRY_BACKOFF,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::default()
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Blocking request executor shared by every WCS endpoint.
#[derive(Debug, Clone)]
pub struct Transport {
    http: HttpClient,
    retry: RetryPolicy,
}

impl Transport {
    /// The API key, when present, is attached to every request as the
    /// `apikey` header the service expects.
    pub fn new(api_key: Option<&str>, retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("meteofrance-wcs/0.1"));
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| Error::Settings("api key is not a valid header value".into()))?;
            headers.insert("apikey", value);
        }

        let http = HttpClient::builder().default_headers(headers).build()?;
        Ok(Self { http, retry })
    }

    /// GET `url` with `query`, returning the response body.
    ///
    /// Timeouts are retried per the policy; any other transport failure or a
    /// non-2xx status is returned to the caller on the first occurrence.
    pub fn get(&self, url: &Url, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.attempt(url, query) {
                Ok(body) => return Ok(body),
                Err(Error::Http(e)) if e.is_timeout() => {
                    if self.retry.exhausted(attempts) {
                        return Err(Error::TimedOut {
                            url: url.to_string(),
                            attempts,
                        });
                    }
                    warn!(
                        "GET {url} timed out (attempt {attempts}), retrying in {:?}",
                        self.retry.backoff
                    );
                    thread::sleep(self.retry.backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn attempt(&self, url: &Url, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(url.clone())
            .query(query)
            .timeout(self.retry.attempt_timeout)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes()?;
        debug!("GET {url}: {} bytes", body.len());
        Ok(body.to_vec())
    }

    /// Single-attempt reachability check, no retry.
    pub fn probe(&self, url: &Url, query: &[(&str, &str)]) -> bool {
        self.http
            .get(url.clone())
            .query(query)
            .timeout(self.retry.attempt_timeout)
            .send()
            .is_ok_and(|response| response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_never_exhausts() {
        let policy = RetryPolicy::default();
        assert!(!policy.exhausted(1));
        assert!(!policy.exhausted(1_000_000));
        assert_eq!(policy.backoff, Duration::from_secs(2));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(10));
    }

    #[test]
    fn bounded_policy_exhausts_at_max_attempts() {
        let policy = RetryPolicy::bounded(3);
        assert!(!policy.exhausted(1));
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
    }

    #[test]
    fn rejects_unprintable_api_key() {
        assert!(matches!(
            Transport::new(Some("line\nbreak"), RetryPolicy::default()),
            Err(Error::Settings(_))
        ));
    }
}
