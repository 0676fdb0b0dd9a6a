//! Blocking HTTP client shared by the webpage source and the logo downloader.
//!
//! No Tokio runtime required. Transport errors, 429 and 5xx are retried with
//! exponential backoff; other 4xx fail immediately.

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const USER_AGENT: &str = concat!("lfmembers/", env!("CARGO_PKG_VERSION"));

const MAX_RETRIES: u32 = 2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot build HTTP client: {0}")]
    Client(String),
    #[error("GET {url}: {message}")]
    Transport { url: String, message: String },
    #[error("GET {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url}: cannot read body: {message}")]
    Body { url: String, message: String },
}

#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::blocking::Client,
    backoff: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            http,
            backoff: Duration::from_secs(1),
        })
    }

    /// Initial wait between retries; doubles on each attempt.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)?.text().map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get(url)?
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        let mut wait = self.backoff;
        let mut attempt = 0;
        loop {
            let err = match self.http.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return Ok(resp);
                    }
                    let err = FetchError::Status {
                        url: url.to_string(),
                        status,
                    };
                    if status != 429 && status < 500 {
                        return Err(err);
                    }
                    err
                }
                Err(e) => FetchError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                },
            };

            if attempt == MAX_RETRIES {
                return Err(err);
            }
            attempt += 1;
            warn!(attempt, max = MAX_RETRIES, wait_ms = wait.as_millis() as u64, error = %err, "retrying request");
            thread::sleep(wait);
            wait *= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client() -> HttpClient {
        HttpClient::new().unwrap().with_backoff(Duration::ZERO)
    }

    #[test]
    fn get_text_ok() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/members/");
            then.status(200).body("<html></html>");
        });
        let body = client().get_text(&server.url("/members/")).unwrap();
        mock.assert();
        assert_eq!(body, "<html></html>");
    }

    #[test]
    fn not_found_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/missing.svg");
            then.status(404);
        });
        let err = client().get_bytes(&server.url("/missing.svg")).unwrap_err();
        mock.assert_hits(1);
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[test]
    fn server_error_retried_then_fails() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });
        let err = client().get_text(&server.url("/flaky")).unwrap_err();
        mock.assert_hits(3);
        assert!(err.to_string().contains("HTTP 503"));
    }
}
