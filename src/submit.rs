//! Job submission to the remote analysis service.
//!
//! Defines the [`Submitter`] trait and [`OcrClient`], its HTTP implementation.
//! Two service protocols are supported:
//!
//! - **Sync**. `POST {endpoint}/computervision/imageanalysis:analyze` returns
//!   the final result body.
//! - **Async**. `POST {endpoint}/formrecognizer/documentModels/{model}:analyze`
//!   returns `202` and an `Operation-Location` header. The client polls that
//!   URL until the body carries the completion field.
//!
//! Polling is an explicit state machine ([`PollState`]) bounded by
//! `polling.max_wait_secs`.
//!
//! A 2xx response whose body is not JSON is logged and treated as an empty
//! result (`{}`) rather than an error.

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

use crate::config::{Config, PollingConfig, Protocol, ServiceConfig};
use crate::error::{OrcaError, Result};
use crate::models::MediaType;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Header carrying the poll URL for asynchronous jobs.
pub const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// Sends one image to an analysis service and returns the raw result body.
///
/// Implementations must not touch the filesystem; persistence belongs to the
/// batch analyzer.
pub trait Submitter {
    fn submit(&self, image: &[u8], media: MediaType) -> Result<Value>;
}

/// The empty result substituted for malformed or degraded responses.
pub fn empty_result() -> Value {
    Value::Object(Map::new())
}

/// States of an asynchronous analysis job.
#[derive(Debug)]
pub enum PollState {
    /// The POST was accepted; `location` is the operation to poll.
    Submitted { location: String },
    /// At least one poll is pending or in flight.
    Polling { location: String, polls: u32 },
    /// The completion field appeared; holds the final body.
    Complete(Value),
}

/// What a single poll response means for the job.
#[derive(Debug, PartialEq)]
pub enum PollStep {
    Done(Value),
    Pending,
    Failed(String),
}

/// Interpret one poll body. Pure, so the state machine can be tested
/// without a server.
pub fn interpret_poll(body: Value, completion_field: &str) -> PollStep {
    if body.get(completion_field).is_some() {
        return PollStep::Done(body);
    }
    match body.get("status").and_then(|s| s.as_str()) {
        Some(status) if status.eq_ignore_ascii_case("failed") => {
            let message = body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("service reported status 'failed'")
                .to_string();
            PollStep::Failed(message)
        }
        _ => PollStep::Pending,
    }
}

/// HTTP client for the analysis endpoint.
pub struct OcrClient {
    client: Client,
    service: ServiceConfig,
    polling: PollingConfig,
    api_key: String,
}

impl OcrClient {
    /// Build a client, resolving the API key from config or environment.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .service
            .resolve_api_key()
            .map_err(|e| OrcaError::Config(format!("{:#}", e)))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &Config, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.service.timeout_secs))
            .build()?;
        let mut service = config.service.clone();
        service.endpoint = service.endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            service,
            polling: config.polling.clone(),
            api_key: api_key.into(),
        })
    }

    /// URL of the initial analyze request.
    pub fn analyze_url(&self) -> String {
        match self.service.protocol {
            Protocol::Sync => format!(
                "{}/computervision/imageanalysis:analyze",
                self.service.endpoint
            ),
            Protocol::Async => format!(
                "{}/formrecognizer/documentModels/{}:analyze",
                self.service.endpoint, self.service.model
            ),
        }
    }

    /// Query parameters of the initial analyze request.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("api-version", self.service.api_version.clone())];
        let features = self.service.features();
        if !features.is_empty() {
            params.push(("features", features.to_string()));
        }
        if self.service.protocol == Protocol::Async {
            if let Some(locale) = self.service.locale.as_ref().filter(|l| !l.is_empty()) {
                params.push(("locale", locale.clone()));
            }
        }
        params
    }

    fn post(&self, image: &[u8], media: MediaType) -> Result<Response> {
        let response = self
            .client
            .post(self.analyze_url())
            .query(&self.query_params())
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, media.mime())
            .body(image.to_vec())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "analyze request rejected");
            return Err(OrcaError::SubmissionFailed {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn submit_sync(&self, image: &[u8], media: MediaType) -> Result<Value> {
        let response = self.post(image, media)?;
        let text = response.text()?;
        Ok(parse_body(&text))
    }

    fn submit_async(&self, image: &[u8], media: MediaType) -> Result<Value> {
        let response = self.post(image, media)?;
        let location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let Some(location) = location else {
            tracing::warn!("analyze response missing Operation-Location header; using empty result");
            return Ok(empty_result());
        };

        self.run_poll(PollState::Submitted { location })
    }

    /// Drive the poll state machine to completion, failure, or timeout.
    fn run_poll(&self, initial: PollState) -> Result<Value> {
        let interval = Duration::from_secs_f64(self.polling.interval_secs);
        let max_wait = Duration::from_secs(self.polling.max_wait_secs);
        let started = Instant::now();
        let deadline = started + max_wait;
        let mut state = initial;

        loop {
            state = match state {
                PollState::Submitted { location } => {
                    tracing::debug!(location = %location, "job submitted");
                    PollState::Polling { location, polls: 0 }
                }
                PollState::Polling { location, polls } => {
                    if started.elapsed() >= max_wait {
                        tracing::warn!(location = %location, polls, "analysis still pending at max wait");
                        return Err(OrcaError::PollTimeout {
                            waited_secs: started.elapsed().as_secs(),
                        });
                    }
                    sleep_until_deadline(interval, deadline);

                    match self.poll_once(&location, interval, deadline)? {
                        Some(body) => match interpret_poll(body, &self.polling.completion_field) {
                            PollStep::Done(body) => PollState::Complete(body),
                            PollStep::Failed(message) => {
                                return Err(OrcaError::AnalysisFailed(message))
                            }
                            PollStep::Pending => PollState::Polling {
                                location,
                                polls: polls + 1,
                            },
                        },
                        None => PollState::Polling {
                            location,
                            polls: polls + 1,
                        },
                    }
                }
                PollState::Complete(body) => return Ok(body),
            };
        }
    }

    /// One GET against the operation URL. `None` means "not ready yet".
    ///
    /// A 429 waits for `Retry-After` (or `interval` without one), never past
    /// `deadline`.
    fn poll_once(
        &self,
        location: &str,
        interval: Duration,
        deadline: Instant,
    ) -> Result<Option<Value>> {
        let response = self
            .client
            .get(location)
            .header(API_KEY_HEADER, &self.api_key)
            .send()?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(interval);
            tracing::debug!(retry_after_secs = retry_after.as_secs_f64(), "poll throttled");
            sleep_until_deadline(retry_after.max(interval), deadline);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(OrcaError::SubmissionFailed {
                status: status.as_u16(),
            });
        }

        let text = response.text()?;
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                tracing::warn!(error = %e, "poll response is not JSON; polling again");
                Ok(None)
            }
        }
    }
}

impl Submitter for OcrClient {
    #[tracing::instrument(skip(self, image), fields(media = %media, bytes = image.len()))]
    fn submit(&self, image: &[u8], media: MediaType) -> Result<Value> {
        match self.service.protocol {
            Protocol::Sync => self.submit_sync(image, media),
            Protocol::Async => self.submit_async(image, media),
        }
    }
}

/// Sleep for `wait`, cut short at `deadline`.
fn sleep_until_deadline(wait: Duration, deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    let wait = wait.min(remaining);
    if !wait.is_zero() {
        std::thread::sleep(wait);
    }
}

fn parse_body(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "response body is not JSON; using empty result");
            empty_result()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(protocol: Protocol) -> OcrClient {
        let mut config = Config::minimal();
        config.service.protocol = protocol;
        config.service.endpoint = "https://ocr.example.com/".to_string();
        config.service.model = "prebuilt-read".to_string();
        config.service.features = Some("ocrHighResolution".to_string());
        OcrClient::with_api_key(&config, "k").unwrap()
    }

    #[test]
    fn sync_url_and_params() {
        let c = client(Protocol::Sync);
        assert_eq!(
            c.analyze_url(),
            "https://ocr.example.com/computervision/imageanalysis:analyze"
        );
        let params = c.query_params();
        assert!(params.iter().any(|(k, _)| *k == "api-version"));
        assert!(params.iter().any(|(k, v)| *k == "features" && v == "ocrHighResolution"));
        assert!(!params.iter().any(|(k, _)| *k == "locale"));
    }

    #[test]
    fn async_url_and_params_carry_locale() {
        let c = client(Protocol::Async);
        assert_eq!(
            c.analyze_url(),
            "https://ocr.example.com/formrecognizer/documentModels/prebuilt-read:analyze"
        );
        assert!(c
            .query_params()
            .iter()
            .any(|(k, v)| *k == "locale" && v == "en"));
    }

    #[test]
    fn poll_completes_on_marker() {
        let body = json!({"status": "succeeded", "analyzeResult": {"paragraphs": []}});
        assert_eq!(
            interpret_poll(body.clone(), "analyzeResult"),
            PollStep::Done(body)
        );
    }

    #[test]
    fn poll_pending_without_marker() {
        assert_eq!(
            interpret_poll(json!({"status": "running"}), "analyzeResult"),
            PollStep::Pending
        );
        assert_eq!(interpret_poll(json!({}), "analyzeResult"), PollStep::Pending);
    }

    #[test]
    fn poll_failed_status() {
        let step = interpret_poll(
            json!({"status": "failed", "error": {"message": "InvalidImage"}}),
            "analyzeResult",
        );
        assert_eq!(step, PollStep::Failed("InvalidImage".to_string()));
    }

    #[test]
    fn sleep_is_cut_at_deadline() {
        let started = Instant::now();
        sleep_until_deadline(Duration::from_secs(30), started + Duration::from_millis(20));
        assert!(started.elapsed() < Duration::from_secs(5));

        let started = Instant::now();
        sleep_until_deadline(Duration::from_secs(30), started);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn malformed_body_is_empty_result() {
        assert_eq!(parse_body("<html>oops</html>"), empty_result());
        assert_eq!(parse_body("{\"a\": 1}"), json!({"a": 1}));
    }
}
