// OCR backend client - asynchronous submit-then-poll protocol
//
// The backend performs recognition out-of-band: a submit returns an
// operation handle, and the client polls that handle at a fixed interval
// until a terminal status or the attempt budget runs out. The handle is
// call-local; nothing is shared between recognize() invocations.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::core::config::OcrConfig;
use crate::core::errors::{OcrError, OcrResult};
use crate::core::types::TextLine;

/// Path of the read-analyze submit endpoint, relative to the configured base
const ANALYZE_PATH: &str = "/vision/v3.2/read/analyze";

/// Auth header expected by the backend
const AUTH_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Status of an in-flight recognition operation, as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
enum OperationStatus {
    Succeeded,
    Failed,
    Pending,
}

/// Poll response body
///
/// `analyzeResult.readResults[].lines[].text` carries the recognized lines,
/// pages concatenated in order.
#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    #[serde(rename = "analyzeResult")]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(rename = "readResults")]
    read_results: Vec<ReadPage>,
}

#[derive(Debug, Deserialize)]
struct ReadPage {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
struct ReadLine {
    text: String,
}

impl PollResponse {
    fn status(&self) -> OperationStatus {
        match self.status.as_str() {
            "succeeded" => OperationStatus::Succeeded,
            "failed" => OperationStatus::Failed,
            // "notStarted", "running", and anything unrecognized keep polling
            _ => OperationStatus::Pending,
        }
    }

    fn into_lines(self) -> Vec<TextLine> {
        self.analyze_result
            .map(|result| {
                result
                    .read_results
                    .into_iter()
                    .flat_map(|page| page.lines)
                    .map(|line| line.text)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// OCR backend client
pub struct OcrClient {
    config: OcrConfig,
    http_client: reqwest::Client,
}

impl OcrClient {
    pub fn new(config: OcrConfig) -> OcrResult<Self> {
        // Per-request timeout covers a single submit or poll, not the whole
        // poll loop; the loop budget is the poll policy's job.
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Submit an encoded image and poll until the backend produces text
    /// lines, fails, or the attempt budget runs out.
    ///
    /// The cancellation token is checked between poll attempts, never
    /// mid-request.
    #[instrument(skip(self, png_bytes, cancel), fields(bytes = png_bytes.len()))]
    pub async fn recognize(
        &self,
        png_bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> OcrResult<Vec<TextLine>> {
        let operation_location = self.submit(png_bytes).await?;
        debug!(handle = %operation_location, "image accepted for processing");
        self.poll(&operation_location, cancel).await
    }

    /// Submit the image for analysis; returns the operation handle
    async fn submit(&self, png_bytes: Vec<u8>) -> OcrResult<String> {
        let url = format!("{}{}", self.config.endpoint, ANALYZE_PATH);

        let response = self
            .http_client
            .post(&url)
            .header(AUTH_HEADER, &self.config.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(png_bytes)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "submit rejected by OCR backend");
            return match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(OcrError::Auth {
                    status: status.as_u16(),
                    message,
                }),
                _ => Err(OcrError::Submit {
                    status: status.as_u16(),
                    message,
                }),
            };
        }

        response
            .headers()
            .get("Operation-Location")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .ok_or(OcrError::MissingOperationLocation)
    }

    /// Fixed-interval poll loop with a hard attempt ceiling
    async fn poll(
        &self,
        operation_location: &str,
        cancel: &CancellationToken,
    ) -> OcrResult<Vec<TextLine>> {
        let policy = &self.config.poll;

        for attempt in 1..=policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(OcrError::Cancelled);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(OcrError::Cancelled),
                _ = tokio::time::sleep(policy.interval) => {}
            }

            let response = self
                .http_client
                .get(operation_location)
                .header(AUTH_HEADER, &self.config.api_key)
                .send()
                .await?
                .error_for_status()?;

            let body: PollResponse = response.json().await?;

            match body.status() {
                OperationStatus::Succeeded => {
                    let lines = body.into_lines();
                    debug!(attempt, lines = lines.len(), "recognition succeeded");
                    return Ok(lines);
                }
                OperationStatus::Failed => {
                    warn!(attempt, "backend reported failed analysis");
                    return Err(OcrError::Backend);
                }
                OperationStatus::Pending => {
                    debug!(attempt, status = %body.status, "operation still pending");
                }
            }
        }

        Err(OcrError::PollTimeout {
            attempts: policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PollPolicy;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: String) -> OcrConfig {
        OcrConfig {
            endpoint,
            api_key: "test-key".to_string(),
            poll: PollPolicy {
                interval: Duration::ZERO,
                max_attempts: 5,
            },
        }
    }

    fn png_stub() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G']
    }

    async fn mount_submit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/vision/v3.2/read/analyze"))
            .and(header("Ocp-Apim-Subscription-Key", "test-key"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Operation-Location", format!("{}/results/op-1", server.uri()).as_str()),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_recognize_returns_lines_in_order() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path("/results/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "analyzeResult": {
                    "readResults": [
                        {"lines": [{"text": "0.128"}, {"text": "mm"}]},
                        {"lines": [{"text": "second page"}]}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let lines = client
            .recognize(png_stub(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(lines, vec!["0.128", "mm", "second page"]);
    }

    #[tokio::test]
    async fn test_poll_timeout_when_backend_never_terminates() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path("/results/op-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "running"})),
            )
            .mount(&server)
            .await;

        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let result = client.recognize(png_stub(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(OcrError::PollTimeout { attempts: 5 })));
    }

    #[tokio::test]
    async fn test_rejected_submit_never_polls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vision/v3.2/read/analyze"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad body"))
            .mount(&server)
            .await;

        // No poll mock mounted: any GET would fail the transport layer, so a
        // Submit error here proves the loop was never entered.
        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let result = client.recognize(png_stub(), &CancellationToken::new()).await;

        match result {
            Err(OcrError::Submit { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad body");
            }
            other => panic!("expected Submit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_submit_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vision/v3.2/read/analyze"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let result = client.recognize(png_stub(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(OcrError::Auth { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_missing_operation_location() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vision/v3.2/read/analyze"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let result = client.recognize(png_stub(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(OcrError::MissingOperationLocation)));
    }

    #[tokio::test]
    async fn test_backend_failure_terminates_poll() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path("/results/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "failed"})))
            .mount(&server)
            .await;

        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let result = client.recognize(png_stub(), &CancellationToken::new()).await;

        assert!(matches!(result, Err(OcrError::Backend)));
    }

    #[tokio::test]
    async fn test_pending_then_succeeded() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path("/results/op-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "notStarted"})),
            )
            .up_to_n_times(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/results/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "analyzeResult": {"readResults": [{"lines": [{"text": "0.128"}]}]}
            })))
            .mount(&server)
            .await;

        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let lines = client
            .recognize(png_stub(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(lines, vec!["0.128"]);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_poll_loop() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path("/results/op-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "running"})),
            )
            .mount(&server)
            .await;

        let mut config = test_config(server.uri());
        config.poll.interval = Duration::from_secs(60);
        config.poll.max_attempts = 30;

        let client = OcrClient::new(config).unwrap();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let result = client.recognize(png_stub(), &cancel).await;
        assert!(matches!(result, Err(OcrError::Cancelled)));
    }

    #[tokio::test]
    async fn test_succeeded_with_no_lines_is_empty() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path("/results/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "analyzeResult": {"readResults": []}
            })))
            .mount(&server)
            .await;

        let client = OcrClient::new(test_config(server.uri())).unwrap();
        let lines = client
            .recognize(png_stub(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(lines.is_empty());
    }
}
