//!
//! src/submit.rs
//!
//! Client for the catalog service: existence check and submission, with
//! bounded retry on transport failures. Application-level error responses
//! are returned as-is on the first attempt.
//!

use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, RequestBuilder};
use tokio::time::sleep;
use tracing::warn;
use url::Url;

use crate::config::{HttpConfig, RemoteConfig, RetryConfig};
use crate::errors::ScanError;
use crate::types::{AnalysisResult, SubmissionOutcome, TrackIdentity};

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
}

/// Transport-level failures (connection refused, timeout, DNS) are the
/// only retryable ones; an HTTP status reached the server and is not.
fn is_transport(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

async fn post_with_retry(request: RequestBuilder, retry: &RetryConfig) -> Result<String, ScanError> {
    let mut attempt = 1_usize;
    loop {
        let response = request
            .try_clone()
            .ok_or_else(|| ScanError::Http("non-cloneable request".to_string()))?
            .send()
            .await;
        match response {
            Ok(resp) => {
                let status = resp.status();
                if !status.is_success() {
                    return Err(ScanError::Http(format!("{status} from {}", resp.url())));
                }
                return Ok(resp.text().await?);
            }
            Err(e) if is_transport(&e) && attempt < retry.max_attempts => {
                warn!(
                    attempt,
                    backoff_ms = retry.backoff.as_millis() as u64,
                    error = %e,
                    "http.retry"
                );
                sleep(retry.backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WavePlotClient {
    http: Client,
    exists_url: Url,
    submit_url: Url,
    editor_key: String,
    retry: RetryConfig,
}

impl WavePlotClient {
    pub fn new(http: &HttpConfig, remote: &RemoteConfig) -> Result<Self, ScanError> {
        let exists_url = remote
            .server_url
            .join("exists")
            .map_err(|e| ScanError::Config(format!("exists url: {e}")))?;
        let submit_url = remote
            .server_url
            .join("submit")
            .map_err(|e| ScanError::Config(format!("submit url: {e}")))?;

        let client = client_helper(http)
            .build()
            .map_err(|e| ScanError::Http(format!("build client: {e}")))?;

        Ok(Self {
            http: client,
            exists_url,
            submit_url,
            editor_key: remote.editor_key.clone(),
            retry: http.retry.clone(),
        })
    }

    /// POST /exists with the identity fields
    fn exists_request(&self, identity: &TrackIdentity) -> RequestBuilder {
        self.http.post(self.exists_url.clone()).form(&[
            ("recording", identity.recording_id.as_str()),
            ("release", identity.release_id.as_str()),
            ("track", identity.track_number.as_str()),
            ("disc", identity.disc_number.as_str()),
        ])
    }

    /// POST /submit with the full payload, binary fields base64-encoded
    fn submit_request(
        &self,
        identity: &TrackIdentity,
        analysis: &AnalysisResult,
        version: &str,
    ) -> RequestBuilder {
        let mut fields: Vec<(&'static str, String)> = vec![
            ("recording", identity.recording_id.clone()),
            ("release", identity.release_id.clone()),
            ("track", identity.track_number.clone()),
            ("disc", identity.disc_number.clone()),
            ("dr_level", format!("{:.1}", analysis.dynamic_range)),
            ("image", general_purpose::STANDARD.encode(&analysis.image)),
        ];
        if let Some(large) = &analysis.large_thumbnail {
            fields.push(("large_thumb", general_purpose::STANDARD.encode(large)));
        }
        if let Some(small) = &analysis.small_thumbnail {
            fields.push(("small_thumb", general_purpose::STANDARD.encode(small)));
        }
        fields.push(("editor", self.editor_key.clone()));
        fields.push(("length", analysis.duration.to_string()));
        fields.push(("trimmed", analysis.trimmed.to_string()));
        fields.push(("source", analysis.source_type.as_str().to_string()));
        fields.push(("num_channels", analysis.channel_count.to_string()));
        fields.push(("version", version.to_string()));

        self.http.post(self.submit_url.clone()).form(&fields)
    }

    /// Asks the catalog whether this identity is already recorded. A body
    /// of exactly "0" means unknown; any other 2xx body means known.
    pub async fn exists(&self, identity: &TrackIdentity) -> Result<bool, ScanError> {
        let body = post_with_retry(self.exists_request(identity), &self.retry).await?;
        Ok(body.trim() != "0")
    }

    /// Submits one analysis and returns the assigned identifier, if any.
    pub async fn submit(
        &self,
        identity: &TrackIdentity,
        analysis: &AnalysisResult,
        version: &str,
    ) -> Result<SubmissionOutcome, ScanError> {
        let body = post_with_retry(self.submit_request(identity, analysis, version), &self.retry).await?;
        Ok(SubmissionOutcome::parse(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceType, WavePlotId};
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> TrackIdentity {
        TrackIdentity {
            recording_id: "r1".into(),
            release_id: "a1".into(),
            track_number: "3".into(),
            disc_number: "1".into(),
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            dynamic_range: 8.0,
            duration: 240.0,
            trimmed: false,
            source_type: SourceType::Cd,
            channel_count: 2,
            image: b"imgDATA".to_vec(),
            large_thumbnail: None,
            small_thumbnail: None,
        }
    }

    fn test_client(uri: &str, max_attempts: usize, backoff_ms: u64, timeout_ms: u64) -> WavePlotClient {
        let http = HttpConfig {
            timeout: Duration::from_millis(timeout_ms),
            connect_timeout: Duration::from_millis(timeout_ms),
            retry: RetryConfig {
                max_attempts,
                backoff: Duration::from_millis(backoff_ms),
            },
        };
        let remote = RemoteConfig {
            server_url: crate::config::parse_server_url(uri).unwrap(),
            editor_key: "key123".into(),
        };
        WavePlotClient::new(&http, &remote).unwrap()
    }

    #[tokio::test]
    async fn exists_zero_body_means_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/exists"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 3, 10, 1000);
        assert!(!client.exists(&identity()).await.unwrap());
    }

    #[tokio::test]
    async fn exists_any_other_body_means_known() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/exists"))
            .respond_with(ResponseTemplate::new(200).set_body_string("wp42"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 3, 10, 1000);
        assert!(client.exists(&identity()).await.unwrap());
    }

    #[tokio::test]
    async fn submit_returns_assigned_id_and_encodes_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_string_contains("recording=r1"))
            .and(body_string_contains("editor=key123"))
            .and(body_string_contains("dr_level=8.0"))
            .and(body_string_contains("num_channels=2"))
            .and(body_string_contains("version=CITRUS"))
            // "imgDATA" transport-encoded
            .and(body_string_contains("aW1nREFUQQ"))
            .respond_with(ResponseTemplate::new(200).set_body_string("wp123"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 3, 10, 1000);
        let outcome = client.submit(&identity(), &analysis(), "CITRUS").await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Assigned(WavePlotId("wp123".into())));
    }

    #[tokio::test]
    async fn submit_empty_body_is_no_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 3, 10, 1000);
        let outcome = client.submit(&identity(), &analysis(), "CITRUS").await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::NoId);
    }

    #[tokio::test]
    async fn application_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 3, 10, 1000);
        let err = client.submit(&identity(), &analysis(), "CITRUS").await.unwrap_err();
        assert!(matches!(err, ScanError::Http(_)));
    }

    #[tokio::test]
    async fn transient_timeout_is_retried_until_success() {
        let server = MockServer::start().await;
        // first attempt stalls past the client timeout, second succeeds
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("wp123")
                    .set_delay(Duration::from_secs(5)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_string("wp123"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), 3, 10, 200);
        let outcome = client.submit(&identity(), &analysis(), "CITRUS").await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Assigned(WavePlotId("wp123".into())));
    }

    #[tokio::test]
    async fn exhausted_attempts_yield_network_failure() {
        // bind then drop to get a port nothing listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let client = test_client(&format!("http://{addr}"), 3, 10, 200);
        let err = client.submit(&identity(), &analysis(), "CITRUS").await.unwrap_err();
        assert!(matches!(err, ScanError::Http(_)));
    }
}
