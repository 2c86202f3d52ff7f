//! Best-effort delivery of written reports to a remote auditor endpoint.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one delivery attempt. Never an error for the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForwardOutcome {
    pub sent: bool,
    /// Empty when sent, or when no endpoint is configured
    pub error: String,
}

pub struct ReportForwarder {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

impl ReportForwarder {
    pub fn new(endpoint: Option<Url>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// POST `{"filename", "content"}` to the endpoint.
    pub async fn forward(&self, filename: &str, content: &str) -> ForwardOutcome {
        let Some(endpoint) = &self.endpoint else {
            return ForwardOutcome::default();
        };

        let body = json!({ "filename": filename, "content": content });
        let result = self.client.post(endpoint.clone()).json(&body).send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Forwarded {} to {}", filename, endpoint);
                ForwardOutcome {
                    sent: true,
                    error: String::new(),
                }
            }
            Ok(response) => {
                let error = format!("auditor endpoint returned HTTP {}", response.status());
                warn!("Forwarding {} failed: {}", filename, error);
                ForwardOutcome { sent: false, error }
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    "auditor endpoint timed out".to_string()
                } else {
                    format!("auditor endpoint unreachable: {}", e)
                };
                warn!("Forwarding {} failed: {}", filename, error);
                ForwardOutcome { sent: false, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_forward_without_endpoint() {
        let forwarder = ReportForwarder::new(None).unwrap();
        assert!(forwarder.endpoint().is_none());
        assert_eq!(
            forwarder.forward("r.txt", "x").await,
            ForwardOutcome::default()
        );
    }

    #[tokio::test]
    async fn test_forward_posts_filename_and_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/receive_report"))
            .and(body_json(json!({"filename": "r.txt", "content": "CLEANING_REPORT_V1\n"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = Url::parse(&format!("{}/api/receive_report", server.uri())).unwrap();
        let forwarder = ReportForwarder::new(Some(endpoint)).unwrap();
        let outcome = forwarder.forward("r.txt", "CLEANING_REPORT_V1\n").await;
        assert!(outcome.sent);
        assert_eq!(outcome.error, "");
    }

    #[tokio::test]
    async fn test_forward_reports_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let forwarder = ReportForwarder::new(Some(Url::parse(&server.uri()).unwrap())).unwrap();
        let outcome = forwarder.forward("r.txt", "x").await;
        assert!(!outcome.sent);
        assert!(outcome.error.contains("500"), "got {}", outcome.error);
    }

    #[tokio::test]
    async fn test_forward_reports_unreachable() {
        let endpoint = Url::parse("http://127.0.0.1:1/receive").unwrap();
        let forwarder = ReportForwarder::new(Some(endpoint)).unwrap();
        let outcome = forwarder.forward("r.txt", "x").await;
        assert!(!outcome.sent);
        assert!(!outcome.error.is_empty());
    }
}
