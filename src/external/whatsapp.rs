use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use super::retry::RetryPolicy;
use crate::config::WhatsAppConfig;
use crate::error::{AppError, AppResult};
use crate::models::OutboundMessage;

/// Status line and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Minimal HTTPS client the request executor needs. Failures to complete the
/// exchange at all are reported as `AppError::TransportFailure`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: String,
    ) -> AppResult<TransportResponse>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        bearer_token: &str,
        body: String,
    ) -> AppResult<TransportResponse> {
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer_token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::TransportFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::TransportFailure(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

/// Request executor for the WhatsApp Cloud API `/messages` endpoint.
#[derive(Clone)]
pub struct WhatsAppClient {
    transport: Arc<dyn HttpTransport>,
    messages_url: String,
    access_token: String,
    retry: RetryPolicy,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            messages_url: config.messages_url(),
            access_token: config.access_token.clone(),
            retry: RetryPolicy::from(&config.retry),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Posts the message and returns the raw response body on HTTP 200.
    pub async fn send(&self, message: &OutboundMessage) -> AppResult<String> {
        let body = serde_json::to_string(message)?;
        log::debug!("Posting {} message to {}", message.kind(), message.to);

        let mut attempt = 1;
        loop {
            match self.attempt(&body).await {
                Ok(response) => return Ok(response),
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    let delay = self.retry.backoff_after(attempt);
                    log::warn!(
                        "WhatsApp send to {} failed on attempt {}/{}, retrying in {:?}: {}",
                        message.to,
                        attempt,
                        self.retry.max_attempts(),
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, body: &str) -> AppResult<String> {
        let response = match self
            .transport
            .post_json(&self.messages_url, &self.access_token, body.to_string())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                log::error!("WhatsApp API Error: {e}");
                return Err(e);
            }
        };

        log::debug!("Response from WhatsApp API: {}", response.body);

        if response.status != 200 {
            log::error!(
                "WhatsApp API Error: HTTP {}, Response: {}",
                response.status,
                response.body
            );
            return Err(AppError::ApiFailure {
                status: response.status,
                body: response.body,
            });
        }

        Ok(response.body)
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One recorded `post_json` call.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub url: String,
        pub bearer_token: String,
        pub body: serde_json::Value,
    }

    /// Replays scripted responses in order; answers 200 `{}` once the script
    /// runs out.
    #[derive(Default)]
    pub struct MockTransport {
        script: Mutex<VecDeque<AppResult<TransportResponse>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, status: u16, body: &str) -> Self {
            self.script.lock().unwrap().push_back(Ok(TransportResponse {
                status,
                body: body.to_string(),
            }));
            self
        }

        pub fn fail(self, reason: &str) -> Self {
            self.script
                .lock()
                .unwrap()
                .push_back(Err(AppError::TransportFailure(reason.to_string())));
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn post_json(
            &self,
            url: &str,
            bearer_token: &str,
            body: String,
        ) -> AppResult<TransportResponse> {
            self.requests.lock().unwrap().push(RecordedRequest {
                url: url.to_string(),
                bearer_token: bearer_token.to_string(),
                body: serde_json::from_str(&body).unwrap(),
            });
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(TransportResponse {
                        status: 200,
                        body: "{}".to_string(),
                    })
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    fn config() -> WhatsAppConfig {
        WhatsAppConfig {
            access_token: "token".to_string(),
            phone_number_id: "1234".to_string(),
            ..Default::default()
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            2,
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn test_send_posts_payload_with_bearer_token() {
        let transport = Arc::new(MockTransport::new().respond(200, r#"{"messages":[{"id":"wamid.1"}]}"#));
        let client = WhatsAppClient::new(&config(), transport.clone());

        let body = client
            .send(&OutboundMessage::text("+923042783912", "hi"))
            .await
            .unwrap();
        assert_eq!(body, r#"{"messages":[{"id":"wamid.1"}]}"#);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://graph.facebook.com/v21.0/1234/messages"
        );
        assert_eq!(requests[0].bearer_token, "token");
        assert_eq!(requests[0].body["type"], "text");
        assert_eq!(requests[0].body["to"], "+923042783912");
    }

    #[tokio::test]
    async fn test_non_200_is_api_failure() {
        let transport = Arc::new(MockTransport::new().respond(400, r#"{"error":{"code":131030}}"#));
        let client = WhatsAppClient::new(&config(), transport.clone());

        let err = client
            .send(&OutboundMessage::text("+923042783912", "hi"))
            .await
            .unwrap_err();
        match err {
            AppError::ApiFailure { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("131030"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_other_2xx_is_still_failure() {
        let transport = Arc::new(MockTransport::new().respond(201, "{}"));
        let client = WhatsAppClient::new(&config(), transport);
        assert!(matches!(
            client.send(&OutboundMessage::text("+1", "x")).await,
            Err(AppError::ApiFailure { status: 201, .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_single_attempt_by_default() {
        let transport = Arc::new(MockTransport::new().fail("connection refused"));
        let client = WhatsAppClient::new(&config(), transport.clone());

        let err = client
            .send(&OutboundMessage::text("+923042783912", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransportFailure(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let transport = Arc::new(
            MockTransport::new()
                .fail("reset")
                .respond(503, "unavailable")
                .respond(200, "ok"),
        );
        let client = WhatsAppClient::new(&config(), transport.clone()).with_retry_policy(fast_retry(3));

        let body = client
            .send(&OutboundMessage::text("+923042783912", "hi"))
            .await
            .unwrap();
        assert_eq!(body, "ok");
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let transport = Arc::new(MockTransport::new().respond(401, "bad token").respond(200, "ok"));
        let client = WhatsAppClient::new(&config(), transport.clone()).with_retry_policy(fast_retry(3));

        assert!(client.send(&OutboundMessage::text("+1", "x")).await.is_err());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let transport = Arc::new(
            MockTransport::new()
                .respond(500, "a")
                .respond(500, "b")
                .respond(200, "never reached"),
        );
        let client = WhatsAppClient::new(&config(), transport.clone()).with_retry_policy(fast_retry(2));

        assert!(matches!(
            client.send(&OutboundMessage::text("+1", "x")).await,
            Err(AppError::ApiFailure { status: 500, .. })
        ));
        assert_eq!(transport.call_count(), 2);
    }
}
