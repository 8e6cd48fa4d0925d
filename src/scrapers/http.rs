//! Plain-HTTP page renderer.
//!
//! [`HttpRendererFactory`] builds one [`reqwest::Client`] per attempt so that
//! no connection pool or cookie state survives a failed attempt. Errors are
//! classified for the retry policy:
//!
//! | Condition | Class |
//! |-----------|-------|
//! | Invalid URL, non-HTTP scheme | fatal |
//! | Request timeout, connect / transport failure | transient |
//! | HTTP 408, 429, 5xx | transient |
//! | Any other non-success status | fatal |

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::renderer::{PageRenderer, RendererFactory};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Builds a fresh [`HttpRenderer`] for every attempt.
#[derive(Debug, Clone)]
pub struct HttpRendererFactory {
    user_agent: String,
    request_timeout: Duration,
}

impl HttpRendererFactory {
    pub fn new(user_agent: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            request_timeout,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.user_agent.clone(),
            Duration::from_millis(config.attempt_timeout_ms),
        )
    }

    pub(crate) fn build_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.as_str())
            .build()
    }
}

impl RendererFactory for HttpRendererFactory {
    type Renderer = HttpRenderer;

    async fn create(&self) -> Result<HttpRenderer, FetchError> {
        let client = self
            .build_client()
            .map_err(|e| FetchError::transient(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpRenderer {
            client: Some(client),
        })
    }
}

/// Single-use HTTP client wrapper.
#[derive(Debug)]
pub struct HttpRenderer {
    client: Option<Client>,
}

impl PageRenderer for HttpRenderer {
    async fn load(&mut self, url: &str) -> Result<String, FetchError> {
        let url = validate_url(url)?;
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| FetchError::fatal("renderer used after dispose"))?;

        let resp = client.get(url.clone()).send().await.map_err(classify_transport)?;
        let status = resp.status();
        if let Some(err) = classify_status(status) {
            return Err(err);
        }
        let body = resp.text().await.map_err(classify_transport)?;
        debug!(%url, bytes = body.len(), %status, "Downloaded page");
        Ok(body)
    }

    fn dispose(&mut self) {
        self.client = None;
    }
}

/// Parse `input` and require an HTTP(S) scheme.
pub fn validate_url(input: &str) -> Result<Url, FetchError> {
    let url = Url::parse(input)
        .map_err(|e| FetchError::fatal(format!("invalid url {input:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::fatal(format!("unsupported url scheme: {other}"))),
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::fatal(err.to_string())
    } else {
        FetchError::transient(err.to_string())
    }
}

/// `None` for success statuses, otherwise the matching error class.
pub fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    let msg = format!("http status {}", status.as_u16());
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        Some(FetchError::Transient(msg))
    } else {
        Some(FetchError::Fatal(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ClientGuard;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://www.grailed.com/listings/123").is_ok());
        assert!(matches!(validate_url("not a url"), Err(FetchError::Fatal(_))));
        assert!(matches!(
            validate_url("ftp://www.depop.com/products/1"),
            Err(FetchError::Fatal(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert!(classify_status(StatusCode::BAD_GATEWAY).unwrap().is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS).unwrap().is_retryable());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT).unwrap().is_retryable());
        assert!(!classify_status(StatusCode::NOT_FOUND).unwrap().is_retryable());
        assert!(!classify_status(StatusCode::FORBIDDEN).unwrap().is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_url_is_fatal_without_network() {
        let factory = HttpRendererFactory::new("fashioncrawler-test", Duration::from_secs(1));
        let mut renderer = ClientGuard::new(factory.create().await.unwrap());
        let err = renderer.load("::::").await.unwrap_err();
        assert!(matches!(err, FetchError::Fatal(_)));
    }

    #[tokio::test]
    async fn test_disposed_renderer_refuses_to_load() {
        let factory = HttpRendererFactory::from_config(&FetchConfig::default());
        let mut renderer = factory.create().await.unwrap();
        renderer.dispose();
        let err = renderer.load("https://www.grailed.com").await.unwrap_err();
        assert!(matches!(err, FetchError::Fatal(_)));
    }
}
