//! HTTP client for webhook destinations.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::config::NotificationConfig;
use crate::destination::message::DestinationMessage;
use crate::destination::webhook::{HttpMethod, DEFAULT_CONTENT_TYPE};
use crate::error::{ConfigurationError, TransportError};

/// Outgoing HTTP request.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Response from the remote endpoint.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Low-level capability to execute an HTTP request.
pub trait HttpTransport: Send + Sync {
    /// Execute `request`. Non-2xx statuses are returned, not treated as errors.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct ReqwestHttpTransport {
    client: Client,
}

impl ReqwestHttpTransport {
    /// Builds a client with the timeouts and user agent from `config`.
    pub fn new(config: &NotificationConfig) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.socket_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigurationError::Invalid {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestHttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body.clone())
            .send()
            .map_err(|e| TransportError::connection(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::rejected(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}

/// Client used by the webhook factories.
#[derive(Clone)]
pub struct DestinationHttpClient {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for DestinationHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationHttpClient").finish_non_exhaustive()
    }
}

impl DestinationHttpClient {
    /// Wraps an HTTP transport.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Client backed by `reqwest`.
    pub fn reqwest(config: &NotificationConfig) -> Result<Self, ConfigurationError> {
        Ok(Self::new(Arc::new(ReqwestHttpTransport::new(config)?)))
    }

    /// Sends a webhook message. Email messages are not accepted.
    pub fn execute(&self, message: &DestinationMessage) -> Result<HttpResponse, TransportError> {
        let request = build_request(message)?;
        tracing::debug!(
            method = %request.method,
            host = request.url.host_str().unwrap_or_default(),
            "sending webhook"
        );
        self.transport.execute(&request)
    }
}

/// Builds the HTTP request for a webhook message.
pub(crate) fn build_request(message: &DestinationMessage) -> Result<HttpRequest, TransportError> {
    match message {
        DestinationMessage::Webhook(m) => {
            let mut headers = BTreeMap::new();
            headers.insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
            Ok(HttpRequest {
                method: HttpMethod::Post,
                url: m.url().clone(),
                headers,
                body: m.payload().to_string(),
            })
        }
        DestinationMessage::CustomWebhook(m) => Ok(HttpRequest {
            method: m.method(),
            url: m.url().clone(),
            headers: m.headers().clone(),
            body: m.message().to_string(),
        }),
        DestinationMessage::Email(_) => Err(TransportError::MessageBuild {
            message: "email messages cannot be sent over HTTP".to_string(),
        }),
    }
}
