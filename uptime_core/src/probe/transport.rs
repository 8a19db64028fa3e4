use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Method};
use thiserror::Error;

use crate::checks::{CheckDefinition, HttpMethod};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: String,
}

impl ProbeRequest {
    pub fn for_check(check: &CheckDefinition) -> Self {
        Self {
            method: check.method,
            url: check.target_url(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Sends one request and reports the response status.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> std::result::Result<u16, TransportError>;
}

/// HTTP/HTTPS transport. Redirects are reported as-is, never followed.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(concat!("uptime-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn send(&self, request: &ProbeRequest) -> std::result::Result<u16, TransportError> {
        let response = self
            .client
            .request(to_method(request.method), request.url.as_str())
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}
