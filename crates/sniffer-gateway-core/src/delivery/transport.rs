//! HTTP transport for delivery requests.
//!
//! A session is opened per dispatch batch and dropped when the batch ends,
//! so connections are reused within a batch and never held across the
//! idle interval.

use std::future::Future;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::Client;

use super::request::DeliveryRequest;
use crate::error::DeliveryError;

/// Default per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens sessions for the dispatcher.
pub trait DeliveryTransport: Send + Sync {
    type Session: DeliverySession;

    fn open_session(&self) -> Result<Self::Session, DeliveryError>;
}

/// A reusable connection context for one batch.
pub trait DeliverySession: Send + Sync {
    /// Send `request`, adding `Authorization: Token <token>` when a token is
    /// given. Resolves to the HTTP status on a 2xx response.
    fn send(
        &self,
        request: &DeliveryRequest,
        token: Option<&str>,
    ) -> impl Future<Output = Result<u16, DeliveryError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(REQUEST_TIMEOUT)
    }
}

impl DeliveryTransport for HttpTransport {
    type Session = HttpSession;

    fn open_session(&self) -> Result<HttpSession, DeliveryError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| DeliveryError::Session(format!("HTTP client error: {}", e)))?;

        Ok(HttpSession { client })
    }
}

pub struct HttpSession {
    client: Client,
}

impl DeliverySession for HttpSession {
    async fn send(
        &self,
        request: &DeliveryRequest,
        token: Option<&str>,
    ) -> Result<u16, DeliveryError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.target_url)
            .json(&request.payload);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Token {}", token));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                url: request.target_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                url: request.target_url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(status.as_u16())
    }
}
