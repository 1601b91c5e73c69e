//! Order submission transport.
//!
//! [`OrderGateway`] is the seam between the checkout flow and the remote
//! order service. [`HttpGateway`] POSTs the order as JSON; tests substitute
//! an in-process gateway.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::Order;

/// Message used when a failed HTTP response has no readable body.
const NO_JSON_MESSAGE: &str = "No JSON response from server.";

/// Why a submission did not produce a decodable response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never completed (connection, TLS, timeout).
    Transport(String),
    /// The service answered with a non-success HTTP status.
    Status { status: u16, message: String },
    /// The service answered 2xx but the body was not JSON. Checkout reports
    /// this as a protocol error.
    InvalidBody(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(reason) => write!(f, "network error: {reason}"),
            Self::Status { status, message } => {
                write!(f, "Order submission failed ({status}): {message}")
            }
            Self::InvalidBody(reason) => write!(f, "unreadable response body: {reason}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Sends orders to the order service.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submits `order` and returns the decoded response body, still possibly
    /// wrapped in a gateway envelope.
    async fn submit(&self, order: &Order) -> Result<Value, GatewayError>;
}

/// Submits orders with an HTTP POST.
pub struct HttpGateway {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpGateway {
    #[must_use]
    pub fn new(client: reqwest::Client, url: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: url.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl OrderGateway for HttpGateway {
    async fn submit(&self, order: &Order) -> Result<Value, GatewayError> {
        info!(order_id = %order.order_id, url = %self.url, "submitting order");
        let response = self
            .client
            .post(&self.url)
            .json(order)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<Value>().await {
                Ok(body) => body
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Unknown server error.")
                    .to_string(),
                Err(_) => NO_JSON_MESSAGE.to_string(),
            };
            warn!(order_id = %order.order_id, status = status.as_u16(), %message, "order rejected");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::InvalidBody(e.to_string()))
    }
}
