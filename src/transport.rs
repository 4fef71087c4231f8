use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::BilinkError;

/// Deadline applied to every outbound call unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Whether a request may follow `3xx` responses on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    Follow,
    /// Hand the `3xx` back to the caller so `Location` can be read as data.
    Manual,
}

/// A fully read HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: impl reqwest::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP transport where every exchange is bounded by a hard deadline.
///
/// The deadline covers connecting, sending and reading the whole body. When it
/// expires the in-flight future is dropped, which closes the connection.
#[derive(Debug, Clone)]
pub struct TimedTransport {
    following: reqwest::Client,
    manual: reqwest::Client,
    timeout: Duration,
}

impl TimedTransport {
    pub fn new(timeout: Duration) -> Result<Self, BilinkError> {
        let user_agent = concat!("bilink/", env!("CARGO_PKG_VERSION"));
        let following = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(client_setup_error)?;
        let manual = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(client_setup_error)?;

        Ok(Self {
            following,
            manual,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a request on the client matching the redirect policy.
    pub fn request(&self, redirects: Redirects, method: Method, url: &str) -> RequestBuilder {
        let client = match redirects {
            Redirects::Follow => &self.following,
            Redirects::Manual => &self.manual,
        };
        client.request(method, url)
    }

    /// Send with the transport's configured deadline.
    pub async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<HttpReply, BilinkError> {
        self.send_with_timeout(operation, request, self.timeout).await
    }

    pub async fn send_with_timeout(
        &self,
        operation: &str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<HttpReply, BilinkError> {
        let started = Instant::now();
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| network_error(operation, timeout, e))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .text()
                .await
                .map_err(|e| network_error(operation, timeout, e))?;
            Ok::<_, BilinkError>(HttpReply {
                status,
                headers,
                body,
            })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(reply)) => {
                tracing::debug!(
                    operation,
                    status = reply.status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "HTTP exchange complete"
                );
                Ok(reply)
            }
            Ok(Err(e)) => {
                tracing::debug!(operation, error = %e, "HTTP exchange failed");
                Err(e)
            }
            Err(_) => {
                tracing::debug!(operation, timeout_ms = timeout.as_millis() as u64, "HTTP exchange timed out");
                Err(BilinkError::Timeout {
                    operation: operation.to_string(),
                    duration: timeout,
                })
            }
        }
    }
}

fn network_error(operation: &str, timeout: Duration, err: reqwest::Error) -> BilinkError {
    if err.is_timeout() {
        return BilinkError::Timeout {
            operation: operation.to_string(),
            duration: timeout,
        };
    }
    BilinkError::Transport {
        operation: operation.to_string(),
        source: Box::new(err),
    }
}

fn client_setup_error(err: reqwest::Error) -> BilinkError {
    BilinkError::Transport {
        operation: "client setup".to_string(),
        source: Box::new(err),
    }
}
