use std::path::PathBuf;
use std::time::Duration;

/// Longest response body excerpt carried inside an error.
pub const MAX_BODY_EXCERPT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum BilinkError {
    #[error("Timeout after {}ms during {operation}", .duration.as_millis())]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Network error during {operation}: {source}")]
    Transport {
        operation: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Server error during {operation} (HTTP {status}): {body}")]
    ServerError {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Sign-in did not return an authorization code (HTTP {status}): {body}")]
    AuthorizationCodeMissing { status: u16, body: String },

    #[error("Token exchange rejected (HTTP {status}): {body}")]
    TokenExchangeRejected { status: u16, body: String },

    #[error("Session expired, refresh was rejected (HTTP {status}): {body}")]
    SessionExpired { status: u16, body: String },

    #[error("{endpoint} failed with HTTP {status}: {body}")]
    DataCall {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Username and password are required to sign in to organization {org}")]
    MissingCredentials { org: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BilinkError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            BilinkError::Timeout { .. } => "timeout",
            BilinkError::Transport { .. } => "network_error",
            BilinkError::ServerError { .. } => "server_error",
            BilinkError::AuthorizationCodeMissing { .. } => "authorization_code_missing",
            BilinkError::TokenExchangeRejected { .. } => "token_exchange_rejected",
            BilinkError::SessionExpired { .. } => "session_expired",
            BilinkError::DataCall { .. } => "data_call_failed",
            BilinkError::MissingCredentials { .. } => "missing_credentials",
            BilinkError::ProtocolError(_) => "parse_error",
            BilinkError::ConfigError { .. } => "config_error",
            BilinkError::IoError(_) => "io_error",
        }
    }

    /// Transient failures the caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BilinkError::Timeout { .. }
                | BilinkError::Transport { .. }
                | BilinkError::ServerError { .. }
        )
    }

    /// True when the refresh token is dead and only a full login can recover.
    pub fn requires_bootstrap(&self) -> bool {
        matches!(self, BilinkError::SessionExpired { .. })
    }

    /// A data call answered 401/403, which usually means the id token lapsed.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            BilinkError::DataCall {
                status: 401 | 403,
                ..
            }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BilinkError::ServerError { status, .. }
            | BilinkError::AuthorizationCodeMissing { status, .. }
            | BilinkError::TokenExchangeRejected { status, .. }
            | BilinkError::SessionExpired { status, .. }
            | BilinkError::DataCall { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Produce a structured JSON error object.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        obj.insert("retryable".into(), serde_json::Value::Bool(self.is_retryable()));
        serde_json::json!({ "error": obj })
    }
}

/// Cut a response body down to [`MAX_BODY_EXCERPT`] characters for diagnostics.
pub fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
