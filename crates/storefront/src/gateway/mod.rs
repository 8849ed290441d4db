//! HTTP gateway to the remote REST API.
//!
//! # Architecture
//!
//! - The gateway is the only component that performs outbound HTTP calls
//! - Every request carries the persisted bearer token, if one exists
//! - Failures are classified before any caller sees them:
//!   - connectivity (backend unreachable) becomes a friendly advisory and
//!     never touches the session
//!   - HTTP 401 clears the persisted session and broadcasts
//!     [`SessionEvent::LoginRequired`]
//!   - everything else passes through for the caller to handle
//!
//! # Example
//!
//! ```rust,ignore
//! use autoparts_storefront::gateway::Gateway;
//!
//! let gateway = Gateway::new(&config, storage)?;
//! let mut events = gateway.subscribe();
//!
//! let products: Vec<Product> = gateway.get_json("/api/products").await?;
//! ```

mod client;

pub use client::{Gateway, ImageUpload};

use reqwest::StatusCode;
use thiserror::Error;

/// Where the client is sent when its session expires.
pub const LOGIN_PATH: &str = "/login";

/// Coarse failure classes that callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No backend could be reached.
    Connectivity,
    /// The backend rejected the credential (HTTP 401).
    Authentication,
    /// Anything else: validation, business rule, server error, bad payload.
    Other,
}

/// Session lifecycle notifications emitted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The credential was rejected; persisted session fields have been
    /// cleared and the client should navigate to `login_path`.
    LoginRequired {
        /// Login entry point.
        login_path: &'static str,
    },
}

/// Errors that can occur when talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Backend unreachable (connection refused, DNS failure, network down).
    #[error(
        "Unable to connect to the server. Please ensure the backend is running at {base_url}"
    )]
    Connectivity {
        /// API base URL that could not be reached.
        base_url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Credential rejected; the session has already been cleared.
    #[error("Your session has expired. Please log in again.")]
    Unauthorized,

    /// Non-success status other than 401.
    #[error("{message}")]
    Status {
        /// HTTP status returned by the API.
        status: StatusCode,
        /// Server-provided message, or a generic one.
        message: String,
    },

    /// Transport failure other than connectivity (timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Connectivity { .. } => FailureKind::Connectivity,
            Self::Unauthorized => FailureKind::Authentication,
            _ => FailureKind::Other,
        }
    }

    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self.kind(), FailureKind::Connectivity)
    }

    /// HTTP status, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Pick a human-readable message out of an error response body.
///
/// Prefers a JSON `message` field, then `error`, then a JSON string body,
/// then a short plain-text body, then a generic line naming the status.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    const MAX_TEXT_LEN: usize = 200;

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            let field = ["message", "error"].iter().find_map(|key| {
                map.get(*key)
                    .and_then(serde_json::Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            });
            if let Some(message) = field {
                return message.to_string();
            }
        }
        Ok(serde_json::Value::String(text)) if !text.trim().is_empty() => {
            return text.trim().to_string();
        }
        _ => {
            let text = body.trim();
            if !text.is_empty() && text.len() <= MAX_TEXT_LEN && !text.starts_with('<') {
                return text.to_string();
            }
        }
    }

    format!("Request failed with status {}", status.as_u16())
}
