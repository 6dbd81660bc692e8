//! Error types for management API calls.
//!
//! Errors are categorized so callers can tell a server that is down from a
//! rejected payload or bad credentials.

use crate::transport::Method;
use std::fmt;

/// Result type alias for management API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of management API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The server could not be reached (possibly restarting).
    Network,
    /// Credentials were rejected.
    Auth,
    /// The server rejected the request (4xx).
    Client,
    /// The server failed the request (5xx).
    Server,
    /// A resource file could not be interpreted.
    Payload,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Category of a response status.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            500.. => Self::Server,
            _ => Self::Client,
        }
    }

    /// Category of an engine error, looking through task and phase wrappers.
    #[must_use]
    pub fn of(err: &orchestration::Error) -> Self {
        match err.root_cause() {
            orchestration::Error::Transport {
                status: Some(status),
                ..
            } => Self::from_status(*status),
            orchestration::Error::Transport { status: None, .. }
            | orchestration::Error::RestartTimeout { .. } => Self::Network,
            orchestration::Error::InvalidPayload(_) => Self::Payload,
            _ => Self::Other,
        }
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Server unreachable",
            Self::Auth => "Authentication failed",
            Self::Client => "Request rejected",
            Self::Server => "Server error",
            Self::Payload => "Invalid resource file",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the host and ports, or wait for the server to finish restarting",
            Self::Auth => "Check the username and password (or APPDEPLOY_PASSWORD)",
            Self::Client => "Check the resource file against the management API documentation",
            Self::Server => "Check the server error log",
            Self::Payload => "Make sure the file is valid JSON or XML and names the resource",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the management API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never got a response.
    #[error("HTTP request failed: {message}")]
    HttpError {
        /// Error message.
        message: String,
    },

    /// The server answered with an unexpected status.
    #[error("{method} {path} returned HTTP {status}: {body}")]
    Status {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
        /// Response status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// A resource payload could not be interpreted.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create an HTTP status error.
    pub fn status(method: Method, path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            method,
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    /// HTTP status code, if the server answered.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError { .. } => ErrorCategory::Network,
            Self::Status { status, .. } => ErrorCategory::from_status(*status),
            Self::InvalidPayload(_) => ErrorCategory::Payload,
            Self::Config(_) => ErrorCategory::Other,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        Self::HttpError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

impl From<Error> for orchestration::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidPayload(message) => Self::InvalidPayload(message),
            Error::Config(message) => Self::Config(message),
            other => Self::transport(other.to_string(), other.status_code()),
        }
    }
}
