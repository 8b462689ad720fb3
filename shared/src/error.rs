//! Error types for the system designer client.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the shared crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Local input validation failed before any request was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend call failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// History lookup miss
    #[error(transparent)]
    NotFound(#[from] NotFound),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Rejections produced by the intake controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Requirements cannot be empty.")]
    EmptyRequirements,

    #[error("Invalid JSON in assumptions field: {0}")]
    InvalidAssumptionsJson(String),

    #[error("Design id cannot be empty.")]
    EmptyDesignId,

    #[error("User edits cannot be empty.")]
    EmptyEdits,
}

impl ValidationError {
    /// Form field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyRequirements => "requirements",
            ValidationError::InvalidAssumptionsJson(_) => "assumptions",
            ValidationError::EmptyDesignId => "design_id",
            ValidationError::EmptyEdits => "user_edits",
        }
    }
}

/// Closed set of backend failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// Non-2xx response carrying a `detail` message
    Backend,
    /// Non-2xx response without a usable `detail`
    Status,
    /// Connection refused or host unreachable
    Unreachable,
    /// Any other transport failure (timeout, TLS, reset)
    Transport,
    /// 2xx response whose body is not a valid document
    Decode,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatewayErrorKind::Backend => "backend",
            GatewayErrorKind::Status => "status",
            GatewayErrorKind::Unreachable => "unreachable",
            GatewayErrorKind::Transport => "transport",
            GatewayErrorKind::Decode => "decode",
        };
        f.write_str(name)
    }
}

/// A backend failure reduced to one user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    /// HTTP status, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// No document with the requested id is in the history list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Design not found: {id}")]
pub struct NotFound {
    pub id: String,
}
