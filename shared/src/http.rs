//! HTTP helpers shared by the gateway: response decoding and the single
//! place where failures are turned into a [`GatewayError`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GatewayError, GatewayErrorKind};

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

/// Backend operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    Revise,
    ListDesigns,
    FetchDesign,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Generate => "generate_design",
            Operation::Revise => "update_design",
            Operation::ListDesigns => "list_designs",
            Operation::FetchDesign => "get_design",
        }
    }

    /// Message used when nothing more specific is available.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::Generate => "Failed to generate design.",
            Operation::Revise => "Failed to update design.",
            Operation::ListDesigns => "Failed to fetch designs.",
            Operation::FetchDesign => "Failed to load design.",
        }
    }
}

/// What went wrong on the wire, before it is reduced to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A response arrived with a non-2xx status.
    Status { status: u16, body: String },
    /// No usable response arrived.
    Transport { connect: bool, message: String },
}

impl Failure {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        Failure::Transport {
            connect: err.is_connect(),
            message: err.to_string(),
        }
    }
}

/// Resolve a failure into one message, in priority order: backend `detail`,
/// fixed unreachable message, raw transport message, operation fallback.
pub fn map_failure(failure: Failure, base_url: &str, operation: Operation) -> GatewayError {
    match failure {
        Failure::Status { status, body } => match extract_detail(&body) {
            Some(detail) => GatewayError::new(GatewayErrorKind::Backend, detail).with_status(status),
            None => GatewayError::new(
                GatewayErrorKind::Status,
                format!("Request failed with status code {}", status),
            )
            .with_status(status),
        },
        Failure::Transport { connect: true, .. } => GatewayError::new(
            GatewayErrorKind::Unreachable,
            format!(
                "Cannot connect to backend server. Please make sure the backend is running on {}",
                base_url
            ),
        ),
        Failure::Transport { connect: false, message } => {
            let message = message.trim();
            if message.is_empty() {
                GatewayError::new(GatewayErrorKind::Transport, operation.fallback_message())
            } else {
                GatewayError::new(GatewayErrorKind::Transport, message)
            }
        }
    }
}

/// Pull a string `detail` out of an error body, if there is one.
pub fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail),
        _ => None,
    }
}

/// Decode a 2xx body, mapping serde failures to a decode error.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| {
        GatewayError::new(
            GatewayErrorKind::Decode,
            format!("Invalid response from backend: {}", e),
        )
    })
}
