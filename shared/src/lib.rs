//! Shared library for the system designer client.
//!
//! This crate holds the design document model, the intake controller, the
//! backend gateway and the two state owners (generation session and history
//! store) that any front end drives.

pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod http;
pub mod intake;
pub mod models;
pub mod session;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{Error, GatewayError, GatewayErrorKind, NotFound, Result, ValidationError};
pub use gateway::{DesignBackend, Gateway};
pub use history::{HistoryStatus, HistoryStore};
pub use intake::{build_request, build_revision};
pub use models::{Component, DesignContent, DesignDocument, DesignRequest, RevisionRequest};
pub use session::{GenerationSession, SessionStatus, Submission};
pub use tokens::{RequestToken, Resolution};
