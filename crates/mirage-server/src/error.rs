//! Error types for Mirage.
//!
//! Two families exist: [`MockError`] is raised while answering a single request and
//! is always converted into a `500` JSON envelope, while [`StartupError`] aborts
//! server bring-up before any connection is accepted.

use crate::binder::BindError;
use crate::config::ConfigError;
use crate::schema::{GenerationError, ResolutionError};
use std::any::Any;
use std::path::PathBuf;

/// Failures while resolving the response for one request.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("missing response for {url} ({status})")]
    UnresolvedStatus { url: String, status: String },
    #[error("no responses declared for {url}")]
    NoStatuses { url: String },
    #[error("missing example for {url} ({status})")]
    MissingExample { url: String, status: String },
    #[error("invalid status code for {url} ({status})")]
    InvalidStatus { url: String, status: String },
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Hook(String),
    #[error("Missing resource for {url}")]
    UnmatchedRoute { url: String },
}

/// Failures that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid schema definition '{name}': {message}")]
    Definition { name: String, message: String },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("Failed to listen on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Text carried by a caught panic payload, if it is a string.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<String> {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}
