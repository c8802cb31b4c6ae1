//! Mirage: a mock HTTP server driven by an extracted API description.
//!
//! Every declared route and method is bound at startup. Each request picks a
//! status (default, query/header override, or `random`) and answers with the
//! literal example, a value generated from the response schema, or the output
//! of a caller-supplied hook.

// ===== Core engine =====
pub mod binder;
pub mod hooks;
pub mod registry;
pub mod resolver;

// ===== Collaborators =====
pub mod schema;

// ===== Serving =====
pub mod activity;
pub mod app;
pub mod config;
pub mod error;
pub mod launch;

pub use app::{MockApp, ServerHandle};
pub use config::ServerConfig;
pub use error::{MockError, StartupError};
pub use hooks::{Hook, HookError, HookMap, HookRequest};
pub use launch::{launch, launch_with_sink};
