//! Shahr API crate - axum HTTP server, route handlers, SSE streaming.
//!
//! Provides the REST API the dashboard UI drives: login and identity,
//! the permission-gated module list, the document catalog, and the
//! conversational query session with its live event stream.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::{AppState, UserSession};
