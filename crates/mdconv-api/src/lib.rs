//! Markdown conversion API
//!
//! HTTP handlers, error mapping and application setup. The binary in
//! `main.rs` only loads configuration and calls into [`setup`].

mod api_doc;
pub mod constants;
pub mod handlers;
pub mod middleware;
pub mod setup;
mod utils;

pub mod error;
pub mod state;

// Re-exports
pub use api_doc::get_openapi_spec;
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
