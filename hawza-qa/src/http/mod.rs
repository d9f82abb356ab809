//! HTTP layer: Axum router, extractors and JSON responses.
//!
//! Public routes accept submissions and list answered questions; admin routes
//! manage the session lifecycle and the full question archive.

mod admin;
mod auth;
mod error;
mod handlers;
mod responses;
mod state;


pub use handlers::router;
pub use state::AppState;
