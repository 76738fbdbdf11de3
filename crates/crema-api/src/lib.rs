//! Crema API Library
//!
//! The same-origin relay service: it holds provider secrets server-side and
//! exposes the upload relay, the Cloudinary proxy and admin routes.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
pub mod telemetry;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
