//! Live payment-intake console
//!
//! Mirrors the backend's payment-intake feed into an in-memory collection
//! behind a single-writer reducer and exposes the operator's table and
//! actions over HTTP. The backend stays the durable source of truth; this
//! process holds session state only.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types for convenience
pub use config::AppSettings;
pub use error::AppError;
