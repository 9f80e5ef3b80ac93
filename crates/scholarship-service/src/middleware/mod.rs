//! Middleware for the scholarship service.

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, SESSION_COOKIE};
pub use http_metrics::http_metrics_middleware;
