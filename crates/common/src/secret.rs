//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types. Passwords submitted at login and
//! registration, and the opaque session tokens handed back to clients, are
//! carried as `SecretString` so that a derived `Debug` or a `tracing` field
//! never prints them.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     email: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     email: "siti@student.ac.id".to_string(),
//!     password: SecretString::from("rahasia123"),
//! };
//!
//! assert!(!format!("{form:?}").contains("rahasia123"));
//! assert_eq!(form.password.expose_secret(), "rahasia123");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
