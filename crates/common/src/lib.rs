//! Common utilities and types shared across the scholarship service crates.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for account roles and other shared data types
pub mod types;
