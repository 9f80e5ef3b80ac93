//! Background tasks for the scholarship service.
//!
//! - `session_cleanup` - Deletes expired sessions on a fixed interval

pub mod session_cleanup;

pub use session_cleanup::start_session_cleanup;
