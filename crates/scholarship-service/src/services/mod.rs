//! Service layer for the scholarship service.
//!
//! Business rules and transactions live here; handlers parse requests and
//! repositories run single queries.
//!
//! # Components
//!
//! - `auth_service` - registration, login, session resolution
//! - `file_service` - document upload, listing, download, deletion
//! - `interview_service` - slot generation, booking, participants, notes
//! - `notifications` - fire-and-forget notification writes
//! - `period_service` - current period lookup and activation
//! - `scoring_service` - rubric questions and score matrices
//! - `storage` - `FileStore` trait with local and in-memory backends
//! - `student_service` - profiles, registration, status decisions

pub mod auth_service;
pub mod file_service;
pub mod interview_service;
pub mod notifications;
pub mod period_service;
pub mod scoring_service;
pub mod storage;
pub mod student_service;

pub use auth_service::AuthUser;
pub use storage::{FileStore, LocalFileStore, MemoryFileStore};
