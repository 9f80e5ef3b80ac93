//! Scholarship Service Library
//!
//! JSON API for running a student-aid scholarship programme: accounts and
//! sessions, academic periods, applicant registration and screening status,
//! document uploads, interview scheduling and booking, rubric scoring,
//! notifications and period statistics.
//!
//! This library is used by the `scholarship-service` binary and by the
//! integration tests through `sc-test-utils`.

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
