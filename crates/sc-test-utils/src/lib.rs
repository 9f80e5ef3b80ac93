//! # Scholarship Service Test Utilities
//!
//! This crate provides:
//! - Server test harness (`TestScServer` for E2E tests)
//! - Database fixtures (users with live sessions, periods, student profiles)
//! - An authenticated HTTP client (`ApiClient`)
//! - Response assertions (`assert_error`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sc_test_utils::*;
//!
//! #[sqlx::test(migrations = "../../migrations")]
//! async fn test_example(pool: PgPool) -> Result<()> {
//!     let server = TestScServer::spawn(pool).await?;
//!     let admin = create_user(server.pool(), "admin@iom.or.id", Role::Admin).await?;
//!
//!     let response = server.client(&admin).get("/api/v1/me").send().await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod client;
pub mod fixtures;
pub mod server_harness;

pub use assertions::*;
pub use client::*;
pub use fixtures::*;
pub use server_harness::*;
