//! Shared data types for the scholarship service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Account role.
///
/// Stored as lowercase snake_case text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// Scholarship committee staff (Pengurus IOM).
    PengurusIom,
    /// Interviewer.
    Pewawancara,
    /// Registered applicant with a student profile.
    Mahasiswa,
    /// Self-registered account without a student profile yet.
    Guest,
}

/// Roles that belong to the organization rather than to applicants.
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::PengurusIom, Role::Pewawancara];

impl Role {
    /// Returns the database/text representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::PengurusIom => "pengurus_iom",
            Role::Pewawancara => "pewawancara",
            Role::Mahasiswa => "mahasiswa",
            Role::Guest => "guest",
        }
    }

    /// Whether the role is one of [`STAFF_ROLES`].
    #[must_use]
    pub fn is_staff(&self) -> bool {
        STAFF_ROLES.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid role: {0}")]
pub struct InvalidRole(pub String);

impl FromStr for Role {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "pengurus_iom" => Ok(Role::PengurusIom),
            "pewawancara" => Ok(Role::Pewawancara),
            "mahasiswa" => Ok(Role::Mahasiswa),
            "guest" => Ok(Role::Guest),
            other => Err(InvalidRole(other.to_string())),
        }
    }
}
