//! Password checks for staff and project access.
//!
//! Passwords are never stored: only the hex SHA-256 digest of salt followed
//! by password. Project passwords are salted with the upper-case project ID.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::StaffSettings;
use crate::error::{OmpError, OmpResult};
use crate::models::Project;

/// Result of a credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthOutcome {
    Authenticated,
    BadCredentials,
    NoCredentials,
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated)
    }

    /// Turn anything but success into an authentication error naming `realm`.
    pub fn require(self, realm: &str) -> OmpResult<()> {
        match self {
            AuthOutcome::Authenticated => Ok(()),
            AuthOutcome::BadCredentials => {
                Err(OmpError::Authentication(format!("Invalid password for {}", realm)))
            }
            AuthOutcome::NoCredentials => {
                Err(OmpError::Authentication(format!("No password supplied for {}", realm)))
            }
        }
    }
}

pub fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn digests_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .fold(0u8, |acc, (x, y)| acc | (x.to_ascii_lowercase() ^ y.to_ascii_lowercase()))
            == 0
}

/// Compare a supplied password against a stored digest.
///
/// A missing or empty password is [`AuthOutcome::NoCredentials`]; a store
/// without a digest accepts nothing.
pub fn check_password(salt: &str, stored_digest: Option<&str>, supplied: Option<&str>) -> AuthOutcome {
    let Some(password) = supplied.filter(|p| !p.is_empty()) else {
        return AuthOutcome::NoCredentials;
    };
    match stored_digest {
        Some(stored) if digests_match(stored, &digest_password(salt, password)) => {
            AuthOutcome::Authenticated
        }
        _ => AuthOutcome::BadCredentials,
    }
}

pub fn verify_staff(staff: &StaffSettings, supplied: Option<&str>) -> AuthOutcome {
    check_password(&staff.salt, staff.password_digest.as_deref(), supplied)
}

pub fn verify_project_password(project: &Project, supplied: Option<&str>) -> AuthOutcome {
    check_password(
        project.project_id.as_str(),
        project.password_digest.as_deref(),
        supplied,
    )
}
