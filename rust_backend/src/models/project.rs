use serde::{Deserialize, Serialize};

use super::telescope::Telescope;
use super::time_account::ProjectId;

/// Queue name of the Engineering & Calibration queue.
pub const EC_QUEUE: &str = "EC";

/// An observing project.
///
/// Only the fields the reporting core needs are modelled: the queue
/// (`country`) drives the science vs E&C split, the digest is used for
/// project-level authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub telescope: Telescope,
    pub country: String,
    pub semester: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pi: String,
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub allocated_seconds: u64,
    #[serde(default)]
    pub remaining_seconds: u64,
    #[serde(default)]
    pub password_digest: Option<String>,
}

impl Project {
    /// Whether the project belongs to `queue`.
    pub fn in_queue(&self, queue: &str) -> bool {
        self.country.eq_ignore_ascii_case(queue)
    }

    pub fn is_ec(&self) -> bool {
        self.in_queue(EC_QUEUE)
    }

    pub fn used_seconds(&self) -> u64 {
        self.allocated_seconds.saturating_sub(self.remaining_seconds)
    }

    /// Percentage of the allocation already used (0 when nothing allocated).
    pub fn percent_complete(&self) -> f64 {
        if self.allocated_seconds == 0 {
            return 0.0;
        }
        self.used_seconds() as f64 / self.allocated_seconds as f64 * 100.0
    }
}
