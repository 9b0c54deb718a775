use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::telescope::Telescope;

/// A shift-log comment entered by an observer during the night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftComment {
    pub telescope: Telescope,
    pub author: String,
    pub date: DateTime<Utc>,
    pub text: String,
}
