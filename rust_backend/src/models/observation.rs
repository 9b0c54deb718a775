use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::telescope::Telescope;
use super::time_account::ProjectId;

define_label_enum!(
    /// Data quality flag attached to an observation.
    ObsStatus {
        Good => "good",
        Questionable => "questionable",
        Bad => "bad",
        Junk => "junk",
    }
);

impl Default for ObsStatus {
    fn default() -> Self {
        ObsStatus::Good
    }
}

impl ObsStatus {
    /// Whether observations with this status are charged to their project.
    pub fn is_chargeable(&self) -> bool {
        matches!(self, ObsStatus::Good | ObsStatus::Questionable)
    }
}

/// Header summary of one raw observation in the data archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub obsid: String,
    pub telescope: Telescope,
    pub project_id: ProjectId,
    pub instrument: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub msb_checksum: Option<String>,
    #[serde(default)]
    pub calibration: bool,
    #[serde(default)]
    pub status: ObsStatus,
}

impl Observation {
    /// Duration in whole seconds; `None` without an end time or when the end
    /// precedes the start.
    pub fn duration_seconds(&self) -> Option<u64> {
        let end = self.end?;
        let seconds = (end - self.start).num_seconds();
        u64::try_from(seconds).ok()
    }
}
