//! Minimum schedulable blocks: the queue view used by the scheduler and the
//! activity log written when MSBs are observed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::telescope::Telescope;
use super::time_account::ProjectId;

define_label_enum!(
    /// What happened to an MSB.
    MsbStatus {
        Done => "done",
        Rejected => "rejected",
        Suspended => "suspended",
        Aborted => "aborted",
        Comment => "comment",
        Undone => "undone",
    }
);

/// One entry in the MSB activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsbDone {
    pub checksum: String,
    pub telescope: Telescope,
    pub project_id: ProjectId,
    pub title: String,
    pub instrument: String,
    pub date: DateTime<Utc>,
    pub status: MsbStatus,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Interval during which an MSB can be scheduled. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ObservabilityWindow {
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant < self.end
    }
}

/// An MSB as held in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulableMsb {
    pub msbid: i64,
    pub checksum: String,
    pub telescope: Telescope,
    pub project_id: ProjectId,
    pub title: String,
    pub instrument: String,
    pub remaining: u32,
    #[serde(default)]
    pub time_estimate: u64,
    /// An empty list means the MSB carries no time constraint.
    #[serde(default)]
    pub windows: Vec<ObservabilityWindow>,
}

impl SchedulableMsb {
    pub fn is_observable_at(&self, instant: &DateTime<Utc>) -> bool {
        self.remaining > 0
            && (self.windows.is_empty() || self.windows.iter().any(|w| w.contains(instant)))
    }
}

/// Scheduler query restricted to a single instant.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MsbQuery {
    pub telescope: Option<Telescope>,
    pub reference: Option<DateTime<Utc>>,
    pub country: Option<String>,
    pub semester: Option<String>,
    pub instrument: Option<String>,
}

impl MsbQuery {
    pub fn at(telescope: Telescope, reference: DateTime<Utc>) -> Self {
        Self {
            telescope: Some(telescope),
            reference: Some(reference),
            ..Default::default()
        }
    }

    /// Whether `msb` passes the telescope, instrument and time restrictions.
    ///
    /// Queue and semester restrictions need the owning project and are
    /// applied by the repository.
    pub fn admits(&self, msb: &SchedulableMsb) -> bool {
        if let Some(tel) = self.telescope {
            if msb.telescope != tel {
                return false;
            }
        }
        if let Some(ref instrument) = self.instrument {
            if !msb.instrument.eq_ignore_ascii_case(instrument) {
                return false;
            }
        }
        match self.reference {
            Some(ref instant) => msb.is_observable_at(instant),
            None => msb.remaining > 0,
        }
    }
}

/// One row returned by a scheduler query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsbQueryResult {
    pub msbid: i64,
    pub checksum: String,
    pub project_id: ProjectId,
    pub title: String,
    pub instrument: String,
    pub time_estimate: u64,
}

impl From<&SchedulableMsb> for MsbQueryResult {
    fn from(msb: &SchedulableMsb) -> Self {
        Self {
            msbid: msb.msbid,
            checksum: msb.checksum.clone(),
            project_id: msb.project_id.clone(),
            title: msb.title.clone(),
            instrument: msb.instrument.clone(),
            time_estimate: msb.time_estimate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msb(remaining: u32, windows: Vec<ObservabilityWindow>) -> SchedulableMsb {
        SchedulableMsb {
            msbid: 1,
            checksum: "abc".to_string(),
            telescope: Telescope::Jcmt,
            project_id: ProjectId::new("M01BU53"),
            title: "Orion".to_string(),
            instrument: "HARP".to_string(),
            remaining,
            time_estimate: 3600,
            windows,
        }
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let start = Utc.with_ymd_and_hms(2004, 1, 20, 5, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2004, 1, 20, 7, 0, 0).unwrap();
        let window = ObservabilityWindow { start, end };
        assert!(window.contains(&start));
        assert!(!window.contains(&end));
    }

    #[test]
    fn test_query_admits() {
        let at = Utc.with_ymd_and_hms(2004, 1, 20, 6, 0, 0).unwrap();
        let mut query = MsbQuery::at(Telescope::Jcmt, at);
        assert!(query.admits(&msb(1, vec![])));
        assert!(!query.admits(&msb(0, vec![])));

        query.instrument = Some("scuba-2".to_string());
        assert!(!query.admits(&msb(1, vec![])));

        query.instrument = Some("harp".to_string());
        let later = ObservabilityWindow {
            start: Utc.with_ymd_and_hms(2004, 1, 20, 8, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2004, 1, 20, 9, 0, 0).unwrap(),
        };
        assert!(!query.admits(&msb(1, vec![later])));
    }
}
