//! Fault reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::telescope::Telescope;
use super::time_account::ProjectId;

define_label_enum!(
    /// Fault system category (one fault database per telescope plus support groups).
    FaultCategory {
        Jcmt => "JCMT",
        Ukirt => "UKIRT",
        Csg => "CSG",
        Omp => "OMP",
        Dr => "DR",
        Safety => "SAFETY",
        Facility => "FACILITY",
    }
);

impl FaultCategory {
    pub fn for_telescope(telescope: Telescope) -> Self {
        match telescope {
            Telescope::Jcmt => FaultCategory::Jcmt,
            Telescope::Ukirt => FaultCategory::Ukirt,
        }
    }
}

define_label_enum!(
    FaultStatus {
        Open => "open",
        Closed => "closed",
        WorksForMe => "works_for_me",
        NotAFault => "not_a_fault",
        WontBeFixed => "wont_be_fixed",
        Duplicate => "duplicate",
        Suspended => "suspended",
    }
);

impl FaultStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, FaultStatus::Open | FaultStatus::Suspended)
    }
}

/// A single response in a fault thread. The first response is the report itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultResponse {
    pub author: String,
    pub date: DateTime<Utc>,
    pub text: String,
    #[serde(default)]
    pub is_fault: bool,
}

/// A fault report.
///
/// `filed` is when the report was entered; `fault_date` is when the fault
/// actually occurred, if the reporter supplied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub fault_id: String,
    pub category: FaultCategory,
    pub subject: String,
    pub system: String,
    pub fault_type: String,
    pub status: FaultStatus,
    #[serde(default)]
    pub urgent: bool,
    pub time_lost: qtty::Hours,
    pub filed: DateTime<Utc>,
    #[serde(default)]
    pub fault_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub projects: Vec<ProjectId>,
    #[serde(default)]
    pub responses: Vec<FaultResponse>,
}

impl Fault {
    /// Key used when merging fault lists: filed-date epoch, then fault ID.
    pub fn merge_key(&self) -> (i64, String) {
        (self.filed.timestamp(), self.fault_id.clone())
    }

    /// When the fault happened, falling back to when it was filed.
    pub fn occurred(&self) -> DateTime<Utc> {
        self.fault_date.unwrap_or(self.filed)
    }

    pub fn time_lost_seconds(&self) -> u64 {
        let seconds: qtty::Seconds = self.time_lost.to();
        seconds.value().max(0.0).round() as u64
    }

    pub fn author(&self) -> Option<&str> {
        self.responses.first().map(|r| r.author.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_category_labels() {
        assert_eq!(FaultCategory::for_telescope(Telescope::Ukirt).as_str(), "UKIRT");
        assert_eq!("csg".parse::<FaultCategory>().unwrap(), FaultCategory::Csg);
        assert!("nope".parse::<FaultStatus>().is_err());
    }

    #[test]
    fn test_time_lost_and_occurrence() {
        let filed = Utc.with_ymd_and_hms(2002, 12, 11, 2, 0, 0).unwrap();
        let fault = Fault {
            fault_id: "20021211.001".to_string(),
            category: FaultCategory::Jcmt,
            subject: "Dome stuck".to_string(),
            system: "Dome".to_string(),
            fault_type: "Mechanical".to_string(),
            status: FaultStatus::Open,
            urgent: false,
            time_lost: qtty::Hours::new(0.5),
            filed,
            fault_date: None,
            projects: vec![],
            responses: vec![],
        };
        assert_eq!(fault.time_lost_seconds(), 1800);
        assert_eq!(fault.occurred(), filed);
        assert_eq!(fault.merge_key(), (filed.timestamp(), "20021211.001".to_string()));
    }
}
