//! Time accounting derived from raw data headers.
//!
//! Independent of the accounting store: every observation in the archive is
//! charged to its project for the span between its start and end times.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{AccountCategory, Observation, ProjectId, Telescope};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderAccounting {
    pub projects: BTreeMap<ProjectId, u64>,
    pub warnings: Vec<String>,
}

impl HeaderAccounting {
    pub fn total(&self) -> u64 {
        self.projects.values().sum()
    }
}

/// Charge each observation to its project. Calibrations go to the
/// telescope's calibration sentinel; unusable observations are skipped with a
/// warning.
pub fn account_observations(telescope: Telescope, observations: &[Observation]) -> HeaderAccounting {
    let mut result = HeaderAccounting::default();
    let calibration = AccountCategory::Calibration.sentinel_for(telescope);

    for obs in observations {
        if obs.telescope != telescope {
            continue;
        }
        if !obs.status.is_chargeable() {
            result
                .warnings
                .push(format!("Observation {} is flagged {} and was not charged", obs.obsid, obs.status));
            continue;
        }
        let seconds = match (obs.end, obs.duration_seconds()) {
            (None, _) => {
                result
                    .warnings
                    .push(format!("Observation {} has no end time", obs.obsid));
                continue;
            }
            (Some(_), None) => {
                result
                    .warnings
                    .push(format!("Observation {} ends before it starts", obs.obsid));
                continue;
            }
            (Some(_), Some(seconds)) => seconds,
        };

        let project = match (&calibration, obs.calibration) {
            (Some(cal), true) => cal.clone(),
            _ => obs.project_id.clone(),
        };
        debug!("{}: {}s charged to {}", obs.obsid, seconds, project);
        *result.projects.entry(project).or_insert(0) += seconds;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObsStatus;
    use chrono::{TimeZone, Utc};

    fn obs(id: &str, project: &str, start_h: u32, end_h: Option<u32>) -> Observation {
        Observation {
            obsid: id.to_string(),
            telescope: Telescope::Jcmt,
            project_id: ProjectId::new(project),
            instrument: "HARP".to_string(),
            start: Utc.with_ymd_and_hms(2002, 12, 10, start_h, 0, 0).unwrap(),
            end: end_h.map(|h| Utc.with_ymd_and_hms(2002, 12, 10, h, 0, 0).unwrap()),
            msb_checksum: None,
            calibration: false,
            status: ObsStatus::Good,
        }
    }

    #[test]
    fn test_charges_projects_and_calibrations() {
        let mut cal = obs("obs3", "M01BU53", 8, Some(9));
        cal.calibration = true;
        let observations = vec![obs("obs1", "M01BU53", 5, Some(6)), obs("obs2", "m01bu53", 6, Some(8)), cal];

        let result = account_observations(Telescope::Jcmt, &observations);
        assert_eq!(result.projects[&ProjectId::new("M01BU53")], 3 * 3600);
        assert_eq!(result.projects[&ProjectId::new("JCMTCAL")], 3600);
        assert!(result.warnings.is_empty());
        assert_eq!(result.total(), 4 * 3600);
    }

    #[test]
    fn test_skips_unusable_observations() {
        let mut junk = obs("obs4", "M01BU53", 5, Some(6));
        junk.status = ObsStatus::Junk;
        let observations = vec![
            obs("obs1", "M01BU53", 5, None),
            obs("obs2", "M01BU53", 7, Some(6)),
            junk,
        ];

        let result = account_observations(Telescope::Jcmt, &observations);
        assert!(result.projects.is_empty());
        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings[0].contains("no end time"));
    }

    #[test]
    fn test_ignores_other_telescopes() {
        let mut other = obs("obs1", "U/02B/5", 5, Some(6));
        other.telescope = Telescope::Ukirt;
        let result = account_observations(Telescope::Jcmt, &[other]);
        assert!(result.projects.is_empty());
        assert!(result.warnings.is_empty());
    }
}
