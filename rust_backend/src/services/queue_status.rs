//! Hour-by-hour sweep of the MSB queue.
//!
//! For each whole UT hour in the window the scheduler is asked what could be
//! observed at that instant. Counts are not deduplicated across hours.

use chrono::{NaiveDate, NaiveTime};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::TelescopeSettings;
use crate::db::repository::FullRepository;
use crate::db::services;
use crate::error::{OmpError, OmpResult};
use crate::models::{MsbQuery, ProjectId, Telescope};

/// Optional restrictions applied to every hourly query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFilters {
    pub country: Option<String>,
    pub semester: Option<String>,
    pub instrument: Option<String>,
    /// Sweep hours 0-23 instead of the telescope's observing window
    #[serde(default)]
    pub full_day: bool,
}

/// Result of a queue sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// project -> hour -> number of MSBs available at that hour
    pub project_hours: BTreeMap<ProjectId, BTreeMap<u32, usize>>,
    /// project -> number of distinct MSBs seen during the sweep
    pub project_msbs: BTreeMap<ProjectId, usize>,
    /// project -> instrument -> number of distinct MSBs using it
    pub project_instruments: BTreeMap<ProjectId, BTreeMap<String, usize>>,
    pub ut_min: u32,
    pub ut_max: u32,
}

pub async fn query_queue_status<R: FullRepository + ?Sized>(
    repo: &R,
    telescope: Telescope,
    date: NaiveDate,
    filters: &QueueFilters,
    settings: &TelescopeSettings,
) -> OmpResult<QueueStatus> {
    let (ut_min, ut_max) = if filters.full_day {
        (0, 23)
    } else {
        settings.ut_window()
    };
    info!(
        "Sweeping {} queue on {} for hours {}..={}",
        telescope, date, ut_min, ut_max
    );

    let mut status = QueueStatus {
        ut_min,
        ut_max,
        ..Default::default()
    };
    let mut seen: BTreeMap<ProjectId, HashSet<String>> = BTreeMap::new();

    for hour in ut_min..=ut_max {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)
            .ok_or_else(|| OmpError::Fatal(format!("Invalid UT hour {}", hour)))?;
        let query = MsbQuery {
            country: filters.country.clone(),
            semester: filters.semester.clone(),
            instrument: filters.instrument.clone(),
            ..MsbQuery::at(telescope, date.and_time(time).and_utc())
        };

        let results = services::query_msbs(repo, &query).await?;
        debug!("{} MSBs available at {:02}:00", results.len(), hour);

        for result in results {
            *status
                .project_hours
                .entry(result.project_id.clone())
                .or_default()
                .entry(hour)
                .or_insert(0) += 1;

            let first_sighting = seen
                .entry(result.project_id.clone())
                .or_default()
                .insert(result.checksum.clone());
            if first_sighting {
                *status.project_msbs.entry(result.project_id.clone()).or_insert(0) += 1;
                *status
                    .project_instruments
                    .entry(result.project_id)
                    .or_default()
                    .entry(result.instrument.to_uppercase())
                    .or_insert(0) += 1;
            }
        }
    }

    Ok(status)
}

impl QueueStatus {
    pub fn projects(&self) -> BTreeSet<&ProjectId> {
        self.project_hours.keys().collect()
    }

    /// Plain-text table of hourly counts.
    pub fn as_text(&self) -> String {
        let hours: Vec<u32> = (self.ut_min..=self.ut_max).collect();
        let mut out = format!("{:<16}", "Project");
        for hour in &hours {
            out.push_str(&format!("{:>4}", hour));
        }
        out.push_str("  MSBs  Instruments\n");

        for (project, by_hour) in &self.project_hours {
            out.push_str(&format!("{:<16}", project.as_str()));
            for hour in &hours {
                match by_hour.get(hour) {
                    Some(count) => out.push_str(&format!("{:>4}", count)),
                    None => out.push_str(&format!("{:>4}", "-")),
                }
            }
            let msbs = self.project_msbs.get(project).copied().unwrap_or(0);
            let instruments = self
                .project_instruments
                .get(project)
                .map(|m| {
                    m.iter()
                        .map(|(inst, n)| format!("{}:{}", inst, n))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            out.push_str(&format!("  {:>4}  {}\n", msbs, instruments));
        }
        out
    }
}
