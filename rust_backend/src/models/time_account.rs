//! Time account records.
//!
//! A time account records how many seconds a project (or one of the special
//! sentinel "projects" used for weather, calibrations, faults, ...) was charged
//! on a given UT date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::telescope::Telescope;

/// Pseudo project used to record time lost to faults.
pub const FAULT_PROJECT: &str = "__FAULT__";

/// Case-insensitive project identifier, normalised to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: &str) -> Self {
        Self(id.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        ProjectId::new(s)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        ProjectId::new(&s)
    }
}

impl From<ProjectId> for String {
    fn from(id: ProjectId) -> Self {
        id.0
    }
}

/// Accounting category a project ID falls into.
///
/// Everything except [`AccountCategory::Project`] is a sentinel encoding
/// non-project time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Weather,
    Calibration,
    Extended,
    Other,
    Shutdown,
    Fault,
    Project,
}

impl AccountCategory {
    /// Categories encoded as a telescope prefix followed by a fixed suffix.
    pub const TELESCOPE_SENTINELS: [AccountCategory; 5] = [
        AccountCategory::Weather,
        AccountCategory::Calibration,
        AccountCategory::Extended,
        AccountCategory::Other,
        AccountCategory::Shutdown,
    ];

    fn suffix(&self) -> Option<&'static str> {
        match self {
            AccountCategory::Weather => Some("WEATHER"),
            AccountCategory::Calibration => Some("CAL"),
            AccountCategory::Extended => Some("EXTENDED"),
            AccountCategory::Other => Some("OTHER"),
            AccountCategory::Shutdown => Some("_SHUTDOWN"),
            AccountCategory::Fault | AccountCategory::Project => None,
        }
    }

    /// Classify a project ID.
    ///
    /// With `telescope` set only that telescope's sentinels match, e.g.
    /// `UKIRTWEATHER` is an ordinary project for a JCMT-only classification.
    /// Without a telescope any known prefix matches.
    pub fn classify(project_id: &ProjectId, telescope: Option<Telescope>) -> AccountCategory {
        let id = project_id.as_str();
        if id == FAULT_PROJECT {
            return AccountCategory::Fault;
        }

        let single;
        let telescopes: &[Telescope] = match telescope {
            Some(tel) => {
                single = [tel];
                &single
            }
            None => &Telescope::ALL,
        };

        for tel in telescopes {
            if let Some(rest) = id.strip_prefix(tel.as_str()) {
                for category in Self::TELESCOPE_SENTINELS {
                    if category.suffix() == Some(rest) {
                        return category;
                    }
                }
            }
        }

        AccountCategory::Project
    }

    /// Sentinel project ID for this category on `telescope`.
    ///
    /// Returns `None` for ordinary projects.
    pub fn sentinel_for(&self, telescope: Telescope) -> Option<ProjectId> {
        match self {
            AccountCategory::Fault => Some(ProjectId::new(FAULT_PROJECT)),
            AccountCategory::Project => None,
            other => other
                .suffix()
                .map(|suffix| ProjectId::new(&format!("{}{}", telescope.as_str(), suffix))),
        }
    }

    pub fn is_special(&self) -> bool {
        !matches!(self, AccountCategory::Project)
    }
}

/// Time charged to a project on a UT date.
///
/// `date` is optional because raw rows can arrive without one; such rows are
/// rejected when handed to [`crate::algorithms::TimeAcctGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAccount {
    pub project_id: ProjectId,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub seconds: u64,
    #[serde(default)]
    pub confirmed: bool,
}

impl TimeAccount {
    pub fn new(project_id: impl Into<ProjectId>, date: NaiveDate, seconds: u64, confirmed: bool) -> Self {
        Self {
            project_id: project_id.into(),
            date: Some(date),
            seconds,
            confirmed,
        }
    }

    /// Storage key; at most one record per key is authoritative.
    pub fn key(&self) -> Option<(NaiveDate, ProjectId)> {
        self.date.map(|date| (date, self.project_id.clone()))
    }

    pub fn category(&self, telescope: Option<Telescope>) -> AccountCategory {
        AccountCategory::classify(&self.project_id, telescope)
    }

    pub fn hours(&self) -> qtty::Hours {
        qtty::Seconds::new(self.seconds as f64).to()
    }
}
