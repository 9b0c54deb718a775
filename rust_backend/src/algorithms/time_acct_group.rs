use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::models::{AccountCategory, Project, ProjectId, Telescope, TimeAccount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountingError {
    #[error("Invalid time account for {project_id}: {reason}")]
    InvalidRecord { project_id: String, reason: String },
}

/// Which projects belong to the Engineering & Calibration queue.
///
/// Projects missing from the classification are treated as science.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueClassification {
    ec_projects: HashSet<ProjectId>,
}

impl QueueClassification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify using each project's queue, with `ec_queue` naming the E&C queue.
    pub fn from_projects<'a>(projects: impl IntoIterator<Item = &'a Project>, ec_queue: &str) -> Self {
        Self {
            ec_projects: projects
                .into_iter()
                .filter(|p| p.in_queue(ec_queue))
                .map(|p| p.project_id.clone())
                .collect(),
        }
    }

    pub fn with_ec_projects(ids: impl IntoIterator<Item = ProjectId>) -> Self {
        Self {
            ec_projects: ids.into_iter().collect(),
        }
    }

    pub fn is_ec(&self, project_id: &ProjectId) -> bool {
        self.ec_projects.contains(project_id)
    }

    pub fn len(&self) -> usize {
        self.ec_projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ec_projects.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Totals {
    total: OnceCell<u64>,
    weather: OnceCell<u64>,
    calibration: OnceCell<u64>,
    other: OnceCell<u64>,
    extended: OnceCell<u64>,
    shutdown: OnceCell<u64>,
    fault: OnceCell<u64>,
    science: OnceCell<u64>,
    ec: OnceCell<u64>,
    confirmed: OnceCell<u64>,
}

/// Aggregation over a set of time accounts.
///
/// Every total is computed on first access and cached until the accounts are
/// replaced with [`TimeAcctGroup::set_accounts`].
#[derive(Debug, Clone)]
pub struct TimeAcctGroup {
    telescope: Option<Telescope>,
    accounts: Vec<TimeAccount>,
    classification: Arc<QueueClassification>,
    totals: Totals,
}

impl TimeAcctGroup {
    /// Empty group. With a telescope only that telescope's sentinel projects are
    /// recognised.
    pub fn new(telescope: Option<Telescope>) -> Self {
        Self {
            telescope,
            accounts: Vec::new(),
            classification: Arc::new(QueueClassification::default()),
            totals: Totals::default(),
        }
    }

    pub fn with_classification(mut self, classification: Arc<QueueClassification>) -> Self {
        self.classification = classification;
        self.totals = Totals::default();
        self
    }

    pub fn from_accounts(
        telescope: Option<Telescope>,
        accounts: Vec<TimeAccount>,
        classification: Arc<QueueClassification>,
    ) -> Result<Self, AccountingError> {
        let mut group = Self::new(telescope).with_classification(classification);
        group.set_accounts(accounts)?;
        Ok(group)
    }

    /// Replace the accounts.
    ///
    /// Every record must carry a UT date. Records are kept in date order and
    /// all cached totals are discarded. On error the group is left untouched.
    pub fn set_accounts(&mut self, mut accounts: Vec<TimeAccount>) -> Result<(), AccountingError> {
        if let Some(bad) = accounts.iter().find(|a| a.date.is_none()) {
            return Err(AccountingError::InvalidRecord {
                project_id: bad.project_id.to_string(),
                reason: "time account has no UT date".to_string(),
            });
        }
        accounts.sort_by_key(|a| a.date);
        self.accounts = accounts;
        self.totals = Totals::default();
        Ok(())
    }

    pub fn accounts(&self) -> &[TimeAccount] {
        &self.accounts
    }

    pub fn telescope(&self) -> Option<Telescope> {
        self.telescope
    }

    pub fn classification(&self) -> &Arc<QueueClassification> {
        &self.classification
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn sum_where(&self, predicate: impl Fn(&TimeAccount) -> bool) -> u64 {
        self.accounts
            .iter()
            .filter(|a| predicate(a))
            .map(|a| a.seconds)
            .sum()
    }

    fn category_time(&self, cell: &OnceCell<u64>, category: AccountCategory) -> u64 {
        *cell.get_or_init(|| self.sum_where(|a| a.category(self.telescope) == category))
    }

    pub fn total_time(&self) -> u64 {
        *self.totals.total.get_or_init(|| self.sum_where(|_| true))
    }

    pub fn weather_loss(&self) -> u64 {
        self.category_time(&self.totals.weather, AccountCategory::Weather)
    }

    pub fn cal_time(&self) -> u64 {
        self.category_time(&self.totals.calibration, AccountCategory::Calibration)
    }

    pub fn other_time(&self) -> u64 {
        self.category_time(&self.totals.other, AccountCategory::Other)
    }

    pub fn extended_time(&self) -> u64 {
        self.category_time(&self.totals.extended, AccountCategory::Extended)
    }

    pub fn shutdown_time(&self) -> u64 {
        self.category_time(&self.totals.shutdown, AccountCategory::Shutdown)
    }

    pub fn fault_loss(&self) -> u64 {
        self.category_time(&self.totals.fault, AccountCategory::Fault)
    }

    /// Time charged to ordinary projects outside the E&C queue.
    pub fn science_time(&self) -> u64 {
        *self.totals.science.get_or_init(|| {
            self.sum_where(|a| {
                a.category(self.telescope) == AccountCategory::Project
                    && !self.classification.is_ec(&a.project_id)
            })
        })
    }

    /// Time charged to E&C projects.
    pub fn ec_time(&self) -> u64 {
        *self.totals.ec.get_or_init(|| {
            self.sum_where(|a| {
                a.category(self.telescope) == AccountCategory::Project
                    && self.classification.is_ec(&a.project_id)
            })
        })
    }

    pub fn confirmed_time(&self) -> u64 {
        *self.totals.confirmed.get_or_init(|| self.sum_where(|a| a.confirmed))
    }

    pub fn pending_time(&self) -> u64 {
        self.total_time() - self.confirmed_time()
    }

    /// Total less weather and other losses.
    pub fn observed_time(&self) -> u64 {
        self.total_time()
            .saturating_sub(self.weather_loss())
            .saturating_sub(self.other_time())
    }

    /// Total less extended time and weather.
    pub fn clear_time(&self) -> u64 {
        self.total_time()
            .saturating_sub(self.extended_time())
            .saturating_sub(self.weather_loss())
    }

    /// Split into one group per UT date, sharing telescope and classification.
    pub fn group_by_ut_date(&self) -> BTreeMap<NaiveDate, TimeAcctGroup> {
        let mut by_date: BTreeMap<NaiveDate, Vec<TimeAccount>> = BTreeMap::new();
        for account in &self.accounts {
            if let Some(date) = account.date {
                by_date.entry(date).or_default().push(account.clone());
            }
        }

        by_date
            .into_iter()
            .map(|(date, accounts)| {
                let group = TimeAcctGroup {
                    telescope: self.telescope,
                    accounts,
                    classification: Arc::clone(&self.classification),
                    totals: Totals::default(),
                };
                (date, group)
            })
            .collect()
    }

    /// Seconds per project across the whole group.
    pub fn project_totals(&self) -> BTreeMap<ProjectId, u64> {
        let mut totals = BTreeMap::new();
        for account in &self.accounts {
            *totals.entry(account.project_id.clone()).or_insert(0) += account.seconds;
        }
        totals
    }

    pub fn summary(&self) -> TimeAcctSummary {
        TimeAcctSummary {
            telescope: self.telescope,
            accounts: self.accounts.len(),
            total: self.total_time(),
            weather: self.weather_loss(),
            calibration: self.cal_time(),
            other: self.other_time(),
            extended: self.extended_time(),
            shutdown: self.shutdown_time(),
            fault: self.fault_loss(),
            science: self.science_time(),
            ec: self.ec_time(),
            observed: self.observed_time(),
            clear: self.clear_time(),
            confirmed: self.confirmed_time(),
            pending: self.pending_time(),
        }
    }

    /// Whether a total is currently cached. Used to check invalidation.
    #[cfg(test)]
    pub(crate) fn has_cached_totals(&self) -> bool {
        let t = &self.totals;
        [
            &t.total,
            &t.weather,
            &t.calibration,
            &t.other,
            &t.extended,
            &t.shutdown,
            &t.fault,
            &t.science,
            &t.ec,
            &t.confirmed,
        ]
        .iter()
        .any(|cell| cell.get().is_some())
    }
}

/// Every named total of a [`TimeAcctGroup`], in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeAcctSummary {
    pub telescope: Option<Telescope>,
    pub accounts: usize,
    pub total: u64,
    pub weather: u64,
    pub calibration: u64,
    pub other: u64,
    pub extended: u64,
    pub shutdown: u64,
    pub fault: u64,
    pub science: u64,
    pub ec: u64,
    pub observed: u64,
    pub clear: u64,
    pub confirmed: u64,
    pub pending: u64,
}
