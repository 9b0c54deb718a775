//! Night (or multi-night) observing report.
//!
//! Pulls time accounting, faults, shift comments and MSB activity for a
//! telescope and UT date range, then renders them as text or HTML. Every
//! repository call is awaited in turn.

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::render;
use crate::algorithms::{
    account_observations, merge_period_faults, QueueClassification, TimeAcctGroup, TimeAcctSummary,
};
use crate::config::TelescopeSettings;
use crate::db::repository::FullRepository;
use crate::db::services;
use crate::error::OmpResult;
use crate::models::{
    AccountCategory, Fault, FaultCategory, MsbDone, MsbStatus, ProjectId, ShiftComment, Telescope,
    TimeAccount,
};
use crate::time::UtRange;

/// Stored accounting for one project over the report period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAccounting {
    pub pending: u64,
    pub confirmed: u64,
    pub total: u64,
}

/// Stored accounts and header-derived totals side by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightAccounting {
    pub stored: BTreeMap<ProjectId, ProjectAccounting>,
    pub headers: BTreeMap<ProjectId, u64>,
    pub warnings: Vec<String>,
}

impl NightAccounting {
    /// Every project seen by either source.
    pub fn projects(&self) -> BTreeSet<&ProjectId> {
        self.stored.keys().chain(self.headers.keys()).collect()
    }
}

/// MSB activity for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMsbActivity {
    /// Number of entries with status `done`
    pub observed: usize,
    pub activity: Vec<MsbDone>,
}

/// Everything a night report shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightReportData {
    pub telescope: Telescope,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: TimeAcctSummary,
    pub daily: BTreeMap<NaiveDate, TimeAcctSummary>,
    pub project_totals: BTreeMap<ProjectId, u64>,
    pub accounting: NightAccounting,
    pub faults: Vec<Fault>,
    pub comments: Vec<ShiftComment>,
    pub msbs: BTreeMap<ProjectId, ProjectMsbActivity>,
}

impl NightReportData {
    pub fn fault_loss_seconds(&self) -> u64 {
        self.faults.iter().map(Fault::time_lost_seconds).sum()
    }

    pub fn as_text(&self) -> String {
        render::night_report_text(self)
    }

    /// HTML fragment; user-supplied text is escaped.
    pub fn as_html(&self) -> String {
        render::night_report_html(self)
    }
}

/// Report for a telescope over `delta_days` UT days starting at a date.
pub struct NightReport<'a, R: FullRepository + ?Sized> {
    repo: &'a R,
    telescope: Telescope,
    range: UtRange,
    settings: &'a TelescopeSettings,
}

impl<'a, R: FullRepository + ?Sized> NightReport<'a, R> {
    pub fn new(
        repo: &'a R,
        telescope: Telescope,
        date: NaiveDate,
        delta_days: u32,
        settings: &'a TelescopeSettings,
    ) -> Self {
        Self {
            repo,
            telescope,
            range: UtRange::new(date, delta_days),
            settings,
        }
    }

    pub fn telescope(&self) -> Telescope {
        self.telescope
    }

    pub fn range(&self) -> &UtRange {
        &self.range
    }

    /// Stored accounting per project plus totals derived from the raw data
    /// headers.
    ///
    /// A failing accounting store is an error; a failing header archive only
    /// adds a warning.
    pub async fn accounting(&self) -> OmpResult<NightAccounting> {
        let accounts = services::time_accounts(self.repo, self.telescope, &self.range).await?;
        Ok(self.accounting_from(&accounts).await)
    }

    async fn accounting_from(&self, accounts: &[TimeAccount]) -> NightAccounting {
        let mut result = NightAccounting::default();
        for account in accounts {
            let entry = result.stored.entry(account.project_id.clone()).or_default();
            if account.confirmed {
                entry.confirmed += account.seconds;
            } else {
                entry.pending += account.seconds;
            }
            entry.total += account.seconds;
        }

        match services::observations(self.repo, self.telescope, &self.range).await {
            Ok(observations) => {
                let headers = account_observations(self.telescope, &observations);
                result.headers = headers.projects;
                result.warnings.extend(headers.warnings);
            }
            Err(e) => {
                warn!("Header scan for {} failed: {}", self.telescope, e);
                result
                    .warnings
                    .push(format!("Unable to scan data headers: {}", e));
            }
        }

        result
    }

    /// Faults filed or occurring in the period, each listed once.
    pub async fn faults_for_period(&self) -> OmpResult<Vec<Fault>> {
        let category = FaultCategory::for_telescope(self.telescope);
        let filed = services::faults_filed(self.repo, category, &self.range).await?;
        let occurred = services::faults_occurred(self.repo, category, &self.range).await?;
        Ok(merge_period_faults(filed, occurred))
    }

    pub async fn shift_comments(&self) -> OmpResult<Vec<ShiftComment>> {
        Ok(services::shift_comments(self.repo, self.telescope, &self.range).await?)
    }

    /// MSB activity grouped by project.
    pub async fn observed_msbs(&self) -> OmpResult<BTreeMap<ProjectId, ProjectMsbActivity>> {
        let activity = services::msb_activity(self.repo, self.telescope, &self.range).await?;
        let mut by_project: BTreeMap<ProjectId, ProjectMsbActivity> = BTreeMap::new();
        for entry in activity {
            let project = by_project.entry(entry.project_id.clone()).or_default();
            if entry.status == MsbStatus::Done {
                project.observed += 1;
            }
            project.activity.push(entry);
        }
        Ok(by_project)
    }

    /// Stored accounts as a [`TimeAcctGroup`], with E&C projects looked up in
    /// the project store.
    ///
    /// Dates without a stored `__FAULT__` account are charged the time lost
    /// to `faults` that occurred on them.
    pub async fn time_acct_group(&self, faults: &[Fault]) -> OmpResult<TimeAcctGroup> {
        let accounts = services::time_accounts(self.repo, self.telescope, &self.range).await?;
        self.group_from(accounts, faults).await
    }

    async fn group_from(&self, mut accounts: Vec<TimeAccount>, faults: &[Fault]) -> OmpResult<TimeAcctGroup> {

        let candidates: BTreeSet<ProjectId> = accounts
            .iter()
            .filter(|a| a.category(Some(self.telescope)) == AccountCategory::Project)
            .map(|a| a.project_id.clone())
            .collect();

        let mut ec_projects = Vec::new();
        for project_id in candidates {
            match services::find_project(self.repo, &project_id).await? {
                Some(project) if project.in_queue(&self.settings.ec_queue) => ec_projects.push(project_id),
                Some(_) => {}
                None => warn!("Project {} has time charged but is not in the database", project_id),
            }
        }

        accounts.extend(fault_accounts(&self.range, &accounts, faults));

        let classification = Arc::new(QueueClassification::with_ec_projects(ec_projects));
        Ok(TimeAcctGroup::from_accounts(
            Some(self.telescope),
            accounts,
            classification,
        )?)
    }

    /// Collect everything the report shows.
    pub async fn assemble(&self) -> OmpResult<NightReportData> {
        info!(
            "Assembling {} night report for {}..={}",
            self.telescope,
            self.range.start,
            self.range.end()
        );

        let accounts = services::time_accounts(self.repo, self.telescope, &self.range).await?;
        let faults = self.faults_for_period().await?;
        let accounting = self.accounting_from(&accounts).await;
        let group = self.group_from(accounts, &faults).await?;
        let comments = self.shift_comments().await?;
        let msbs = self.observed_msbs().await?;

        let daily = group
            .group_by_ut_date()
            .into_iter()
            .map(|(date, g)| (date, g.summary()))
            .collect();

        Ok(NightReportData {
            telescope: self.telescope,
            start: self.range.start,
            end: self.range.end(),
            summary: group.summary(),
            daily,
            project_totals: group.project_totals(),
            accounting,
            faults,
            comments,
            msbs,
        })
    }
}

/// `__FAULT__` accounts for dates in `range` that have fault losses but no
/// stored fault account.
fn fault_accounts(range: &UtRange, stored: &[TimeAccount], faults: &[Fault]) -> Vec<TimeAccount> {
    let already: BTreeSet<NaiveDate> = stored
        .iter()
        .filter(|a| a.category(None) == AccountCategory::Fault)
        .filter_map(|a| a.date)
        .collect();

    let mut per_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for fault in faults {
        let date = fault.occurred().date_naive();
        if range.contains_date(&date) && !already.contains(&date) {
            *per_date.entry(date).or_insert(0) += fault.time_lost_seconds();
        }
    }

    per_date
        .into_iter()
        .filter(|(_, seconds)| *seconds > 0)
        .map(|(date, seconds)| TimeAccount {
            project_id: ProjectId::new(crate::models::FAULT_PROJECT),
            date: Some(date),
            seconds,
            confirmed: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FaultStatus;
    use chrono::{TimeZone, Utc};

    fn fault(id: &str, day: u32, hours: f64) -> Fault {
        Fault {
            fault_id: id.to_string(),
            category: FaultCategory::Jcmt,
            subject: "Fault".to_string(),
            system: "Telescope".to_string(),
            fault_type: "Software".to_string(),
            status: FaultStatus::Open,
            urgent: false,
            time_lost: qtty::Hours::new(hours),
            filed: Utc.with_ymd_and_hms(2002, 12, day, 8, 0, 0).unwrap(),
            fault_date: None,
            projects: vec![],
            responses: vec![],
        }
    }

    #[test]
    fn test_fault_accounts_skip_dates_with_stored_fault_time() {
        let d10 = NaiveDate::from_ymd_opt(2002, 12, 10).unwrap();
        let d11 = NaiveDate::from_ymd_opt(2002, 12, 11).unwrap();
        let range = UtRange::new(d10, 2);
        let stored = vec![TimeAccount::new("__FAULT__", d10, 600, true)];
        let faults = vec![
            fault("20021210.001", 10, 1.0),
            fault("20021211.001", 11, 0.5),
            fault("20021211.002", 11, 0.25),
        ];

        let synthesized = fault_accounts(&range, &stored, &faults);
        assert_eq!(synthesized.len(), 1);
        assert_eq!(synthesized[0].date, Some(d11));
        assert_eq!(synthesized[0].seconds, 2700);
        assert!(!synthesized[0].confirmed);
    }
}
