//! In-memory local repository implementation.
//!
//! Stores every OMP table in ordered maps behind a single `RwLock`, suitable
//! for unit tests, demos and running reports from a JSON snapshot.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::repository::*;
use crate::models::{
    Fault, FaultCategory, MsbDone, MsbQuery, MsbQueryResult, Observation, Project, ProjectId,
    SchedulableMsb, ShiftComment, Telescope, TimeAccount,
};
use crate::time::UtRange;

/// A time account together with the telescope it was charged on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAccount {
    pub telescope: Telescope,
    #[serde(flatten)]
    pub account: TimeAccount,
}

/// JSON snapshot used to populate a [`LocalRepository`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSeed {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub time_accounts: Vec<SeedAccount>,
    #[serde(default)]
    pub faults: Vec<Fault>,
    #[serde(default)]
    pub shift_comments: Vec<ShiftComment>,
    #[serde(default)]
    pub msb_activity: Vec<MsbDone>,
    #[serde(default)]
    pub msbs: Vec<SchedulableMsb>,
    #[serde(default)]
    pub observations: Vec<Observation>,
}

impl LocalSeed {
    /// Parse a seed document. Errors name the JSON path that failed.
    pub fn from_json_str(content: &str) -> RepositoryResult<Self> {
        let de = &mut serde_json::Deserializer::from_str(content);
        serde_path_to_error::deserialize(de).map_err(|e| {
            RepositoryError::validation_with_context(
                e.inner().to_string(),
                ErrorContext::new("load_seed").with_details(format!("path={}", e.path())),
            )
        })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration_with_context(
                format!("Failed to read seed file: {}", e),
                ErrorContext::new("load_seed").with_entity_id(path.display()),
            )
        })?;
        Self::from_json_str(&content)
    }
}

type AccountKey = (Telescope, NaiveDate, ProjectId);

struct LocalData {
    projects: BTreeMap<ProjectId, Project>,
    accounts: BTreeMap<AccountKey, TimeAccount>,
    faults: BTreeMap<String, Fault>,
    shift_comments: Vec<ShiftComment>,
    msb_activity: Vec<MsbDone>,
    msbs: BTreeMap<String, SchedulableMsb>,
    observations: Vec<Observation>,

    // Simulated failures
    is_healthy: bool,
    archive_available: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            projects: BTreeMap::new(),
            accounts: BTreeMap::new(),
            faults: BTreeMap::new(),
            shift_comments: Vec::new(),
            msb_activity: Vec::new(),
            msbs: BTreeMap::new(),
            observations: Vec::new(),
            is_healthy: true,
            archive_available: true,
        }
    }
}

/// In-memory local repository.
///
/// Cloning shares the underlying data.
///
/// # Example
/// ```
/// use omp_rust::db::repositories::LocalRepository;
/// use omp_rust::db::repository::AccountingRepository;
///
/// let repo = LocalRepository::new();
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// assert!(rt.block_on(repo.health_check()).unwrap());
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
    account_fetches: Arc<AtomicUsize>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository holding everything in `seed`.
    pub fn from_seed(seed: LocalSeed) -> RepositoryResult<Self> {
        let repo = Self::new();
        {
            let mut data = repo.write()?;
            for project in seed.projects {
                data.projects.insert(project.project_id.clone(), project);
            }
            for SeedAccount { telescope, account } in seed.time_accounts {
                let key = account_key(telescope, &account, "load_seed")?;
                data.accounts.insert(key, account);
            }
            for fault in seed.faults {
                data.faults.insert(fault.fault_id.clone(), fault);
            }
            data.shift_comments = seed.shift_comments;
            data.msb_activity = seed.msb_activity;
            for msb in seed.msbs {
                data.msbs.insert(msb.checksum.clone(), msb);
            }
            data.observations = seed.observations;
        }
        Ok(repo)
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.is_healthy = healthy;
    }

    /// Make the raw data archive unreachable while the other stores keep working.
    pub fn set_archive_available(&self, available: bool) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.archive_available = available;
    }

    /// Clear all data, keeping the simulated health flags.
    pub fn clear(&self) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *data = LocalData {
            is_healthy: data.is_healthy,
            archive_available: data.archive_available,
            ..Default::default()
        };
    }

    /// Number of `fetch_time_accounts` calls served so far.
    pub fn account_fetch_count(&self) -> usize {
        self.account_fetches.load(Ordering::Relaxed)
    }

    pub fn account_count(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .accounts
            .len()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, LocalData>> {
        self.data
            .read()
            .map_err(|_| RepositoryError::internal("Local repository lock poisoned"))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, LocalData>> {
        self.data
            .write()
            .map_err(|_| RepositoryError::internal("Local repository lock poisoned"))
    }

    /// Read access, failing when the store is marked unhealthy.
    fn healthy_read(&self, operation: &str) -> RepositoryResult<RwLockReadGuard<'_, LocalData>> {
        let data = self.read()?;
        if !data.is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(data)
    }

    fn healthy_write(&self, operation: &str) -> RepositoryResult<RwLockWriteGuard<'_, LocalData>> {
        let data = self.write()?;
        if !data.is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(data)
    }
}

fn account_key(telescope: Telescope, account: &TimeAccount, operation: &str) -> RepositoryResult<AccountKey> {
    account
        .key()
        .map(|(date, project)| (telescope, date, project))
        .ok_or_else(|| {
            RepositoryError::validation_with_context(
                "Time account has no UT date",
                ErrorContext::new(operation)
                    .with_entity("time_account")
                    .with_entity_id(&account.project_id),
            )
        })
}

#[async_trait]
impl AccountingRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.read()?.is_healthy)
    }

    async fn fetch_time_accounts(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<TimeAccount>> {
        self.account_fetches.fetch_add(1, Ordering::Relaxed);
        let data = self.healthy_read("fetch_time_accounts")?;
        let start = (telescope, range.start, ProjectId::new(""));
        Ok(data
            .accounts
            .range(start..)
            .take_while(|((tel, date, _), _)| *tel == telescope && *date <= range.end())
            .map(|(_, account)| account.clone())
            .collect())
    }

    async fn fetch_project_accounts(&self, project_id: &ProjectId) -> RepositoryResult<Vec<TimeAccount>> {
        let data = self.healthy_read("fetch_project_accounts")?;
        let mut accounts: Vec<TimeAccount> = data
            .accounts
            .values()
            .filter(|a| a.project_id == *project_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.date);
        Ok(accounts)
    }

    async fn store_time_accounts(
        &self,
        telescope: Telescope,
        accounts: &[TimeAccount],
    ) -> RepositoryResult<usize> {
        // Validate everything before touching the map.
        let keyed = accounts
            .iter()
            .map(|a| account_key(telescope, a, "store_time_accounts").map(|k| (k, a.clone())))
            .collect::<RepositoryResult<Vec<_>>>()?;

        let mut data = self.healthy_write("store_time_accounts")?;
        for (key, account) in keyed {
            debug!("storing {}s for {} on {}", account.seconds, key.2, key.1);
            data.accounts.insert(key, account);
        }
        Ok(accounts.len())
    }
}

#[async_trait]
impl ProjectRepository for LocalRepository {
    async fn find_project(&self, project_id: &ProjectId) -> RepositoryResult<Option<Project>> {
        let data = self.healthy_read("find_project")?;
        Ok(data.projects.get(project_id).cloned())
    }

    async fn list_projects(
        &self,
        telescope: Telescope,
        semester: Option<&str>,
    ) -> RepositoryResult<Vec<Project>> {
        let data = self.healthy_read("list_projects")?;
        Ok(data
            .projects
            .values()
            .filter(|p| p.telescope == telescope)
            .filter(|p| semester.map_or(true, |s| p.semester.eq_ignore_ascii_case(s)))
            .cloned()
            .collect())
    }

    async fn store_project(&self, project: &Project) -> RepositoryResult<()> {
        let mut data = self.healthy_write("store_project")?;
        data.projects.insert(project.project_id.clone(), project.clone());
        Ok(())
    }
}

#[async_trait]
impl FaultRepository for LocalRepository {
    async fn fetch_faults_filed(
        &self,
        category: FaultCategory,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Fault>> {
        let data = self.healthy_read("fetch_faults_filed")?;
        Ok(data
            .faults
            .values()
            .filter(|f| f.category == category && range.contains(&f.filed))
            .cloned()
            .collect())
    }

    async fn fetch_faults_occurred(
        &self,
        category: FaultCategory,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Fault>> {
        let data = self.healthy_read("fetch_faults_occurred")?;
        Ok(data
            .faults
            .values()
            .filter(|f| f.category == category)
            .filter(|f| f.fault_date.map_or(false, |d| range.contains(&d)))
            .cloned()
            .collect())
    }

    async fn get_fault(&self, fault_id: &str) -> RepositoryResult<Option<Fault>> {
        let data = self.healthy_read("get_fault")?;
        Ok(data.faults.get(fault_id).cloned())
    }

    async fn store_fault(&self, fault: &Fault) -> RepositoryResult<()> {
        let mut data = self.healthy_write("store_fault")?;
        data.faults.insert(fault.fault_id.clone(), fault.clone());
        Ok(())
    }
}

#[async_trait]
impl ShiftLogRepository for LocalRepository {
    async fn fetch_shift_comments(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<ShiftComment>> {
        let data = self.healthy_read("fetch_shift_comments")?;
        let mut comments: Vec<ShiftComment> = data
            .shift_comments
            .iter()
            .filter(|c| c.telescope == telescope && range.contains(&c.date))
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.date);
        Ok(comments)
    }

    async fn add_shift_comment(&self, comment: &ShiftComment) -> RepositoryResult<()> {
        let mut data = self.healthy_write("add_shift_comment")?;
        data.shift_comments.push(comment.clone());
        Ok(())
    }
}

#[async_trait]
impl MsbRepository for LocalRepository {
    async fn fetch_msb_activity(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<MsbDone>> {
        let data = self.healthy_read("fetch_msb_activity")?;
        let mut entries: Vec<MsbDone> = data
            .msb_activity
            .iter()
            .filter(|m| m.telescope == telescope && range.contains(&m.date))
            .cloned()
            .collect();
        entries.sort_by_key(|m| m.date);
        Ok(entries)
    }

    async fn record_msb_activity(&self, entry: &MsbDone) -> RepositoryResult<()> {
        let mut data = self.healthy_write("record_msb_activity")?;
        data.msb_activity.push(entry.clone());
        Ok(())
    }

    async fn find_msb(&self, checksum: &str) -> RepositoryResult<Option<SchedulableMsb>> {
        let data = self.healthy_read("find_msb")?;
        Ok(data.msbs.get(checksum).cloned())
    }

    async fn query_msbs(&self, query: &MsbQuery) -> RepositoryResult<Vec<MsbQueryResult>> {
        let data = self.healthy_read("query_msbs")?;
        let project_matches = |msb: &SchedulableMsb| -> bool {
            if query.country.is_none() && query.semester.is_none() {
                return true;
            }
            let Some(project) = data.projects.get(&msb.project_id) else {
                return false;
            };
            query.country.as_deref().map_or(true, |c| project.in_queue(c))
                && query
                    .semester
                    .as_deref()
                    .map_or(true, |s| project.semester.eq_ignore_ascii_case(s))
        };

        let mut results: Vec<MsbQueryResult> = data
            .msbs
            .values()
            .filter(|msb| query.admits(msb) && project_matches(msb))
            .map(MsbQueryResult::from)
            .collect();
        results.sort_by_key(|r| r.msbid);
        Ok(results)
    }

    async fn store_msb(&self, msb: &SchedulableMsb) -> RepositoryResult<()> {
        let mut data = self.healthy_write("store_msb")?;
        data.msbs.insert(msb.checksum.clone(), msb.clone());
        Ok(())
    }
}

#[async_trait]
impl ArchiveRepository for LocalRepository {
    async fn fetch_observations(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Observation>> {
        let data = self.read()?;
        if !data.archive_available {
            return Err(RepositoryError::connection_with_context(
                "Header archive unavailable",
                ErrorContext::new("fetch_observations").with_entity("observation"),
            ));
        }
        let mut observations: Vec<Observation> = data
            .observations
            .iter()
            .filter(|o| o.telescope == telescope && range.contains(&o.start))
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.start);
        Ok(observations)
    }

    async fn store_observation(&self, observation: &Observation) -> RepositoryResult<()> {
        let mut data = self.write()?;
        data.observations.push(observation.clone());
        Ok(())
    }
}
