//! Postgres repository implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::db::repository::{
    AccountingRepository, ArchiveRepository, ErrorContext, FaultRepository, MsbRepository,
    ProjectRepository, RepositoryError, RepositoryResult, ShiftLogRepository,
};
use crate::models::{
    Fault, FaultCategory, MsbDone, MsbQuery, MsbQueryResult, Observation, Project, ProjectId,
    SchedulableMsb, ShiftComment, Telescope, TimeAccount,
};
use crate::time::UtRange;

mod models;
mod schema;

use models::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables (see module docs).
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    pub total_queries: u64,
    pub failed_queries: u64,
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        Ok(())
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    debug!("{}: retry {} after {:?}", operation, attempt, retry_delay);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new(operation)
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e.with_operation(operation));
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl AccountingRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn fetch_time_accounts(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<TimeAccount>> {
        let (start, end) = (range.start, range.end());
        self.with_conn("fetch_time_accounts", move |conn| {
            use schema::time_accounts::dsl;
            let rows: Vec<TimeAccountRow> = dsl::time_accounts
                .filter(dsl::telescope.eq(telescope.as_str()))
                .filter(dsl::ut_date.between(start, end))
                .order((dsl::ut_date.asc(), dsl::project_id.asc()))
                .select(TimeAccountRow::as_select())
                .load(conn)?;
            rows.into_iter().map(TimeAccountRow::into_account).collect()
        })
        .await
    }

    async fn fetch_project_accounts(&self, project_id: &ProjectId) -> RepositoryResult<Vec<TimeAccount>> {
        let project_id = project_id.to_string();
        self.with_conn("fetch_project_accounts", move |conn| {
            use schema::time_accounts::dsl;
            let rows: Vec<TimeAccountRow> = dsl::time_accounts
                .filter(dsl::project_id.eq(&project_id))
                .order(dsl::ut_date.asc())
                .select(TimeAccountRow::as_select())
                .load(conn)?;
            rows.into_iter().map(TimeAccountRow::into_account).collect()
        })
        .await
    }

    async fn store_time_accounts(
        &self,
        telescope: Telescope,
        accounts: &[TimeAccount],
    ) -> RepositoryResult<usize> {
        let rows = accounts
            .iter()
            .map(|a| TimeAccountRow::from_account(telescope, a))
            .collect::<RepositoryResult<Vec<_>>>()?;

        self.with_conn("store_time_accounts", move |conn| {
            use schema::time_accounts::dsl;
            conn.transaction::<_, RepositoryError, _>(|tx| {
                for row in &rows {
                    diesel::delete(
                        dsl::time_accounts
                            .filter(dsl::telescope.eq(&row.telescope))
                            .filter(dsl::ut_date.eq(row.ut_date))
                            .filter(dsl::project_id.eq(&row.project_id)),
                    )
                    .execute(tx)?;
                }
                let inserted = diesel::insert_into(dsl::time_accounts)
                    .values(&rows)
                    .execute(tx)?;
                Ok(inserted)
            })
        })
        .await
    }
}

#[async_trait]
impl ProjectRepository for PostgresRepository {
    async fn find_project(&self, project_id: &ProjectId) -> RepositoryResult<Option<Project>> {
        let project_id = project_id.to_string();
        self.with_conn("find_project", move |conn| {
            use schema::projects::dsl;
            let row: Option<ProjectRow> = dsl::projects
                .find(&project_id)
                .select(ProjectRow::as_select())
                .first(conn)
                .optional()?;
            row.map(ProjectRow::into_project).transpose()
        })
        .await
    }

    async fn list_projects(
        &self,
        telescope: Telescope,
        semester: Option<&str>,
    ) -> RepositoryResult<Vec<Project>> {
        let semester = semester.map(|s| s.to_uppercase());
        self.with_conn("list_projects", move |conn| {
            use schema::projects::dsl;
            let mut query = dsl::projects
                .filter(dsl::telescope.eq(telescope.as_str()))
                .select(ProjectRow::as_select())
                .order(dsl::project_id.asc())
                .into_boxed();
            if let Some(ref sem) = semester {
                query = query.filter(dsl::semester.eq(sem));
            }
            let rows: Vec<ProjectRow> = query.load(conn)?;
            rows.into_iter().map(ProjectRow::into_project).collect()
        })
        .await
    }

    async fn store_project(&self, project: &Project) -> RepositoryResult<()> {
        let row = ProjectRow::from_project(project)?;
        self.with_conn("store_project", move |conn| {
            use schema::projects::dsl;
            diesel::insert_into(dsl::projects)
                .values(&row)
                .on_conflict(dsl::project_id)
                .do_update()
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl FaultRepository for PostgresRepository {
    async fn fetch_faults_filed(
        &self,
        category: FaultCategory,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Fault>> {
        let (start, end) = (range.start_time(), range.end_time());
        self.with_conn("fetch_faults_filed", move |conn| {
            use schema::faults::dsl;
            let rows: Vec<FaultRow> = dsl::faults
                .filter(dsl::category.eq(category.as_str()))
                .filter(dsl::filed.ge(start))
                .filter(dsl::filed.lt(end))
                .order((dsl::filed.asc(), dsl::fault_id.asc()))
                .select(FaultRow::as_select())
                .load(conn)?;
            rows.into_iter().map(FaultRow::into_fault).collect()
        })
        .await
    }

    async fn fetch_faults_occurred(
        &self,
        category: FaultCategory,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Fault>> {
        let (start, end) = (range.start_time(), range.end_time());
        self.with_conn("fetch_faults_occurred", move |conn| {
            use schema::faults::dsl;
            let rows: Vec<FaultRow> = dsl::faults
                .filter(dsl::category.eq(category.as_str()))
                .filter(dsl::fault_date.ge(start))
                .filter(dsl::fault_date.lt(end))
                .order((dsl::filed.asc(), dsl::fault_id.asc()))
                .select(FaultRow::as_select())
                .load(conn)?;
            rows.into_iter().map(FaultRow::into_fault).collect()
        })
        .await
    }

    async fn get_fault(&self, fault_id: &str) -> RepositoryResult<Option<Fault>> {
        let fault_id = fault_id.to_string();
        self.with_conn("get_fault", move |conn| {
            use schema::faults::dsl;
            let row: Option<FaultRow> = dsl::faults
                .find(&fault_id)
                .select(FaultRow::as_select())
                .first(conn)
                .optional()?;
            row.map(FaultRow::into_fault).transpose()
        })
        .await
    }

    async fn store_fault(&self, fault: &Fault) -> RepositoryResult<()> {
        let row = FaultRow::from_fault(fault)?;
        self.with_conn("store_fault", move |conn| {
            use schema::faults::dsl;
            diesel::insert_into(dsl::faults)
                .values(&row)
                .on_conflict(dsl::fault_id)
                .do_update()
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ShiftLogRepository for PostgresRepository {
    async fn fetch_shift_comments(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<ShiftComment>> {
        let (start, end) = (range.start_time(), range.end_time());
        self.with_conn("fetch_shift_comments", move |conn| {
            use schema::shift_comments::dsl;
            let rows: Vec<ShiftCommentRow> = dsl::shift_comments
                .filter(dsl::telescope.eq(telescope.as_str()))
                .filter(dsl::comment_date.ge(start))
                .filter(dsl::comment_date.lt(end))
                .order((dsl::comment_date.asc(), dsl::comment_id.asc()))
                .select(ShiftCommentRow::as_select())
                .load(conn)?;
            rows.into_iter().map(ShiftCommentRow::into_comment).collect()
        })
        .await
    }

    async fn add_shift_comment(&self, comment: &ShiftComment) -> RepositoryResult<()> {
        let row = NewShiftCommentRow::from_comment(comment);
        self.with_conn("add_shift_comment", move |conn| {
            diesel::insert_into(schema::shift_comments::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl MsbRepository for PostgresRepository {
    async fn fetch_msb_activity(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<MsbDone>> {
        let (start, end) = (range.start_time(), range.end_time());
        self.with_conn("fetch_msb_activity", move |conn| {
            use schema::msb_activity::dsl;
            let rows: Vec<MsbActivityRow> = dsl::msb_activity
                .filter(dsl::telescope.eq(telescope.as_str()))
                .filter(dsl::activity_date.ge(start))
                .filter(dsl::activity_date.lt(end))
                .order((dsl::activity_date.asc(), dsl::activity_id.asc()))
                .select(MsbActivityRow::as_select())
                .load(conn)?;
            rows.into_iter().map(MsbActivityRow::into_entry).collect()
        })
        .await
    }

    async fn record_msb_activity(&self, entry: &MsbDone) -> RepositoryResult<()> {
        let row = NewMsbActivityRow::from_entry(entry);
        self.with_conn("record_msb_activity", move |conn| {
            diesel::insert_into(schema::msb_activity::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn find_msb(&self, checksum: &str) -> RepositoryResult<Option<SchedulableMsb>> {
        let checksum = checksum.to_string();
        self.with_conn("find_msb", move |conn| {
            use schema::msbs::dsl;
            let row: Option<MsbRow> = dsl::msbs
                .find(&checksum)
                .select(MsbRow::as_select())
                .first(conn)
                .optional()?;
            row.map(MsbRow::into_msb).transpose()
        })
        .await
    }

    async fn query_msbs(&self, query: &MsbQuery) -> RepositoryResult<Vec<MsbQueryResult>> {
        let query = query.clone();
        self.with_conn("query_msbs", move |conn| {
            use schema::msbs::dsl;
            let mut sql = dsl::msbs
                .filter(dsl::remaining.gt(0))
                .select(MsbRow::as_select())
                .order(dsl::msbid.asc())
                .into_boxed();
            if let Some(tel) = query.telescope {
                sql = sql.filter(dsl::telescope.eq(tel.as_str()));
            }
            let rows: Vec<MsbRow> = sql.load(conn)?;
            let candidates = rows
                .into_iter()
                .map(MsbRow::into_msb)
                .collect::<RepositoryResult<Vec<_>>>()?
                .into_iter()
                .filter(|msb| query.admits(msb))
                .collect::<Vec<_>>();

            if query.country.is_none() && query.semester.is_none() {
                return Ok(candidates.iter().map(MsbQueryResult::from).collect());
            }

            let ids: Vec<String> = candidates.iter().map(|m| m.project_id.to_string()).collect();
            let owners: HashMap<ProjectId, Project> = {
                use schema::projects::dsl as p;
                let rows: Vec<ProjectRow> = p::projects
                    .filter(p::project_id.eq_any(&ids))
                    .select(ProjectRow::as_select())
                    .load(conn)?;
                rows.into_iter()
                    .map(|r| r.into_project().map(|p| (p.project_id.clone(), p)))
                    .collect::<RepositoryResult<_>>()?
            };

            Ok(candidates
                .iter()
                .filter(|msb| match owners.get(&msb.project_id) {
                    Some(project) => {
                        query.country.as_deref().map_or(true, |c| project.in_queue(c))
                            && query
                                .semester
                                .as_deref()
                                .map_or(true, |s| project.semester.eq_ignore_ascii_case(s))
                    }
                    None => false,
                })
                .map(MsbQueryResult::from)
                .collect())
        })
        .await
    }

    async fn store_msb(&self, msb: &SchedulableMsb) -> RepositoryResult<()> {
        let row = MsbRow::from_msb(msb)?;
        self.with_conn("store_msb", move |conn| {
            use schema::msbs::dsl;
            diesel::insert_into(dsl::msbs)
                .values(&row)
                .on_conflict(dsl::checksum)
                .do_update()
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ArchiveRepository for PostgresRepository {
    async fn fetch_observations(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Observation>> {
        let (start, end) = (range.start_time(), range.end_time());
        self.with_conn("fetch_observations", move |conn| {
            use schema::observations::dsl;
            let rows: Vec<ObservationRow> = dsl::observations
                .filter(dsl::telescope.eq(telescope.as_str()))
                .filter(dsl::obs_start.ge(start))
                .filter(dsl::obs_start.lt(end))
                .order(dsl::obs_start.asc())
                .select(ObservationRow::as_select())
                .load(conn)?;
            rows.into_iter().map(ObservationRow::into_observation).collect()
        })
        .await
    }

    async fn store_observation(&self, observation: &Observation) -> RepositoryResult<()> {
        let row = ObservationRow::from_observation(observation);
        self.with_conn("store_observation", move |conn| {
            use schema::observations::dsl;
            diesel::insert_into(dsl::observations)
                .values(&row)
                .on_conflict(dsl::obsid)
                .do_update()
                .set(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}
