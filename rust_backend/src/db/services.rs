//! Repository-agnostic database operations.
//!
//! Thin, logged wrappers over the repository traits. Report and accounting
//! code goes through these rather than calling repositories directly, so
//! every storage access shows up in the log the same way regardless of the
//! backend.
//!
//! # Usage
//!
//! ```no_run
//! use omp_rust::db::{services, repositories::LocalRepository};
//! use omp_rust::models::Telescope;
//! use omp_rust::time::UtRange;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let night = UtRange::single(chrono::NaiveDate::from_ymd_opt(2002, 12, 10).unwrap());
//!     let accounts = services::time_accounts(&repo, Telescope::Jcmt, &night).await?;
//!     println!("Found {} accounts", accounts.len());
//!     Ok(())
//! }
//! ```

use log::{debug, info};

use super::repository::{FullRepository, RepositoryResult};
use crate::models::{
    Fault, FaultCategory, MsbDone, MsbQuery, MsbQueryResult, Observation, Project, ProjectId,
    SchedulableMsb, ShiftComment, Telescope, TimeAccount,
};
use crate::time::UtRange;

// ==================== Health ====================

pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Accounting ====================

pub async fn time_accounts<R: FullRepository + ?Sized>(
    repo: &R,
    telescope: Telescope,
    range: &UtRange,
) -> RepositoryResult<Vec<TimeAccount>> {
    info!(
        "Service layer: fetching {} time accounts {}..={}",
        telescope,
        range.start,
        range.end()
    );
    repo.fetch_time_accounts(telescope, range).await
}

pub async fn project_time_accounts<R: FullRepository + ?Sized>(
    repo: &R,
    project_id: &ProjectId,
) -> RepositoryResult<Vec<TimeAccount>> {
    info!("Service layer: fetching time accounts for {}", project_id);
    repo.fetch_project_accounts(project_id).await
}

/// Store accounts, replacing earlier records for the same (date, project).
pub async fn store_time_accounts<R: FullRepository + ?Sized>(
    repo: &R,
    telescope: Telescope,
    accounts: &[TimeAccount],
) -> RepositoryResult<usize> {
    info!(
        "Service layer: storing {} {} time accounts",
        accounts.len(),
        telescope
    );
    let stored = repo.store_time_accounts(telescope, accounts).await?;
    debug!("Service layer: stored {} accounts", stored);
    Ok(stored)
}

// ==================== Projects ====================

pub async fn find_project<R: FullRepository + ?Sized>(
    repo: &R,
    project_id: &ProjectId,
) -> RepositoryResult<Option<Project>> {
    debug!("Service layer: looking up project {}", project_id);
    repo.find_project(project_id).await
}

pub async fn list_projects<R: FullRepository + ?Sized>(
    repo: &R,
    telescope: Telescope,
    semester: Option<&str>,
) -> RepositoryResult<Vec<Project>> {
    info!(
        "Service layer: listing {} projects (semester {})",
        telescope,
        semester.unwrap_or("any")
    );
    repo.list_projects(telescope, semester).await
}

pub async fn store_project<R: FullRepository + ?Sized>(repo: &R, project: &Project) -> RepositoryResult<()> {
    info!("Service layer: storing project {}", project.project_id);
    repo.store_project(project).await
}

// ==================== Faults ====================

pub async fn faults_filed<R: FullRepository + ?Sized>(
    repo: &R,
    category: FaultCategory,
    range: &UtRange,
) -> RepositoryResult<Vec<Fault>> {
    info!(
        "Service layer: fetching {} faults filed {}..={}",
        category,
        range.start,
        range.end()
    );
    repo.fetch_faults_filed(category, range).await
}

pub async fn faults_occurred<R: FullRepository + ?Sized>(
    repo: &R,
    category: FaultCategory,
    range: &UtRange,
) -> RepositoryResult<Vec<Fault>> {
    info!(
        "Service layer: fetching {} faults occurring {}..={}",
        category,
        range.start,
        range.end()
    );
    repo.fetch_faults_occurred(category, range).await
}

pub async fn get_fault<R: FullRepository + ?Sized>(repo: &R, fault_id: &str) -> RepositoryResult<Option<Fault>> {
    debug!("Service layer: loading fault {}", fault_id);
    repo.get_fault(fault_id).await
}

pub async fn store_fault<R: FullRepository + ?Sized>(repo: &R, fault: &Fault) -> RepositoryResult<()> {
    info!("Service layer: storing fault {}", fault.fault_id);
    repo.store_fault(fault).await
}

// ==================== Shift log ====================

pub async fn shift_comments<R: FullRepository + ?Sized>(
    repo: &R,
    telescope: Telescope,
    range: &UtRange,
) -> RepositoryResult<Vec<ShiftComment>> {
    info!("Service layer: fetching {} shift comments from {}", telescope, range.start);
    repo.fetch_shift_comments(telescope, range).await
}

pub async fn add_shift_comment<R: FullRepository + ?Sized>(
    repo: &R,
    comment: &ShiftComment,
) -> RepositoryResult<()> {
    info!("Service layer: adding shift comment by {}", comment.author);
    repo.add_shift_comment(comment).await
}

// ==================== MSBs ====================

pub async fn msb_activity<R: FullRepository + ?Sized>(
    repo: &R,
    telescope: Telescope,
    range: &UtRange,
) -> RepositoryResult<Vec<MsbDone>> {
    info!("Service layer: fetching {} MSB activity from {}", telescope, range.start);
    repo.fetch_msb_activity(telescope, range).await
}

pub async fn find_msb<R: FullRepository + ?Sized>(
    repo: &R,
    checksum: &str,
) -> RepositoryResult<Option<SchedulableMsb>> {
    debug!("Service layer: looking up MSB {}", checksum);
    repo.find_msb(checksum).await
}

pub async fn query_msbs<R: FullRepository + ?Sized>(
    repo: &R,
    query: &MsbQuery,
) -> RepositoryResult<Vec<MsbQueryResult>> {
    debug!("Service layer: MSB query {:?}", query);
    repo.query_msbs(query).await
}

pub async fn record_msb_activity<R: FullRepository + ?Sized>(
    repo: &R,
    entry: &MsbDone,
) -> RepositoryResult<()> {
    info!(
        "Service layer: recording MSB {} as {} for {}",
        entry.checksum, entry.status, entry.project_id
    );
    repo.record_msb_activity(entry).await
}

pub async fn store_msb<R: FullRepository + ?Sized>(repo: &R, msb: &SchedulableMsb) -> RepositoryResult<()> {
    info!("Service layer: storing MSB {} ({})", msb.checksum, msb.project_id);
    repo.store_msb(msb).await
}

// ==================== Archive ====================

pub async fn observations<R: FullRepository + ?Sized>(
    repo: &R,
    telescope: Telescope,
    range: &UtRange,
) -> RepositoryResult<Vec<Observation>> {
    info!("Service layer: scanning {} headers from {}", telescope, range.start);
    repo.fetch_observations(telescope, range).await
}
