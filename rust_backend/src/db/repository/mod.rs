//! Repository trait definitions for the OMP stores.
//!
//! Each store the reporting core talks to gets its own focused trait:
//!
//! - [`accounting`]: time accounts per project and UT date
//! - [`project`]: project details used for classification and authentication
//! - [`fault`]: fault reports
//! - [`shiftlog`]: shift-log comments
//! - [`msb`]: MSB queue and activity log
//! - [`archive`]: raw data headers
//!
//! Functions that need every store take the [`FullRepository`] bound:
//!
//! ```ignore
//! async fn night<R: FullRepository + ?Sized>(repo: &R, range: &UtRange) -> RepositoryResult<()> {
//!     let accounts = repo.fetch_time_accounts(Telescope::Jcmt, range).await?;
//!     let comments = repo.fetch_shift_comments(Telescope::Jcmt, range).await?;
//!     Ok(())
//! }
//! ```

pub mod accounting;
pub mod archive;
pub mod error;
pub mod fault;
pub mod msb;
pub mod project;
pub mod shiftlog;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use accounting::AccountingRepository;
pub use archive::ArchiveRepository;
pub use fault::FaultRepository;
pub use msb::MsbRepository;
pub use project::ProjectRepository;
pub use shiftlog::ShiftLogRepository;

/// Composite trait bound for a complete repository implementation.
pub trait FullRepository:
    AccountingRepository
    + ProjectRepository
    + FaultRepository
    + ShiftLogRepository
    + MsbRepository
    + ArchiveRepository
{
}

impl<T> FullRepository for T where
    T: AccountingRepository
        + ProjectRepository
        + FaultRepository
        + ShiftLogRepository
        + MsbRepository
        + ArchiveRepository
{
}
