//! Time accounting store.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{ProjectId, Telescope, TimeAccount};
use crate::time::UtRange;

/// Repository trait for time accounts.
///
/// Accounts are keyed on (telescope, UT date, project). Storing an account
/// for an existing key replaces the earlier record.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AccountingRepository: Send + Sync {
    /// Check that the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Accounts on every UT date of `range`, ordered by date then project.
    async fn fetch_time_accounts(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<TimeAccount>>;

    /// Every account charged to a project, in date order.
    async fn fetch_project_accounts(&self, project_id: &ProjectId) -> RepositoryResult<Vec<TimeAccount>>;

    /// Store accounts, replacing any existing record for the same key.
    ///
    /// Either every account is stored or none is. Accounts without a UT date
    /// are rejected with a validation error.
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of accounts written
    async fn store_time_accounts(
        &self,
        telescope: Telescope,
        accounts: &[TimeAccount],
    ) -> RepositoryResult<usize>;
}
