//! MSB queue and activity log.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{MsbDone, MsbQuery, MsbQueryResult, SchedulableMsb, Telescope};
use crate::time::UtRange;

/// Repository trait for MSBs.
///
/// Covers both the scheduler view of the queue and the log of what happened
/// to MSBs at the telescope.
#[async_trait]
pub trait MsbRepository: Send + Sync {
    /// MSB activity recorded during `range`, in time order.
    async fn fetch_msb_activity(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<MsbDone>>;

    /// Append an entry to the activity log.
    async fn record_msb_activity(&self, entry: &MsbDone) -> RepositoryResult<()>;

    /// Look up a queued MSB by checksum. An unknown checksum is `Ok(None)`.
    async fn find_msb(&self, checksum: &str) -> RepositoryResult<Option<SchedulableMsb>>;

    /// MSBs the scheduler would offer for `query`.
    ///
    /// Country and semester restrictions are matched against the owning
    /// project; MSBs whose project is unknown never match them.
    async fn query_msbs(&self, query: &MsbQuery) -> RepositoryResult<Vec<MsbQueryResult>>;

    /// Insert or replace a queued MSB, keyed on its checksum.
    async fn store_msb(&self, msb: &SchedulableMsb) -> RepositoryResult<()>;
}
