use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Observation, Telescope};
use crate::time::UtRange;

/// Read access to the raw data header archive.
#[async_trait]
pub trait ArchiveRepository: Send + Sync {
    /// Observations started during `range`, in start order.
    async fn fetch_observations(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Observation>>;

    async fn store_observation(&self, observation: &Observation) -> RepositoryResult<()>;
}
