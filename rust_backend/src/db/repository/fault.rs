use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Fault, FaultCategory};
use crate::time::UtRange;

/// Repository trait for the fault database.
#[async_trait]
pub trait FaultRepository: Send + Sync {
    /// Faults in `category` filed on a UT date within `range`.
    async fn fetch_faults_filed(
        &self,
        category: FaultCategory,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Fault>>;

    /// Faults in `category` whose occurrence date lies within `range`.
    /// Faults without an occurrence date are never returned.
    async fn fetch_faults_occurred(
        &self,
        category: FaultCategory,
        range: &UtRange,
    ) -> RepositoryResult<Vec<Fault>>;

    /// Fetch a fault by ID (`YYYYMMDD.NNN`). An unknown ID is `Ok(None)`.
    async fn get_fault(&self, fault_id: &str) -> RepositoryResult<Option<Fault>>;

    /// Insert or replace a fault.
    async fn store_fault(&self, fault: &Fault) -> RepositoryResult<()>;
}
