use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{ShiftComment, Telescope};
use crate::time::UtRange;

#[async_trait]
pub trait ShiftLogRepository: Send + Sync {
    /// Comments entered during `range`, in time order.
    async fn fetch_shift_comments(
        &self,
        telescope: Telescope,
        range: &UtRange,
    ) -> RepositoryResult<Vec<ShiftComment>>;

    async fn add_shift_comment(&self, comment: &ShiftComment) -> RepositoryResult<()>;
}
