use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Project, ProjectId, Telescope};

/// Repository trait for project details.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Look up a project. An unknown project is `Ok(None)`.
    async fn find_project(&self, project_id: &ProjectId) -> RepositoryResult<Option<Project>>;

    /// Projects on a telescope, optionally restricted to one semester label (e.g. `03B`).
    async fn list_projects(
        &self,
        telescope: Telescope,
        semester: Option<&str>,
    ) -> RepositoryResult<Vec<Project>>;

    /// Insert or replace a project.
    async fn store_project(&self, project: &Project) -> RepositoryResult<()>;
}
