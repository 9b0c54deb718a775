//! Repository factory.
//!
//! Creates repository instances from runtime configuration.

use std::sync::Arc;

use super::repo_config::{PostgresSettings, RepositorySettings};
use super::repositories::{LocalRepository, LocalSeed};
use super::repository::{FullRepository, RepositoryError, RepositoryResult};

/// Repository type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// In-memory store, optionally seeded from JSON
    Local,
    /// PostgreSQL through Diesel (requires the `postgres-repo` feature)
    Postgres,
}

impl std::str::FromStr for RepositoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "memory" => Ok(Self::Local),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Read `REPOSITORY_TYPE`, falling back to `default` when unset or invalid.
    pub fn from_env_or(default: RepositoryType) -> Self {
        std::env::var("REPOSITORY_TYPE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default)
    }
}

/// Repository factory for creating repository instances.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create the repository named by `settings`.
    ///
    /// `seed` populates a local repository and is ignored for Postgres.
    pub async fn create(
        settings: &RepositorySettings,
        postgres: &PostgresSettings,
        seed: Option<LocalSeed>,
    ) -> RepositoryResult<Arc<dyn FullRepository>> {
        let repo_type = RepositoryType::from_env_or(settings.repository_type()?);
        match repo_type {
            RepositoryType::Local => {
                let repo = Self::create_local(seed)?;
                Ok(repo as Arc<dyn FullRepository>)
            }
            RepositoryType::Postgres => Self::create_postgres(postgres).await,
        }
    }

    pub fn create_local(seed: Option<LocalSeed>) -> RepositoryResult<Arc<LocalRepository>> {
        let repo = match seed {
            Some(seed) => LocalRepository::from_seed(seed)?,
            None => LocalRepository::new(),
        };
        Ok(Arc::new(repo))
    }

    #[cfg(feature = "postgres-repo")]
    async fn create_postgres(settings: &PostgresSettings) -> RepositoryResult<Arc<dyn FullRepository>> {
        use super::repositories::{PostgresConfig, PostgresRepository};

        let config = if settings.database_url.is_empty() {
            PostgresConfig::from_env().map_err(RepositoryError::configuration)?
        } else {
            settings.to_postgres_config()?
        };
        // Pool creation and migrations block.
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))??;
        Ok(Arc::new(repo))
    }

    #[cfg(not(feature = "postgres-repo"))]
    async fn create_postgres(_settings: &PostgresSettings) -> RepositoryResult<Arc<dyn FullRepository>> {
        Err(RepositoryError::configuration(
            "Postgres repository requested but the 'postgres-repo' feature is not enabled",
        ))
    }
}
