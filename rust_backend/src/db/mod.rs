//! Storage for the OMP reporting core.
//!
//! The database module follows a layered architecture:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Reports, queue sweeps, CLI                             │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs) - logged operations        │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/)                        │
//! │  - AccountingRepository, ProjectRepository              │
//! │  - FaultRepository, ShiftLogRepository                  │
//! │  - MsbRepository, ArchiveRepository                     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                 │
//! ┌───▼──────────────┐     ┌──────────▼──────────────┐
//! │ Local Repository │     │ Postgres Repository     │
//! │ (in-memory)      │     │ (Diesel, r2d2)          │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! Repositories are created explicitly through [`RepositoryFactory`] and
//! passed to the code that needs them.

pub mod checksum;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

pub use checksum::calculate_checksum;
pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::{PostgresSettings, RepositorySettings};
pub use repositories::{LocalRepository, LocalSeed};
#[cfg(feature = "postgres-repo")]
pub use repositories::{PostgresConfig, PostgresRepository};
pub use repository::{
    AccountingRepository, ArchiveRepository, FaultRepository, FullRepository, MsbRepository,
    ProjectRepository, RepositoryError, RepositoryResult, ShiftLogRepository,
};
