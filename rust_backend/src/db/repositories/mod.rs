//! Repository implementations:
//! - `local`: in-memory implementation for tests, demos and JSON snapshots
//! - `postgres`: PostgreSQL implementation with the Diesel ORM

pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::{LocalRepository, LocalSeed, SeedAccount};
#[cfg(feature = "postgres-repo")]
pub use postgres::{PoolStats, PostgresConfig, PostgresRepository};
