//! OMP reporting core: observatory time accounting, night reports and queue
//! status for JCMT and UKIRT.

pub mod algorithms;
pub mod auth;
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time;

pub use error::{OmpError, OmpResult};
