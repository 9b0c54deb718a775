//! Domain models for observatory time accounting and night reporting.
//!
//! These types mirror the records kept by the accounting, fault, shift-log and
//! MSB stores. They are plain data: storage lives in [`crate::db`] and the
//! aggregation logic in [`crate::algorithms`].

#[macro_use]
mod macros;

pub mod fault;
pub mod msb;
pub mod observation;
pub mod project;
pub mod shiftlog;
pub mod telescope;
pub mod time_account;

pub use fault::*;
pub use msb::*;
pub use observation::*;
pub use project::*;
pub use shiftlog::*;
pub use telescope::*;
pub use time_account::*;
