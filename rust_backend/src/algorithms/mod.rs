//! Accounting algorithms.
//!
//! # Components
//!
//! - [`time_acct_group`]: aggregation engine over time accounts with memoized totals
//! - [`header_accounting`]: time charged per project from raw data headers
//! - [`fault_merge`]: combining filed-in and occurred-in fault queries for a period

pub mod fault_merge;
pub mod header_accounting;
pub mod time_acct_group;


pub use fault_merge::merge_period_faults;
pub use header_accounting::{account_observations, HeaderAccounting};
pub use time_acct_group::{AccountingError, QueueClassification, TimeAcctGroup, TimeAcctSummary};
