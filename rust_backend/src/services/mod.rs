//! Report and workflow services.
//!
//! Services sit on top of the logged database operations in
//! [`crate::db::services`] and combine them with the aggregation code in
//! [`crate::algorithms`].

pub mod accounting;
pub mod msb_activity;
pub mod night_report;
pub mod queue_status;
pub mod render;

pub use accounting::{confirm_night, project_accounts};
pub use msb_activity::{record_activity, register_msb, MsbEvent};
pub use night_report::{
    NightAccounting, NightReport, NightReportData, ProjectAccounting, ProjectMsbActivity,
};
pub use queue_status::{query_queue_status, QueueFilters, QueueStatus};
pub use render::{format_hours, html_escape};
