//! UT date handling and semester arithmetic.

pub mod semester;
pub mod ut;

pub use semester::{determine_semester, semester_boundary, Semester, SemesterHalf};
pub use ut::{parse_ut_date, today_ut, UtRange};
