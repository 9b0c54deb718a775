use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use std::str::FromStr;

use super::schema::{
    faults, msb_activity, msbs, observations, projects, shift_comments, time_accounts,
};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    Fault, MsbDone, Observation, Project, ProjectId, SchedulableMsb, ShiftComment, Telescope,
    TimeAccount,
};

fn parse_label<T: FromStr<Err = String>>(value: &str, column: &str) -> RepositoryResult<T> {
    value
        .parse()
        .map_err(|e: String| RepositoryError::internal(format!("Bad value in {}: {}", column, e)))
}

fn to_u64(value: i64, column: &str) -> RepositoryResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::internal(format!("Negative value {} in {}", value, column)))
}

pub(super) fn to_i64(value: u64, column: &str) -> RepositoryResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::validation(format!("Value {} too large for {}", value, column)))
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = time_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TimeAccountRow {
    pub telescope: String,
    pub ut_date: NaiveDate,
    pub project_id: String,
    pub seconds: i64,
    pub confirmed: bool,
}

impl TimeAccountRow {
    pub fn from_account(telescope: Telescope, account: &TimeAccount) -> RepositoryResult<Self> {
        let ut_date = account
            .date
            .ok_or_else(|| RepositoryError::validation(format!("Time account for {} has no UT date", account.project_id)))?;
        Ok(Self {
            telescope: telescope.as_str().to_string(),
            ut_date,
            project_id: account.project_id.to_string(),
            seconds: to_i64(account.seconds, "time_accounts.seconds")?,
            confirmed: account.confirmed,
        })
    }

    pub fn into_account(self) -> RepositoryResult<TimeAccount> {
        Ok(TimeAccount {
            project_id: ProjectId::new(&self.project_id),
            date: Some(self.ut_date),
            seconds: to_u64(self.seconds, "time_accounts.seconds")?,
            confirmed: self.confirmed,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectRow {
    pub project_id: String,
    pub telescope: String,
    pub country: String,
    pub semester: String,
    pub title: String,
    pub pi: String,
    pub contacts: Value,
    pub allocated_seconds: i64,
    pub remaining_seconds: i64,
    pub password_digest: Option<String>,
}

impl ProjectRow {
    pub fn from_project(project: &Project) -> RepositoryResult<Self> {
        Ok(Self {
            project_id: project.project_id.to_string(),
            telescope: project.telescope.as_str().to_string(),
            country: project.country.clone(),
            semester: project.semester.clone(),
            title: project.title.clone(),
            pi: project.pi.clone(),
            contacts: serde_json::to_value(&project.contacts)?,
            allocated_seconds: to_i64(project.allocated_seconds, "projects.allocated_seconds")?,
            remaining_seconds: to_i64(project.remaining_seconds, "projects.remaining_seconds")?,
            password_digest: project.password_digest.clone(),
        })
    }

    pub fn into_project(self) -> RepositoryResult<Project> {
        Ok(Project {
            project_id: ProjectId::new(&self.project_id),
            telescope: parse_label(&self.telescope, "projects.telescope")?,
            country: self.country,
            semester: self.semester,
            title: self.title,
            pi: self.pi,
            contacts: serde_json::from_value(self.contacts)?,
            allocated_seconds: to_u64(self.allocated_seconds, "projects.allocated_seconds")?,
            remaining_seconds: to_u64(self.remaining_seconds, "projects.remaining_seconds")?,
            password_digest: self.password_digest,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = faults)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct FaultRow {
    pub fault_id: String,
    pub category: String,
    pub subject: String,
    pub system: String,
    pub fault_type: String,
    pub status: String,
    pub urgent: bool,
    pub time_lost_hours: f64,
    pub filed: DateTime<Utc>,
    pub fault_date: Option<DateTime<Utc>>,
    pub projects: Value,
    pub responses: Value,
}

impl FaultRow {
    pub fn from_fault(fault: &Fault) -> RepositoryResult<Self> {
        Ok(Self {
            fault_id: fault.fault_id.clone(),
            category: fault.category.as_str().to_string(),
            subject: fault.subject.clone(),
            system: fault.system.clone(),
            fault_type: fault.fault_type.clone(),
            status: fault.status.as_str().to_string(),
            urgent: fault.urgent,
            time_lost_hours: fault.time_lost.value(),
            filed: fault.filed,
            fault_date: fault.fault_date,
            projects: serde_json::to_value(&fault.projects)?,
            responses: serde_json::to_value(&fault.responses)?,
        })
    }

    pub fn into_fault(self) -> RepositoryResult<Fault> {
        Ok(Fault {
            fault_id: self.fault_id,
            category: parse_label(&self.category, "faults.category")?,
            subject: self.subject,
            system: self.system,
            fault_type: self.fault_type,
            status: parse_label(&self.status, "faults.status")?,
            urgent: self.urgent,
            time_lost: qtty::Hours::new(self.time_lost_hours),
            filed: self.filed,
            fault_date: self.fault_date,
            projects: serde_json::from_value(self.projects)?,
            responses: serde_json::from_value(self.responses)?,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = shift_comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // comment_id is only used for ordering in SQL
pub struct ShiftCommentRow {
    pub comment_id: i64,
    pub telescope: String,
    pub author: String,
    pub comment_date: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = shift_comments)]
pub struct NewShiftCommentRow {
    pub telescope: String,
    pub author: String,
    pub comment_date: DateTime<Utc>,
    pub text: String,
}

impl NewShiftCommentRow {
    pub fn from_comment(comment: &ShiftComment) -> Self {
        Self {
            telescope: comment.telescope.as_str().to_string(),
            author: comment.author.clone(),
            comment_date: comment.date,
            text: comment.text.clone(),
        }
    }
}

impl ShiftCommentRow {
    pub fn into_comment(self) -> RepositoryResult<ShiftComment> {
        Ok(ShiftComment {
            telescope: parse_label(&self.telescope, "shift_comments.telescope")?,
            author: self.author,
            date: self.comment_date,
            text: self.text,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = msb_activity)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)]
pub struct MsbActivityRow {
    pub activity_id: i64,
    pub checksum: String,
    pub telescope: String,
    pub project_id: String,
    pub title: String,
    pub instrument: String,
    pub activity_date: DateTime<Utc>,
    pub status: String,
    pub author: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = msb_activity)]
pub struct NewMsbActivityRow {
    pub checksum: String,
    pub telescope: String,
    pub project_id: String,
    pub title: String,
    pub instrument: String,
    pub activity_date: DateTime<Utc>,
    pub status: String,
    pub author: Option<String>,
    pub comment: Option<String>,
}

impl NewMsbActivityRow {
    pub fn from_entry(entry: &MsbDone) -> Self {
        Self {
            checksum: entry.checksum.clone(),
            telescope: entry.telescope.as_str().to_string(),
            project_id: entry.project_id.to_string(),
            title: entry.title.clone(),
            instrument: entry.instrument.clone(),
            activity_date: entry.date,
            status: entry.status.as_str().to_string(),
            author: entry.author.clone(),
            comment: entry.comment.clone(),
        }
    }
}

impl MsbActivityRow {
    pub fn into_entry(self) -> RepositoryResult<MsbDone> {
        Ok(MsbDone {
            checksum: self.checksum,
            telescope: parse_label(&self.telescope, "msb_activity.telescope")?,
            project_id: ProjectId::new(&self.project_id),
            title: self.title,
            instrument: self.instrument,
            date: self.activity_date,
            status: parse_label(&self.status, "msb_activity.status")?,
            author: self.author,
            comment: self.comment,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = msbs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MsbRow {
    pub checksum: String,
    pub msbid: i64,
    pub telescope: String,
    pub project_id: String,
    pub title: String,
    pub instrument: String,
    pub remaining: i32,
    pub time_estimate: i64,
    pub windows: Value,
}

impl MsbRow {
    pub fn from_msb(msb: &SchedulableMsb) -> RepositoryResult<Self> {
        Ok(Self {
            checksum: msb.checksum.clone(),
            msbid: msb.msbid,
            telescope: msb.telescope.as_str().to_string(),
            project_id: msb.project_id.to_string(),
            title: msb.title.clone(),
            instrument: msb.instrument.clone(),
            remaining: i32::try_from(msb.remaining)
                .map_err(|_| RepositoryError::validation("msbs.remaining out of range"))?,
            time_estimate: to_i64(msb.time_estimate, "msbs.time_estimate")?,
            windows: serde_json::to_value(&msb.windows)?,
        })
    }

    pub fn into_msb(self) -> RepositoryResult<SchedulableMsb> {
        Ok(SchedulableMsb {
            msbid: self.msbid,
            checksum: self.checksum,
            telescope: parse_label(&self.telescope, "msbs.telescope")?,
            project_id: ProjectId::new(&self.project_id),
            title: self.title,
            instrument: self.instrument,
            remaining: u32::try_from(self.remaining)
                .map_err(|_| RepositoryError::internal("Negative value in msbs.remaining"))?,
            time_estimate: to_u64(self.time_estimate, "msbs.time_estimate")?,
            windows: serde_json::from_value(self.windows)?,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = observations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ObservationRow {
    pub obsid: String,
    pub telescope: String,
    pub project_id: String,
    pub instrument: String,
    pub obs_start: DateTime<Utc>,
    pub obs_end: Option<DateTime<Utc>>,
    pub msb_checksum: Option<String>,
    pub calibration: bool,
    pub status: String,
}

impl ObservationRow {
    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            obsid: obs.obsid.clone(),
            telescope: obs.telescope.as_str().to_string(),
            project_id: obs.project_id.to_string(),
            instrument: obs.instrument.clone(),
            obs_start: obs.start,
            obs_end: obs.end,
            msb_checksum: obs.msb_checksum.clone(),
            calibration: obs.calibration,
            status: obs.status.as_str().to_string(),
        }
    }

    pub fn into_observation(self) -> RepositoryResult<Observation> {
        Ok(Observation {
            obsid: self.obsid,
            telescope: parse_label(&self.telescope, "observations.telescope")?,
            project_id: ProjectId::new(&self.project_id),
            instrument: self.instrument,
            start: self.obs_start,
            end: self.obs_end,
            msb_checksum: self.msb_checksum,
            calibration: self.calibration,
            status: parse_label(&self.status, "observations.status")?,
        })
    }
}
