//! Confirmation of a night's time accounts and per-project views.

use chrono::NaiveDate;
use log::{info, warn};

use crate::auth::{verify_project_password, verify_staff};
use crate::config::StaffSettings;
use crate::db::repository::FullRepository;
use crate::db::services;
use crate::error::{OmpError, OmpResult};
use crate::models::{AccountCategory, ProjectId, Telescope, TimeAccount};

/// Store staff-confirmed time accounts for one UT night.
///
/// Every account must be dated `night` and name either a sentinel or a
/// project known to the project store. Accounts are stored with their
/// confirmed flag set, replacing any earlier records for the same keys.
pub async fn confirm_night<R: FullRepository + ?Sized>(
    repo: &R,
    staff: &StaffSettings,
    password: Option<&str>,
    telescope: Telescope,
    night: NaiveDate,
    accounts: &[TimeAccount],
) -> OmpResult<usize> {
    verify_staff(staff, password).require("staff")?;

    for account in accounts {
        match account.date {
            Some(date) if date == night => {}
            Some(date) => {
                return Err(OmpError::bad_args(format!(
                    "Account for {} is dated {} but the night being confirmed is {}",
                    account.project_id, date, night
                )))
            }
            None => {
                return Err(OmpError::bad_args(format!(
                    "Account for {} has no UT date",
                    account.project_id
                )))
            }
        }

        if account.category(Some(telescope)) == AccountCategory::Project
            && services::find_project(repo, &account.project_id).await?.is_none()
        {
            return Err(OmpError::UnknownProject(account.project_id.to_string()));
        }
    }

    let confirmed: Vec<TimeAccount> = accounts
        .iter()
        .cloned()
        .map(|mut a| {
            a.confirmed = true;
            a
        })
        .collect();

    let stored = services::store_time_accounts(repo, telescope, &confirmed).await?;
    info!("Confirmed {} accounts for {} night {}", stored, telescope, night);
    Ok(stored)
}

/// Time accounts for a project, visible to holders of the project password.
pub async fn project_accounts<R: FullRepository + ?Sized>(
    repo: &R,
    project_id: &ProjectId,
    password: Option<&str>,
) -> OmpResult<Vec<TimeAccount>> {
    let project = services::find_project(repo, project_id)
        .await?
        .ok_or_else(|| OmpError::UnknownProject(project_id.to_string()))?;

    if let Err(e) = verify_project_password(&project, password).require(project_id.as_str()) {
        warn!("Rejected access to accounts of {}", project_id);
        return Err(e);
    }

    Ok(services::project_time_accounts(repo, project_id).await?)
}
