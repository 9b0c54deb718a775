//! Registering MSBs in the queue and recording what happened to them.

use chrono::{DateTime, Utc};
use log::info;

use crate::db::calculate_checksum;
use crate::db::repository::FullRepository;
use crate::db::services;
use crate::error::{OmpError, OmpResult};
use crate::models::{MsbDone, MsbStatus, SchedulableMsb};

/// Store `msb` keyed by the checksum of its definition, returning the checksum.
pub async fn register_msb<R: FullRepository + ?Sized>(
    repo: &R,
    definition: &str,
    mut msb: SchedulableMsb,
) -> OmpResult<String> {
    msb.checksum = calculate_checksum(definition);
    services::store_msb(repo, &msb).await?;
    Ok(msb.checksum)
}

/// Details of one activity entry beyond the MSB itself.
#[derive(Debug, Clone)]
pub struct MsbEvent {
    pub status: MsbStatus,
    pub date: DateTime<Utc>,
    pub author: Option<String>,
    pub comment: Option<String>,
}

/// Append an activity entry for the MSB with `checksum`.
///
/// Marking an MSB done uses up one of its remaining repeats.
pub async fn record_activity<R: FullRepository + ?Sized>(
    repo: &R,
    checksum: &str,
    event: MsbEvent,
) -> OmpResult<MsbDone> {
    let mut msb = services::find_msb(repo, checksum)
        .await?
        .ok_or_else(|| OmpError::MsbMissing(checksum.to_string()))?;

    let entry = MsbDone {
        checksum: msb.checksum.clone(),
        telescope: msb.telescope,
        project_id: msb.project_id.clone(),
        title: msb.title.clone(),
        instrument: msb.instrument.clone(),
        date: event.date,
        status: event.status,
        author: event.author,
        comment: event.comment,
    };
    services::record_msb_activity(repo, &entry).await?;

    if event.status == MsbStatus::Done && msb.remaining > 0 {
        msb.remaining -= 1;
        info!("MSB {} now has {} repeats remaining", msb.checksum, msb.remaining);
        services::store_msb(repo, &msb).await?;
    }

    Ok(entry)
}
