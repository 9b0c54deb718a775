use std::collections::BTreeMap;

use crate::models::Fault;

/// Merge faults filed in a period with faults that occurred in it.
///
/// Filed faults that carry an occurrence date are dropped: they are reported
/// through the occurrence list only when that date lies in the period. The
/// result is de-duplicated and ordered on (filed epoch, fault ID).
pub fn merge_period_faults(filed: Vec<Fault>, occurred: Vec<Fault>) -> Vec<Fault> {
    let mut merged: BTreeMap<(i64, String), Fault> = BTreeMap::new();

    for fault in filed.into_iter().filter(|f| f.fault_date.is_none()) {
        merged.insert(fault.merge_key(), fault);
    }
    for fault in occurred {
        merged.insert(fault.merge_key(), fault);
    }

    merged.into_values().collect()
}
