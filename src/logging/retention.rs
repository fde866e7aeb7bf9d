//! Log partition retention management
//!
//! Handles cleanup of old daily partitions based on the date in their file name.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::store::{parse_partition_name, PartitionStore};

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Outcome of a cleanup sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Partition files removed
    pub deleted: Vec<String>,
    /// Files that could not be parsed or removed
    pub failed: Vec<String>,
}

/// Delete partitions dated strictly before `today - days_to_keep`
///
/// Files without the partition extension are ignored. A file that cannot be
/// parsed or removed is logged and skipped; the sweep continues.
pub fn cleanup_old_logs(
    store: &dyn PartitionStore,
    today: NaiveDate,
    days_to_keep: u32,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    let Some(cutoff) = today.checked_sub_days(Days::new(days_to_keep.into())) else {
        return report;
    };

    let names = match store.list() {
        Ok(names) => names,
        Err(e) => {
            error!("Failed to list log partitions: {}", e);
            return report;
        }
    };

    for name in names {
        let date = match parse_partition_name(&name) {
            None => continue,
            Some(Ok(date)) => date,
            Some(Err(e)) => {
                error!(file = %name, "Cannot parse log partition date: {}", e);
                report.failed.push(name);
                continue;
            }
        };

        if date >= cutoff {
            continue;
        }

        match store.remove(&name) {
            Ok(()) => {
                debug!(file = %name, "Deleted old log partition");
                report.deleted.push(name);
            }
            Err(e) => {
                error!(file = %name, "Failed to delete old log partition: {}", e);
                report.failed.push(name);
            }
        }
    }

    report
}
