// teamspace-service/src/services/quota_service.rs
//
// Storage quota accounting. Usage is recomputed by summing file sizes on
// every call, which costs O(files in the team); a maintained per-team
// counter would be the next step if teams grow large.
use chrono::{Duration, Utc};
use log::{debug, error};
use std::collections::BTreeMap;

use crate::models::{ServiceError, StorageSummary, Team};
use crate::storage::Database;

const RECENT_FILE_WINDOW_DAYS: i64 = 30;

pub fn current_usage(db: &Database, team_id: &str) -> Result<u64, ServiceError> {
    db.team_storage_used(team_id)
}

/// Check that `incoming` more bytes fit into `team`'s storage limit.
///
/// The check and the subsequent insert are only atomic when the caller holds
/// the team's lock from `TeamLockRegistry`; without it two concurrent
/// uploads can each pass the check and together overshoot the limit.
/// Returns the usage measured before the reservation.
pub fn check_and_reserve(db: &Database, team: &Team, incoming: u64) -> Result<u64, ServiceError> {
    let used = current_usage(db, &team.id)?;
    let limit = team.settings.storage_limit;

    if used.saturating_add(incoming) > limit {
        error!(
            "❌ Quota exceeded for team: {} (used {}, requested {}, limit {})",
            team.id, used, incoming, limit
        );
        return Err(ServiceError::QuotaExceeded {
            team_id: team.id.clone(),
            used,
            requested: incoming,
            limit,
        });
    }

    debug!(
        "Reserved {} bytes for team_id={} ({} of {} used)",
        incoming, team.id, used, limit
    );
    Ok(used)
}

// Usage breakdown for the team storage page
pub fn storage_summary(db: &Database, team: &Team) -> Result<StorageSummary, ServiceError> {
    let files = db.get_team_files(&team.id)?;
    let recent_cutoff = Utc::now() - Duration::days(RECENT_FILE_WINDOW_DAYS);

    let total_size: u64 = files.iter().map(|f| f.size).sum();
    let mut file_types = BTreeMap::new();
    for file in &files {
        *file_types.entry(file.file_type.clone()).or_insert(0) += 1;
    }
    let recent_files = files.iter().filter(|f| f.created_at > recent_cutoff).count();
    let average_file_size = if files.is_empty() {
        0.0
    } else {
        total_size as f64 / files.len() as f64
    };

    Ok(StorageSummary {
        team_id: team.id.clone(),
        total_size,
        file_count: files.len(),
        storage_limit: team.settings.storage_limit,
        remaining: team.settings.storage_limit.saturating_sub(total_size),
        file_types,
        recent_files,
        average_file_size,
    })
}
