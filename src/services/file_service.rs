// teamspace-service/src/services/file_service.rs
use chrono::Utc;
use log::{error, info, warn};
use uuid::Uuid;

use crate::models::{
    CreateFileRequest, FileListQuery, FilePage, FileRecord, ServiceError, StorageSummary, Team,
    UpdateFileRequest, User,
};
use crate::services::authorization::{self, DELETE_FILES, READ_TEAM, WRITE_FILES};
use crate::services::quota_service;
use crate::services::team_service::load_team;
use crate::state::AppState;
use crate::storage::Database;
use crate::utils::{clamp_limit, matches_prefix};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_SEARCH_LIMIT: usize = 20;
const TEAM_CHANGE_RETRIES: usize = 3;

fn load_file(db: &Database, file_id: &str) -> Result<FileRecord, ServiceError> {
    db.find_file_by_id(file_id)?.ok_or_else(|| {
        error!("❌ File not found: {}", file_id);
        ServiceError::NotFound("File not found".to_string())
    })
}

// Run `op` on the file while holding the lock of the team that owns it.
// The file is re-read under the lock; when a move changed its team in the
// meantime the lookup is repeated against the new team.
fn with_file_locked<T>(
    state: &AppState,
    file_id: &str,
    mut op: impl FnMut(FileRecord) -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    for _ in 0..TEAM_CHANGE_RETRIES {
        let team_id = load_file(&state.db, file_id)?.team_id;
        let outcome = state.locks.with_team(&team_id, || {
            let file = load_file(&state.db, file_id)?;
            if file.team_id != team_id {
                return Ok(None);
            }
            op(file).map(Some)
        })?;
        match outcome {
            Some(value) => return Ok(value),
            None => warn!("⚠️ File: {} left team: {} while waiting for its lock", file_id, team_id),
        }
    }
    Err(ServiceError::InvariantViolation(
        "File keeps moving between teams, retry the request".to_string(),
    ))
}

fn ensure_size_allowed(size: u64, max_file_size: u64) -> Result<(), ServiceError> {
    if size > max_file_size {
        warn!("⚠️ Rejected file of {} bytes (max {})", size, max_file_size);
        return Err(ServiceError::BadRequest(format!(
            "File size {} exceeds the maximum of {} bytes",
            size, max_file_size
        )));
    }
    Ok(())
}

fn ensure_type_allowed(team: &Team, file_type: &str) -> Result<(), ServiceError> {
    if team.settings.allows_type(file_type) {
        Ok(())
    } else {
        warn!("⚠️ Type {} rejected by team: {}", file_type, team.id);
        Err(ServiceError::UnsupportedFileType(format!(
            "File type '{}' is not allowed in team '{}'",
            file_type, team.name
        )))
    }
}

// Declared type if given, otherwise guessed from the file name
fn resolve_file_type(name: &str, declared: Option<String>) -> String {
    declared
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

/// Register file metadata in a team after checking the per-file size cap,
/// the caller's role, the team's allowed types and its storage quota.
///
/// The quota check and the insert run under the team lock so concurrent
/// uploads cannot jointly exceed the limit.
pub fn create_file(
    state: &AppState,
    actor: &User,
    team_id: &str,
    req: CreateFileRequest,
) -> Result<FileRecord, ServiceError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("File name is required".to_string()));
    }
    ensure_size_allowed(req.size, state.config.max_file_size)?;
    let file_type = resolve_file_type(&name, req.file_type);

    state.locks.with_team(team_id, || {
        let team = load_team(&state.db, team_id)?;
        authorization::require_role(
            &state.db,
            &actor.id,
            team_id,
            WRITE_FILES,
            "upload files to this team",
        )?;
        ensure_type_allowed(&team, &file_type)?;
        quota_service::check_and_reserve(&state.db, &team, req.size)?;

        let now = Utc::now();
        let storage_key = req
            .storage_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| format!("{}/{}/{}-{}", team_id, actor.id, now.timestamp_millis(), name));

        let file = state.db.insert_file(FileRecord {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            name,
            file_type,
            size: req.size,
            description: req.description.filter(|d| !d.trim().is_empty()),
            storage_key,
            metadata: req.metadata,
            created_by: actor.id.clone(),
            created_at: now,
            updated_at: now,
        })?;

        info!(
            "✅ File created: {} ({} bytes) in team: {} by user: {}",
            file.id, file.size, team_id, actor.id
        );
        Ok(file)
    })
}

pub fn get_file(state: &AppState, actor: &User, file_id: &str) -> Result<FileRecord, ServiceError> {
    let file = load_file(&state.db, file_id)?;
    authorization::require_role(&state.db, &actor.id, &file.team_id, READ_TEAM, "view this file")?;
    Ok(file)
}

/// One page of a team's files, newest first.
///
/// Pages are ordered by (`created_at` millis, id), both descending. The
/// cursor pair (`cursor`, `cursor_id`) names the last file of the previous
/// page; without `cursor_id` every file of the cursor millisecond is skipped.
/// The returned cursor is `None` on the last page.
pub fn list_team_files(
    state: &AppState,
    actor: &User,
    team_id: &str,
    query: FileListQuery,
) -> Result<FilePage, ServiceError> {
    load_team(&state.db, team_id)?;
    authorization::require_role(&state.db, &actor.id, team_id, READ_TEAM, "view team files")?;

    let limit = clamp_limit(query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let type_filter = query.file_type.map(|t| t.to_lowercase());

    let mut files = state.db.get_team_files(team_id)?;
    files.sort_by(|a, b| page_key(b).cmp(&page_key(a)));

    let mut matching = files
        .into_iter()
        .filter(|f| type_filter.as_deref().map_or(true, |t| f.file_type == t))
        .filter(|f| after_cursor(f, query.cursor, query.cursor_id.as_deref()));

    let files: Vec<FileRecord> = matching.by_ref().take(limit).collect();
    let (cursor, cursor_id) = match (matching.next(), files.last()) {
        (Some(_), Some(last)) => (Some(last.created_at.timestamp_millis()), Some(last.id.clone())),
        _ => (None, None),
    };

    Ok(FilePage {
        files,
        cursor,
        cursor_id,
    })
}

fn page_key(file: &FileRecord) -> (i64, &str) {
    (file.created_at.timestamp_millis(), file.id.as_str())
}

fn after_cursor(file: &FileRecord, cursor: Option<i64>, cursor_id: Option<&str>) -> bool {
    let Some(cursor) = cursor else {
        return true;
    };
    let millis = file.created_at.timestamp_millis();
    millis < cursor || (millis == cursor && cursor_id.map_or(false, |id| file.id.as_str() < id))
}

pub fn search_team_files(
    state: &AppState,
    actor: &User,
    team_id: &str,
    query: &str,
    limit: Option<usize>,
) -> Result<Vec<FileRecord>, ServiceError> {
    load_team(&state.db, team_id)?;
    authorization::require_role(&state.db, &actor.id, team_id, READ_TEAM, "search team files")?;

    let limit = clamp_limit(limit, DEFAULT_SEARCH_LIMIT, MAX_PAGE_SIZE);
    Ok(state
        .db
        .get_team_files(team_id)?
        .into_iter()
        .filter(|f| {
            matches_prefix(&f.name, query)
                || f.description.as_deref().map_or(false, |d| matches_prefix(d, query))
        })
        .take(limit)
        .collect())
}

/// Edit a file's name, description or metadata.
///
/// Runs under the owning team's lock, so a concurrent move either finishes
/// first (and the edit is authorized against the new team) or waits.
pub fn update_file(
    state: &AppState,
    actor: &User,
    file_id: &str,
    req: UpdateFileRequest,
) -> Result<FileRecord, ServiceError> {
    let name = match req.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::BadRequest("File name cannot be empty".to_string()));
            }
            Some(name)
        }
        None => None,
    };

    let file = with_file_locked(state, file_id, |file| {
        authorization::require_role(&state.db, &actor.id, &file.team_id, WRITE_FILES, "edit this file")?;

        state.db.patch_file(file_id, |stored| {
            if let Some(name) = &name {
                stored.name = name.clone();
            }
            if let Some(description) = &req.description {
                stored.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
            }
            if req.metadata.is_some() {
                stored.metadata = req.metadata.clone();
            }
            stored.updated_at = Utc::now();
        })
    })?;

    info!("✅ File updated: {} by user: {}", file_id, actor.id);
    Ok(file)
}

pub fn delete_file(state: &AppState, actor: &User, file_id: &str) -> Result<(), ServiceError> {
    let team_id = with_file_locked(state, file_id, |file| {
        authorization::require_role(&state.db, &actor.id, &file.team_id, DELETE_FILES, "delete this file")?;
        if !state.db.delete_file(file_id)? {
            warn!("⚠️ File: {} was already deleted", file_id);
        }
        Ok(file.team_id)
    })?;

    info!("🗑️ File deleted: {} from team: {} by user: {}", file_id, team_id, actor.id);
    Ok(())
}

/// Move a file between teams.
///
/// Both team locks are held (ascending id order) while the caller's rights
/// on both teams, the target's allowed types and its quota are re-checked,
/// so the move cannot race a concurrent upload into the target.
pub fn move_file(
    state: &AppState,
    actor: &User,
    file_id: &str,
    target_team_id: &str,
) -> Result<FileRecord, ServiceError> {
    let source_team_id = load_file(&state.db, file_id)?.team_id;
    if source_team_id == target_team_id {
        return Err(ServiceError::BadRequest(
            "File already belongs to that team".to_string(),
        ));
    }

    state.locks.with_teams(&source_team_id, target_team_id, || {
        let file = load_file(&state.db, file_id)?;
        if file.team_id != source_team_id {
            warn!("⚠️ File: {} changed team while waiting for locks", file_id);
            return Err(ServiceError::InvariantViolation(
                "File was moved concurrently, retry the request".to_string(),
            ));
        }

        let target = load_team(&state.db, target_team_id)?;
        authorization::require_role(
            &state.db,
            &actor.id,
            &source_team_id,
            DELETE_FILES,
            "move files out of this team",
        )?;
        authorization::require_role(
            &state.db,
            &actor.id,
            target_team_id,
            DELETE_FILES,
            "move files into the target team",
        )?;
        ensure_type_allowed(&target, &file.file_type)?;
        quota_service::check_and_reserve(&state.db, &target, file.size)?;

        let file = state.db.patch_file(file_id, |stored| {
            stored.team_id = target_team_id.to_string();
            stored.updated_at = Utc::now();
        })?;

        info!(
            "✅ File: {} moved from team: {} to team: {} by user: {}",
            file_id, source_team_id, target_team_id, actor.id
        );
        Ok(file)
    })
}

pub fn team_storage(state: &AppState, actor: &User, team_id: &str) -> Result<StorageSummary, ServiceError> {
    let team = load_team(&state.db, team_id)?;
    authorization::require_role(&state.db, &actor.id, team_id, READ_TEAM, "view team storage")?;
    quota_service::storage_summary(&state.db, &team)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_type_wins_over_guess() {
        assert_eq!(
            resolve_file_type("notes.txt", Some("Application/PDF".to_string())),
            "application/pdf"
        );
    }

    #[test]
    fn size_cap_is_inclusive() {
        assert!(ensure_size_allowed(100, 100).is_ok());
        assert!(matches!(ensure_size_allowed(101, 100), Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn missing_type_is_guessed_from_extension() {
        assert_eq!(resolve_file_type("photo.png", None), "image/png");
        assert_eq!(resolve_file_type("blob", None), "application/octet-stream");
    }
}
