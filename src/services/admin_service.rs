// teamspace-service/src/services/admin_service.rs
//
// Superuser-only views and overrides. Every entry point re-checks the
// actor's flag so the service is safe to call outside the HTTP layer.
use chrono::{DateTime, Duration, Utc};
use log::info;

use crate::models::{
    DashboardStats, FileRecord, ServiceError, Team, TeamWithStats, UpdateTeamRequest,
    User, UserProfile,
};
use crate::services::identity_service::ensure_superuser;
use crate::services::team_service::{apply_team_update, cascade_delete_team, load_team, CascadeReport};
use crate::services::user_service::user_team_entries;
use crate::state::AppState;

const STATS_WINDOW_DAYS: i64 = 30;

pub fn list_all_users(state: &AppState, actor: &User) -> Result<Vec<UserProfile>, ServiceError> {
    ensure_superuser(actor)?;
    state
        .db
        .list_users()?
        .into_iter()
        .map(|user| {
            let teams = user_team_entries(&state.db, &user.id)?;
            Ok(UserProfile { user, teams })
        })
        .collect()
}

pub fn list_all_teams(state: &AppState, actor: &User) -> Result<Vec<TeamWithStats>, ServiceError> {
    ensure_superuser(actor)?;
    state
        .db
        .list_teams()?
        .into_iter()
        .map(|team| {
            let member_count = state.db.get_team_members(&team.id)?.len();
            let storage_used = state.db.team_storage_used(&team.id)?;
            Ok(TeamWithStats {
                team,
                member_count,
                storage_used,
            })
        })
        .collect()
}

pub fn dashboard_stats(state: &AppState, actor: &User) -> Result<DashboardStats, ServiceError> {
    ensure_superuser(actor)?;
    let users = state.db.list_users()?;
    let teams = state.db.list_teams()?;
    let memberships = state.db.count_memberships()?;
    let files = state.db.list_files()?;
    Ok(compute_stats(&users, &teams, memberships, &files, Utc::now()))
}

pub(crate) fn compute_stats(
    users: &[User],
    teams: &[Team],
    total_memberships: usize,
    files: &[FileRecord],
    now: DateTime<Utc>,
) -> DashboardStats {
    let window_start = now - Duration::days(STATS_WINDOW_DAYS);
    let average_members_per_team = if teams.is_empty() {
        0.0
    } else {
        total_memberships as f64 / teams.len() as f64
    };

    DashboardStats {
        total_teams: teams.len(),
        total_users: users.len(),
        total_memberships,
        total_storage: files.iter().map(|f| f.size).sum(),
        teams_created_last_30_days: teams.iter().filter(|t| t.created_at > window_start).count(),
        users_created_last_30_days: users.iter().filter(|u| u.created_at > window_start).count(),
        average_members_per_team,
    }
}

/// Grant or revoke the superuser flag.
///
/// Revoking the flag from the last remaining superuser is refused so the
/// system never ends up without an administrator.
pub fn set_superuser(
    state: &AppState,
    actor: &User,
    user_id: &str,
    is_superuser: bool,
) -> Result<User, ServiceError> {
    ensure_superuser(actor)?;
    let user = state.db.set_superuser_flag(user_id, is_superuser)?;

    info!(
        "👑 Superuser flag of user: {} set to {} by {}",
        user_id, is_superuser, actor.id
    );
    Ok(user)
}

// Settings override that bypasses team roles
pub fn admin_update_team(
    state: &AppState,
    actor: &User,
    team_id: &str,
    req: UpdateTeamRequest,
) -> Result<Team, ServiceError> {
    ensure_superuser(actor)?;
    state.locks.with_team(team_id, || {
        let mut team = load_team(&state.db, team_id)?;
        apply_team_update(&mut team, req);
        state.db.save_team(&team)?;
        info!("✅ Team: {} updated by superuser: {}", team_id, actor.id);
        Ok(team)
    })
}

/// Delete a team regardless of roles.
///
/// Also finishes a cascade that was interrupted earlier: leftover
/// memberships or files of an already removed team are cleaned up, and
/// only a team with nothing left at all is reported as missing.
pub fn admin_delete_team(state: &AppState, actor: &User, team_id: &str) -> Result<CascadeReport, ServiceError> {
    ensure_superuser(actor)?;
    let report = state
        .locks
        .with_team(team_id, || cascade_delete_team(&state.db, team_id))?;
    state.locks.release(team_id)?;

    if report == CascadeReport::default() {
        return Err(ServiceError::NotFound("Team not found".to_string()));
    }
    info!("🗑️ Team: {} deleted by superuser: {}", team_id, actor.id);
    Ok(report)
}
