// teamspace-service/src/services/user_service.rs
use log::{error, info};

use crate::models::{
    NotificationSettings, ServiceError, TeamSummary, UpdateProfileRequest, User, UserProfile,
    UserTeamEntry,
};
use crate::services::team_service::list_teams_for_user;
use crate::state::AppState;
use crate::storage::Database;
use crate::utils::{clamp_limit, matches_prefix};

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

pub fn user_team_entries(db: &Database, user_id: &str) -> Result<Vec<UserTeamEntry>, ServiceError> {
    Ok(list_teams_for_user(db, user_id)?
        .into_iter()
        .map(|summary| UserTeamEntry {
            team_id: summary.team.id,
            name: summary.team.name,
            role: summary.role,
        })
        .collect())
}

// Current user with the teams they belong to
pub fn get_profile(state: &AppState, user: User) -> Result<UserProfile, ServiceError> {
    let teams = user_team_entries(&state.db, &user.id)?;
    Ok(UserProfile { user, teams })
}

pub fn get_user_by_id(state: &AppState, user_id: &str) -> Result<User, ServiceError> {
    state.db.find_user_by_id(user_id)?.ok_or_else(|| {
        error!("❌ User not found: {}", user_id);
        ServiceError::NotFound("User not found".to_string())
    })
}

// Teams of `target_user_id`; only the user themself or a superuser may ask
pub fn get_user_teams(
    state: &AppState,
    actor: &User,
    target_user_id: &str,
) -> Result<Vec<TeamSummary>, ServiceError> {
    if actor.id != target_user_id && !actor.is_superuser {
        return Err(ServiceError::NotAuthorized(
            "Not authorized to view this user's teams".to_string(),
        ));
    }
    get_user_by_id(state, target_user_id)?;
    list_teams_for_user(&state.db, target_user_id)
}

// Prefix match on email, first name or last name
pub fn search_users(state: &AppState, query: &str, limit: Option<usize>) -> Result<Vec<User>, ServiceError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let limit = clamp_limit(limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

    Ok(state
        .db
        .list_users()?
        .into_iter()
        .filter(|user| {
            matches_prefix(&user.email, query)
                || user.first_name.as_deref().map_or(false, |n| matches_prefix(n, query))
                || user.last_name.as_deref().map_or(false, |n| matches_prefix(n, query))
        })
        .take(limit)
        .collect())
}

// Profile writes are applied to the stored record, never to the caller's
// snapshot, so a concurrent superuser change is not overwritten.
pub fn update_profile(state: &AppState, user: User, req: UpdateProfileRequest) -> Result<User, ServiceError> {
    let user = state.db.update_user(&user.id, |stored| {
        if let Some(first_name) = req.first_name {
            stored.first_name = Some(first_name.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(last_name) = req.last_name {
            stored.last_name = Some(last_name.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(avatar_url) = req.avatar_url {
            stored.avatar_url = Some(avatar_url.trim().to_string()).filter(|u| !u.is_empty());
        }
        if let Some(settings) = req.settings {
            if settings.theme.is_some() {
                stored.settings.theme = settings.theme;
            }
            if settings.timezone.is_some() {
                stored.settings.timezone = settings.timezone;
            }
            if let Some(notifications) = settings.notifications {
                stored.settings.notifications.merge(notifications);
            }
        }
    })?;

    info!("✅ Profile updated for user: {}", user.id);
    Ok(user)
}

pub fn update_notification_settings(
    state: &AppState,
    user: User,
    patch: NotificationSettings,
) -> Result<User, ServiceError> {
    let user = state
        .db
        .update_user(&user.id, |stored| stored.settings.notifications.merge(patch))?;
    info!("✅ Notification settings updated for user: {}", user.id);
    Ok(user)
}

pub fn update_avatar(state: &AppState, user: User, avatar_url: &str) -> Result<User, ServiceError> {
    let avatar_url = avatar_url.trim();
    if avatar_url.is_empty() {
        return Err(ServiceError::BadRequest("Avatar URL is required".to_string()));
    }
    state
        .db
        .update_user(&user.id, |stored| stored.avatar_url = Some(avatar_url.to_string()))
}

pub fn delete_avatar(state: &AppState, user: User) -> Result<User, ServiceError> {
    state.db.update_user(&user.id, |stored| stored.avatar_url = None)
}
