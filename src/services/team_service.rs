// teamspace-service/src/services/team_service.rs
use chrono::Utc;
use log::{error, info, warn};
use uuid::Uuid;

use crate::models::{
    CreateTeamRequest, MemberTarget, Membership, ServiceError, Team, TeamDetails, TeamMemberView,
    TeamRole, TeamSettings, TeamSummary, UpdateTeamRequest, User,
};
use crate::services::authorization::{
    self, check_grantable_role, check_membership_change, MembershipChange, MANAGE_TEAM,
    OWNER_ONLY, READ_TEAM,
};
use crate::state::AppState;
use crate::storage::Database;
use crate::utils::{clamp_limit, is_valid_email, matches_prefix};

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

// What a cascading delete actually removed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CascadeReport {
    pub memberships: usize,
    pub files: usize,
    pub team_removed: bool,
}

pub(crate) fn load_team(db: &Database, team_id: &str) -> Result<Team, ServiceError> {
    db.find_team_by_id(team_id)?.ok_or_else(|| {
        error!("❌ Team not found: {}", team_id);
        ServiceError::NotFound("Team not found".to_string())
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create a team with `creator` as its single owner.
///
/// The team and the owner membership are two writes. If the membership
/// cannot be written the team is deleted again; a failing rollback is
/// reported as a fatal partial write.
pub fn create_team(
    state: &AppState,
    creator: &User,
    req: CreateTeamRequest,
) -> Result<Team, ServiceError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("Team name is required".to_string()));
    }

    let mut settings = TeamSettings {
        storage_limit: state.config.default_storage_limit,
        allowed_file_types: state.config.default_allowed_file_types.clone(),
    };
    if let Some(patch) = req.settings {
        settings.merge(patch);
    }

    let now = Utc::now();
    let team = state.db.insert_team(Team {
        id: Uuid::new_v4().to_string(),
        name,
        description: non_blank(req.description),
        created_by: creator.id.clone(),
        settings,
        created_at: now,
        updated_at: None,
    })?;

    let owner = Membership {
        id: Uuid::new_v4().to_string(),
        team_id: team.id.clone(),
        user_id: creator.id.clone(),
        role: TeamRole::Owner,
        invited_by: creator.id.clone(),
        joined_at: now,
    };

    if let Err(err) = state.db.insert_membership(owner) {
        error!("❌ Failed to add owner to team: {}: {}", team.id, err);
        return match state.db.delete_team(&team.id) {
            Ok(_) => Err(err),
            Err(rollback_err) => {
                error!(
                    "❌ Rollback of team: {} failed, team left without owner: {}",
                    team.id, rollback_err
                );
                Err(ServiceError::Storage(format!(
                    "Fatal partial write: team {} has no owner",
                    team.id
                )))
            }
        };
    }

    info!("✅ Team created: {} ({}) by user: {}", team.name, team.id, creator.id);
    Ok(team)
}

// Shared by owner/admin updates and the superuser override. Blank name or
// description values leave the stored ones untouched.
pub(crate) fn apply_team_update(team: &mut Team, req: UpdateTeamRequest) {
    if let Some(name) = non_blank(req.name) {
        team.name = name;
    }
    if let Some(description) = non_blank(req.description) {
        team.description = Some(description);
    }
    if let Some(patch) = req.settings {
        team.settings.merge(patch);
    }
    team.updated_at = Some(Utc::now());
}

pub fn update_team_settings(
    state: &AppState,
    actor: &User,
    team_id: &str,
    req: UpdateTeamRequest,
) -> Result<Team, ServiceError> {
    state.locks.with_team(team_id, || {
        let mut team = load_team(&state.db, team_id)?;
        authorization::require_role(&state.db, &actor.id, team_id, MANAGE_TEAM, "update this team")?;

        apply_team_update(&mut team, req);
        state.db.save_team(&team)?;

        info!("✅ Team updated: {} by user: {}", team_id, actor.id);
        Ok(team)
    })
}

pub fn add_member(
    state: &AppState,
    actor: &User,
    team_id: &str,
    target: MemberTarget,
    role: TeamRole,
) -> Result<Membership, ServiceError> {
    state.locks.with_team(team_id, || {
        load_team(&state.db, team_id)?;
        authorization::require_role(
            &state.db,
            &actor.id,
            team_id,
            MANAGE_TEAM,
            "manage team members",
        )?;
        check_grantable_role(role)?;

        let user = match target {
            MemberTarget::UserId(user_id) => state
                .db
                .find_user_by_id(&user_id)?
                .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?,
            MemberTarget::Email(email) => {
                if !is_valid_email(&email) {
                    return Err(ServiceError::BadRequest(format!("Invalid email address: {}", email)));
                }
                state.db.find_user_by_email(&email)?.ok_or_else(|| {
                    ServiceError::NotFound("User not found with that email".to_string())
                })?
            }
        };

        if state.db.find_membership(&user.id, team_id)?.is_some() {
            warn!("⚠️ User: {} is already a member of team: {}", user.id, team_id);
            return Err(ServiceError::AlreadyExists(
                "User is already a member of this team".to_string(),
            ));
        }

        let membership = state.db.insert_membership(Membership {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            user_id: user.id.clone(),
            role,
            invited_by: actor.id.clone(),
            joined_at: Utc::now(),
        })?;

        info!("✅ User: {} joined team: {} as {}", user.id, team_id, role);
        Ok(membership)
    })
}

fn load_target_membership(
    db: &Database,
    user_id: &str,
    team_id: &str,
) -> Result<Membership, ServiceError> {
    db.find_membership(user_id, team_id)?
        .ok_or_else(|| ServiceError::NotFound("Member not found".to_string()))
}

pub fn change_member_role(
    state: &AppState,
    actor: &User,
    team_id: &str,
    target_user_id: &str,
    new_role: TeamRole,
) -> Result<Membership, ServiceError> {
    state.locks.with_team(team_id, || {
        load_team(&state.db, team_id)?;
        let actor_role = authorization::authorize_member_management(authorization::role_of(
            &state.db, &actor.id, team_id,
        )?)?;
        let target = load_target_membership(&state.db, target_user_id, team_id)?;
        check_membership_change(actor_role, &target, MembershipChange::ChangeRole(new_role))?;

        let updated = state.db.update_membership_role(&target.id, new_role)?;
        info!(
            "✅ Role of user: {} in team: {} changed {} -> {}",
            target_user_id, team_id, target.role, new_role
        );
        Ok(updated)
    })
}

pub fn remove_member(
    state: &AppState,
    actor: &User,
    team_id: &str,
    target_user_id: &str,
) -> Result<(), ServiceError> {
    state.locks.with_team(team_id, || {
        load_team(&state.db, team_id)?;
        let actor_role = authorization::authorize_member_management(authorization::role_of(
            &state.db, &actor.id, team_id,
        )?)?;
        let target = load_target_membership(&state.db, target_user_id, team_id)?;
        check_membership_change(actor_role, &target, MembershipChange::Remove)?;

        if !state.db.delete_membership(&target.id)? {
            warn!("⚠️ Membership: {} was already removed", target.id);
        }
        info!("✅ User: {} removed from team: {} by {}", target_user_id, team_id, actor.id);
        Ok(())
    })
}

/// Remove a team's memberships, then its files, then the team itself.
///
/// Each step tolerates rows that are already gone, so re-running the
/// cascade after an interruption finishes the job. Callers must hold the
/// team's lock.
pub(crate) fn cascade_delete_team(db: &Database, team_id: &str) -> Result<CascadeReport, ServiceError> {
    let memberships = db.delete_team_members(team_id)?;
    let files = db.delete_team_files(team_id)?;
    let team_removed = db.delete_team(team_id)?;

    if !team_removed {
        warn!("⚠️ Team: {} was already deleted when the cascade reached it", team_id);
    }
    info!(
        "🗑️ Deleted team: {} ({} memberships, {} files)",
        team_id, memberships, files
    );
    Ok(CascadeReport {
        memberships,
        files,
        team_removed,
    })
}

pub fn delete_team(state: &AppState, actor: &User, team_id: &str) -> Result<CascadeReport, ServiceError> {
    let report = state.locks.with_team(team_id, || {
        load_team(&state.db, team_id)?;
        authorization::require_role(&state.db, &actor.id, team_id, OWNER_ONLY, "delete this team")?;
        cascade_delete_team(&state.db, team_id)
    })?;
    state.locks.release(team_id)?;
    Ok(report)
}

// Team plus the caller's role and the member list
pub fn get_team(state: &AppState, actor: &User, team_id: &str) -> Result<TeamDetails, ServiceError> {
    let team = load_team(&state.db, team_id)?;
    let user_role =
        authorization::require_role(&state.db, &actor.id, team_id, READ_TEAM, "view this team")?;
    let members = member_views(&state.db, team_id)?;

    Ok(TeamDetails {
        team,
        user_role,
        members,
    })
}

pub fn get_team_members(
    state: &AppState,
    actor: &User,
    team_id: &str,
) -> Result<Vec<TeamMemberView>, ServiceError> {
    load_team(&state.db, team_id)?;
    authorization::require_role(&state.db, &actor.id, team_id, READ_TEAM, "view team members")?;
    member_views(&state.db, team_id)
}

fn member_views(db: &Database, team_id: &str) -> Result<Vec<TeamMemberView>, ServiceError> {
    let mut views = Vec::new();
    for membership in db.get_team_members(team_id)? {
        match db.find_user_by_id(&membership.user_id)? {
            Some(user) => views.push(TeamMemberView { membership, user }),
            None => warn!(
                "⚠️ Membership: {} points at missing user: {}",
                membership.id, membership.user_id
            ),
        }
    }
    Ok(views)
}

// Every team the user belongs to, with their role and the member count
pub fn list_teams_for_user(db: &Database, user_id: &str) -> Result<Vec<TeamSummary>, ServiceError> {
    let mut summaries = Vec::new();
    for membership in db.get_memberships_for_user(user_id)? {
        let Some(team) = db.find_team_by_id(&membership.team_id)? else {
            warn!("⚠️ Membership: {} points at missing team: {}", membership.id, membership.team_id);
            continue;
        };
        let member_count = db.get_team_members(&team.id)?.len();
        summaries.push(TeamSummary {
            team,
            role: membership.role,
            member_count,
        });
    }
    Ok(summaries)
}

pub fn list_teams(state: &AppState, actor: &User) -> Result<Vec<TeamSummary>, ServiceError> {
    list_teams_for_user(&state.db, &actor.id)
}

// Prefix search on name or description, restricted to the caller's teams
pub fn search_teams(
    state: &AppState,
    actor: &User,
    query: &str,
    limit: Option<usize>,
) -> Result<Vec<TeamSummary>, ServiceError> {
    let limit = clamp_limit(limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);
    Ok(list_teams_for_user(&state.db, &actor.id)?
        .into_iter()
        .filter(|summary| {
            matches_prefix(&summary.team.name, query)
                || summary
                    .team
                    .description
                    .as_deref()
                    .map_or(false, |d| matches_prefix(d, query))
        })
        .take(limit)
        .collect())
}
