// teamspace-service/src/services/authorization.rs
//
// Role checks for team-scoped operations. Every decision matches on the
// closed `TeamRole` set, so adding a role forces each rule to be revisited.
use log::error;

use crate::models::{Membership, ServiceError, TeamRole};
use crate::storage::Database;

pub const READ_TEAM: &[TeamRole] = &TeamRole::ALL;
pub const MANAGE_TEAM: &[TeamRole] = &[TeamRole::Owner, TeamRole::Admin];
pub const OWNER_ONLY: &[TeamRole] = &[TeamRole::Owner];
pub const WRITE_FILES: &[TeamRole] = &[TeamRole::Owner, TeamRole::Admin, TeamRole::Member];
pub const DELETE_FILES: &[TeamRole] = &[TeamRole::Owner, TeamRole::Admin];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MembershipChange {
    ChangeRole(TeamRole),
    Remove,
}

pub fn role_of(db: &Database, user_id: &str, team_id: &str) -> Result<Option<TeamRole>, ServiceError> {
    Ok(db.find_membership(user_id, team_id)?.map(|m| m.role))
}

// True iff the user's role is in `allowed`; no membership is simply false
pub fn can_perform(
    db: &Database,
    user_id: &str,
    team_id: &str,
    allowed: &[TeamRole],
) -> Result<bool, ServiceError> {
    Ok(role_of(db, user_id, team_id)?.map_or(false, |role| allowed.contains(&role)))
}

// `can_perform` translated into a `NotAuthorized` failure
pub fn require_role(
    db: &Database,
    user_id: &str,
    team_id: &str,
    allowed: &[TeamRole],
    action: &str,
) -> Result<TeamRole, ServiceError> {
    match role_of(db, user_id, team_id)? {
        Some(role) if allowed.contains(&role) => Ok(role),
        role => {
            error!(
                "❌ User: {} (role {:?}) may not {} in team: {}",
                user_id, role, action, team_id
            );
            Err(ServiceError::NotAuthorized(format!("Not authorized to {}", action)))
        }
    }
}

/// Whether a role may perform escalated actions: changing another member's
/// role, removing members and deleting the team.
pub fn can_escalate(role: TeamRole) -> bool {
    match role {
        TeamRole::Owner => true,
        TeamRole::Admin | TeamRole::Member | TeamRole::Viewer => false,
    }
}

/// Whether a role may manage membership and settings at all.
pub fn can_manage_members(role: TeamRole) -> bool {
    match role {
        TeamRole::Owner | TeamRole::Admin => true,
        TeamRole::Member | TeamRole::Viewer => false,
    }
}

// First gate for role changes and removals: the actor needs manage rights
pub fn authorize_member_management(actor_role: Option<TeamRole>) -> Result<TeamRole, ServiceError> {
    match actor_role {
        Some(role) if can_manage_members(role) => Ok(role),
        _ => Err(ServiceError::NotAuthorized(
            "Not authorized to manage team members".to_string(),
        )),
    }
}

/// Escalation rules for modifying an existing membership.
///
/// An owner membership can never be removed or downgraded through this
/// path, whoever asks (the sole owner included). Otherwise only the owner
/// may change roles or remove members, and nobody can hand out the owner
/// role since a team has exactly one owner.
pub fn check_membership_change(
    actor_role: TeamRole,
    target: &Membership,
    change: MembershipChange,
) -> Result<(), ServiceError> {
    match target.role {
        TeamRole::Owner => {
            return Err(ServiceError::InvariantViolation(match change {
                MembershipChange::Remove => "Cannot remove the team owner".to_string(),
                MembershipChange::ChangeRole(_) => "Cannot change the team owner's role".to_string(),
            }));
        }
        TeamRole::Admin | TeamRole::Member | TeamRole::Viewer => {}
    }

    if !can_escalate(actor_role) {
        return Err(ServiceError::NotAuthorized(match change {
            MembershipChange::Remove => "Only team owners can remove members".to_string(),
            MembershipChange::ChangeRole(_) => "Only team owners can change member roles".to_string(),
        }));
    }

    match change {
        MembershipChange::ChangeRole(new_role) => check_grantable_role(new_role),
        MembershipChange::Remove => Ok(()),
    }
}

// Roles that may be handed out by add-member or role-change
pub fn check_grantable_role(role: TeamRole) -> Result<(), ServiceError> {
    match role {
        TeamRole::Owner => Err(ServiceError::InvariantViolation(
            "A team has exactly one owner; the owner role cannot be granted".to_string(),
        )),
        TeamRole::Admin | TeamRole::Member | TeamRole::Viewer => Ok(()),
    }
}
