use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{ServiceError, User, UserId};

pub type TeamId = String;

// Closed role set. Privilege order is owner > admin > member > viewer, but
// checks always go through explicit role sets, never through ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl TeamRole {
    pub const ALL: [TeamRole; 4] = [
        TeamRole::Owner,
        TeamRole::Admin,
        TeamRole::Member,
        TeamRole::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Owner => "owner",
            TeamRole::Admin => "admin",
            TeamRole::Member => "member",
            TeamRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(TeamRole::Owner),
            "admin" => Ok(TeamRole::Admin),
            "member" => Ok(TeamRole::Member),
            "viewer" => Ok(TeamRole::Viewer),
            other => Err(ServiceError::BadRequest(format!(
                "Invalid role '{}'. Must be one of owner, admin, member, viewer",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamSettings {
    pub storage_limit: u64,
    pub allowed_file_types: Vec<String>,
}

// Partial settings update; absent fields keep their stored value
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TeamSettingsPatch {
    pub storage_limit: Option<u64>,
    pub allowed_file_types: Option<Vec<String>>,
}

impl TeamSettings {
    pub fn merge(&mut self, patch: TeamSettingsPatch) {
        if let Some(limit) = patch.storage_limit {
            self.storage_limit = limit;
        }
        if let Some(types) = patch.allowed_file_types {
            self.allowed_file_types = types;
        }
    }

    /// Whether `mime` matches one of the allowed patterns.
    ///
    /// Patterns are exact MIME types or `type/*` wildcards, compared
    /// case-insensitively. An empty list allows everything.
    pub fn allows_type(&self, mime: &str) -> bool {
        if self.allowed_file_types.is_empty() {
            return true;
        }
        let mime = mime.to_lowercase();
        self.allowed_file_types.iter().any(|pattern| {
            let pattern = pattern.to_lowercase();
            if pattern == "*" || pattern == "*/*" {
                return true;
            }
            match pattern.strip_suffix("/*") {
                Some(major) => mime
                    .split_once('/')
                    .map_or(false, |(mime_major, _)| mime_major == major),
                None => pattern == mime,
            }
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub settings: TeamSettings,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// Join record granting one user exactly one role in one team
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Membership {
    pub id: String,
    pub team_id: TeamId,
    pub user_id: UserId,
    pub role: TeamRole,
    pub invited_by: UserId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateTeamRequest {
    pub name: String,
    pub description: Option<String>,
    pub settings: Option<TeamSettingsPatch>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<TeamSettingsPatch>,
}

// Body of `POST /teams/{id}/members`: exactly one of user_id or email
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AddMemberRequest {
    pub user_id: Option<UserId>,
    pub email: Option<String>,
    pub role: TeamRole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberTarget {
    UserId(UserId),
    Email(String),
}

impl AddMemberRequest {
    pub fn target(&self) -> Result<MemberTarget, ServiceError> {
        match (&self.user_id, &self.email) {
            (Some(user_id), None) => Ok(MemberTarget::UserId(user_id.clone())),
            (None, Some(email)) => Ok(MemberTarget::Email(email.clone())),
            _ => Err(ServiceError::BadRequest(
                "Provide exactly one of 'user_id' or 'email'".to_string(),
            )),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChangeRoleRequest {
    pub role: TeamRole,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamSummary {
    #[serde(flatten)]
    pub team: Team,
    pub role: TeamRole,
    pub member_count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamMemberView {
    #[serde(flatten)]
    pub membership: Membership,
    pub user: User,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamDetails {
    #[serde(flatten)]
    pub team: Team,
    pub user_role: TeamRole,
    pub members: Vec<TeamMemberView>,
}
