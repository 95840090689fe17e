// teamspace-service/src/tests/mod.rs
//
// Shared fixtures for the service and route tests.
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::config::Config;
use crate::models::{
    Claims, CreateFileRequest, CreateTeamRequest, MemberTarget, Membership, ProfileFields, Team,
    TeamRole, TeamSettingsPatch, User,
};
use crate::services::{identity_service, team_service};
use crate::state::AppState;

mod admin_tests;
mod file_tests;

pub(crate) const TEST_SECRET: &str = "teamspace_test_secret";

pub(crate) fn test_config() -> Config {
    Config {
        jwt_secret: TEST_SECRET.to_string(),
        default_allowed_file_types: vec![],
        read_retry_attempts: 1,
        ..Config::default()
    }
}

pub(crate) fn test_state() -> AppState {
    AppState::in_memory(test_config())
}

pub(crate) fn subject(name: &str) -> String {
    format!("idp|{}", name)
}

pub(crate) fn email(name: &str) -> String {
    format!("{}@example.com", name)
}

pub(crate) fn sign_in(state: &AppState, name: &str) -> User {
    identity_service::resolve_or_create_user(
        state,
        &subject(name),
        &email(name),
        ProfileFields {
            first_name: Some(name.to_string()),
            last_name: None,
        },
    )
    .unwrap()
}

pub(crate) fn token_for(name: &str) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: subject(name),
        email: email(name),
        given_name: Some(name.to_string()),
        family_name: None,
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_ref()),
    )
    .unwrap()
}

pub(crate) fn create_team(state: &AppState, owner: &User, name: &str) -> Team {
    team_service::create_team(
        state,
        owner,
        CreateTeamRequest {
            name: name.to_string(),
            description: None,
            settings: None,
        },
    )
    .unwrap()
}

pub(crate) fn create_limited_team(
    state: &AppState,
    owner: &User,
    name: &str,
    storage_limit: u64,
    allowed_file_types: &[&str],
) -> Team {
    team_service::create_team(
        state,
        owner,
        CreateTeamRequest {
            name: name.to_string(),
            description: None,
            settings: Some(TeamSettingsPatch {
                storage_limit: Some(storage_limit),
                allowed_file_types: Some(allowed_file_types.iter().map(|t| t.to_string()).collect()),
            }),
        },
    )
    .unwrap()
}

pub(crate) fn join(state: &AppState, owner: &User, team: &Team, user: &User, role: TeamRole) -> Membership {
    team_service::add_member(
        state,
        owner,
        &team.id,
        MemberTarget::UserId(user.id.clone()),
        role,
    )
    .unwrap()
}

pub(crate) fn file_request(name: &str, file_type: &str, size: u64) -> CreateFileRequest {
    CreateFileRequest {
        name: name.to_string(),
        file_type: Some(file_type.to_string()),
        size,
        description: None,
        storage_key: None,
        metadata: None,
    }
}
