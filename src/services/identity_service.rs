// teamspace-service/src/services/identity_service.rs
use chrono::Utc;
use log::{error, info};
use uuid::Uuid;

use crate::models::{Claims, ProfileFields, ServiceError, User};
use crate::state::AppState;
use crate::storage::Database;
use crate::utils::is_valid_email;

/// Map an external subject onto the internal user record, creating it on
/// first sight and refreshing email/name fields afterwards.
///
/// The superuser flag of an existing user is never touched here.
pub fn resolve_or_create_user(
    state: &AppState,
    external_subject: &str,
    email: &str,
    profile: ProfileFields,
) -> Result<User, ServiceError> {
    if external_subject.trim().is_empty() {
        return Err(ServiceError::BadRequest("External subject is required".to_string()));
    }
    if !is_valid_email(email) {
        error!("❌ Invalid email on sign-in for subject: {}", external_subject);
        return Err(ServiceError::BadRequest(format!("Invalid email address: {}", email)));
    }

    if let Some(existing) = state.db.find_user_by_subject(external_subject)? {
        return refresh_user(&state.db, existing, email, profile);
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        external_subject: external_subject.to_string(),
        email: email.trim().to_string(),
        first_name: profile.first_name,
        last_name: profile.last_name,
        avatar_url: None,
        is_superuser: false,
        settings: Default::default(),
        created_at: Utc::now(),
        updated_at: None,
    };

    let user = match state.db.insert_user(user) {
        Ok(user) => user,
        // A concurrent sign-in for the same subject won the insert
        Err(ServiceError::AlreadyExists(_)) => {
            return state
                .db
                .find_user_by_subject(external_subject)?
                .ok_or_else(|| ServiceError::NotFound("User not found".to_string()));
        }
        Err(err) => return Err(err),
    };

    info!("✅ Created user: {} for subject: {}", user.id, external_subject);

    match provision_initial_superuser(&state.db, state.config.initial_superuser_email.as_deref())? {
        Some(promoted) if promoted.id == user.id => Ok(promoted),
        _ => Ok(user),
    }
}

fn refresh_user(
    db: &Database,
    user: User,
    email: &str,
    profile: ProfileFields,
) -> Result<User, ServiceError> {
    let email = email.trim().to_string();
    let unchanged = user.email == email
        && profile.first_name.as_ref().map_or(true, |n| user.first_name.as_ref() == Some(n))
        && profile.last_name.as_ref().map_or(true, |n| user.last_name.as_ref() == Some(n));
    if unchanged {
        return Ok(user);
    }

    let user = db.update_user(&user.id, |stored| {
        stored.email = email;
        if profile.first_name.is_some() {
            stored.first_name = profile.first_name;
        }
        if profile.last_name.is_some() {
            stored.last_name = profile.last_name;
        }
    })?;

    info!("✅ Refreshed profile for user: {}", user.id);
    Ok(user)
}

/// One-time bootstrap of the first superuser.
///
/// Promotes the user registered under `email` only while the system has no
/// superuser at all. Once any superuser exists this does nothing, so reusing
/// the configured address later grants no privileges.
pub fn provision_initial_superuser(
    db: &Database,
    email: Option<&str>,
) -> Result<Option<User>, ServiceError> {
    let Some(email) = email else {
        return Ok(None);
    };
    let Some(user) = db.promote_first_superuser(email)? else {
        return Ok(None);
    };

    info!("👑 Provisioned initial superuser: {} ({})", user.id, user.email);
    Ok(Some(user))
}

pub fn require_authenticated_user(
    db: &Database,
    identity: Option<&Claims>,
) -> Result<User, ServiceError> {
    let claims = identity.ok_or_else(|| {
        error!("❌ Request without caller identity");
        ServiceError::Unauthenticated
    })?;

    db.find_user_by_subject(&claims.sub)?.ok_or_else(|| {
        error!("❌ No user record for subject: {}", claims.sub);
        ServiceError::NotFound("User not found".to_string())
    })
}

pub fn require_superuser(db: &Database, identity: Option<&Claims>) -> Result<User, ServiceError> {
    let user = require_authenticated_user(db, identity)?;
    ensure_superuser(&user)?;
    Ok(user)
}

pub fn ensure_superuser(user: &User) -> Result<(), ServiceError> {
    if user.is_superuser {
        Ok(())
    } else {
        error!("❌ User: {} is not a superuser", user.id);
        Err(ServiceError::NotAuthorized(
            "Requires superuser access".to_string(),
        ))
    }
}
