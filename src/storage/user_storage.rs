// teamspace-service/src/storage/user_storage.rs
use chrono::Utc;
use log::{error, warn};

use crate::models::{ServiceError, User};
use crate::storage::Database;

impl Database {
    // Insert a new user; the external subject must be unused
    pub fn insert_user(&self, user: User) -> Result<User, ServiceError> {
        self.write(|tables| {
            if tables.users_by_subject.contains_key(&user.external_subject) {
                error!("❌ External subject already registered: {}", user.external_subject);
                return Err(ServiceError::AlreadyExists(
                    "A user with this external subject already exists".to_string(),
                ));
            }
            tables
                .users_by_subject
                .insert(user.external_subject.clone(), user.id.clone());
            tables.users.insert(user.id.clone(), user.clone());
            Ok(user)
        })
    }

    /// Apply `change` to the stored user inside one write transaction.
    ///
    /// Callers never write back a copy they read earlier, so fields `change`
    /// leaves alone (the superuser flag in particular) keep whatever value is
    /// stored at commit time. The id and subject are immutable.
    pub fn update_user(
        &self,
        id: &str,
        change: impl FnOnce(&mut User),
    ) -> Result<User, ServiceError> {
        self.write(|tables| {
            let stored = tables
                .users
                .get(id)
                .ok_or_else(|| ServiceError::NotFound(format!("User {}", id)))?;
            let mut user = stored.clone();
            change(&mut user);
            if user.id != stored.id || user.external_subject != stored.external_subject {
                return Err(ServiceError::BadRequest(
                    "External subject cannot be changed".to_string(),
                ));
            }
            user.updated_at = Some(Utc::now());
            tables.users.insert(user.id.clone(), user.clone());
            Ok(user)
        })
    }

    // Grant or revoke the superuser flag. The last-superuser count is taken
    // under the same write lock as the change.
    pub fn set_superuser_flag(&self, id: &str, is_superuser: bool) -> Result<User, ServiceError> {
        self.write(|tables| {
            let superusers = tables.users.values().filter(|u| u.is_superuser).count();
            let user = tables
                .users
                .get_mut(id)
                .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

            if user.is_superuser == is_superuser {
                return Ok(user.clone());
            }
            if !is_superuser && superusers <= 1 {
                warn!("⚠️ Refused to demote the last superuser: {}", id);
                return Err(ServiceError::InvariantViolation(
                    "Cannot remove the last superuser".to_string(),
                ));
            }
            user.is_superuser = is_superuser;
            user.updated_at = Some(Utc::now());
            Ok(user.clone())
        })
    }

    // Promote the user registered under `email`, only while no superuser exists
    pub fn promote_first_superuser(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let email = email.trim().to_lowercase();
        self.write(|tables| {
            if tables.users.values().any(|u| u.is_superuser) {
                return Ok(None);
            }
            let Some(user) = tables
                .users
                .values_mut()
                .find(|u| u.email.to_lowercase() == email)
            else {
                return Ok(None);
            };
            user.is_superuser = true;
            user.updated_at = Some(Utc::now());
            Ok(Some(user.clone()))
        })
    }

    pub fn find_user_by_id(&self, id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    pub fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, ServiceError> {
        let tables = self.read()?;
        Ok(tables
            .users_by_subject
            .get(subject)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    // Case-insensitive email lookup (no index; scans the collection)
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .read()?
            .users
            .values()
            .find(|user| user.email.to_lowercase() == email)
            .cloned())
    }

    pub fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}
