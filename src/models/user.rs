use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TeamRole;

pub type UserId = String;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub external_subject: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub is_superuser: bool,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct UserSettings {
    pub theme: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NotificationSettings {
    pub email_notifications: Option<bool>,
    pub push_notifications: Option<bool>,
    pub notification_types: Option<Vec<String>>,
}

impl NotificationSettings {
    // Provided fields win, missing ones keep their stored value
    pub fn merge(&mut self, patch: NotificationSettings) {
        if patch.email_notifications.is_some() {
            self.email_notifications = patch.email_notifications;
        }
        if patch.push_notifications.is_some() {
            self.push_notifications = patch.push_notifications;
        }
        if patch.notification_types.is_some() {
            self.notification_types = patch.notification_types;
        }
    }
}

// JWT claims issued by the external identity provider
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String, // Stable external subject
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

// Optional name fields carried along with a sign-in
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&Claims> for ProfileFields {
    fn from(claims: &Claims) -> Self {
        Self {
            first_name: claims.given_name.clone(),
            last_name: claims.family_name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct UserSettingsPatch {
    pub theme: Option<String>,
    pub timezone: Option<String>,
    pub notifications: Option<NotificationSettings>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub settings: Option<UserSettingsPatch>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UpdateAvatarRequest {
    pub avatar_url: String,
}

// A team as seen from one of its members
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserTeamEntry {
    pub team_id: String,
    pub name: String,
    pub role: TeamRole,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub teams: Vec<UserTeamEntry>,
}
