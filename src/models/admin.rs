use serde::{Deserialize, Serialize};

use crate::models::Team;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TeamWithStats {
    #[serde(flatten)]
    pub team: Team,
    pub member_count: usize,
    pub storage_used: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_teams: usize,
    pub total_users: usize,
    pub total_memberships: usize,
    pub total_storage: u64,
    pub teams_created_last_30_days: usize,
    pub users_created_last_30_days: usize,
    pub average_members_per_team: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SetSuperuserRequest {
    pub is_superuser: bool,
}
