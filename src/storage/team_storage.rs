// teamspace-service/src/storage/team_storage.rs
use log::error;

use crate::models::{Membership, ServiceError, Team, TeamRole};
use crate::storage::Database;

impl Database {
    pub fn insert_team(&self, team: Team) -> Result<Team, ServiceError> {
        self.write(|tables| {
            if tables.teams.contains_key(&team.id) {
                return Err(ServiceError::AlreadyExists(format!("Team {}", team.id)));
            }
            tables.teams.insert(team.id.clone(), team.clone());
            Ok(team)
        })
    }

    pub fn save_team(&self, team: &Team) -> Result<(), ServiceError> {
        self.write(|tables| {
            if !tables.teams.contains_key(&team.id) {
                return Err(ServiceError::NotFound(format!("Team {}", team.id)));
            }
            tables.teams.insert(team.id.clone(), team.clone());
            Ok(())
        })
    }

    pub fn find_team_by_id(&self, id: &str) -> Result<Option<Team>, ServiceError> {
        Ok(self.read()?.teams.get(id).cloned())
    }

    // Returns false when the team was already gone
    pub fn delete_team(&self, id: &str) -> Result<bool, ServiceError> {
        self.write(|tables| Ok(tables.teams.remove(id).is_some()))
    }

    pub fn list_teams(&self) -> Result<Vec<Team>, ServiceError> {
        let mut teams: Vec<Team> = self.read()?.teams.values().cloned().collect();
        teams.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(teams)
    }

    // Insert a membership, enforcing the (user_id, team_id) uniqueness constraint
    pub fn insert_membership(&self, membership: Membership) -> Result<Membership, ServiceError> {
        self.write(|tables| {
            let key = (membership.user_id.clone(), membership.team_id.clone());
            if tables.members_by_user_team.contains_key(&key) {
                error!(
                    "❌ Duplicate membership for user: {} in team: {}",
                    membership.user_id, membership.team_id
                );
                return Err(ServiceError::AlreadyExists(
                    "User is already a member of this team".to_string(),
                ));
            }
            tables.members_by_user_team.insert(key, membership.id.clone());
            tables
                .team_members
                .insert(membership.id.clone(), membership.clone());
            Ok(membership)
        })
    }

    pub fn find_membership(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<Option<Membership>, ServiceError> {
        let tables = self.read()?;
        Ok(tables
            .members_by_user_team
            .get(&(user_id.to_string(), team_id.to_string()))
            .and_then(|id| tables.team_members.get(id))
            .cloned())
    }

    pub fn get_team_members(&self, team_id: &str) -> Result<Vec<Membership>, ServiceError> {
        let mut members: Vec<Membership> = self
            .read()?
            .team_members
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
        Ok(members)
    }

    pub fn get_memberships_for_user(&self, user_id: &str) -> Result<Vec<Membership>, ServiceError> {
        let mut memberships: Vec<Membership> = self
            .read()?
            .team_members
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
        Ok(memberships)
    }

    pub fn count_memberships(&self) -> Result<usize, ServiceError> {
        Ok(self.read()?.team_members.len())
    }

    pub fn update_membership_role(
        &self,
        membership_id: &str,
        role: TeamRole,
    ) -> Result<Membership, ServiceError> {
        self.write(|tables| match tables.team_members.get_mut(membership_id) {
            Some(membership) => {
                membership.role = role;
                Ok(membership.clone())
            }
            None => Err(ServiceError::NotFound("Member not found".to_string())),
        })
    }

    // Returns false when the membership was already gone
    pub fn delete_membership(&self, membership_id: &str) -> Result<bool, ServiceError> {
        self.write(|tables| match tables.team_members.remove(membership_id) {
            Some(membership) => {
                tables
                    .members_by_user_team
                    .remove(&(membership.user_id, membership.team_id));
                Ok(true)
            }
            None => Ok(false),
        })
    }

    // Remove every membership of a team, returning how many were deleted
    pub fn delete_team_members(&self, team_id: &str) -> Result<usize, ServiceError> {
        self.write(|tables| {
            let doomed: Vec<String> = tables
                .team_members
                .values()
                .filter(|m| m.team_id == team_id)
                .map(|m| m.id.clone())
                .collect();
            for id in &doomed {
                if let Some(membership) = tables.team_members.remove(id) {
                    tables
                        .members_by_user_team
                        .remove(&(membership.user_id, membership.team_id));
                }
            }
            Ok(doomed.len())
        })
    }
}
