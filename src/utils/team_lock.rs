// teamspace-service/src/utils/team_lock.rs
//
// Per-team serialization point. Every mutation that reads team state and
// then writes based on it (quota check + insert, duplicate-membership
// check + insert, role changes, cascading delete) runs while holding its
// team's mutex, so two such mutations on one team never interleave.
use log::{debug, error};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::ServiceError;

#[derive(Clone, Default)]
pub struct TeamLockRegistry {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl TeamLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, team_id: &str) -> Result<Arc<Mutex<()>>, ServiceError> {
        let mut locks = self.locks.lock().map_err(|e| {
            error!("❌ Lock registry poisoned: {:?}", e);
            ServiceError::Storage(format!("Lock error: {:?}", e))
        })?;
        Ok(locks
            .entry(team_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    // Run `f` while holding the mutex of one team
    pub fn with_team<T>(
        &self,
        team_id: &str,
        f: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let lock = self.lock_for(team_id)?;
        let _guard = lock.lock().map_err(|e| {
            error!("❌ Team lock poisoned for team: {}", team_id);
            ServiceError::Storage(format!("Lock error: {:?}", e))
        })?;
        debug!("Holding team lock for team_id={}", team_id);
        f()
    }

    // Run `f` while holding the mutexes of two teams, taken in ascending id
    // order so concurrent cross-team operations cannot deadlock
    pub fn with_teams<T>(
        &self,
        first: &str,
        second: &str,
        f: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        if first == second {
            return self.with_team(first, f);
        }
        let (low, high) = if first < second { (first, second) } else { (second, first) };
        self.with_team(low, || self.with_team(high, f))
    }

    // Forget a team's mutex once the team is gone
    pub fn release(&self, team_id: &str) -> Result<(), ServiceError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| ServiceError::Storage(format!("Lock error: {:?}", e)))?;
        locks.remove(team_id);
        debug!("Released team lock entry for team_id={}", team_id);
        Ok(())
    }

    // Drop entries nobody is holding or waiting on
    pub fn cleanup_idle_locks(&self) -> Result<usize, ServiceError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| ServiceError::Storage(format!("Lock error: {:?}", e)))?;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let removed = before - locks.len();
        if removed > 0 {
            debug!("Removed {} idle team locks", removed);
        }
        Ok(removed)
    }

    pub fn tracked_teams(&self) -> Result<usize, ServiceError> {
        let locks = self
            .locks
            .lock()
            .map_err(|e| ServiceError::Storage(format!("Lock error: {:?}", e)))?;
        Ok(locks.len())
    }
}
