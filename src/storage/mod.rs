// teamspace-service/src/storage/mod.rs
//
// In-process document store holding the four collections (users, teams,
// teamMembers, files). Each storage call is one serialized transaction:
// reads share the lock, writes take it exclusively and, when a data
// directory is configured, are staged on a copy and snapshotted to disk
// before being swapped in.
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use crate::config::Config;
use crate::models::{FileId, FileRecord, Membership, ServiceError, Team, TeamId, User, UserId};

pub mod file_storage;
pub mod team_storage;
pub mod user_storage;

const SNAPSHOT_FILE: &str = "teamspace.json";

#[derive(Serialize, Deserialize, Default, Clone)]
pub(crate) struct Tables {
    pub users: HashMap<UserId, User>,
    pub teams: HashMap<TeamId, Team>,
    pub team_members: HashMap<String, Membership>,
    pub files: HashMap<FileId, FileRecord>,
    // Unique index on users.external_subject
    #[serde(skip)]
    pub users_by_subject: HashMap<String, UserId>,
    // Unique index on teamMembers.(user_id, team_id)
    #[serde(skip)]
    pub members_by_user_team: HashMap<(UserId, TeamId), String>,
}

impl Tables {
    fn rebuild_indexes(&mut self) {
        self.users_by_subject = self
            .users
            .values()
            .map(|user| (user.external_subject.clone(), user.id.clone()))
            .collect();
        self.members_by_user_team = self
            .team_members
            .values()
            .map(|m| ((m.user_id.clone(), m.team_id.clone()), m.id.clone()))
            .collect();
    }
}

pub struct Database {
    tables: RwLock<Tables>,
    snapshot_path: Option<PathBuf>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            snapshot_path: None,
        }
    }

    // Open a store persisted under `data_dir`, loading the last snapshot if any
    pub fn open(data_dir: &Path) -> Result<Self, ServiceError> {
        fs::create_dir_all(data_dir).map_err(|e| {
            error!("❌ Failed to create data directory {:?}: {:?}", data_dir, e);
            ServiceError::Storage("Failed to create data directory".to_string())
        })?;

        let snapshot_path = data_dir.join(SNAPSHOT_FILE);
        let mut tables = if snapshot_path.exists() {
            let content = fs::read_to_string(&snapshot_path).map_err(|e| {
                error!("❌ Failed to read snapshot {:?}: {:?}", snapshot_path, e);
                ServiceError::Storage("Failed to read snapshot".to_string())
            })?;
            serde_json::from_str::<Tables>(&content).map_err(|e| {
                error!("❌ Failed to parse snapshot {:?}: {:?}", snapshot_path, e);
                ServiceError::Storage("Snapshot is corrupt".to_string())
            })?
        } else {
            Tables::default()
        };
        tables.rebuild_indexes();

        info!(
            "📂 Opened store at {:?} ({} users, {} teams, {} files)",
            snapshot_path,
            tables.users.len(),
            tables.teams.len(),
            tables.files.len()
        );

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: Some(snapshot_path),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        match &config.data_dir {
            Some(dir) => Self::open(dir),
            None => Ok(Self::in_memory()),
        }
    }

    pub(crate) fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, ServiceError> {
        self.tables.read().map_err(|e| {
            error!("❌ Store lock poisoned: {:?}", e);
            ServiceError::Storage("Store lock poisoned".to_string())
        })
    }

    // Run `apply` as one write transaction. `apply` must finish its checks
    // before it mutates anything; with a snapshot configured, a failed disk
    // write also leaves memory untouched.
    pub(crate) fn write<T>(
        &self,
        apply: impl FnOnce(&mut Tables) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut tables = self.tables.write().map_err(|e| {
            error!("❌ Store lock poisoned: {:?}", e);
            ServiceError::Storage("Store lock poisoned".to_string())
        })?;

        match &self.snapshot_path {
            Some(path) => {
                let mut staged = tables.clone();
                let out = apply(&mut staged)?;
                write_snapshot(path, &staged)?;
                *tables = staged;
                Ok(out)
            }
            None => apply(&mut tables),
        }
    }
}

fn write_snapshot(path: &Path, tables: &Tables) -> Result<(), ServiceError> {
    let json = serde_json::to_string_pretty(tables).map_err(|e| {
        error!("❌ Failed to serialize store: {:?}", e);
        ServiceError::Storage("Failed to serialize store".to_string())
    })?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .and_then(|_| fs::rename(&tmp_path, path))
        .map_err(|e| {
            error!("❌ Failed to write snapshot {:?}: {:?}", path, e);
            ServiceError::Storage("Failed to write snapshot".to_string())
        })?;

    debug!("Wrote snapshot {:?}", path);
    Ok(())
}
