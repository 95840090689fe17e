use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{TeamId, UserId};

pub type FileId = String;

// Metadata for externally stored bytes; `storage_key` is opaque to this service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub id: FileId,
    pub team_id: TeamId,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    pub description: Option<String>,
    pub storage_key: String,
    pub metadata: Option<serde_json::Value>,
    pub created_by: UserId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateFileRequest {
    pub name: String,
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
    pub size: u64,
    pub description: Option<String>,
    pub storage_key: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateFileRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MoveFileRequest {
    pub target_team_id: TeamId,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FileListQuery {
    // Epoch millis of the last `created_at` seen on the previous page
    pub cursor: Option<i64>,
    // Id of that last file; breaks ties inside the cursor millisecond
    pub cursor_id: Option<FileId>,
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FilePage {
    pub files: Vec<FileRecord>,
    pub cursor: Option<i64>,
    pub cursor_id: Option<FileId>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StorageSummary {
    pub team_id: TeamId,
    pub total_size: u64,
    pub file_count: usize,
    pub storage_limit: u64,
    pub remaining: u64,
    pub file_types: BTreeMap<String, usize>,
    pub recent_files: usize,
    pub average_file_size: f64,
}
