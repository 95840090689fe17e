// teamspace-service/src/storage/file_storage.rs
use crate::models::{FileRecord, ServiceError};
use crate::storage::Database;

impl Database {
    pub fn insert_file(&self, file: FileRecord) -> Result<FileRecord, ServiceError> {
        self.write(|tables| {
            if tables.files.contains_key(&file.id) {
                return Err(ServiceError::AlreadyExists(format!("File {}", file.id)));
            }
            tables.files.insert(file.id.clone(), file.clone());
            Ok(file)
        })
    }

    // Apply `change` to the stored file in one write transaction. The stored
    // record is the base, so a stale copy can never be written back.
    pub fn patch_file(
        &self,
        id: &str,
        change: impl FnOnce(&mut FileRecord),
    ) -> Result<FileRecord, ServiceError> {
        self.write(|tables| {
            let file = tables
                .files
                .get_mut(id)
                .ok_or_else(|| ServiceError::NotFound(format!("File {}", id)))?;
            change(file);
            Ok(file.clone())
        })
    }

    pub fn find_file_by_id(&self, id: &str) -> Result<Option<FileRecord>, ServiceError> {
        Ok(self.read()?.files.get(id).cloned())
    }

    pub fn delete_file(&self, id: &str) -> Result<bool, ServiceError> {
        self.write(|tables| Ok(tables.files.remove(id).is_some()))
    }

    // All files of a team, newest first (scan of the files collection)
    pub fn get_team_files(&self, team_id: &str) -> Result<Vec<FileRecord>, ServiceError> {
        let mut files: Vec<FileRecord> = self
            .read()?
            .files
            .values()
            .filter(|f| f.team_id == team_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(files)
    }

    // Sum of file sizes for a team, read under one lock
    pub fn team_storage_used(&self, team_id: &str) -> Result<u64, ServiceError> {
        Ok(self
            .read()?
            .files
            .values()
            .filter(|f| f.team_id == team_id)
            .map(|f| f.size)
            .sum())
    }

    pub fn list_files(&self) -> Result<Vec<FileRecord>, ServiceError> {
        Ok(self.read()?.files.values().cloned().collect())
    }

    pub fn delete_team_files(&self, team_id: &str) -> Result<usize, ServiceError> {
        self.write(|tables| {
            let before = tables.files.len();
            tables.files.retain(|_, f| f.team_id != team_id);
            Ok(before - tables.files.len())
        })
    }
}
