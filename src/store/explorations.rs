use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{JsonlLog, Records};
use crate::errors::StoreError;
use crate::models::Exploration;

/// Append-only record of generated exploration prompts.
pub struct ExplorationStore {
    log: JsonlLog<Exploration>,
}

impl ExplorationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: JsonlLog::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    pub fn append(&self, exploration: &Exploration) -> Result<Uuid, StoreError> {
        self.log.append(exploration)
    }

    pub fn read_all(&self) -> Result<Records<Exploration>, StoreError> {
        self.log.read_all()
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Exploration>, StoreError> {
        self.log.get(id)
    }

    /// Explorations generated from one entry, newest first.
    pub fn for_entry(&self, entry_id: Uuid) -> Result<Vec<Exploration>, StoreError> {
        let mut found = Vec::new();
        for exploration in self.read_all()? {
            let exploration = exploration?;
            if exploration.original_entry_id == entry_id {
                found.push(exploration);
            }
        }
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    /// Case-insensitive search over the generated prompt and its context.
    pub fn search(&self, query: &str) -> Result<Vec<Exploration>, StoreError> {
        let needle = query.to_lowercase();
        let mut found = Vec::new();
        for exploration in self.read_all()? {
            let exploration = exploration?;
            if exploration.generated_prompt.to_lowercase().contains(&needle)
                || exploration.context.to_lowercase().contains(&needle)
            {
                found.push(exploration);
            }
        }
        Ok(found)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        self.log.len()
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        self.log.is_empty()
    }
}
