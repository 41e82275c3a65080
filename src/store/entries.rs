//! Entry persistence and queries.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::{CompactionReport, JsonlLog, Records};
use crate::errors::StoreError;
use crate::models::{Entry, EntryUpdate};

/// Durable, queryable record of logged interactions.
pub struct EntryStore {
    log: JsonlLog<Entry>,
}

impl EntryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            log: JsonlLog::new(path),
        }
    }

    pub fn with_compact_after(mut self, compact_after: usize) -> Self {
        self.log = self.log.with_compact_after(compact_after);
        self
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    /// Persist a new entry and return its id.
    pub fn append(&self, entry: &Entry) -> Result<Uuid, StoreError> {
        let id = self.log.append(entry)?;
        debug!(entry_id = %id, model = %entry.model_name, "Logged entry");
        Ok(id)
    }

    /// Build and persist an entry from its parts.
    pub fn log_response(
        &self,
        prompt: &str,
        response: &str,
        model_name: &str,
        tokens_used: Option<u32>,
        metadata: BTreeMap<String, Value>,
    ) -> Result<Uuid, StoreError> {
        let mut entry = Entry::new(prompt, response, model_name);
        entry.tokens_used = tokens_used;
        entry.metadata = metadata;
        self.append(&entry)
    }

    pub fn read_all(&self) -> Result<Records<Entry>, StoreError> {
        self.log.read_all()
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Entry>, StoreError> {
        self.log.get(id)
    }

    /// Apply caller-driven field changes. Returns `false` if the id is unknown.
    pub fn update(&self, id: Uuid, changes: EntryUpdate) -> Result<bool, StoreError> {
        let updated = self.log.modify(id, |entry| changes.apply(entry))?;
        Ok(updated.is_some())
    }

    /// Most recent entries first, at most `limit`.
    pub fn recent(&self, limit: usize) -> Result<Vec<Entry>, StoreError> {
        let mut entries: Vec<Entry> = self.read_all()?.collect::<Result<_, _>>()?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Case-insensitive substring search over one text field.
    ///
    /// Entries where the field is unset, or the field name is unknown, never match.
    pub fn search(&self, query: &str, field: &str) -> Result<Vec<Entry>, StoreError> {
        let needle = query.to_lowercase();
        let mut found = Vec::new();
        for entry in self.read_all()? {
            let entry = entry?;
            if entry
                .text_field(field)
                .is_some_and(|value| value.to_lowercase().contains(&needle))
            {
                found.push(entry);
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

    pub fn compact(&self) -> Result<CompactionReport, StoreError> {
        self.log.compact()
    }
}
