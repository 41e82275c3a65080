//! Generation of follow-up prompts from past entries.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cleanup::clean_generated_prompt;
use super::templates::ExplorationType;
use crate::backend::{Backend, GenerateOptions};
use crate::errors::{ExploreError, StepError, StoreError};
use crate::models::{Entry, Exploration};
use crate::store::{EntryStore, ExplorationStore};

/// Responses longer than this get a `deepen` exploration.
const DEEPEN_MIN_RESPONSE_CHARS: usize = 200;
const OPINION_WORDS: [&str; 6] = ["should", "could", "might", "recommend", "suggest", "believe"];
const EXPLANATORY_WORDS: [&str; 3] = ["how", "what", "explain"];

/// Result of one generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorationOutcome {
    pub entry_id: Uuid,
    pub exploration_type: ExplorationType,
    /// The stored record, on success
    pub exploration: Option<Exploration>,
    pub error: Option<StepError>,
}

impl ExplorationOutcome {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn generated_prompt(&self) -> Option<&str> {
        self.exploration.as_ref().map(|e| e.generated_prompt.as_str())
    }
}

/// Results of generating several explorations for one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiExploration {
    pub entry_id: Uuid,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub explorations: Vec<ExplorationOutcome>,
}

/// Results of exploring the most recent entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecentExploration {
    pub total_entries: usize,
    pub total_explorations: usize,
    pub successful_explorations: usize,
    pub entry_results: Vec<MultiExploration>,
}

pub struct ExplorationEngine {
    entries: Arc<EntryStore>,
    explorations: Arc<ExplorationStore>,
    rng: Mutex<StdRng>,
    options: GenerateOptions,
}

impl ExplorationEngine {
    /// Engine with entropy-seeded type selection.
    pub fn new(entries: Arc<EntryStore>, explorations: Arc<ExplorationStore>) -> Self {
        Self {
            entries,
            explorations,
            rng: Mutex::new(StdRng::from_entropy()),
            options: GenerateOptions::default(),
        }
    }

    /// Seed type selection so the same call sequence picks the same types.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn exploration_store(&self) -> &Arc<ExplorationStore> {
        &self.explorations
    }

    /// Generate one exploration of the named type for an entry.
    ///
    /// Unknown entries and unknown type names fail before anything is generated or
    /// written. A backend failure is reported in the outcome and writes nothing.
    pub fn generate(
        &self,
        entry_id: Uuid,
        type_name: &str,
        backend: &dyn Backend,
    ) -> Result<ExplorationOutcome, ExploreError> {
        let entry = self.find_entry(entry_id)?;
        let kind: ExplorationType = type_name.parse()?;
        Ok(self.generate_for(&entry, kind, backend)?)
    }

    /// Generate one exploration per type, in order.
    pub fn generate_many(
        &self,
        entry_id: Uuid,
        types: &[ExplorationType],
        backend: &dyn Backend,
    ) -> Result<MultiExploration, ExploreError> {
        let entry = self.find_entry(entry_id)?;
        Ok(self.generate_all(&entry, types, backend)?)
    }

    /// Pick types for an entry with [`select_types`](Self::select_types) and generate them.
    pub fn auto_explore_entry(
        &self,
        entry_id: Uuid,
        backend: &dyn Backend,
        max_explorations: usize,
    ) -> Result<MultiExploration, ExploreError> {
        let entry = self.find_entry(entry_id)?;
        let types = self.select_types(&entry, max_explorations);
        Ok(self.generate_all(&entry, &types, backend)?)
    }

    /// Auto-explore the `limit` most recent entries.
    pub fn explore_recent_entries(
        &self,
        backend: &dyn Backend,
        limit: usize,
        per_entry: usize,
    ) -> Result<RecentExploration, StoreError> {
        let recent = self.entries.recent(limit)?;
        let mut summary = RecentExploration {
            total_entries: recent.len(),
            ..Default::default()
        };

        for entry in &recent {
            let types = self.select_types(entry, per_entry);
            let result = self.generate_all(entry, &types, backend)?;
            summary.total_explorations += result.total;
            summary.successful_explorations += result.successful;
            summary.entry_results.push(result);
        }

        info!(
            entries = summary.total_entries,
            explorations = summary.total_explorations,
            successful = summary.successful_explorations,
            "Explored recent entries"
        );
        Ok(summary)
    }

    /// Explorations generated from one entry, newest first.
    pub fn explorations_for_entry(&self, entry_id: Uuid) -> Result<Vec<Exploration>, StoreError> {
        self.explorations.for_entry(entry_id)
    }

    pub fn search_explorations(&self, query: &str) -> Result<Vec<Exploration>, StoreError> {
        self.explorations.search(query)
    }

    /// Choose up to `max_count` distinct exploration types for an entry.
    ///
    /// `deepen` for long responses, `alternative` for opinionated responses and
    /// `application` for explanatory prompts come first; remaining slots are filled
    /// at random from the unused types.
    pub fn select_types(&self, entry: &Entry, max_count: usize) -> Vec<ExplorationType> {
        let mut selected = Vec::new();
        let response = entry.response.to_lowercase();
        let prompt = entry.prompt.to_lowercase();

        if entry.response.chars().count() > DEEPEN_MIN_RESPONSE_CHARS {
            selected.push(ExplorationType::Deepen);
        }
        if OPINION_WORDS.iter().any(|w| response.contains(w)) {
            selected.push(ExplorationType::Alternative);
        }
        if EXPLANATORY_WORDS.iter().any(|w| prompt.contains(w)) {
            selected.push(ExplorationType::Application);
        }

        let mut remaining: Vec<ExplorationType> = ExplorationType::ALL
            .into_iter()
            .filter(|t| !selected.contains(t))
            .collect();
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while selected.len() < max_count && !remaining.is_empty() {
            let index = rng.gen_range(0..remaining.len());
            selected.push(remaining.remove(index));
        }

        selected.truncate(max_count);
        debug!(entry_id = %entry.id, types = ?selected, "Selected exploration types");
        selected
    }

    fn find_entry(&self, entry_id: Uuid) -> Result<Entry, ExploreError> {
        self.entries
            .get(entry_id)?
            .ok_or(ExploreError::NotFound { id: entry_id })
    }

    fn generate_all(
        &self,
        entry: &Entry,
        types: &[ExplorationType],
        backend: &dyn Backend,
    ) -> Result<MultiExploration, StoreError> {
        let mut result = MultiExploration {
            entry_id: entry.id,
            total: types.len(),
            successful: 0,
            failed: 0,
            explorations: Vec::with_capacity(types.len()),
        };
        for &kind in types {
            let outcome = self.generate_for(entry, kind, backend)?;
            if outcome.success() {
                result.successful += 1;
            } else {
                result.failed += 1;
            }
            result.explorations.push(outcome);
        }
        Ok(result)
    }

    fn generate_for(
        &self,
        entry: &Entry,
        kind: ExplorationType,
        backend: &dyn Backend,
    ) -> Result<ExplorationOutcome, StoreError> {
        let raw = match backend.generate(&kind.prompt_for(entry), &self.options) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(entry_id = %entry.id, exploration_type = %kind, error = %e, "Exploration generation failed");
                return Ok(ExplorationOutcome {
                    entry_id: entry.id,
                    exploration_type: kind,
                    exploration: None,
                    error: Some(e.into()),
                });
            }
        };

        let exploration = Exploration::new(entry.id, clean_generated_prompt(&raw), kind.context());
        self.explorations.append(&exploration)?;
        debug!(entry_id = %entry.id, exploration_id = %exploration.id, exploration_type = %kind, "Stored exploration");

        Ok(ExplorationOutcome {
            entry_id: entry.id,
            exploration_type: kind,
            exploration: Some(exploration),
            error: None,
        })
    }
}
