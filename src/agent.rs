//! The reflection agent: stores, review pipeline and exploration engine wired together.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::backend::Backend;
use crate::config::ReflectorConfig;
use crate::errors::{AgentError, StoreError};
use crate::explore::ExplorationEngine;
use crate::models::Entry;
use crate::review::ReviewPipeline;
use crate::stats::EntryStats;
use crate::store::{EntryStore, ExplorationStore};

/// Model name recorded when neither the caller nor a backend provides one.
pub const UNKNOWN_MODEL: &str = "unknown";

pub struct ReflectionAgent {
    entries: Arc<EntryStore>,
    explorations: Arc<ExplorationStore>,
    pipeline: ReviewPipeline,
    engine: ExplorationEngine,
}

impl ReflectionAgent {
    /// Build the agent over the log directory named by `config`.
    ///
    /// No files are touched until the first write.
    pub fn open(config: &ReflectorConfig) -> Self {
        let entries = Arc::new(
            EntryStore::new(config.responses_path()).with_compact_after(config.compact_after()),
        );
        let explorations = Arc::new(ExplorationStore::new(config.explorations_path()));

        let pipeline = ReviewPipeline::new(Arc::clone(&entries)).with_options(config.generation());
        let mut engine = ExplorationEngine::new(Arc::clone(&entries), Arc::clone(&explorations))
            .with_options(config.generation());
        if let Some(seed) = config.explore().seed {
            engine = engine.with_seed(seed);
        }

        Self {
            entries,
            explorations,
            pipeline,
            engine,
        }
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn explorations(&self) -> &ExplorationStore {
        &self.explorations
    }

    pub fn pipeline(&self) -> &ReviewPipeline {
        &self.pipeline
    }

    pub fn engine(&self) -> &ExplorationEngine {
        &self.engine
    }

    /// Log an interaction that happened elsewhere.
    ///
    /// The model name falls back to the backend's, then to `"unknown"`. With a
    /// backend, `tokens_used` is its estimate for prompt and response together.
    pub fn log_interaction(
        &self,
        prompt: &str,
        response: &str,
        model_name: Option<&str>,
        backend: Option<&dyn Backend>,
    ) -> Result<Uuid, StoreError> {
        let model = match (model_name, backend) {
            (Some(name), _) => name.to_string(),
            (None, Some(backend)) => backend.model_name(),
            (None, None) => UNKNOWN_MODEL.to_string(),
        };
        let mut entry = Entry::new(prompt, response, model);
        if let Some(backend) = backend {
            entry.tokens_used = Some(backend.estimate_tokens(&format!("{prompt}{response}")));
        }
        self.entries.append(&entry)
    }

    /// Generate a response with `backend` and log it.
    ///
    /// A backend with a thinking trace has it stored in `thinking_process`.
    pub fn ask(&self, prompt: &str, backend: &dyn Backend) -> Result<Entry, AgentError> {
        let options = self.pipeline.options();
        let (response, thinking) = match backend.as_thinking() {
            Some(thinking_backend) => {
                let split = thinking_backend.generate_with_thinking(prompt, &options)?;
                let thinking = (!split.thinking.is_empty()).then_some(split.thinking);
                (split.response, thinking)
            }
            None => (backend.generate(prompt, &options)?, None),
        };

        let mut entry = Entry::new(prompt, response, backend.model_name());
        entry.tokens_used = Some(backend.estimate_tokens(&format!("{}{}", prompt, entry.response)));
        entry.thinking_process = thinking;
        self.entries.append(&entry)?;
        info!(entry_id = %entry.id, model = %entry.model_name, "Logged generated response");
        Ok(entry)
    }

    pub fn stats(&self) -> Result<EntryStats, StoreError> {
        EntryStats::collect(&self.entries, &self.explorations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::backend::testing::ScriptedBackend;
    use crate::config::ReflectorToml;
    use tempfile::TempDir;

    fn setup() -> (ReflectionAgent, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut toml = ReflectorToml::default();
        toml.storage.log_dir = dir.path().join("logs");
        toml.explore.seed = Some(5);
        let agent = ReflectionAgent::open(&ReflectorConfig::from_toml(toml));
        (agent, dir)
    }

    #[test]
    fn test_open_writes_into_log_dir() {
        let (agent, dir) = setup();
        agent.log_interaction("p", "r", Some("m"), None).unwrap();
        assert!(dir.path().join("logs/responses.jsonl").exists());
        assert_eq!(agent.explorations().path(), dir.path().join("logs/explorations.jsonl"));
    }

    #[test]
    fn test_log_interaction_model_fallbacks() {
        let (agent, _dir) = setup();
        let backend = ScriptedBackend::constant("unused");

        let explicit = agent.log_interaction("p", "r", Some("gpt-x"), Some(&backend)).unwrap();
        let from_backend = agent.log_interaction("p", "r", None, Some(&backend)).unwrap();
        let unknown = agent.log_interaction("p", "r", None, None).unwrap();

        let get = |id| agent.entries().get(id).unwrap().unwrap();
        assert_eq!(get(explicit).model_name, "gpt-x");
        assert_eq!(get(from_backend).model_name, "scripted");
        assert_eq!(get(unknown).model_name, UNKNOWN_MODEL);
        assert_eq!(get(unknown).tokens_used, None);
    }

    #[test]
    fn test_log_interaction_estimates_tokens() {
        let (agent, _dir) = setup();
        let backend = ScriptedBackend::constant("unused");
        let id = agent
            .log_interaction("12345678", "abcdefgh", None, Some(&backend))
            .unwrap();
        assert_eq!(agent.entries().get(id).unwrap().unwrap().tokens_used, Some(4));
    }

    #[test]
    fn test_ask_logs_response() {
        let (agent, _dir) = setup();
        let backend = ScriptedBackend::constant("Forty-two.");

        let entry = agent.ask("What is the answer?", &backend).unwrap();

        assert_eq!(entry.response, "Forty-two.");
        assert!(entry.thinking_process.is_none());
        assert_eq!(agent.entries().get(entry.id).unwrap(), Some(entry));
    }

    #[test]
    fn test_ask_captures_thinking_trace() {
        let (agent, _dir) = setup();
        let backend = MockBackend::new().with_seed(1).with_thinking(true);

        let entry = agent.ask("Why is the sky blue?", &backend).unwrap();

        assert!(entry.thinking_process.unwrap().contains("Why is the sky blue?"));
    }

    #[test]
    fn test_ask_backend_failure_logs_nothing() {
        let (agent, _dir) = setup();
        let err = agent.ask("hello", &ScriptedBackend::failing()).unwrap_err();
        assert!(matches!(err, AgentError::Backend(_)));
        assert!(agent.entries().is_empty().unwrap());
    }

    #[test]
    fn test_review_and_explore_through_agent() {
        let (agent, _dir) = setup();
        let backend = MockBackend::new().with_seed(2);
        let entry = agent.ask("What is machine learning?", &backend).unwrap();

        let report = agent.pipeline().review_entry(entry.id, &backend).unwrap();
        assert!(report.steps.iter().all(|s| s.success()));

        let result = agent.engine().auto_explore_entry(entry.id, &backend, 3).unwrap();
        assert_eq!(result.successful, 3);

        let stats = agent.stats().unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.scored_entries, 1);
        assert_eq!(stats.total_explorations, 3);
    }
}
