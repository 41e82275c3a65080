//! The score → reflect → revise state machine.
//!
//! Each review field moves from absent to present at most once. A review runs only
//! the steps whose field is still absent, stages what succeeds, and commits the
//! staged fields with a single store update. Step failures never abort the review.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::outcome::{
    BatchEntryResult, BatchReview, ReviewFilter, ReviewReport, ReviewStep, ReviewSummary,
    StepOutcome, StepValue,
};
use crate::backend::{Backend, GenerateOptions};
use crate::errors::{ReviewError, StepError, StoreError};
use crate::models::{Entry, EntryUpdate};
use crate::scoring::{parse_scores, reflection_prompt, revision_prompt, scoring_prompt};
use crate::store::EntryStore;

pub struct ReviewPipeline {
    store: Arc<EntryStore>,
    options: GenerateOptions,
}

impl ReviewPipeline {
    pub fn new(store: Arc<EntryStore>) -> Self {
        Self {
            store,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &Arc<EntryStore> {
        &self.store
    }

    pub fn options(&self) -> GenerateOptions {
        self.options
    }

    /// Run every missing review step on one entry.
    ///
    /// Fails only when the entry does not exist or the store fails. Backend errors
    /// and unparsable scores are reported in the returned step list.
    pub fn review_entry(&self, id: Uuid, backend: &dyn Backend) -> Result<ReviewReport, ReviewError> {
        let mut entry = self.store.get(id)?.ok_or(ReviewError::NotFound { id })?;
        let mut staged = EntryUpdate::new();
        let mut steps = Vec::new();

        info!(entry_id = %id, model = %backend.model_name(), "Reviewing entry");

        if entry.score.is_none() {
            let outcome = self.score_entry(&entry, backend);
            if let Some(score) = outcome.score() {
                staged.score = Some(score.clone());
                entry.score = Some(score.clone());
            }
            steps.push(outcome);
        }

        if entry.reflection.is_none() {
            let outcome = self.reflect_on_entry(&entry, backend);
            if let Some(text) = outcome.text() {
                staged.reflection = Some(text.to_string());
                entry.reflection = Some(text.to_string());
            }
            steps.push(outcome);
        }

        if entry.revision.is_none()
            && let Some(reflection) = entry.reflection.clone()
        {
            let outcome = self.revise_entry(&entry, &reflection, backend);
            if let Some(text) = outcome.text() {
                staged.revision = Some(text.to_string());
                entry.revision = Some(text.to_string());
            }
            steps.push(outcome);
        }

        if !staged.is_empty() && !self.store.update(id, staged)? {
            warn!(entry_id = %id, "Entry disappeared before review results were saved");
        }

        debug!(
            entry_id = %id,
            steps = steps.len(),
            failed = steps.iter().filter(|s| !s.success()).count(),
            "Review finished"
        );

        Ok(ReviewReport {
            entry_id: id,
            steps,
            entry,
        })
    }

    /// Ask the backend to score `entry` and parse the answer.
    pub fn score_entry(&self, entry: &Entry, backend: &dyn Backend) -> StepOutcome {
        let raw = match backend.generate(&scoring_prompt(entry), &self.options) {
            Ok(raw) => raw,
            Err(e) => return step_failed(ReviewStep::Scoring, entry, e.into(), None),
        };

        match parse_scores(&raw) {
            Ok(Some(score)) => StepOutcome::succeeded(ReviewStep::Scoring, StepValue::Score(score), Some(raw)),
            Ok(None) => step_failed(ReviewStep::Scoring, entry, StepError::ParseFailure, Some(raw)),
            Err(e) => step_failed(ReviewStep::Scoring, entry, e.into(), Some(raw)),
        }
    }

    /// Ask the backend to reflect on `entry`. Any answer is accepted as-is.
    pub fn reflect_on_entry(&self, entry: &Entry, backend: &dyn Backend) -> StepOutcome {
        match backend.generate(&reflection_prompt(entry), &self.options) {
            Ok(text) => StepOutcome::succeeded(ReviewStep::Reflection, StepValue::Reflection(text), None),
            Err(e) => step_failed(ReviewStep::Reflection, entry, e.into(), None),
        }
    }

    /// Ask the backend for a revised response informed by `reflection`.
    pub fn revise_entry(&self, entry: &Entry, reflection: &str, backend: &dyn Backend) -> StepOutcome {
        match backend.generate(&revision_prompt(entry, reflection), &self.options) {
            Ok(text) => StepOutcome::succeeded(ReviewStep::Revision, StepValue::Revision(text), None),
            Err(e) => step_failed(ReviewStep::Revision, entry, e.into(), None),
        }
    }

    /// Review several entries in order.
    ///
    /// Unknown ids are counted as failed and the batch continues. A store failure
    /// aborts the batch.
    pub fn batch_review(&self, ids: &[Uuid], backend: &dyn Backend) -> Result<BatchReview, StoreError> {
        self.batch_review_with(ids, backend, |_| {})
    }

    /// [`batch_review`](Self::batch_review) with a callback after each entry.
    pub fn batch_review_with(
        &self,
        ids: &[Uuid],
        backend: &dyn Backend,
        mut on_entry: impl FnMut(&BatchEntryResult),
    ) -> Result<BatchReview, StoreError> {
        let mut batch = BatchReview {
            total: ids.len(),
            ..Default::default()
        };

        for &id in ids {
            let result = match self.review_entry(id, backend) {
                Ok(report) => BatchEntryResult::Reviewed { report },
                Err(ReviewError::NotFound { id }) => {
                    warn!(entry_id = %id, "Skipping unknown entry in batch review");
                    BatchEntryResult::NotFound { entry_id: id }
                }
                Err(ReviewError::Store(e)) => return Err(e),
            };
            on_entry(&result);
            batch.record(result);
        }

        info!(
            total = batch.total,
            successful = batch.successful,
            failed = batch.failed,
            skipped = batch.skipped,
            "Batch review finished"
        );
        Ok(batch)
    }

    /// Newest entries first, filtered, at most `limit`.
    pub fn reviewable_entries(&self, limit: usize, filter: ReviewFilter) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .store
            .recent(usize::MAX)?
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .take(limit)
            .collect())
    }

    pub fn review_summary(&self, id: Uuid) -> Result<Option<ReviewSummary>, StoreError> {
        Ok(self.store.get(id)?.as_ref().map(ReviewSummary::from))
    }
}

fn step_failed(step: ReviewStep, entry: &Entry, error: StepError, raw: Option<String>) -> StepOutcome {
    warn!(entry_id = %entry.id, step = %step, error = %error, "Review step failed");
    StepOutcome::failed(step, error, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::ScriptedBackend;
    use crate::errors::BackendError;
    use crate::models::{Score, ScoreError};
    use chrono::{Duration, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (ReviewPipeline, Arc<EntryStore>, TempDir) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = Arc::new(EntryStore::new(dir.path().join("responses.jsonl")));
        (ReviewPipeline::new(Arc::clone(&store)), store, dir)
    }

    fn log(store: &EntryStore, prompt: &str) -> Uuid {
        store.append(&Entry::new(prompt, "Some response.", "mock")).unwrap()
    }

    #[test]
    fn test_review_runs_three_steps_in_order_and_persists() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "What is ownership?");
        let backend = ScriptedBackend::reviewer();

        let report = pipeline.review_entry(id, &backend).unwrap();

        let order: Vec<_> = report.steps.iter().map(|s| s.step).collect();
        assert_eq!(order, [ReviewStep::Scoring, ReviewStep::Reflection, ReviewStep::Revision]);
        assert!(report.steps.iter().all(StepOutcome::success));

        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.score, Some(Score::new(8.0, 7.5, 9.0, None).unwrap()));
        assert_eq!(stored.reflection.as_deref(), Some("Could use a concrete example."));
        assert_eq!(stored.revision.as_deref(), Some("Revised answer with an example."));
        assert_eq!(report.entry, stored);
    }

    #[test]
    fn test_second_review_does_nothing() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "What is ownership?");
        let backend = ScriptedBackend::reviewer();
        pipeline.review_entry(id, &backend).unwrap();
        let before = fs::read(store.path()).unwrap();
        let calls = backend.calls();

        let report = pipeline.review_entry(id, &backend).unwrap();

        assert!(report.is_noop());
        assert_eq!(backend.calls(), calls);
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_review_unknown_id() {
        let (pipeline, _store, _dir) = setup();
        let err = pipeline
            .review_entry(Uuid::new_v4(), &ScriptedBackend::reviewer())
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotFound { .. }));
    }

    #[test]
    fn test_parse_failure_keeps_other_steps() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "Explain lifetimes");
        let backend = ScriptedBackend::constant("I think it was fine.");

        let report = pipeline.review_entry(id, &backend).unwrap();

        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.steps[0].error, Some(StepError::ParseFailure));
        assert_eq!(report.steps[0].raw_response.as_deref(), Some("I think it was fine."));
        assert!(report.steps[1].success());
        assert!(report.steps[2].success());

        let stored = store.get(id).unwrap().unwrap();
        assert!(stored.score.is_none());
        assert_eq!(stored.reflection.as_deref(), Some("I think it was fine."));
        assert!(stored.revision.is_some());
    }

    #[test]
    fn test_failing_backend_records_failures_and_writes_nothing() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "Explain traits");
        let before = fs::read(store.path()).unwrap();

        let report = pipeline.review_entry(id, &ScriptedBackend::failing()).unwrap();

        let order: Vec<_> = report.steps.iter().map(|s| s.step).collect();
        assert_eq!(order, [ReviewStep::Scoring, ReviewStep::Reflection]);
        assert!(matches!(
            report.steps[0].error,
            Some(StepError::Backend { ref message }) if message.contains("backend unavailable")
        ));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "Rate me");
        let backend = ScriptedBackend::new(|prompt| {
            if prompt.contains("Clarity (0-10)") {
                Ok("Clarity: 11\nUsefulness: 5\nAlignment: 5".to_string())
            } else {
                Ok("text".to_string())
            }
        });

        let report = pipeline.review_entry(id, &backend).unwrap();

        assert!(matches!(
            report.steps[0].error,
            Some(StepError::InvalidScore(ScoreError::OutOfRange { ref field, .. })) if field == "clarity"
        ));
        assert!(store.get(id).unwrap().unwrap().score.is_none());
    }

    #[test]
    fn test_revision_uses_stored_reflection() {
        let (pipeline, store, _dir) = setup();
        let mut entry = Entry::new("Explain Rc", "Reference counting.", "mock");
        entry.score = Some(Score::new(5.0, 5.0, 5.0, None).unwrap());
        entry.reflection = Some("Mention Weak.".to_string());
        let id = store.append(&entry).unwrap();
        let backend = ScriptedBackend::reviewer();

        let report = pipeline.review_entry(id, &backend).unwrap();

        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].step, ReviewStep::Revision);
        assert!(backend.prompts()[0].contains("Your Reflection: Mention Weak."));
    }

    #[test]
    fn test_revision_skipped_when_reflection_fails() {
        let (pipeline, store, _dir) = setup();
        let mut entry = Entry::new("Explain Arc", "Atomic reference counting.", "mock");
        entry.score = Some(Score::new(5.0, 5.0, 5.0, None).unwrap());
        let id = store.append(&entry).unwrap();

        let report = pipeline.review_entry(id, &ScriptedBackend::failing()).unwrap();

        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].step, ReviewStep::Reflection);
        assert!(!report.steps[0].success());
    }

    #[test]
    fn test_batch_review_continues_past_unknown_ids() {
        let (pipeline, store, _dir) = setup();
        let first = log(&store, "one");
        let second = log(&store, "two");
        let missing = Uuid::new_v4();
        let backend = ScriptedBackend::reviewer();
        let mut seen = Vec::new();

        let batch = pipeline
            .batch_review_with(&[first, missing, second], &backend, |result| seen.push(result.entry_id()))
            .unwrap();

        assert_eq!(batch.total, 3);
        assert_eq!(batch.successful, 2);
        assert_eq!(batch.failed, 1);
        assert_eq!(seen, [first, missing, second]);
        assert!(store.get(second).unwrap().unwrap().is_fully_reviewed());
    }

    #[test]
    fn test_batch_review_counts_skipped_entries() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "one");
        let backend = ScriptedBackend::reviewer();
        pipeline.review_entry(id, &backend).unwrap();

        let batch = pipeline.batch_review(&[id], &backend).unwrap();
        assert_eq!((batch.successful, batch.failed, batch.skipped), (0, 0, 1));
    }

    #[test]
    fn test_batch_review_all_steps_failing_counts_as_failed() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "one");
        let backend = ScriptedBackend::new(|_| Err(BackendError::EmptyResponse));

        let batch = pipeline.batch_review(&[id], &backend).unwrap();
        assert_eq!(batch.failed, 1);
    }

    #[test]
    fn test_reviewable_entries_newest_first_with_filter() {
        let (pipeline, store, _dir) = setup();
        let now = Utc::now();
        let mut old = Entry::new("old", "r", "m");
        old.timestamp = now - Duration::hours(2);
        let mut scored = Entry::new("scored", "r", "m");
        scored.timestamp = now - Duration::hours(1);
        scored.score = Some(Score::new(5.0, 5.0, 5.0, None).unwrap());
        let mut fresh = Entry::new("fresh", "r", "m");
        fresh.timestamp = now;
        for entry in [&old, &scored, &fresh] {
            store.append(entry).unwrap();
        }

        let all = pipeline.reviewable_entries(10, ReviewFilter::default()).unwrap();
        let prompts: Vec<_> = all.iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, ["fresh", "scored", "old"]);

        let unscored = pipeline
            .reviewable_entries(1, ReviewFilter { unscored_only: true, unreflected_only: false })
            .unwrap();
        assert_eq!(unscored.len(), 1);
        assert_eq!(unscored[0].prompt, "fresh");
    }

    #[test]
    fn test_review_summary() {
        let (pipeline, store, _dir) = setup();
        let id = log(&store, "summary");
        assert!(!pipeline.review_summary(id).unwrap().unwrap().has_score);

        pipeline.review_entry(id, &ScriptedBackend::reviewer()).unwrap();
        let summary = pipeline.review_summary(id).unwrap().unwrap();
        assert!(summary.has_score && summary.has_reflection && summary.has_revision);
        assert!(pipeline.review_summary(Uuid::new_v4()).unwrap().is_none());
    }
}
