//! Result types for the review pipeline.
//!
//! Step failures are carried as data: a [`ReviewReport`] always lists which steps
//! ran, what each produced, and why any of them failed.
//!
//! ## Example
//!
//! ```
//! use reflector::errors::StepError;
//! use reflector::review::{ReviewStep, StepOutcome, StepValue};
//!
//! let ok = StepOutcome::succeeded(ReviewStep::Reflection, StepValue::Reflection("Fine.".into()), None);
//! let failed = StepOutcome::failed(ReviewStep::Scoring, StepError::ParseFailure, Some("no scores".into()));
//!
//! assert!(ok.success());
//! assert_eq!(ok.text(), Some("Fine."));
//! assert!(!failed.success());
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::errors::StepError;
use crate::models::{Entry, Score};
use crate::scoring::ScoreSummary;

/// The three review steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStep {
    Scoring,
    Reflection,
    Revision,
}

impl ReviewStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStep::Scoring => "scoring",
            ReviewStep::Reflection => "reflection",
            ReviewStep::Revision => "revision",
        }
    }
}

impl fmt::Display for ReviewStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful step produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StepValue {
    Score(Score),
    Reflection(String),
    Revision(String),
}

/// Outcome of one review step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: ReviewStep,
    pub value: Option<StepValue>,
    pub error: Option<StepError>,
    /// Backend output a scoring step parsed, kept for diagnosis
    pub raw_response: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(step: ReviewStep, value: StepValue, raw_response: Option<String>) -> Self {
        Self {
            step,
            value: Some(value),
            error: None,
            raw_response,
        }
    }

    pub fn failed(step: ReviewStep, error: StepError, raw_response: Option<String>) -> Self {
        Self {
            step,
            value: None,
            error: Some(error),
            raw_response,
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn score(&self) -> Option<&Score> {
        match &self.value {
            Some(StepValue::Score(score)) => Some(score),
            _ => None,
        }
    }

    /// Text produced by a reflection or revision step.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(StepValue::Reflection(text)) | Some(StepValue::Revision(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Result of reviewing one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewReport {
    pub entry_id: Uuid,
    /// Steps that ran, in scoring, reflection, revision order
    pub steps: Vec<StepOutcome>,
    /// The entry with every successfully staged field applied
    pub entry: Entry,
}

impl ReviewReport {
    /// True when the entry needed no work.
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn any_succeeded(&self) -> bool {
        self.steps.iter().any(StepOutcome::success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.success())
    }
}

/// Per-id result inside a batch review.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntryResult {
    Reviewed { report: ReviewReport },
    NotFound { entry_id: Uuid },
}

impl BatchEntryResult {
    pub fn entry_id(&self) -> Uuid {
        match self {
            BatchEntryResult::Reviewed { report } => report.entry_id,
            BatchEntryResult::NotFound { entry_id } => *entry_id,
        }
    }
}

/// Aggregate result of reviewing several entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReview {
    pub total: usize,
    /// Entries where at least one step succeeded
    pub successful: usize,
    /// Unknown ids and entries where every step failed
    pub failed: usize,
    /// Entries that were already fully reviewed
    pub skipped: usize,
    pub results: Vec<BatchEntryResult>,
}

impl BatchReview {
    pub(crate) fn record(&mut self, result: BatchEntryResult) {
        match &result {
            BatchEntryResult::NotFound { .. } => self.failed += 1,
            BatchEntryResult::Reviewed { report } if report.is_noop() => self.skipped += 1,
            BatchEntryResult::Reviewed { report } if report.any_succeeded() => self.successful += 1,
            BatchEntryResult::Reviewed { .. } => self.failed += 1,
        }
        self.results.push(result);
    }
}

/// Which entries [`reviewable_entries`](super::ReviewPipeline::reviewable_entries) returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub unscored_only: bool,
    pub unreflected_only: bool,
}

impl ReviewFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        !(self.unscored_only && entry.is_scored()) && !(self.unreflected_only && entry.is_reflected())
    }
}

/// Review state of one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub entry_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub model_name: String,
    pub has_score: bool,
    pub has_reflection: bool,
    pub has_revision: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreSummary>,
}

impl From<&Entry> for ReviewSummary {
    fn from(entry: &Entry) -> Self {
        Self {
            entry_id: entry.id,
            timestamp: entry.timestamp,
            model_name: entry.model_name.clone(),
            has_score: entry.is_scored(),
            has_reflection: entry.is_reflected(),
            has_revision: entry.is_revised(),
            score: entry.score.as_ref().map(ScoreSummary::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(steps: Vec<StepOutcome>) -> ReviewReport {
        let entry = Entry::new("p", "r", "m");
        ReviewReport {
            entry_id: entry.id,
            steps,
            entry,
        }
    }

    #[test]
    fn test_batch_counts() {
        let mut batch = BatchReview::default();
        batch.record(BatchEntryResult::NotFound {
            entry_id: Uuid::new_v4(),
        });
        batch.record(BatchEntryResult::Reviewed { report: report(vec![]) });
        batch.record(BatchEntryResult::Reviewed {
            report: report(vec![
                StepOutcome::failed(ReviewStep::Scoring, StepError::ParseFailure, None),
                StepOutcome::succeeded(ReviewStep::Reflection, StepValue::Reflection("ok".into()), None),
            ]),
        });
        batch.record(BatchEntryResult::Reviewed {
            report: report(vec![StepOutcome::failed(
                ReviewStep::Scoring,
                StepError::ParseFailure,
                None,
            )]),
        });

        assert_eq!(batch.results.len(), 4);
        assert_eq!((batch.successful, batch.failed, batch.skipped), (1, 2, 1));
    }

    #[test]
    fn test_review_filter() {
        let mut entry = Entry::new("p", "r", "m");
        assert!(ReviewFilter { unscored_only: true, unreflected_only: true }.matches(&entry));

        entry.reflection = Some("done".into());
        assert!(ReviewFilter { unscored_only: true, unreflected_only: false }.matches(&entry));
        assert!(!ReviewFilter { unscored_only: false, unreflected_only: true }.matches(&entry));
        assert!(ReviewFilter::default().matches(&entry));
    }

    #[test]
    fn test_step_outcome_serializes_error_kind() {
        let outcome = StepOutcome::failed(ReviewStep::Scoring, StepError::ParseFailure, None);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["step"], "scoring");
        assert_eq!(value["error"]["kind"], "parse_failure");
    }

    #[test]
    fn test_summary_from_entry() {
        let mut entry = Entry::new("p", "r", "m");
        entry.score = Some(Score::new(6.0, 6.0, 6.0, None).unwrap());
        let summary = ReviewSummary::from(&entry);
        assert!(summary.has_score);
        assert!(!summary.has_revision);
        assert_eq!(summary.score.unwrap().overall, 6.0);
    }
}
