//! Review of logged entries: self-scoring, reflection and revision.
//!
//! ## Components
//!
//! - [`pipeline`]: [`ReviewPipeline`], the per-entry state machine and batch review
//! - [`outcome`]: step outcomes, review reports and batch aggregates

pub mod outcome;
pub mod pipeline;

pub use outcome::{
    BatchEntryResult, BatchReview, ReviewFilter, ReviewReport, ReviewStep, ReviewSummary,
    StepOutcome, StepValue,
};
pub use pipeline::ReviewPipeline;
