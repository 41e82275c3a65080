//! Exploration mode: follow-up prompts generated from past entries.
//!
//! ## Components
//!
//! - [`templates`]: the five [`ExplorationType`]s and their generation templates
//! - [`cleanup`]: heuristic extraction of the prompt from a backend's raw output
//! - [`engine`]: [`ExplorationEngine`], type selection and generation
//!
//! ## Example
//!
//! ```
//! use reflector::explore::{ExplorationType, clean_generated_prompt};
//!
//! let kind: ExplorationType = "deepen".parse().unwrap();
//! assert_eq!(kind.context(), "Generated using 'deepen' template");
//!
//! let raw = "Create a new prompt that:\n1. Goes deeper\nNew Prompt:\nWhy does this fail under load?";
//! assert_eq!(clean_generated_prompt(raw), "Why does this fail under load?");
//! ```

pub mod cleanup;
pub mod engine;
pub mod templates;

pub use cleanup::clean_generated_prompt;
pub use engine::{ExplorationEngine, ExplorationOutcome, MultiExploration, RecentExploration};
pub use templates::ExplorationType;
