//! Self-evaluation support.
//!
//! - [`parse_scores`]: turn a backend's free-text evaluation into a [`Score`]
//! - [`scoring_prompt`], [`reflection_prompt`], [`revision_prompt`]: fixed prompt templates
//! - [`overall_score`]: weighted aggregate of a score

mod parser;
mod prompts;

pub use parser::{ScoreParser, parse_scores};
pub use prompts::{
    REFLECTION_PROMPT_TEMPLATE, REVISION_PROMPT_TEMPLATE, SCORING_PROMPT_TEMPLATE,
    reflection_prompt, revision_prompt, scoring_prompt,
};

use serde::Serialize;

use crate::models::Score;

/// Mean of the mandatory metrics; when creativity is present it counts for a quarter.
pub fn overall_score(score: &Score) -> f64 {
    let base = (score.clarity + score.usefulness + score.alignment) / 3.0;
    match score.creativity {
        Some(creativity) => (base * 3.0 + creativity) / 4.0,
        None => base,
    }
}

/// Flattened score with its overall value, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub clarity: f64,
    pub usefulness: f64,
    pub alignment: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creativity: Option<f64>,
    pub overall: f64,
}

impl From<&Score> for ScoreSummary {
    fn from(score: &Score) -> Self {
        Self {
            clarity: score.clarity,
            usefulness: score.usefulness,
            alignment: score.alignment,
            creativity: score.creativity,
            overall: overall_score(score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_score_without_creativity_is_mean() {
        let score = Score::new(8.0, 6.0, 10.0, None).unwrap();
        assert!((overall_score(&score) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_score_with_creativity_is_weighted() {
        let score = Score::new(8.0, 6.0, 10.0, Some(4.0)).unwrap();
        assert!((overall_score(&score) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_summary_carries_overall() {
        let score = Score::new(9.0, 9.0, 9.0, None).unwrap();
        let summary = ScoreSummary::from(&score);
        assert!((summary.overall - 9.0).abs() < 1e-9);
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("creativity").is_none());
    }
}
