//! Score parsing from a backend's self-evaluation.
//!
//! The backend is asked to answer in a fixed line format:
//!
//! ```text
//! Clarity: 8.5
//! Usefulness: 7.0
//! Alignment: 9.0
//! Creativity: N/A
//! ```
//!
//! Any other lines (explanations, headings) are ignored.

use tracing::debug;

use crate::models::{Score, ScoreError};

/// Creativity values meaning "no creativity score".
const NOT_APPLICABLE: [&str; 3] = ["n/a", "na", "not applicable"];

#[derive(Debug, Default, Clone, Copy)]
struct ScoreFields {
    clarity: Option<f64>,
    usefulness: Option<f64>,
    alignment: Option<f64>,
    creativity: Option<f64>,
}

/// Parser for `key: value` score lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoreParser;

impl ScoreParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract a score from free text.
    ///
    /// Returns `Ok(None)` when clarity, usefulness or alignment is missing, and
    /// `Err` when all are present but a value falls outside `[0, 10]`. Repeated keys
    /// overwrite earlier ones.
    pub fn parse(&self, text: &str) -> Result<Option<Score>, ScoreError> {
        let mut fields = ScoreFields::default();

        for line in text.lines() {
            let Some((key, value)) = line.trim().split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            let slot = match key.as_str() {
                "clarity" => &mut fields.clarity,
                "usefulness" => &mut fields.usefulness,
                "alignment" => &mut fields.alignment,
                "creativity" => {
                    if NOT_APPLICABLE.contains(&value.to_lowercase().as_str()) {
                        continue;
                    }
                    &mut fields.creativity
                }
                _ => continue,
            };

            match value.parse::<f64>() {
                Ok(number) => *slot = Some(number),
                Err(_) => debug!(key = %key, value = %value, "Ignoring non-numeric score value"),
            }
        }

        let (Some(clarity), Some(usefulness), Some(alignment)) =
            (fields.clarity, fields.usefulness, fields.alignment)
        else {
            return Ok(None);
        };
        Score::new(clarity, usefulness, alignment, fields.creativity).map(Some)
    }
}

/// Convenience function to parse scores without creating a parser.
pub fn parse_scores(text: &str) -> Result<Option<Score>, ScoreError> {
    ScoreParser::new().parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_format_with_na_creativity() {
        let score = parse_scores("Clarity: 8.5\nUsefulness: 7.0\nAlignment: 9.0\nCreativity: N/A")
            .unwrap()
            .unwrap();
        assert_eq!(score.clarity, 8.5);
        assert_eq!(score.usefulness, 7.0);
        assert_eq!(score.alignment, 9.0);
        assert_eq!(score.creativity, None);
    }

    #[test]
    fn test_parse_missing_usefulness_returns_none() {
        let result = parse_scores("Clarity: 8.5\nAlignment: 9.0\nCreativity: 6").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_with_creativity_and_explanations() {
        let text = r#"
Looking at my previous response:

Clarity: 7.8
The response was well structured.

Usefulness: 6.5
It addressed the question.

Alignment: 8.1
Stayed on topic.

Creativity: 5.9
Fairly conventional.
"#;
        let score = parse_scores(text).unwrap().unwrap();
        assert_eq!(score.clarity, 7.8);
        assert_eq!(score.creativity, Some(5.9));
    }

    #[test]
    fn test_parse_keys_are_case_insensitive() {
        let score = parse_scores("CLARITY: 1\nusefulness: 2\nAlIgNmEnT: 3")
            .unwrap()
            .unwrap();
        assert_eq!((score.clarity, score.usefulness, score.alignment), (1.0, 2.0, 3.0));
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        let score = parse_scores("Clarity: 4\nUsefulness: 5\nAlignment: 6\nClarity: 9")
            .unwrap()
            .unwrap();
        assert_eq!(score.clarity, 9.0);
    }

    #[test]
    fn test_parse_ignores_non_numeric_values() {
        let score = parse_scores("Clarity: high\nClarity: 7\nUsefulness: 5\nAlignment: 6\nCreativity: lots")
            .unwrap()
            .unwrap();
        assert_eq!(score.clarity, 7.0);
        assert_eq!(score.creativity, None);

        assert!(parse_scores("Clarity: 8/10\nUsefulness: 5\nAlignment: 6").unwrap().is_none());
    }

    #[test]
    fn test_parse_not_applicable_variants() {
        for na in ["na", "NA", "Not Applicable", "n/a"] {
            let text = format!("Clarity: 1\nUsefulness: 1\nAlignment: 1\nCreativity: {}", na);
            let score = parse_scores(&text).unwrap().unwrap();
            assert_eq!(score.creativity, None, "value {:?}", na);
        }
    }

    #[test]
    fn test_parse_out_of_range_is_rejected() {
        let err = parse_scores("Clarity: 15\nUsefulness: 5\nAlignment: 6").unwrap_err();
        assert!(matches!(err, ScoreError::OutOfRange { ref field, value } if field == "clarity" && value == 15.0));
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_scores("").unwrap().is_none());
    }
}
