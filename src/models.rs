//! Persisted record types: logged entries, their scores, and explorations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Inclusive bounds for every score metric.
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// A score value that violates the 0-10 range.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreError {
    #[error("{field} score {value} is outside the 0-10 range")]
    OutOfRange { field: String, value: f64 },
}

/// Self-evaluation of a response.
///
/// Deserialization goes through [`Score::new`], so out-of-range values in a log are
/// rejected like any other schema violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScoreFields")]
pub struct Score {
    pub clarity: f64,
    pub usefulness: f64,
    pub alignment: f64,
    #[serde(default)]
    pub creativity: Option<f64>,
}

impl Score {
    /// Build a score, rejecting values outside `[0, 10]` and non-finite values.
    pub fn new(
        clarity: f64,
        usefulness: f64,
        alignment: f64,
        creativity: Option<f64>,
    ) -> Result<Self, ScoreError> {
        check_range("clarity", clarity)?;
        check_range("usefulness", usefulness)?;
        check_range("alignment", alignment)?;
        if let Some(value) = creativity {
            check_range("creativity", value)?;
        }
        Ok(Self {
            clarity,
            usefulness,
            alignment,
            creativity,
        })
    }
}

#[derive(Deserialize)]
struct ScoreFields {
    clarity: f64,
    usefulness: f64,
    alignment: f64,
    #[serde(default)]
    creativity: Option<f64>,
}

impl TryFrom<ScoreFields> for Score {
    type Error = ScoreError;

    fn try_from(fields: ScoreFields) -> Result<Self, Self::Error> {
        Score::new(
            fields.clarity,
            fields.usefulness,
            fields.alignment,
            fields.creativity,
        )
    }
}

fn check_range(field: &str, value: f64) -> Result<(), ScoreError> {
    if value.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ScoreError::OutOfRange {
            field: field.to_string(),
            value,
        })
    }
}

/// One logged prompt/response interaction plus its review annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub response: String,
    pub model_name: String,
    #[serde(default)]
    pub tokens_used: Option<u32>,
    #[serde(default)]
    pub score: Option<Score>,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub thinking_process: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Entry {
    /// Create a fresh entry with a new id and the current time.
    pub fn new(
        prompt: impl Into<String>,
        response: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            prompt: prompt.into(),
            response: response.into(),
            model_name: model_name.into(),
            tokens_used: None,
            score: None,
            reflection: None,
            revision: None,
            thinking_process: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_tokens_used(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    pub fn with_thinking_process(mut self, thinking: impl Into<String>) -> Self {
        self.thinking_process = Some(thinking.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Field names accepted by [`text_field`](Self::text_field).
    pub const SEARCHABLE_FIELDS: [&'static str; 6] = [
        "prompt",
        "response",
        "model_name",
        "reflection",
        "revision",
        "thinking_process",
    ];

    /// Text value of a searchable field by name.
    ///
    /// Returns `None` for unknown field names and for optional fields that are unset.
    pub fn text_field(&self, field: &str) -> Option<&str> {
        match field {
            "prompt" => Some(&self.prompt),
            "response" => Some(&self.response),
            "model_name" => Some(&self.model_name),
            "reflection" => self.reflection.as_deref(),
            "revision" => self.revision.as_deref(),
            "thinking_process" => self.thinking_process.as_deref(),
            _ => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    pub fn is_reflected(&self) -> bool {
        self.reflection.is_some()
    }

    pub fn is_revised(&self) -> bool {
        self.revision.is_some()
    }

    /// True when all three review fields are present.
    pub fn is_fully_reviewed(&self) -> bool {
        self.is_scored() && self.is_reflected() && self.is_revised()
    }
}

/// Caller-driven changes to an entry.
///
/// Only review annotations and bookkeeping fields are updatable; `id`, `prompt`,
/// `response`, `model_name` and `timestamp` are fixed once logged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub score: Option<Score>,
    pub reflection: Option<String>,
    pub revision: Option<String>,
    pub thinking_process: Option<String>,
    pub tokens_used: Option<u32>,
    pub metadata: Option<BTreeMap<String, Value>>,
}

impl EntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(mut self, score: Score) -> Self {
        self.score = Some(score);
        self
    }

    pub fn reflection(mut self, reflection: impl Into<String>) -> Self {
        self.reflection = Some(reflection.into());
        self
    }

    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn thinking_process(mut self, thinking: impl Into<String>) -> Self {
        self.thinking_process = Some(thinking.into());
        self
    }

    pub fn tokens_used(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    pub fn metadata(mut self, metadata: BTreeMap<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the set fields onto `entry`, leaving all others untouched.
    pub fn apply(self, entry: &mut Entry) {
        if let Some(score) = self.score {
            entry.score = Some(score);
        }
        if let Some(reflection) = self.reflection {
            entry.reflection = Some(reflection);
        }
        if let Some(revision) = self.revision {
            entry.revision = Some(revision);
        }
        if let Some(thinking) = self.thinking_process {
            entry.thinking_process = Some(thinking);
        }
        if let Some(tokens) = self.tokens_used {
            entry.tokens_used = Some(tokens);
        }
        if let Some(metadata) = self.metadata {
            entry.metadata = metadata;
        }
    }
}

/// A generated follow-up prompt derived from a past entry.
///
/// `original_entry_id` is a weak reference: the entry may not exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exploration {
    pub id: Uuid,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub original_entry_id: Uuid,
    pub generated_prompt: String,
    pub context: String,
}

impl Exploration {
    pub fn new(
        original_entry_id: Uuid,
        generated_prompt: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            original_entry_id,
            generated_prompt: generated_prompt.into(),
            context: context.into(),
        }
    }
}

/// RFC 3339 timestamps; offset-less timestamps from older logs are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
    }
}
