//! Typed error hierarchy for Reflector.
//!
//! One enum per subsystem:
//! - `StoreError`: JSONL log persistence failures (fatal to the calling operation)
//! - `BackendError`: failures of the text-generation collaborator
//! - `StepError`: why a single review or exploration step failed (recorded as data)
//! - `ReviewError` / `ExploreError`: caller-visible failures of the pipeline and engine
//! - `AgentError`: failures of the facade operations that call a backend directly

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ScoreError;

/// Errors from the JSONL-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize record {id}: {source}")]
    Serialize {
        id: Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record {id} already exists in {path}")]
    DuplicateId { id: Uuid, path: PathBuf },

    #[error("Store index lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by a generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Failed to spawn backend command '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend command '{program}' exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("Unknown backend type '{name}'. Available: {available}")]
    UnknownBackend { name: String, available: String },

    #[error("Backend misconfigured: {0}")]
    Config(String),

    #[error("Backend request failed: {0}")]
    Request(String),
}

/// Reason a single pipeline step failed.
///
/// Step failures are data, not control flow: they are stored in step outcomes and
/// never abort the pipeline.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Failed to parse scores from response")]
    ParseFailure,

    #[error("Invalid score: {0}")]
    InvalidScore(#[from] ScoreError),
}

impl From<BackendError> for StepError {
    fn from(err: BackendError) -> Self {
        StepError::Backend {
            message: err.to_string(),
        }
    }
}

/// Errors from the review pipeline that the caller must handle.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Entry {id} not found")]
    NotFound { id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the exploration engine that the caller must handle.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("Entry {id} not found")]
    NotFound { id: Uuid },

    #[error("Unknown exploration type '{name}'. Available: {available}")]
    UnknownTemplateType { name: String, available: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from agent operations that generate and log in one go.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_io_carries_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = StoreError::io("/logs/responses.jsonl", io_err);
        match &err {
            StoreError::Io { path, source } => {
                assert_eq!(path, &PathBuf::from("/logs/responses.jsonl"));
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Io variant"),
        }
        assert!(err.to_string().contains("/logs/responses.jsonl"));
    }

    #[test]
    fn backend_error_converts_to_step_error_with_message() {
        let err = BackendError::NonZeroExit {
            program: "claude".to_string(),
            exit_code: 2,
            stderr: "rate limited".to_string(),
        };
        let step: StepError = err.into();
        match &step {
            StepError::Backend { message } => {
                assert!(message.contains("claude"));
                assert!(message.contains("rate limited"));
            }
            _ => panic!("Expected Backend variant"),
        }
    }

    #[test]
    fn step_error_serializes_with_kind_tag() {
        let value = serde_json::to_value(StepError::ParseFailure).unwrap();
        assert_eq!(value["kind"], "parse_failure");
    }

    #[test]
    fn review_error_wraps_store_error() {
        let store_err = StoreError::LockPoisoned;
        let err: ReviewError = store_err.into();
        assert!(matches!(err, ReviewError::Store(StoreError::LockPoisoned)));
    }

    #[test]
    fn explore_error_unknown_type_lists_available() {
        let err = ExploreError::UnknownTemplateType {
            name: "poetry".to_string(),
            available: "deepen, alternative".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("poetry"));
        assert!(msg.contains("deepen"));
    }
}
