//! Text-generation backends.
//!
//! A backend is anything that turns a prompt into text. The pipeline and the
//! exploration engine only see the [`Backend`] trait; backends that expose a
//! separate reasoning trace additionally implement [`ThinkingBackend`] and
//! advertise it through [`Backend::as_thinking`].
//!
//! Backends are built explicitly with [`create_backend`] from [`BackendSettings`];
//! there is no global registry.

mod command;
mod mock;
mod thinking;

#[cfg(test)]
pub(crate) mod testing;

pub use command::CommandBackend;
pub use mock::MockBackend;
pub use thinking::split_thinking;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::BackendError;

/// Per-call generation hints. Backends may ignore any of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// A response split into its reasoning trace and final answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThinkingResponse {
    pub thinking: String,
    pub response: String,
}

/// Outcome of a backend connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The text-generation capability.
pub trait Backend {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, BackendError>;

    fn model_name(&self) -> String;

    /// Rough token count, about four characters per token.
    fn estimate_tokens(&self, text: &str) -> u32 {
        u32::try_from(text.chars().count() / 4).unwrap_or(u32::MAX)
    }

    /// Narrow to the thinking-trace capability, when this backend has it.
    fn as_thinking(&self) -> Option<&dyn ThinkingBackend> {
        None
    }

    fn test_connection(&self) -> ConnectionReport {
        match self.generate("Hello, this is a test.", &GenerateOptions::default()) {
            Ok(text) => ConnectionReport {
                success: true,
                model: self.model_name(),
                response_length: Some(text.len()),
                error: None,
            },
            Err(e) => ConnectionReport {
                success: false,
                model: self.model_name(),
                response_length: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Backends that separate a reasoning trace from the final answer.
pub trait ThinkingBackend: Backend {
    fn generate_with_thinking(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ThinkingResponse, BackendError>;
}

/// Available backend implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Claude CLI in print mode
    #[default]
    Claude,
    /// Local model through `ollama run`
    Ollama,
    /// Any program reading a prompt and printing a response
    Command,
    /// Canned offline responses
    Mock,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Claude,
        BackendKind::Ollama,
        BackendKind::Command,
        BackendKind::Mock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Claude => "claude",
            BackendKind::Ollama => "ollama",
            BackendKind::Command => "command",
            BackendKind::Mock => "mock",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        BackendKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| BackendError::UnknownBackend {
                name: s.to_string(),
                available: available_backends().join(", "),
            })
    }
}

/// Names accepted by [`BackendKind::from_str`](std::str::FromStr).
pub fn available_backends() -> Vec<&'static str> {
    BackendKind::ALL.iter().map(|k| k.as_str()).collect()
}

/// Settings used to construct a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub kind: BackendKind,
    /// Model name passed to the backend (and recorded on logged entries)
    #[serde(default)]
    pub model: Option<String>,
    /// Program to run; overrides the preset program of `claude` and `ollama`
    #[serde(default)]
    pub command: Option<String>,
    /// Extra arguments appended after the preset arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Split `<think>` sections out of responses
    #[serde(default)]
    pub thinking: bool,
    /// Pass the prompt as the last argument instead of on stdin
    #[serde(default)]
    pub prompt_as_arg: bool,
    /// Seed for the mock backend's canned choices
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Build the backend described by `settings`.
pub fn create_backend(settings: &BackendSettings) -> Result<Box<dyn Backend>, BackendError> {
    let backend: Box<dyn Backend> = match settings.kind {
        BackendKind::Mock => {
            let mut mock = MockBackend::new().with_thinking(settings.thinking);
            if let Some(model) = &settings.model {
                mock = mock.with_model(model);
            }
            if let Some(seed) = settings.seed {
                mock = mock.with_seed(seed);
            }
            Box::new(mock)
        }
        BackendKind::Claude | BackendKind::Ollama | BackendKind::Command => {
            Box::new(command_backend(settings)?)
        }
    };
    Ok(backend)
}

fn command_backend(settings: &BackendSettings) -> Result<CommandBackend, BackendError> {
    let mut backend = match settings.kind {
        BackendKind::Claude => CommandBackend::claude(settings.model.as_deref()),
        BackendKind::Ollama => CommandBackend::ollama(settings.model.as_deref().unwrap_or("llama2")),
        _ => {
            let program = settings.command.as_deref().ok_or_else(|| {
                BackendError::Config("backend.command is required for the 'command' backend".to_string())
            })?;
            let model = settings.model.as_deref().unwrap_or(program);
            CommandBackend::new(program, model)
        }
    };
    if let Some(program) = &settings.command {
        backend = backend.with_program(program);
    }
    Ok(backend
        .with_extra_args(settings.args.iter().cloned())
        .with_thinking(settings.thinking)
        .with_prompt_as_arg(settings.prompt_as_arg))
}
