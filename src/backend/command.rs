//! Backend that shells out to a CLI program.
//!
//! The prompt is written to the child's stdin (or passed as the final argument)
//! and whatever it prints on stdout is the response. This covers `claude --print`,
//! `ollama run <model>`, and any script following the same contract.

use std::io::{ErrorKind, Write};
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use super::{Backend, GenerateOptions, ThinkingBackend, ThinkingResponse, split_thinking};
use crate::errors::BackendError;

#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    model: String,
    thinking: bool,
    prompt_as_arg: bool,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            model: model.into(),
            thinking: false,
            prompt_as_arg: false,
        }
    }

    /// `claude --print [--model <model>]`
    pub fn claude(model: Option<&str>) -> Self {
        let mut backend = Self::new("claude", model.unwrap_or("claude"));
        backend.args.push("--print".to_string());
        if let Some(model) = model {
            backend.args.push("--model".to_string());
            backend.args.push(model.to_string());
        }
        backend
    }

    /// `ollama run <model>`
    pub fn ollama(model: &str) -> Self {
        let mut backend = Self::new("ollama", model);
        backend.args.push("run".to_string());
        backend.args.push(model.to_string());
        backend
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_thinking(mut self, thinking: bool) -> Self {
        self.thinking = thinking;
        self
    }

    pub fn with_prompt_as_arg(mut self, prompt_as_arg: bool) -> Self {
        self.prompt_as_arg = prompt_as_arg;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn run(&self, prompt: &str) -> Result<String, BackendError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if self.prompt_as_arg {
            cmd.arg(prompt);
            cmd.stdin(Stdio::null());
        } else {
            cmd.stdin(Stdio::piped());
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(program = %self.program, args = ?self.args, prompt_len = prompt.len(), "Spawning backend command");

        let mut child = cmd.spawn().map_err(|source| BackendError::SpawnFailed {
            program: self.program.clone(),
            source,
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading its input closes the pipe early;
            // the exit status below reports that case.
            if let Err(e) = stdin.write_all(prompt.as_bytes())
                && e.kind() != ErrorKind::BrokenPipe
            {
                drop(stdin);
                reap(&mut child, &self.program);
                return Err(BackendError::Request(format!(
                    "Failed to write prompt to '{}': {}",
                    self.program, e
                )));
            }
        }

        let output = child.wait_with_output().map_err(|e| {
            BackendError::Request(format!("Failed to wait for '{}': {}", self.program, e))
        })?;

        if !output.status.success() {
            return Err(BackendError::NonZeroExit {
                program: self.program.clone(),
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(stdout)
    }
}

/// Kill a child that is being abandoned and wait for it so it does not linger.
fn reap(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        debug!(program, error = %e, "Backend command already exited");
    }
    if let Err(e) = child.wait() {
        warn!(program, error = %e, "Failed to reap backend command");
    }
}

impl Backend for CommandBackend {
    fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, BackendError> {
        let raw = self.run(prompt)?;
        if self.thinking {
            Ok(split_thinking(&raw).response)
        } else {
            Ok(raw)
        }
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    fn as_thinking(&self) -> Option<&dyn ThinkingBackend> {
        if self.thinking { Some(self) } else { None }
    }
}

impl ThinkingBackend for CommandBackend {
    fn generate_with_thinking(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<ThinkingResponse, BackendError> {
        let raw = self.run(prompt)?;
        Ok(split_thinking(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_preset_args() {
        let backend = CommandBackend::claude(Some("sonnet"));
        assert_eq!(backend.program(), "claude");
        assert_eq!(backend.args(), ["--print", "--model", "sonnet"]);
        assert_eq!(backend.model_name(), "sonnet");

        let default = CommandBackend::claude(None);
        assert_eq!(default.args(), ["--print"]);
        assert_eq!(default.model_name(), "claude");
    }

    #[test]
    fn test_ollama_preset_args() {
        let backend = CommandBackend::ollama("llama3");
        assert_eq!(backend.program(), "ollama");
        assert_eq!(backend.args(), ["run", "llama3"]);
    }

    #[test]
    fn test_missing_program_is_spawn_failure() {
        let backend = CommandBackend::new("reflector-no-such-program-xyz", "none");
        let err = backend.generate("hi", &GenerateOptions::default()).unwrap_err();
        assert!(matches!(err, BackendError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_prompt_is_written_to_stdin() {
        let backend = CommandBackend::new("cat", "cat");
        let out = backend.generate("  echo me  ", &GenerateOptions::default()).unwrap();
        assert_eq!(out, "echo me");
    }

    #[cfg(unix)]
    #[test]
    fn test_prompt_as_argument() {
        let backend = CommandBackend::new("echo", "echo").with_prompt_as_arg(true);
        let out = backend.generate("as an arg", &GenerateOptions::default()).unwrap();
        assert_eq!(out, "as an arg");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_reports_stderr() {
        let backend = CommandBackend::new("sh", "sh")
            .with_extra_args(["-c".to_string(), "echo boom >&2; exit 3".to_string()]);
        let err = backend.generate("ignored", &GenerateOptions::default()).unwrap_err();
        match err {
            BackendError::NonZeroExit { exit_code, stderr, .. } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_output_is_an_error() {
        let backend = CommandBackend::new("true", "true");
        let err = backend.generate("anything", &GenerateOptions::default()).unwrap_err();
        assert!(matches!(err, BackendError::EmptyResponse));
    }

    #[cfg(unix)]
    #[test]
    fn test_thinking_mode_splits_output() {
        let backend = CommandBackend::new("cat", "cat").with_thinking(true);
        let thinking = backend.as_thinking().expect("thinking enabled");
        let split = thinking
            .generate_with_thinking("<think>hmm</think>done", &GenerateOptions::default())
            .unwrap();
        assert_eq!(split.thinking, "hmm");
        assert_eq!(split.response, "done");

        let plain = backend
            .generate("<think>hmm</think>done", &GenerateOptions::default())
            .unwrap();
        assert_eq!(plain, "done");
    }

    #[cfg(unix)]
    #[test]
    fn test_reap_kills_and_waits_for_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        reap(&mut child, "sleep");
        let status = child.try_wait().unwrap().expect("child should be reaped");
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_reap_tolerates_exited_child() {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().unwrap();
        reap(&mut child, "true");
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_thinking_disabled_by_default() {
        assert!(CommandBackend::new("cat", "cat").as_thinking().is_none());
    }
}
