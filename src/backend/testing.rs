//! Test doubles for code that drives a [`Backend`].

use std::cell::RefCell;

use super::{Backend, GenerateOptions};
use crate::errors::BackendError;

type Responder = Box<dyn Fn(&str) -> Result<String, BackendError>>;

/// Backend answering through a closure and recording every prompt.
pub struct ScriptedBackend {
    respond: Responder,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(respond: impl Fn(&str) -> Result<String, BackendError> + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Valid scores for scoring prompts, fixed text for reflection and revision prompts.
    pub fn reviewer() -> Self {
        Self::new(|prompt| {
            let lower = prompt.to_lowercase();
            let text = if lower.contains("evaluate your previous response") {
                "Clarity: 8.0\nUsefulness: 7.5\nAlignment: 9.0\nCreativity: N/A"
            } else if lower.contains("reflect on your previous response") {
                "Could use a concrete example."
            } else {
                "Revised answer with an example."
            };
            Ok(text.to_string())
        })
    }

    /// Always answers with `text`.
    pub fn constant(text: &'static str) -> Self {
        Self::new(move |_| Ok(text.to_string()))
    }

    /// Always fails with a request error.
    pub fn failing() -> Self {
        Self::new(|_| Err(BackendError::Request("backend unavailable".to_string())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl Backend for ScriptedBackend {
    fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, BackendError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        (self.respond)(prompt)
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}
