//! Offline backend with canned, prompt-aware responses.
//!
//! Recognises the scoring, reflection, revision and exploration prompts by their
//! fixed phrasing and answers each in the format the pipeline expects, so the
//! whole review and exploration flow can run without a model.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Backend, GenerateOptions, ThinkingBackend, ThinkingResponse};
use crate::errors::BackendError;

pub const MOCK_MODEL_NAME: &str = "mock-ai-v1.0";

const REFLECTIONS: [&str; 3] = [
    "Upon reflection, I notice several aspects of my previous response:

**Strengths:**
- The response was factually accurate and well-structured
- I provided concrete examples to illustrate key points

**Areas for improvement:**
- I could have provided more specific, actionable advice
- I missed an opportunity to address common misconceptions

**Potential issues:**
- The response assumes background knowledge the user might not have
- I could have been more explicit about limitations or caveats",
    "Analyzing my previous response critically:

**What worked well:**
- Clear logical flow from introduction to conclusion
- Appropriate depth for the question asked

**What could be improved:**
- The response was quite lengthy and could have been more concise
- I focused on theory and could have included more practical applications

**Reflection on accuracy:**
- The core information provided was sound
- I may have oversimplified some nuanced aspects of the topic",
    "Reviewing my response with a critical eye:

**Positive aspects:**
- Comprehensive coverage of the main topic
- Good balance between breadth and depth

**Shortcomings identified:**
- The response lacked specific, concrete recommendations
- The structure, while logical, was somewhat predictable

**Accuracy assessment:**
- Information provided appears to be factually correct
- Debated topics may have been presented as more settled than they are",
];

const REVISIONS: [&str; 2] = [
    "Here's an improved version of my original response:

Building on my reflection, I want to provide a more targeted and practical answer.

1. **Immediate next steps**: start with the smallest change that delivers value
2. **Common pitfalls to avoid**: skipping measurement and over-engineering early
3. **Resources for deeper learning**: official documentation and worked examples

This revision is more concise and adds the practical elements the original was missing.",
    "Based on my reflection, here's a more effective response:

The most important thing to understand is the core trade-off involved, because it shapes every later decision.

- **Start with**: a small, well-defined experiment
- **Then consider**: how the result generalises to your situation
- **Watch out for**: assuming the first approach is the only one

This revised approach is more user-focused and immediately applicable.",
];

const DEEPEN_PROMPTS: [&str; 3] = [
    "What are the most counterintuitive aspects of this topic that even experts struggle with?",
    "What are the fundamental assumptions underlying this approach, and when might they not hold true?",
    "Can you walk through a complex real-world scenario where applying these principles becomes challenging?",
];

const ALTERNATIVE_PROMPTS: [&str; 3] = [
    "What would someone from a completely different professional background think about this approach?",
    "What are the strongest criticisms of this mainstream view, and what evidence supports them?",
    "If we had to solve this problem with a tenth of the resources, what creative approaches might emerge?",
];

const APPLICATION_PROMPTS: [&str; 3] = [
    "Can you design a step-by-step implementation plan for applying this in a small organization?",
    "What would a pilot project look like to test these concepts with minimal risk?",
    "How would you measure success when implementing this approach, and what metrics matter most?",
];

const CRITIQUE_PROMPTS: [&str; 3] = [
    "What are the hidden costs or unintended consequences that advocates of this approach tend to downplay?",
    "Under what conditions would this solution actually make the problem worse?",
    "What evidence would convince you that this approach is fundamentally flawed?",
];

const SYNTHESIS_PROMPTS: [&str; 3] = [
    "How does this concept connect to broader patterns we see across completely different fields?",
    "What would happen if we combined this approach with insights from psychology and economics?",
    "What universal human needs or cognitive biases does this approach either leverage or work against?",
];

const MACHINE_LEARNING_ANSWER: &str = "Machine learning is a subset of artificial intelligence that enables computers to learn from experience without being explicitly programmed for every task.

There are three main types:
- **Supervised learning**: learning from labeled examples (like spam detection)
- **Unsupervised learning**: finding hidden patterns in data (like customer segmentation)
- **Reinforcement learning**: learning through trial and error with rewards (like game AI)

Practical applications include recommendation systems, fraud detection and medical diagnosis.";

const PYTHON_ANSWER: &str = "Python is a high-level, interpreted programming language known for its simplicity and readability.

Key characteristics:
- **Simple syntax**: indentation defines structure
- **Large ecosystem**: libraries for almost any task
- **Dynamic typing**: variables don't need explicit type declarations

Python excels in data analysis, machine learning, web development and automation.";

/// Deterministic-when-seeded stand-in for a real model.
#[derive(Debug)]
pub struct MockBackend {
    model: String,
    thinking: bool,
    rng: Mutex<StdRng>,
    calls: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            model: MOCK_MODEL_NAME.to_string(),
            thinking: false,
            rng: Mutex::new(StdRng::from_entropy()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_thinking(mut self, thinking: bool) -> Self {
        self.thinking = thinking;
        self
    }

    /// Number of generate calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    fn pick(&self, options: &[&str]) -> String {
        self.with_rng(|rng| options.choose(rng).copied().unwrap_or_default().to_string())
    }

    fn respond(&self, prompt: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = prompt.to_lowercase();

        if lower.contains("evaluate your previous response") && lower.contains("clarity") {
            return self.scoring_response();
        }
        if lower.contains("reflect on your previous response") {
            return self.pick(&REFLECTIONS);
        }
        if lower.contains("revised version") && lower.contains("reflection:") {
            return self.pick(&REVISIONS);
        }
        if lower.contains("generate a follow-up prompt") || lower.contains("new prompt:") {
            return self.exploration_response(&lower);
        }
        regular_response(prompt, &lower)
    }

    fn scoring_response(&self) -> String {
        let (clarity, usefulness, alignment, creativity) = self.with_rng(|rng| {
            (
                rng.gen_range(6.5..=9.5),
                rng.gen_range(6.0..=9.0),
                rng.gen_range(7.0..=9.5),
                rng.gen_range(5.5..=8.5),
            )
        });
        format!(
            "Looking at my previous response, I'll evaluate it across the key criteria:

Clarity: {clarity:.1}
The response was well-structured and used accessible language.

Usefulness: {usefulness:.1}
The response directly addressed the prompt with actionable information.

Alignment: {alignment:.1}
The response stayed focused on the original question.

Creativity: {creativity:.1}
The response followed a fairly conventional approach to the topic."
        )
    }

    fn exploration_response(&self, lower: &str) -> String {
        let pool: &[&str] = if lower.contains("deepen") {
            &DEEPEN_PROMPTS
        } else if lower.contains("alternative") {
            &ALTERNATIVE_PROMPTS
        } else if lower.contains("application") {
            &APPLICATION_PROMPTS
        } else if lower.contains("critique") || lower.contains("critical") {
            &CRITIQUE_PROMPTS
        } else {
            &SYNTHESIS_PROMPTS
        };
        self.pick(pool)
    }
}

fn regular_response(prompt: &str, lower: &str) -> String {
    if lower.contains("machine learning") {
        return MACHINE_LEARNING_ANSWER.to_string();
    }
    if lower.contains("python") {
        return PYTHON_ANSWER.to_string();
    }
    format!(
        "Thank you for your question about \"{}\". This topic deserves a thoughtful response.

There are several key aspects to consider:

1. **Foundation**: the fundamental principles underlying this topic
2. **Applications**: how this applies in real-world scenarios
3. **Considerations**: important factors to keep in mind

The best path forward typically depends on your specific context and goals.",
        prompt.trim()
    )
}

impl Backend for MockBackend {
    fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<String, BackendError> {
        Ok(self.respond(prompt))
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    fn as_thinking(&self) -> Option<&dyn ThinkingBackend> {
        if self.thinking { Some(self) } else { None }
    }
}

impl ThinkingBackend for MockBackend {
    fn generate_with_thinking(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<ThinkingResponse, BackendError> {
        let response = self.respond(prompt);
        let first_line = prompt.trim().lines().next().unwrap_or_default();
        Ok(ThinkingResponse {
            thinking: format!(
                "The request starts with \"{}\". I should answer directly and keep the format it asks for.",
                first_line
            ),
            response,
        })
    }
}
