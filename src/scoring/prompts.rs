//! Prompt templates for self-scoring, reflection and revision.

use crate::models::Entry;
use crate::template::fill;

pub const SCORING_PROMPT_TEMPLATE: &str = r#"
Please evaluate your previous response on the following criteria, giving a score from 0-10 for each:

Original Prompt: {prompt}

Your Response: {response}

Evaluation Criteria:
1. Clarity (0-10): How clear and understandable is the response?
2. Usefulness (0-10): How useful is the response for addressing the prompt?
3. Alignment (0-10): How well does the response align with the intent of the prompt?
4. Creativity (0-10, optional): How creative or innovative is the response?

Please provide scores in this exact format:
Clarity: X.X
Usefulness: X.X
Alignment: X.X
Creativity: X.X (or "N/A" if not applicable)

Also provide a brief explanation for each score.
"#;

pub const REFLECTION_PROMPT_TEMPLATE: &str = r#"
Please reflect on your previous response to this prompt:

Original Prompt: {prompt}

Your Response: {response}

Consider the following:
1. Are there any inaccuracies, hallucinations, or errors in your response?
2. What aspects of the response could be improved?
3. Did you fully address all parts of the prompt?
4. What would you do differently if answering this prompt again?

Provide your reflection as a structured analysis addressing these points.
"#;

pub const REVISION_PROMPT_TEMPLATE: &str = r#"
Based on your reflection, please provide a revised version of your original response.

Original Prompt: {prompt}

Your Original Response: {response}

Your Reflection: {reflection}

Please provide an improved version of your response that addresses the issues identified in your reflection.
"#;

pub fn scoring_prompt(entry: &Entry) -> String {
    fill(
        SCORING_PROMPT_TEMPLATE,
        &[("prompt", entry.prompt.as_str()), ("response", entry.response.as_str())],
    )
}

pub fn reflection_prompt(entry: &Entry) -> String {
    fill(
        REFLECTION_PROMPT_TEMPLATE,
        &[("prompt", entry.prompt.as_str()), ("response", entry.response.as_str())],
    )
}

pub fn revision_prompt(entry: &Entry, reflection: &str) -> String {
    fill(
        REVISION_PROMPT_TEMPLATE,
        &[
            ("prompt", entry.prompt.as_str()),
            ("response", entry.response.as_str()),
            ("reflection", reflection),
        ],
    )
}
