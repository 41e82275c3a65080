//! Exploration types and their generation templates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ExploreError;
use crate::models::Entry;
use crate::template::fill;

const DEEPEN_TEMPLATE: &str = r#"
Based on this previous conversation, generate a follow-up prompt that deepens the discussion:

Original Prompt: {prompt}
Original Response: {response}

Create a new prompt that:
1. Explores a specific aspect mentioned in the response in greater detail
2. Asks for more nuanced or advanced information
3. Challenges or extends the original thinking

New Prompt:
"#;

const ALTERNATIVE_TEMPLATE: &str = r#"
Based on this previous conversation, generate an alternative perspective prompt:

Original Prompt: {prompt}
Original Response: {response}

Create a new prompt that:
1. Approaches the same topic from a different angle
2. Considers alternative viewpoints or methodologies
3. Explores what wasn't covered in the original response

New Prompt:
"#;

const APPLICATION_TEMPLATE: &str = r#"
Based on this previous conversation, generate a practical application prompt:

Original Prompt: {prompt}
Original Response: {response}

Create a new prompt that:
1. Asks how to apply the concepts discussed in real-world scenarios
2. Explores specific use cases or examples
3. Focuses on implementation or practical considerations

New Prompt:
"#;

const CRITIQUE_TEMPLATE: &str = r#"
Based on this previous conversation, generate a critical analysis prompt:

Original Prompt: {prompt}
Original Response: {response}

Create a new prompt that:
1. Questions assumptions made in the original response
2. Explores potential limitations or drawbacks
3. Asks for evidence or counter-arguments

New Prompt:
"#;

const SYNTHESIS_TEMPLATE: &str = r#"
Based on this previous conversation, generate a synthesis prompt:

Original Prompt: {prompt}
Original Response: {response}

Create a new prompt that:
1. Connects this topic to other related concepts or fields
2. Asks for broader implications or connections
3. Explores how this fits into a larger framework

New Prompt:
"#;

/// Kind of follow-up prompt to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplorationType {
    /// Go further into one aspect of the response
    Deepen,
    /// Approach the topic from another angle
    Alternative,
    /// Apply the ideas to real scenarios
    Application,
    /// Question assumptions and limits
    Critique,
    /// Connect the topic to other fields
    Synthesis,
}

impl ExplorationType {
    pub const ALL: [ExplorationType; 5] = [
        ExplorationType::Deepen,
        ExplorationType::Alternative,
        ExplorationType::Application,
        ExplorationType::Critique,
        ExplorationType::Synthesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExplorationType::Deepen => "deepen",
            ExplorationType::Alternative => "alternative",
            ExplorationType::Application => "application",
            ExplorationType::Critique => "critique",
            ExplorationType::Synthesis => "synthesis",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            ExplorationType::Deepen => DEEPEN_TEMPLATE,
            ExplorationType::Alternative => ALTERNATIVE_TEMPLATE,
            ExplorationType::Application => APPLICATION_TEMPLATE,
            ExplorationType::Critique => CRITIQUE_TEMPLATE,
            ExplorationType::Synthesis => SYNTHESIS_TEMPLATE,
        }
    }

    /// The generation prompt for `entry`.
    pub fn prompt_for(&self, entry: &Entry) -> String {
        fill(
            self.template(),
            &[("prompt", entry.prompt.as_str()), ("response", entry.response.as_str())],
        )
    }

    /// Context string stored with explorations of this type.
    pub fn context(&self) -> String {
        format!("Generated using '{}' template", self.as_str())
    }

    /// Comma-separated list of all type names.
    pub fn names() -> String {
        Self::ALL.map(|t| t.as_str()).join(", ")
    }
}

impl fmt::Display for ExplorationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplorationType {
    type Err = ExploreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| ExploreError::UnknownTemplateType {
                name: s.to_string(),
                available: Self::names(),
            })
    }
}
