use regex::Regex;
use std::sync::LazyLock;

use super::ThinkingResponse;

static THINK_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").unwrap());

/// Split `<think>...</think>` sections out of raw model output.
///
/// All sections are collected (trimmed, newline-joined) into `thinking`; the
/// remaining text, trimmed, becomes `response`.
pub fn split_thinking(raw: &str) -> ThinkingResponse {
    let thinking = THINK_SECTION
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|section| !section.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let response = THINK_SECTION.replace_all(raw, "").trim().to_string();

    ThinkingResponse { thinking, response }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_single_section() {
        let split = split_thinking("<think>\nweigh options\n</think>\nThe answer is 4.");
        assert_eq!(split.thinking, "weigh options");
        assert_eq!(split.response, "The answer is 4.");
    }

    #[test]
    fn test_split_multiple_sections() {
        let split = split_thinking("<think>a</think>first <think>b</think>second");
        assert_eq!(split.thinking, "a\nb");
        assert_eq!(split.response, "first second");
    }

    #[test]
    fn test_split_without_sections() {
        let split = split_thinking("  plain answer \n");
        assert!(split.thinking.is_empty());
        assert_eq!(split.response, "plain answer");
    }
}
