use regex::Regex;
use std::sync::LazyLock;

const PROMPT_MARKER: &str = "New Prompt:";
const MIN_PROMPT_CHARS: usize = 20;

static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.").unwrap());

fn is_scaffolding(line: &str) -> bool {
    NUMBERED_LINE.is_match(line) || line.starts_with("Create a") || line.starts_with("Generate a")
}

fn is_substantial(line: &str) -> bool {
    line.chars().count() > MIN_PROMPT_CHARS
}

/// Strip template echo and instructions from a backend's generated prompt.
///
/// Blank lines and scaffolding (numbered lines, "Create a...", "Generate a...")
/// are dropped. After a `New Prompt:` marker every remaining line is kept; a marker
/// with text after it keeps that text too. Before the marker only questions longer
/// than 20 characters are kept. Kept lines are joined with spaces. If nothing is
/// kept, the last line longer than 20 characters is returned, else the trimmed input.
pub fn clean_generated_prompt(raw: &str) -> String {
    let raw = raw.trim();
    let mut kept = Vec::new();
    let mut in_prompt = false;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix(PROMPT_MARKER) {
            in_prompt = true;
            let rest = rest.trim();
            if !rest.is_empty() {
                kept.push(rest);
            }
            continue;
        }
        if is_scaffolding(line) {
            continue;
        }
        if in_prompt || (line.ends_with('?') && is_substantial(line)) {
            kept.push(line);
        }
    }

    if !kept.is_empty() {
        return kept.join(" ");
    }

    raw.lines()
        .map(str::trim)
        .filter(|l| is_substantial(l))
        .next_back()
        .unwrap_or(raw)
        .to_string()
}
