//! Shared UI icons and emojis.
//!
//! Emoji constants used by the command output, with plain-text fallbacks for
//! terminals that cannot render them.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "[SKIP]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Review steps
pub static SCORE: Emoji<'_, '_> = Emoji("📊 ", "[S]");
pub static REFLECT: Emoji<'_, '_> = Emoji("🤔 ", "[R]");
pub static REVISE: Emoji<'_, '_> = Emoji("📝 ", "[V]");

// Exploration and search
pub static EXPLORE: Emoji<'_, '_> = Emoji("🧭 ", "[E]");
pub static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[?]");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
