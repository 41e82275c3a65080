//! Log maintenance: `reflector compact`.

use anyhow::{Context as _, Result};
use console::style;

use reflector::ui::icons::CHECK;

use super::{Context, print_json};

pub fn cmd_compact(ctx: &Context) -> Result<()> {
    let store = ctx.agent.entries();
    let report = store
        .compact()
        .with_context(|| format!("Failed to compact {}", store.path().display()))?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "path": store.path(),
            "lines_before": report.lines_before,
            "lines_after": report.lines_after,
            "reclaimed": report.reclaimed(),
        }));
    }
    println!(
        "{}Compacted {}: {} -> {} lines ({} reclaimed)",
        CHECK,
        style(store.path().display()).cyan(),
        report.lines_before,
        report.lines_after,
        style(report.reclaimed()).green()
    );
    Ok(())
}
