//! Recording interactions: `reflector log` and `reflector ask`.

use anyhow::{Context as _, Result};
use console::style;
use tracing::warn;

use reflector::ui::icons::{CHECK, SPARKLE};

use super::{Context, print_json};

pub fn cmd_log(ctx: &Context, prompt: &str, response: &str, model_name: Option<&str>) -> Result<()> {
    // The backend only contributes a model name and a token estimate here.
    let backend = match ctx.backend() {
        Ok(backend) => Some(backend),
        Err(e) => {
            warn!(error = %e, "Logging without a backend");
            None
        }
    };

    let id = ctx
        .agent
        .log_interaction(prompt, response, model_name, backend.as_deref())
        .context("Failed to log interaction")?;

    if ctx.json {
        return print_json(&serde_json::json!({ "id": id }));
    }
    println!("{}Logged entry {}", CHECK, style(id).yellow());
    Ok(())
}

pub fn cmd_ask(ctx: &Context, prompt: &str) -> Result<()> {
    let backend = ctx.backend()?;
    let entry = ctx
        .agent
        .ask(prompt, backend.as_ref())
        .context("Failed to generate a response")?;

    if ctx.json {
        return print_json(&entry);
    }

    if let Some(thinking) = &entry.thinking_process {
        println!("{}", style("Thinking:").dim().bold());
        println!("{}", style(thinking).dim());
        println!();
    }
    println!("{}", entry.response);
    println!();
    println!(
        "{}Logged entry {} ({})",
        SPARKLE,
        style(entry.id).yellow(),
        style(&entry.model_name).cyan()
    );
    Ok(())
}
