//! Backend connectivity check: `reflector test-backend`.

use anyhow::{Result, bail};
use console::style;

use reflector::ui::icons::{CHECK, CROSS};

use super::{Context, print_json};

pub fn cmd_test_backend(ctx: &Context) -> Result<()> {
    let settings = ctx.config.backend();
    let backend = ctx.backend()?;
    let report = backend.test_connection();

    if ctx.json {
        print_json(&report)?;
    } else if report.success {
        println!(
            "{}Backend {} ({}) answered with {} characters",
            CHECK,
            style(settings.kind).bold(),
            style(&report.model).cyan(),
            report.response_length.unwrap_or_default()
        );
    } else {
        println!(
            "{}Backend {} ({}) failed: {}",
            CROSS,
            style(settings.kind).bold(),
            style(&report.model).cyan(),
            style(report.error.as_deref().unwrap_or("unknown error")).red()
        );
    }

    if !report.success {
        bail!("Backend connection test failed");
    }
    Ok(())
}
