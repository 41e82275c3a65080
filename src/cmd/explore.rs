//! Exploration commands: `reflector explore`, `auto-explore`, `explorations`
//! and `search --explorations`.

use anyhow::{Context as _, Result};
use console::style;

use reflector::explore::{ExplorationOutcome, MultiExploration};
use reflector::models::Exploration;
use reflector::ui::icons::{CHECK, CROSS, EXPLORE, SEARCH};
use reflector::ui::progress::short_id;

use super::{Context, print_json};

pub fn cmd_explore(ctx: &Context, id: &str, exploration_type: &str) -> Result<()> {
    let id = ctx.resolve_entry_id(id)?;
    let backend = ctx.backend()?;
    let outcome = ctx
        .agent
        .engine()
        .generate(id, exploration_type, backend.as_ref())?;

    if ctx.json {
        return print_json(&outcome);
    }
    print_outcome(&outcome);
    Ok(())
}

pub fn cmd_auto_explore(ctx: &Context, id: &str, max: Option<usize>) -> Result<()> {
    let id = ctx.resolve_entry_id(id)?;
    let max = max.unwrap_or(ctx.config.explore().max_explorations);
    let backend = ctx.backend()?;
    let result = ctx
        .agent
        .engine()
        .auto_explore_entry(id, backend.as_ref(), max)?;

    if ctx.json {
        return print_json(&result);
    }
    print_multi(&result);
    Ok(())
}

pub fn cmd_explore_recent(ctx: &Context, limit: Option<usize>, per_entry: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(ctx.config.explore().recent_limit);
    let per_entry = per_entry.unwrap_or(ctx.config.explore().per_entry);
    let backend = ctx.backend()?;
    let summary = ctx
        .agent
        .engine()
        .explore_recent_entries(backend.as_ref(), limit, per_entry)
        .context("Failed to explore recent entries")?;

    if ctx.json {
        return print_json(&summary);
    }
    for result in &summary.entry_results {
        print_multi(result);
    }
    println!(
        "Explored {} entries: {} of {} explorations generated",
        summary.total_entries,
        style(summary.successful_explorations).green(),
        summary.total_explorations
    );
    Ok(())
}

pub fn cmd_explorations(ctx: &Context, entry: Option<&str>) -> Result<()> {
    let explorations: Vec<Exploration> = match entry {
        Some(entry) => {
            let id = ctx.resolve_entry_id(entry)?;
            ctx.agent.engine().explorations_for_entry(id)?
        }
        None => ctx.agent.explorations().read_all()?.collect::<Result<_, _>>()?,
    };

    if ctx.json {
        return print_json(&explorations);
    }
    if explorations.is_empty() {
        println!("No explorations found.");
        return Ok(());
    }
    for exploration in &explorations {
        print_exploration(exploration);
    }
    Ok(())
}

pub fn cmd_search_explorations(ctx: &Context, query: &str) -> Result<()> {
    let results = ctx.agent.engine().search_explorations(query)?;

    if ctx.json {
        return print_json(&results);
    }
    println!(
        "{}{} exploration(s) matching '{}'",
        SEARCH,
        results.len(),
        style(query).cyan()
    );
    for exploration in &results {
        print_exploration(exploration);
    }
    Ok(())
}

fn print_exploration(exploration: &Exploration) {
    println!(
        "{}  from {}  {}",
        style(short_id(&exploration.id.to_string())).yellow(),
        style(short_id(&exploration.original_entry_id.to_string())).dim(),
        style(&exploration.context).dim()
    );
    println!("    {}", exploration.generated_prompt);
}

fn print_outcome(outcome: &ExplorationOutcome) {
    let kind = style(outcome.exploration_type).bold();
    match (&outcome.exploration, &outcome.error) {
        (Some(exploration), _) => {
            println!("  {}{} {}", CHECK, kind, style(short_id(&exploration.id.to_string())).yellow());
            println!("      {}", exploration.generated_prompt);
        }
        (None, Some(error)) => println!("  {}{} {}", CROSS, kind, style(error).red()),
        (None, None) => println!("  {}{}", CROSS, kind),
    }
}

fn print_multi(result: &MultiExploration) {
    println!();
    println!(
        "{}{} {} ({}/{} generated)",
        EXPLORE,
        style("Explorations for").bold(),
        style(result.entry_id).yellow(),
        result.successful,
        result.total
    );
    for outcome in &result.explorations {
        print_outcome(outcome);
    }
    println!();
}
