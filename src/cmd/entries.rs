//! Reading the log: `reflector list`, `show`, `search` and `stats`.

use anyhow::{Result, bail};
use console::style;
use serde::Serialize;

use reflector::models::{Entry, Exploration};
use reflector::scoring::ScoreSummary;
use reflector::ui::icons::{FOLDER, SEARCH};
use reflector::ui::progress::short_id;

use super::{Context, print_json, truncate};

const PREVIEW_CHARS: usize = 60;

/// Status markers: score, reflection, revision.
fn review_marks(entry: &Entry) -> String {
    let mark = |set: bool, c: char| if set { c } else { '-' };
    format!(
        "{}{}{}",
        mark(entry.is_scored(), 'S'),
        mark(entry.is_reflected(), 'R'),
        mark(entry.is_revised(), 'V')
    )
}

fn print_entry_line(entry: &Entry) {
    println!(
        "{}  {}  {}  {:<14}  {}",
        style(short_id(&entry.id.to_string())).yellow(),
        style(entry.timestamp.format("%Y-%m-%d %H:%M")).dim(),
        style(review_marks(entry)).cyan(),
        entry.model_name,
        truncate(&entry.prompt, PREVIEW_CHARS)
    );
}

pub fn cmd_list(ctx: &Context, limit: usize) -> Result<()> {
    let entries = ctx.agent.entries().recent(limit)?;

    if ctx.json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No entries logged in {}", ctx.config.log_dir().display());
        return Ok(());
    }

    println!();
    for entry in &entries {
        print_entry_line(entry);
    }
    println!();
    println!("{}", style("S = scored, R = reflected, V = revised").dim());
    Ok(())
}

#[derive(Serialize)]
struct EntryDetail<'a> {
    entry: &'a Entry,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<ScoreSummary>,
    explorations: Vec<Exploration>,
}

pub fn cmd_show(ctx: &Context, id: &str) -> Result<()> {
    let id = ctx.resolve_entry_id(id)?;
    let Some(entry) = ctx.agent.entries().get(id)? else {
        bail!("Entry {} not found", id);
    };
    let explorations = ctx.agent.engine().explorations_for_entry(id)?;

    if ctx.json {
        return print_json(&EntryDetail {
            entry: &entry,
            score: entry.score.as_ref().map(ScoreSummary::from),
            explorations,
        });
    }

    println!();
    println!("{} {}", style("Entry").bold(), style(entry.id).yellow());
    println!("  time:   {}", entry.timestamp.to_rfc3339());
    println!("  model:  {}", entry.model_name);
    if let Some(tokens) = entry.tokens_used {
        println!("  tokens: {}", tokens);
    }
    for (key, value) in &entry.metadata {
        println!("  {}: {}", key, value);
    }

    section("Prompt", &entry.prompt);
    section("Response", &entry.response);
    if let Some(thinking) = &entry.thinking_process {
        section("Thinking", thinking);
    }

    if let Some(score) = &entry.score {
        let summary = ScoreSummary::from(score);
        println!();
        println!("{}", style("Score").bold().underlined());
        println!("  clarity:    {:.1}", summary.clarity);
        println!("  usefulness: {:.1}", summary.usefulness);
        println!("  alignment:  {:.1}", summary.alignment);
        if let Some(creativity) = summary.creativity {
            println!("  creativity: {:.1}", creativity);
        }
        println!("  overall:    {}", style(format!("{:.2}", summary.overall)).green());
    }
    if let Some(reflection) = &entry.reflection {
        section("Reflection", reflection);
    }
    if let Some(revision) = &entry.revision {
        section("Revision", revision);
    }

    if !explorations.is_empty() {
        println!();
        println!("{}", style("Explorations").bold().underlined());
        for exploration in &explorations {
            println!(
                "  {}{} {}",
                FOLDER,
                style(short_id(&exploration.id.to_string())).yellow(),
                exploration.generated_prompt
            );
        }
    }
    println!();
    Ok(())
}

fn section(title: &str, body: &str) {
    println!();
    println!("{}", style(title).bold().underlined());
    for line in body.lines() {
        println!("  {}", line);
    }
}

pub fn cmd_search(ctx: &Context, query: &str, field: &str) -> Result<()> {
    if !Entry::SEARCHABLE_FIELDS.contains(&field) {
        bail!(
            "Unknown field '{}'. Searchable fields: {}",
            field,
            Entry::SEARCHABLE_FIELDS.join(", ")
        );
    }
    let results = ctx.agent.entries().search(query, field)?;

    if ctx.json {
        return print_json(&results);
    }
    println!(
        "{}{} match(es) for '{}' in {}",
        SEARCH,
        results.len(),
        style(query).cyan(),
        field
    );
    for entry in &results {
        print_entry_line(entry);
    }
    Ok(())
}

pub fn cmd_stats(ctx: &Context) -> Result<()> {
    let stats = ctx.agent.stats()?;

    if ctx.json {
        return print_json(&stats);
    }

    println!();
    println!("{}", style("Reflector Statistics").bold());
    println!("====================");
    println!("  log dir:      {}", ctx.config.log_dir().display());
    println!("  entries:      {}", stats.total_entries);
    println!("  scored:       {}", stats.scored_entries);
    println!("  reflected:    {}", stats.reflected_entries);
    println!("  revised:      {}", stats.revised_entries);
    println!("  explorations: {}", stats.total_explorations);

    if !stats.models.is_empty() {
        println!();
        println!("Models:");
        for (model, count) in &stats.models {
            println!("  {:<20} {}", model, count);
        }
    }
    if let Some(avg) = &stats.average_scores {
        println!();
        println!("Average scores:");
        println!("  clarity:    {:.2}", avg.clarity);
        println!("  usefulness: {:.2}", avg.usefulness);
        println!("  alignment:  {:.2}", avg.alignment);
    }
    println!();
    Ok(())
}
