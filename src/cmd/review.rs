//! Entry review: `reflector review`.

use anyhow::{Context as _, Result, bail};
use console::style;
use uuid::Uuid;

use reflector::review::{BatchReview, ReviewFilter, ReviewReport, ReviewStep, StepOutcome};
use reflector::scoring::overall_score;
use reflector::ui::BatchProgress;
use reflector::ui::icons::{CHECK, CROSS, REFLECT, REVISE, SCORE, SKIP};

use super::{Context, print_json};

/// Which entries a review run covers.
pub enum ReviewSelection {
    Ids(Vec<String>),
    Pending {
        limit: usize,
        unscored: bool,
        unreflected: bool,
    },
}

pub fn cmd_review(ctx: &Context, selection: ReviewSelection) -> Result<()> {
    let ids: Vec<Uuid> = match selection {
        ReviewSelection::Ids(inputs) if inputs.is_empty() => {
            bail!("Provide one or more entry ids, or use --pending")
        }
        ReviewSelection::Ids(inputs) if inputs.len() == 1 => {
            let id = ctx.resolve_entry_id(&inputs[0])?;
            return review_one(ctx, id);
        }
        ReviewSelection::Ids(inputs) => inputs
            .iter()
            .map(|input| ctx.resolve_entry_id(input))
            .collect::<Result<_>>()?,
        ReviewSelection::Pending {
            limit,
            unscored,
            unreflected,
        } => {
            let filter = ReviewFilter {
                unscored_only: unscored,
                unreflected_only: unreflected,
            };
            ctx.agent
                .pipeline()
                .reviewable_entries(usize::MAX, filter)?
                .into_iter()
                .filter(|entry| !entry.is_fully_reviewed())
                .take(limit)
                .map(|entry| entry.id)
                .collect()
        }
    };

    if ids.is_empty() {
        if ctx.json {
            return print_json(&BatchReview::default());
        }
        println!("{}Nothing to review.", SKIP);
        return Ok(());
    }

    let backend = ctx.backend()?;
    let progress = BatchProgress::new(ids.len() as u64, "Review", ctx.json);
    let summary = ctx
        .agent
        .pipeline()
        .batch_review_with(&ids, backend.as_ref(), |result| progress.review_done(result))
        .context("Batch review aborted")?;
    progress.finish(&summary);

    if ctx.json {
        return print_json(&summary);
    }
    println!();
    println!(
        "Reviewed {} entries: {} successful, {} failed, {} skipped",
        summary.total,
        style(summary.successful).green(),
        style(summary.failed).red(),
        style(summary.skipped).dim()
    );
    Ok(())
}

fn review_one(ctx: &Context, id: Uuid) -> Result<()> {
    let backend = ctx.backend()?;
    let report = ctx.agent.pipeline().review_entry(id, backend.as_ref())?;

    if ctx.json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &ReviewReport) {
    println!();
    println!("{} {}", style("Review of").bold(), style(report.entry_id).yellow());

    if report.is_noop() {
        println!("  {}Already scored, reflected and revised.", SKIP);
        println!();
        return;
    }

    for step in &report.steps {
        print_step(step);
    }
    println!();
}

fn print_step(step: &StepOutcome) {
    let icon = match step.step {
        ReviewStep::Scoring => SCORE,
        ReviewStep::Reflection => REFLECT,
        ReviewStep::Revision => REVISE,
    };

    if let Some(error) = &step.error {
        println!("  {}{} {}{}", icon, style(step.step).bold(), CROSS, style(error).red());
        return;
    }

    println!("  {}{} {}", icon, style(step.step).bold(), CHECK);
    if let Some(score) = step.score() {
        println!(
            "      clarity {:.1}  usefulness {:.1}  alignment {:.1}{}  overall {}",
            score.clarity,
            score.usefulness,
            score.alignment,
            score
                .creativity
                .map(|c| format!("  creativity {:.1}", c))
                .unwrap_or_default(),
            style(format!("{:.2}", overall_score(score))).green()
        );
    }
    if let Some(text) = step.text() {
        for line in text.lines() {
            println!("      {}", line);
        }
    }
}
