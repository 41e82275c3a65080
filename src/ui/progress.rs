use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::review::{BatchEntryResult, BatchReview};
use crate::ui::icons::{CHECK, CROSS, SKIP};

/// Progress bar for work over a known number of entries, such as a batch review.
///
/// Per-entry lines are printed above the bar. When `hidden` is set nothing is
/// drawn, which keeps machine-readable output clean.
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    pub fn new(total: u64, label: &str, hidden: bool) -> Self {
        let bar = ProgressBar::new(total);
        if hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        let bar_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");
        bar.set_style(bar_style);
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Print a line above the bar. Hidden bars print nothing.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.bar.is_hidden() {
            return;
        }
        self.bar.println(msg.as_ref());
    }

    /// Report one entry of a batch review and advance the bar.
    pub fn review_done(&self, result: &BatchEntryResult) {
        let full = result.entry_id().to_string();
        let short = short_id(&full);
        let line = match result {
            BatchEntryResult::NotFound { .. } => {
                format!("{}{} {}", CROSS, style(short).yellow(), style("not found").red())
            }
            BatchEntryResult::Reviewed { report } if report.is_noop() => {
                format!("{}{} {}", SKIP, style(short).yellow(), style("already reviewed").dim())
            }
            BatchEntryResult::Reviewed { report } if report.any_succeeded() => {
                let steps: Vec<&str> = report
                    .steps
                    .iter()
                    .filter(|s| s.success())
                    .map(|s| s.step.as_str())
                    .collect();
                format!("{}{} {}", CHECK, style(short).yellow(), steps.join(", "))
            }
            BatchEntryResult::Reviewed { .. } => {
                format!("{}{} {}", CROSS, style(short).yellow(), style("all steps failed").red())
            }
        };
        self.print_line(line);
        self.bar.inc(1);
    }

    pub fn finish(&self, summary: &BatchReview) {
        self.bar.finish_with_message(format!(
            "{} reviewed, {} failed, {} skipped",
            style(summary.successful).green(),
            style(summary.failed).red(),
            style(summary.skipped).dim()
        ));
    }
}

/// First eight characters of an id, as shown in listings.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_hidden_progress_counts() {
        let progress = BatchProgress::new(2, "Review", true);
        progress.review_done(&BatchEntryResult::NotFound {
            entry_id: uuid::Uuid::new_v4(),
        });
        assert_eq!(progress.bar.position(), 1);
    }
}
