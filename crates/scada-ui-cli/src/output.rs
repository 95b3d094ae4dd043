//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use scada_ui::{ScenarioResult, ScenarioStatus, SuiteReport};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for scenario runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print the steps of each scenario
    pub show_steps: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
            show_steps: false,
        }
    }

    /// Print step timings under each scenario
    #[must_use]
    pub const fn with_steps(mut self, show_steps: bool) -> Self {
        self.show_steps = show_steps;
        self
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Clear the progress bar; later lines go straight to the terminal
    pub fn finish(&mut self) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
    }

    fn write_line(&self, line: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.println(line),
            None => {
                let _ = self.term.write_line(line);
            }
        }
    }

    fn prefix(&self, symbol: &str, plain: &str, color: &Style) -> String {
        if self.use_color {
            color.apply_to(symbol).bold().to_string()
        } else {
            plain.to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("✓", "PASS", &Style::new().green());
        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = self.prefix("✗", "FAIL", &Style::new().red());
        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a skip message
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("-", "SKIP", &Style::new().yellow());
        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = self.prefix("ℹ", "INFO", &Style::new().blue());
        self.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.write_line("");
        self.write_line(&styled);
    }

    /// Print the outcome of one scenario
    pub fn scenario_result(&self, result: &ScenarioResult) {
        let line = scenario_line(result);
        match result.status {
            ScenarioStatus::Passed => self.success(&line),
            ScenarioStatus::Skipped => self.skipped(&line),
            ScenarioStatus::Failed => {
                self.failure(&line);
                if let Some(error) = &result.error {
                    self.write_line(&format!("    {error}"));
                }
            }
        }

        if self.show_steps && !self.quiet {
            for step in &result.steps {
                let mark = if step.passed { "ok" } else { "FAILED" };
                self.write_line(&format!(
                    "    {} ... {mark} ({} ms)",
                    step.name, step.duration_ms
                ));
            }
        }
        self.increment(1);
    }

    /// Print the summary of a whole run
    pub fn report_summary(&self, report: &SuiteReport) {
        self.summary(
            report.passed_count(),
            report.failed_count(),
            report.skipped_count(),
            Duration::from_millis(report.duration_ms),
        );
    }

    /// Print run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        self.write_line("");
        if !self.use_color {
            self.write_line(&summary_line(passed, failed, skipped, duration));
            return;
        }

        let verdict = if failed > 0 {
            style("FAILED").red().bold()
        } else {
            style("PASSED").green().bold()
        };
        let failed_count = if failed > 0 {
            style(failed).red().bold()
        } else {
            style(failed)
        };
        self.write_line(&format!(
            "{verdict} {} scenarios in {:.2}s ({} passed, {failed_count} failed, {} skipped)",
            passed + failed + skipped,
            duration.as_secs_f64(),
            style(passed).green().bold(),
            style(skipped).yellow(),
        ));
    }
}

/// `name [tags] (N ms)`
#[must_use]
pub fn scenario_line(result: &ScenarioResult) -> String {
    let tags: Vec<&str> = result.tags.iter().map(|t| t.as_str()).collect();
    format!(
        "{} [{}] ({} ms)",
        result.name,
        tags.join(", "),
        result.duration_ms
    )
}

/// Uncolored summary line
#[must_use]
pub fn summary_line(passed: usize, failed: usize, skipped: usize, duration: Duration) -> String {
    let status = if failed > 0 { "FAILED" } else { "PASSED" };
    let total = passed + failed + skipped;
    format!(
        "{status} {total} scenarios in {:.2}s ({passed} passed, {failed} failed, {skipped} skipped)",
        duration.as_secs_f64()
    )
}
