//! Console reporter with colored output

use crate::factcheck::Comparison;
use crate::review::{FileOutcome, FileReport, RunOutcome, RunSummary};
use colored::Colorize;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Print each vendor's answer under the claim
    pub fn report_comparison(&self, comparison: &Comparison) {
        println!();
        println!("{} {}", "Claim:".bold(), comparison.request.claim);
        if self.verbose {
            println!("{} {}", "Mode:".dimmed(), comparison.request.constraint);
        }
        println!("{}", "─".repeat(60));

        for reply in &comparison.replies {
            let answer = if reply.reply.is_empty() {
                "(no answer)".dimmed().to_string()
            } else {
                self.colorize_verdict(&reply.reply)
            };
            println!("{:>12}  {}", reply.vendor.to_string().cyan().bold(), answer);
        }
        println!();
    }

    /// Print per-file outcomes and the run summary
    pub fn report_review(&self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::NothingToDo { root, skipped } => {
                println!(
                    "{}: No allowed files found in '{}' to process ({} skipped)",
                    "Info".blue(),
                    root.display(),
                    skipped
                );
            }
            RunOutcome::Completed(summary) => {
                println!();
                for file in &summary.files {
                    self.print_file(file);
                }
                self.print_summary(summary);
            }
        }
    }

    fn print_file(&self, file: &FileReport) {
        let path = file.path.display();
        match &file.outcome {
            FileOutcome::Written {
                backup,
                fallback,
                changed,
            } => {
                let status = match (*fallback, *changed) {
                    (true, _) => "written (raw reply)".yellow(),
                    (false, true) => "updated".green(),
                    (false, false) => "unchanged".normal(),
                };
                println!("  {} {} [{}]", "✓".green(), path, status);
                if self.verbose {
                    println!("      backup: {}", backup.display().to_string().dimmed());
                }
            }
            FileOutcome::WouldWrite { fallback, changed } => {
                let status = match (*fallback, *changed) {
                    (true, _) => "would write raw reply",
                    (false, true) => "would update",
                    (false, false) => "would leave unchanged",
                };
                println!("  {} {} [{}]", "·".blue(), path, status.blue());
            }
            FileOutcome::Rejected => {
                println!(
                    "  {} {} [{}]",
                    "!".yellow(),
                    path,
                    "reply not in code block format, not written".yellow()
                );
            }
            FileOutcome::Failed(e) => {
                println!(
                    "  {} {} [{} failed] {}",
                    "✗".red(),
                    path,
                    e.stage(),
                    e.to_string().red()
                );
            }
        }

        if self.verbose {
            for warning in &file.warnings {
                println!("      {} {}", "warning:".yellow(), warning);
            }
        }
    }

    fn print_summary(&self, summary: &RunSummary) {
        println!("{}", "─".repeat(60));
        println!(
            "{} {} file(s) in {}",
            "Processed".bold(),
            summary.attempted(),
            summary.root.display()
        );

        let mut parts = vec![format!("{} written", summary.written())];
        if summary.unchanged() > 0 {
            parts.push(format!("{} unchanged", summary.unchanged()));
        }
        if summary.fallback_written() > 0 {
            parts.push(format!("{} raw replies", summary.fallback_written()).yellow().to_string());
        }
        if summary.would_write() > 0 {
            parts.push(format!("{} would write", summary.would_write()));
        }
        if summary.rejected() > 0 {
            parts.push(format!("{} rejected", summary.rejected()).yellow().to_string());
        }
        if summary.failed() > 0 {
            parts.push(format!("{} failed", summary.failed()).red().to_string());
        }
        if self.verbose {
            parts.push(format!("{} skipped", summary.skipped));
        }
        println!("  {}", parts.join(", "));
        println!();
    }

    fn colorize_verdict(&self, reply: &str) -> String {
        let lower = reply.trim_start().to_lowercase();
        if lower.starts_with("true") {
            reply.green().to_string()
        } else if lower.starts_with("false") {
            reply.red().to_string()
        } else {
            reply.to_string()
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}
