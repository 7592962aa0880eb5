//! CLI output formatting.
//!
//! # Progress
//!
//! A run reports [`ConvertEvent`]s; how many of them turn into lines depends
//! on the [`Verbosity`]:
//!
//! | Verbosity | Lines |
//! |-----------|-------|
//! | silent | none |
//! | minimal | run start, failed topics, total time |
//! | normal | + start and finish of each step |
//! | detailed | + one line per topic in parallel steps |
//! | insane | + step numbers and percentages |
//!
//! ```text
//! STARTED
//! STARTED  READING
//! FINISHED READING IN 00:00:00.001
//! ...
//! STARTED  MATCHING
//! MATCHING  Welcome
//! MATCHING  HowTo-Build
//! FAILED   Parts/Broken.md: Cannot find topic Gone, source: Parts/Broken.md
//! FINISHED MATCHING IN 00:00:00.004
//! ...
//! TOTAL    00:00:00.020 (12 written, 1 failed)
//! ```
//!
//! # Check
//!
//! Information-first: each topic leads with its title and variant, with the
//! source path and id as indented context.
//!
//! ```text
//! Topics
//! 001 Welcome (general)
//!     Source: Welcome.md
//!     Id: 6f1c...
//!
//! Unresolved links
//! Welcome.md → Gone
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no clocks.

use crate::convert::{CheckReport, ConvertEvent};
use crate::types::Verbosity;
use std::time::Duration;

// ============================================================================
// Shared helpers
// ============================================================================

/// `hh:mm:ss.fff`
fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total / 3600,
        total / 60 % 60,
        total % 60,
        d.subsec_millis()
    )
}

fn format_index(index: usize) -> String {
    format!("{:03}", index)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn percent(index: usize, count: usize) -> f64 {
    if count == 0 {
        return 100.0;
    }
    index as f64 * 100.0 / count as f64
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_event(event: &ConvertEvent, verbosity: Verbosity) -> Vec<String> {
    let insane = verbosity == Verbosity::Insane;
    let line = match event {
        ConvertEvent::Started if verbosity >= Verbosity::Minimal => "STARTED".to_string(),
        ConvertEvent::StepStarted { step, index, count } if verbosity >= Verbosity::Normal => {
            if insane {
                format!("STEP {index}/{count} {step}")
            } else {
                format!("STARTED  {step}")
            }
        }
        ConvertEvent::Progress {
            step,
            index,
            count,
            name,
        } if verbosity >= Verbosity::Detailed => {
            if insane {
                format!("{step}  {:06.2}%  {name}", percent(*index, *count))
            } else {
                format!("{step}  {name}")
            }
        }
        ConvertEvent::StepFinished { step, elapsed } if verbosity >= Verbosity::Normal => {
            format!("FINISHED {step} IN {}", format_duration(*elapsed))
        }
        ConvertEvent::TopicFailed { path, message } if verbosity >= Verbosity::Minimal => {
            format!("FAILED   {}: {message}", path.display())
        }
        ConvertEvent::Finished {
            elapsed,
            written,
            failed,
        } if verbosity >= Verbosity::Minimal => format!(
            "TOTAL    {} ({written} written, {failed} failed)",
            format_duration(*elapsed)
        ),
        _ => return Vec::new(),
    };
    vec![line]
}

pub fn print_event(event: &ConvertEvent, verbosity: Verbosity) {
    for line in format_event(event, verbosity) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of a check run.
pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.topics.is_empty() {
        lines.push("Topics".to_string());
        for (i, topic) in report.topics.iter().enumerate() {
            lines.push(format!(
                "{} {} ({})",
                format_index(i + 1),
                topic.title,
                topic.kind()
            ));
            lines.push(format!(
                "{}Source: {}",
                indent(1),
                topic.entry.relative_path().display()
            ));
            lines.push(format!("{}Id: {}", indent(1), topic.id));
        }
    }

    if !report.unresolved.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Unresolved links".to_string());
        for link in &report.unresolved {
            lines.push(format!("{} \u{2192} {}", link.from.display(), link.target));
        }
    }

    if !report.failed.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Failed".to_string());
        for failure in &report.failed {
            lines.push(format!("{}", failure.path.display()));
            lines.push(format!("{}{}", indent(1), failure.message));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Checked {} topics: {} unresolved links, {} failed",
        report.topics.len(),
        report.unresolved.len(),
        report.failed.len()
    ));
    lines
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}
