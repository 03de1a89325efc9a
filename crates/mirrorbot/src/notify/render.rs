//! Message text.
//!
//! All lengths are counted in characters, which is how Discord measures its
//! message limits.

use std::time::Duration;

use crate::pipeline::{CycleOutcome, CycleReport};

/// Smallest message cap that still fits a summary header and an omission tail.
pub const MIN_MESSAGE_LENGTH: usize = 100;

/// Summary text for a cycle that found nothing.
pub const NO_RESULTS: &str = "No new repositories found matching the criteria.";

const DETAIL_DESCRIPTION_WIDTH: usize = 50;

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }
    let mut out: String = s.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// `1h2m3s`, `4m0s`, `12s`, rounded to the nearest second.
pub fn format_duration(duration: Duration) -> String {
    let secs = (duration.as_millis() + 500) / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

pub fn status_icon(outcome: &CycleOutcome) -> &'static str {
    if outcome.is_queued() { "✅" } else { "❌" }
}

/// One summary line per repository.
pub fn detail_line(outcome: &CycleOutcome) -> String {
    format!(
        "{} **{}** ({}⭐) - {}",
        status_icon(outcome),
        outcome.full_name,
        outcome.stars,
        truncate(&outcome.description, DETAIL_DESCRIPTION_WIDTH)
    )
}

pub fn omitted_tail(omitted: usize) -> String {
    format!("... and {omitted} more")
}

fn summary_header(report: &CycleReport) -> String {
    let mut header = if report.outcomes.is_empty() {
        format!(
            "{NO_RESULTS}\nCompleted in {}",
            format_duration(report.elapsed)
        )
    } else {
        format!(
            "Found {} new repositories in {}\nQueued: {} | Failed: {}",
            report.outcomes.len(),
            format_duration(report.elapsed),
            report.queued(),
            report.failed()
        )
    };
    if !report.query_errors.is_empty() {
        header.push_str(&format!("\nQuery errors: {}", report.query_errors.len()));
    }
    header
}

/// Render the cycle summary in at most `max_len` characters.
///
/// Detail lines are added in outcome order while they fit together with the
/// tail that would be needed for the lines after them. Once one does not
/// fit, it and every later line are replaced by `... and N more`. A line is
/// either included whole or not at all.
///
/// Room for the longest possible tail is reserved before the header is
/// placed, so an oversized header is cut and the tail never is.
pub fn render_summary(report: &CycleReport, max_len: usize) -> String {
    let header = summary_header(report);
    let total = report.outcomes.len();
    if total == 0 {
        return truncate(&header, max_len);
    }

    let worst_tail = omitted_tail(total).chars().count() + 2;
    let mut out = truncate(&header, max_len.saturating_sub(worst_tail));
    out.push('\n');
    let mut used = out.chars().count();

    for (i, outcome) in report.outcomes.iter().enumerate() {
        let line = detail_line(outcome);
        let line_len = line.chars().count() + 1;
        let after = total - i - 1;
        let reserve = if after > 0 {
            omitted_tail(after).chars().count() + 1
        } else {
            0
        };

        if used + line_len + reserve > max_len {
            out.push('\n');
            out.push_str(&omitted_tail(total - i));
            break;
        }

        out.push('\n');
        out.push_str(&line);
        used += line_len;
    }

    out
}
