use std::fmt::Write as _;
use std::path::Path;

use apptrack::orchestrator::RunSummary;
use apptrack::tracking::{
    format_timestamp, ClassificationEvent, ParseError, TrackingRecord, TABLE_HEADERS,
};
use serde::Serialize;

/// Output shape of the `classify` command.
#[derive(Debug, Serialize)]
pub(crate) struct ClassificationView {
    pub(crate) status: &'static str,
    pub(crate) employer: String,
    pub(crate) role: String,
    pub(crate) observed_at: String,
    pub(crate) actionable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) parse_error: Option<String>,
}

impl ClassificationView {
    pub(crate) fn new(event: &ClassificationEvent, parse_error: Option<&ParseError>) -> Self {
        Self {
            status: event.status.label(),
            employer: event.employer.clone(),
            role: event.role.clone(),
            observed_at: format_timestamp(&event.observed_at),
            actionable: parse_error.is_none() && event.status.is_actionable(),
            parse_error: parse_error.map(ToString::to_string),
        }
    }
}

pub(crate) fn summary_text(store_path: &Path, summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sync complete ({})", store_path.display());
    let _ = writeln!(out, "- candidates: {}", summary.candidates);
    let _ = writeln!(
        out,
        "- reconciled: {} created, {} updated, {} unchanged",
        summary.created, summary.updated, summary.unchanged
    );
    let _ = writeln!(
        out,
        "- skipped: {} without status, {} malformed answers",
        summary.skipped, summary.malformed
    );
    let _ = writeln!(out, "- failed: {}", summary.failed);
    out
}

/// Renders rows as an aligned, pipe separated table.
pub(crate) fn records_table<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a TrackingRecord>,
{
    let rows: Vec<[String; 4]> = records
        .into_iter()
        .map(|record| {
            [
                record.employer.clone(),
                record.role.clone(),
                format_timestamp(&record.last_observed_at),
                record.status.label().to_string(),
            ]
        })
        .collect();

    if rows.is_empty() {
        return "No tracked applications.\n".to_string();
    }

    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &TABLE_HEADERS, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}
