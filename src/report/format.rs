//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting/mapping code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{FitOutcome, LabeledPoint, MappingOutcome};
use crate::io::summary::RunSummary;
use crate::report::tally_by_candidate;

/// Assignment table: one line per training column.
pub fn format_fit_summary(fit: &FitOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("Best matches (over {} shared points):\n", fit.common_points));
    out.push_str(
        format!(
            "{:<10} {:<10} {:>14} {:>12} {:>12}",
            "train", "ideal", "SSE", "max dev", "threshold"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<10} {:-<14} {:-<12} {:-<12}", "", "", "", "", "").trim_end());
    out.push('\n');

    for m in &fit.matches {
        out.push_str(
            format!(
                "{:<10} {:<10} {:>14.4} {:>12.4} {:>12.4}",
                truncate(&m.training, 10),
                truncate(&m.candidate, 10),
                m.sse,
                m.max_deviation,
                m.threshold()
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Mapping counts, per-candidate tallies and the first `rows` labeled points.
pub fn format_mapping_summary(fit: &FitOutcome, mapping: &MappingOutcome, rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Test points: observed={} mapped={} unmatched={}\n",
        mapping.observed,
        mapping.points.len(),
        mapping.unmatched
    ));

    for t in tally_by_candidate(fit, &mapping.points) {
        out.push_str(&format!(
            "  {} -> {}: {} points (max residual {:.4})\n",
            t.training, t.candidate, t.points, t.max_residual
        ));
    }

    if rows > 0 && !mapping.points.is_empty() {
        out.push('\n');
        out.push_str(&format_labeled_table(&mapping.points[..rows.min(mapping.points.len())]));
    }
    out
}

/// Table of labeled points.
pub fn format_labeled_table(points: &[LabeledPoint]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>10} {:>12} {:>12} {:<10}", "x", "y", "delta y", "ideal").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<12} {:-<12} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');

    for p in points {
        out.push_str(
            format!(
                "{:>10.3} {:>12.4} {:>12.4} {:<10}",
                p.x,
                p.y,
                p.residual,
                truncate(&p.candidate, 10)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Format a saved run summary.
pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} run summary ===\n", summary.tool));
    out.push_str(&format!("Generated: {}\n", summary.generated_at.to_rfc3339()));
    out.push_str(&format!(
        "Shape: {} training x {} candidate columns | shared points: {}\n",
        summary.shape.training_columns, summary.shape.candidate_columns, summary.common_points
    ));

    out.push('\n');
    for a in &summary.assignments {
        out.push_str(&format!(
            "{} -> {} (Max Dev: {:.4}, threshold {:.4}, SSE {:.4}, {} points)\n",
            a.training, a.candidate, a.max_deviation, a.threshold, a.sse, a.mapped_points
        ));
    }

    let tp = &summary.test_points;
    out.push_str(&format!(
        "\nTest points: observed={} mapped={} unmatched={} skipped rows={}\n",
        tp.observed, tp.mapped, tp.unmatched, tp.skipped_rows
    ));
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
