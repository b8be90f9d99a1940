//! Formatted terminal output.
//!
//! We keep formatting code in one place so the equation code stays clean and
//! output changes are localized.

use crate::app::pipeline::RunOutput;
use crate::domain::SubjectResult;
use crate::tables::{KnudsonTable, WangTable};

use super::pct_stats;

/// Format the run summary (reference, measure, counts, warnings, row notes).
pub fn format_summary(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== spiro - Spirometry reference values ===\n");
    out.push_str(&format!("Reference: {}\n", run.reference.display_name()));
    out.push_str(&format!("Measure: {}\n", run.measure));
    if run.adult_mode {
        out.push_str("Adult mode: ages 19+ use the 18-year-old coefficients\n");
    }
    out.push_str(&format!(
        "Subjects: n={} | predicted={} | missing={}\n",
        run.results.len(),
        run.results.len() - run.n_missing(),
        run.n_missing(),
    ));

    if let Some(stats) = pct_stats(&run.results) {
        out.push_str(&format!(
            "% predicted: n={} | mean={:.1} | range=[{:.1}, {:.1}] | <80%: {}\n",
            stats.n, stats.mean, stats.min, stats.max, stats.below_80
        ));
    }

    if !run.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &run.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    if !run.row_notes.is_empty() {
        out.push_str("\nInput notes:\n");
        for note in &run.row_notes {
            let id = note.id.as_deref().map(|id| format!(" ({id})")).unwrap_or_default();
            out.push_str(&format!("- line {}{id}: {}\n", note.line, note.message));
        }
    }

    out
}

/// Format per-subject results. Observed and %pred columns only appear in
/// percent-of-predicted runs.
pub fn format_results(results: &[SubjectResult], with_pct: bool) -> String {
    let mut out = String::new();

    if with_pct {
        push_line(
            &mut out,
            format!(
                "{:<16} {:<5} {:>6} {:>8} {:<6} {:>10} {:>10} {:>8}",
                "id", "sex", "age", "height", "race", "predicted", "observed", "%pred"
            ),
        );
        push_line(
            &mut out,
            format!(
                "{:-<16} {:-<5} {:-<6} {:-<8} {:-<6} {:-<10} {:-<10} {:-<8}",
                "", "", "", "", "", "", "", ""
            ),
        );
    } else {
        push_line(
            &mut out,
            format!(
                "{:<16} {:<5} {:>6} {:>8} {:<6} {:>10}",
                "id", "sex", "age", "height", "race", "predicted"
            ),
        );
        push_line(
            &mut out,
            format!("{:-<16} {:-<5} {:-<6} {:-<8} {:-<6} {:-<10}", "", "", "", "", "", ""),
        );
    }

    for r in results {
        let mut line = format!(
            "{:<16} {:<5} {:>6} {:>8} {:<6} {:>10}",
            truncate(&r.id, 16),
            truncate(r.sex.as_deref().unwrap_or("NA"), 5),
            fmt_opt(r.age, 1),
            fmt_opt(r.height, 2),
            truncate(r.race.as_deref().unwrap_or(""), 6),
            fmt_opt(r.predicted, 3),
        );
        if with_pct {
            line.push_str(&format!(" {:>10} {:>8}", fmt_opt(r.observed, 3), fmt_opt(r.pct_predicted, 1)));
        }
        push_line(&mut out, line);
    }

    out
}

/// Format the Knudson coefficient table.
pub fn format_knudson_table(table: &KnudsonTable) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<8} {:>3} {:>6} {:>10} {:>10} {:>10} {:>10}",
            "measure", "sex", "age_lb", "const", "height", "age", "age^2"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<8} {:-<3} {:-<6} {:-<10} {:-<10} {:-<10} {:-<10}", "", "", "", "", "", "", ""),
    );
    for row in table.rows() {
        push_line(
            &mut out,
            format!(
                "{:<8} {:>3} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
                row.measure.to_string(),
                row.sex.code(),
                row.age_lb,
                row.coef_const,
                row.coef_height,
                row.coef_age,
                row.coef_age_sq,
            ),
        );
    }
    out
}

/// Format the Wang coefficient table.
pub fn format_wang_table(table: &WangTable) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!("{:<8} {:<6} {:>3} {:>6} {:>10} {:>10}", "measure", "race", "sex", "age_lb", "alpha", "beta"),
    );
    push_line(
        &mut out,
        format!("{:-<8} {:-<6} {:-<3} {:-<6} {:-<10} {:-<10}", "", "", "", "", "", ""),
    );
    for row in table.rows() {
        push_line(
            &mut out,
            format!(
                "{:<8} {:<6} {:>3} {:>6} {:>10.3} {:>10.3}",
                row.measure.to_string(),
                row.race.name(),
                row.sex.code(),
                row.age_lb,
                row.alpha,
                row.beta,
            ),
        );
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "NA".to_string(),
    }
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
