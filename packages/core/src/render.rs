//! Human-readable text rendering of [`Violation`]s and [`ValidationReport`]s.
//!
//! The output is stable plain text for terminals and logs. It is not a
//! canonical format; only the JSON form of a report is meant for machines.

use crate::validation::{Severity, ValidationReport, Violation};

/// Render a single [`Violation`] as a header line and a wrapped message.
///
/// ```text
/// [ERROR] example.weather#Forecast  ResourceLifecycle
///   The `put` lifecycle operation of this resource targets an invalid
///   operation, `example.weather#PutForecast`. The targeted operation must not
///   be marked with the readonly trait.
/// ```
pub fn render_violation(violation: &Violation) -> String {
    let subject = violation
        .shape_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "(model)".to_string());
    let mut out = format!("[{}] {}  {}\n", violation.severity, subject, violation.kind);
    out.push_str(&wrap(&violation.message, 78, "  "));
    out.push('\n');
    out
}

/// Render every violation at `min` severity or above, grouped by severity
/// from most to least severe.
///
/// ```text
/// Validation report  2 violations
/// ───────────────────────────────
///
/// ERROR (1)
///   ns#A  ShapeNotFound
///     member shape targets an unresolved shape `ns#Missing`
///
/// WARNING (1)
///   ...
/// ```
pub fn render_report(report: &ValidationReport, min: Severity) -> String {
    let shown: Vec<&Violation> = report.at_least(min).collect();
    let total = shown.len();
    let header = format!(
        "Validation report  {} violation{}",
        total,
        if total == 1 { "" } else { "s" }
    );
    let rule = "─".repeat(header.chars().count());
    let mut out = format!("{}\n{}\n", header, rule);

    for severity in [Severity::Error, Severity::Danger, Severity::Warning, Severity::Note] {
        let group: Vec<&&Violation> = shown.iter().filter(|v| v.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&format!("{} ({})\n", severity, group.len()));
        for v in group {
            let subject = v
                .shape_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "(model)".to_string());
            out.push_str(&format!("  {}  {}\n", subject, v.kind));
            out.push_str(&wrap(&v.message, 76, "    "));
            out.push('\n');
        }
    }

    if report.is_valid() {
        out.push_str("\nThe model is valid.\n");
    }
    out
}

// --- helpers -----------------------------------------------------------------

fn wrap(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::from(indent);
    let mut line_len = 0usize;
    for word in text.split_whitespace() {
        if line_len > 0 && line_len + word.len() + 1 > width {
            result.push('\n');
            result.push_str(indent);
            line_len = 0;
        } else if line_len > 0 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word.len();
    }
    result
}

// --- tests -------------------------------------------------------------------
