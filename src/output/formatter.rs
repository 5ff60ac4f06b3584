use owo_colors::OwoColorize;
use serde_json::{json, Map, Value};
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::catalog::Catalog;
use crate::scoring::{ScoreReport, SubjectScore};

/// Output column for a category's sub-score.
pub fn score_column(category_id: &str) -> String {
    format!("score_{}", category_id)
}

pub const COMPOSITE_COLUMN: &str = "composite_index";

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Format points with two decimals, dropping a trailing ".00"
pub fn format_points(points: f64) -> String {
    let formatted = format!("{:.2}", points);
    formatted
        .strip_suffix(".00")
        .map(str::to_string)
        .unwrap_or(formatted)
}

/// Interpretation band of a composite index scaled to 100 points.
pub fn rating(composite: f64, max_points: f64) -> &'static str {
    let percent = if max_points > 0.0 {
        composite / max_points * 100.0
    } else {
        0.0
    };
    if percent > 80.0 {
        "good"
    } else if percent > 50.0 {
        "needs improvement"
    } else {
        "poor"
    }
}

fn colored_composite(text: &str, composite: f64, max_points: f64) -> String {
    match rating(composite, max_points) {
        "good" => text.green().bold().to_string(),
        "needs improvement" => text.yellow().bold().to_string(),
        _ => text.red().bold().to_string(),
    }
}

/// Scored subjects as an aligned table: subject, one column per category,
/// composite. Falls back to subject and composite only when the full table
/// would not fit the terminal.
pub fn format_score_table(report: &ScoreReport, use_colors: bool) -> String {
    if report.scored.is_empty() {
        return "No subjects scored.".to_string();
    }

    let separator = "  ";
    let id_width = report
        .scored
        .iter()
        .map(|s| s.subject_id.chars().count())
        .chain(std::iter::once("subject".len()))
        .max()
        .unwrap_or(7);
    let widths: Vec<usize> = report.categories.iter().map(|c| c.len().max(6)).collect();
    let composite_width = "composite".len();

    let full_width = id_width
        + widths.iter().map(|w| w + separator.len()).sum::<usize>()
        + separator.len()
        + composite_width;
    let compact = matches!(get_terminal_width(), Some(width) if width < full_width);

    let mut header = format!("{:<width$}", "subject", width = id_width);
    if !compact {
        for (category, width) in report.categories.iter().zip(&widths) {
            header.push_str(separator);
            header.push_str(&format!("{:>width$}", category, width = width));
        }
    }
    header.push_str(separator);
    header.push_str(&format!("{:>width$}", "composite", width = composite_width));

    let mut lines = Vec::with_capacity(report.scored.len() + 1);
    lines.push(if use_colors {
        header.bold().to_string()
    } else {
        header
    });

    for subject in &report.scored {
        let mut line = format!("{:<width$}", subject.subject_id, width = id_width);
        if !compact {
            for (sub, width) in subject.sub_scores.iter().zip(&widths) {
                line.push_str(separator);
                line.push_str(&format!("{:>width$}", format_points(sub.points), width = width));
            }
        }
        line.push_str(separator);
        let composite = format!(
            "{:>width$}",
            format_points(subject.composite_index),
            width = composite_width
        );
        if use_colors {
            line.push_str(&colored_composite(&composite, subject.composite_index, report.max_points));
        } else {
            line.push_str(&composite);
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Per-category breakdown of one subject (for verbose mode)
pub fn format_breakdown(subject: &SubjectScore, catalog: &Catalog, use_colors: bool) -> String {
    let max_points = catalog.max_points();
    let mut lines = Vec::with_capacity(subject.sub_scores.len() + 1);

    let composite = format!(
        "{} / {} ({})",
        format_points(subject.composite_index),
        format_points(max_points),
        rating(subject.composite_index, max_points)
    );
    if use_colors {
        lines.push(format!(
            "{}  {}",
            subject.subject_id.bold(),
            colored_composite(&composite, subject.composite_index, max_points)
        ));
    } else {
        lines.push(format!("{}  {}", subject.subject_id, composite));
    }

    for sub in &subject.sub_scores {
        let (name, total) = catalog
            .lookup(&sub.category_id)
            .map(|c| (c.display_name.as_str(), c.total_points))
            .unwrap_or((sub.category_id.as_str(), f64::NAN));
        lines.push(format!(
            "  {:<28} value {:>9.4}  points {:>6} / {}",
            name,
            sub.value,
            format_points(sub.points),
            format_points(total)
        ));
    }

    lines.join("\n")
}

/// Tab-separated output with a header row:
/// subject_id, score_<category>..., composite_index
pub fn format_tsv(report: &ScoreReport) -> String {
    let mut header = vec!["subject_id".to_string()];
    header.extend(report.categories.iter().map(|c| score_column(c)));
    header.push(COMPOSITE_COLUMN.to_string());

    let mut lines = vec![header.join("\t")];
    for subject in &report.scored {
        let mut row = vec![subject.subject_id.clone()];
        row.extend(subject.sub_scores.iter().map(|s| s.points.to_string()));
        row.push(subject.composite_index.to_string());
        lines.push(row.join("\t"));
    }
    lines.join("\n")
}

/// JSON array with one object per scored subject.
pub fn format_json(report: &ScoreReport) -> serde_json::Result<String> {
    let subjects: Vec<Value> = report
        .scored
        .iter()
        .map(|subject| {
            let mut object = Map::new();
            object.insert("subject_id".to_string(), json!(subject.subject_id));
            for sub in &subject.sub_scores {
                object.insert(score_column(&sub.category_id), json!(sub.points));
            }
            object.insert(COMPOSITE_COLUMN.to_string(), json!(subject.composite_index));
            Value::Object(object)
        })
        .collect();
    serde_json::to_string_pretty(&subjects)
}

/// One line per failed subject with its reason.
pub fn format_failures(report: &ScoreReport) -> Vec<String> {
    report
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.subject_id, f.error))
        .collect()
}

/// Catalog listing: id, name, shape, goal, bound, points.
pub fn format_catalog(catalog: &Catalog, use_colors: bool) -> String {
    let mut lines = vec![format!(
        "{} ({} categories, max {} points)",
        catalog.edition(),
        catalog.len(),
        format_points(catalog.max_points())
    )];
    if use_colors {
        lines[0] = lines[0].bold().to_string();
    }

    for category in catalog.iter() {
        let bound = category
            .clamp_bound
            .map(format_points)
            .unwrap_or_else(|| "-".to_string());
        let id = if use_colors {
            category.id.cyan().to_string()
        } else {
            category.id.clone()
        };
        lines.push(format!(
            "  {:<12} {:<52} {:<26} goal {:>5}  bound {:>5}  points {:>3}",
            id,
            category.display_name,
            category.shape.name(),
            format_points(category.goal),
            bound,
            format_points(category.total_points)
        ));
    }

    lines.join("\n")
}
