//! Table renderings of analysis results

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};

use crate::pipeline::correlation::CorrelationMatrix;
use crate::pipeline::evaluation::EvaluationReport;
use crate::pipeline::missing::MissingReport;
use crate::pipeline::ranking::TopCorrelations;
use crate::pipeline::selection::FeatureScore;

fn base_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn number(value: f64) -> Cell {
    Cell::new(format!("{:.4}", value)).set_alignment(CellAlignment::Right)
}

/// Colour a correlation by strength.
fn correlation_cell(value: f64) -> Cell {
    let color = match value.abs() {
        a if a >= 0.9 => Color::Red,
        a if a >= 0.7 => Color::Yellow,
        _ => Color::Reset,
    };
    number(value).fg(color)
}

/// Full matrix with column names on both axes.
pub fn correlation_table(matrix: &CorrelationMatrix) -> Table {
    let mut header = vec![""];
    header.extend(matrix.columns().iter().map(String::as_str));
    let mut table = base_table(&header);
    for (i, name) in matrix.columns().iter().enumerate() {
        let mut row = vec![Cell::new(name).add_attribute(Attribute::Bold)];
        row.extend((0..matrix.len()).map(|j| correlation_cell(matrix.value(i, j))));
        table.add_row(row);
    }
    table
}

pub fn top_correlations_table(top: &TopCorrelations) -> Table {
    match top {
        TopCorrelations::Target(rows) => {
            let mut table = base_table(&["Feature", "Correlation"]);
            for r in rows {
                table.add_row(vec![Cell::new(&r.feature), correlation_cell(r.correlation)]);
            }
            table
        }
        TopCorrelations::Pairwise(rows) => {
            let mut table = base_table(&["Feature 1", "Feature 2", "Correlation"]);
            for r in rows {
                table.add_row(vec![
                    Cell::new(&r.feature1),
                    Cell::new(&r.feature2),
                    correlation_cell(r.correlation),
                ]);
            }
            table
        }
    }
}

pub fn score_table(scores: &[FeatureScore]) -> Table {
    let mut table = base_table(&["Rank", "Feature", "Score"]);
    for s in scores {
        table.add_row(vec![Cell::new(s.rank), Cell::new(&s.feature), number(s.score)]);
    }
    table
}

pub fn missing_table(reports: &[MissingReport]) -> Table {
    let mut table = base_table(&["Column", "Missing", "Percent"]);
    for r in reports {
        table.add_row(vec![
            Cell::new(&r.column),
            Cell::new(r.missing_count),
            Cell::new(format!("{:.1}%", r.missing_percent)),
        ]);
    }
    table
}

pub fn metrics_table(report: &EvaluationReport) -> Table {
    let mut table = base_table(&["Metric", "Value"]);
    for (name, value) in report.metrics() {
        table.add_row(vec![Cell::new(name), number(value)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::selection::FeatureScore;

    #[test]
    fn test_score_table_rows() {
        let scores = vec![
            FeatureScore {
                feature: "f1".into(),
                score: 12.5,
                rank: 1,
            },
            FeatureScore {
                feature: "noise".into(),
                score: 0.0,
                rank: 2,
            },
        ];
        let rendered = score_table(&scores).to_string();
        assert!(rendered.contains("12.5000"));
        assert!(rendered.contains("noise"));
    }
}
