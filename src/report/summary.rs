//! Preparation summary report

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use std::fmt;

/// Running tally of what each preparation step removed
#[derive(Debug, Default, Clone)]
pub struct PreparationSummary {
    pub initial_columns: usize,
    pub final_columns: usize,
    pub initial_rows: usize,
    pub final_rows: usize,
    pub dropped_missing: Vec<String>,
    pub dropped_correlation: Vec<String>,
    pub dropped_selection: Vec<String>,
}

impl PreparationSummary {
    pub fn new(initial_rows: usize, initial_columns: usize) -> Self {
        Self {
            initial_columns,
            final_columns: initial_columns,
            initial_rows,
            final_rows: initial_rows,
            ..Default::default()
        }
    }

    pub fn add_missing_drops(&mut self, columns: Vec<String>) {
        self.final_columns = self.final_columns.saturating_sub(columns.len());
        self.dropped_missing.extend(columns);
    }

    pub fn add_correlation_drops(&mut self, columns: Vec<String>) {
        self.final_columns = self.final_columns.saturating_sub(columns.len());
        self.dropped_correlation.extend(columns);
    }

    pub fn add_selection_drops(&mut self, columns: Vec<String>) {
        self.final_columns = self.final_columns.saturating_sub(columns.len());
        self.dropped_selection.extend(columns);
    }

    pub fn add_removed_rows(&mut self, rows: usize) {
        self.final_rows = self.final_rows.saturating_sub(rows);
    }

    /// Share of columns removed, in percent.
    pub fn reduction_percent(&self) -> f64 {
        if self.initial_columns == 0 {
            return 0.0;
        }
        (self.initial_columns - self.final_columns) as f64 / self.initial_columns as f64 * 100.0
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        let dropped_cell = |n: usize| {
            Cell::new(n).fg(if n == 0 { Color::White } else { Color::Red })
        };

        table.add_row(vec![Cell::new("Initial rows"), Cell::new(self.initial_rows)]);
        table.add_row(vec![
            Cell::new("Rows removed"),
            dropped_cell(self.initial_rows - self.final_rows.min(self.initial_rows)),
        ]);
        table.add_row(vec![Cell::new("Initial columns"), Cell::new(self.initial_columns)]);
        table.add_row(vec![
            Cell::new("Dropped (missing)"),
            dropped_cell(self.dropped_missing.len()),
        ]);
        table.add_row(vec![
            Cell::new("Dropped (correlation)"),
            dropped_cell(self.dropped_correlation.len()),
        ]);
        table.add_row(vec![
            Cell::new("Dropped (selection)"),
            dropped_cell(self.dropped_selection.len()),
        ]);
        table.add_row(vec![
            Cell::new("Final columns"),
            Cell::new(self.final_columns)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);

        let pct = self.reduction_percent();
        let color = if pct > 30.0 {
            Color::Green
        } else if pct > 10.0 {
            Color::Yellow
        } else {
            Color::Cyan
        };
        table.add_row(vec![
            Cell::new("Reduction"),
            Cell::new(format!("{:.1}%", pct))
                .fg(color)
                .add_attribute(Attribute::Bold),
        ]);
        table
    }
}

impl fmt::Display for PreparationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.to_table())?;

        let groups = [
            ("High missing values", &self.dropped_missing),
            ("High correlation", &self.dropped_correlation),
            ("Not selected", &self.dropped_selection),
        ];
        for (label, columns) in groups {
            if columns.is_empty() {
                continue;
            }
            writeln!(f, "{} ({}):", label, columns.len())?;
            for column in columns {
                writeln!(f, "  - {}", column)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_follow_drops() {
        let mut summary = PreparationSummary::new(100, 10);
        summary.add_missing_drops(vec!["a".into()]);
        summary.add_correlation_drops(vec!["b".into(), "c".into()]);
        summary.add_removed_rows(5);
        assert_eq!(summary.final_columns, 7);
        assert_eq!(summary.final_rows, 95);
        assert!((summary.reduction_percent() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_drops_accumulate() {
        let mut summary = PreparationSummary::new(10, 6);
        summary.add_correlation_drops(vec!["b".into()]);
        summary.add_correlation_drops(vec!["c".into(), "d".into()]);
        assert_eq!(summary.final_columns, 3);
        assert_eq!(summary.dropped_correlation, vec!["b", "c", "d"]);
        assert!(summary.to_string().contains("High correlation (3):"));
    }

    #[test]
    fn test_display_lists_dropped_columns() {
        let mut summary = PreparationSummary::new(10, 3);
        summary.add_correlation_drops(vec!["B".into()]);
        let text = summary.to_string();
        assert!(text.contains("High correlation (1):"));
        assert!(text.contains("  - B"));
        assert!(!text.contains("High missing values"));
    }
}
