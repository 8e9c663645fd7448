//! Missing value analysis, column dropping and imputation
//!
//! A value is missing when it is null, or NaN in a float column.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::dataset::{float_values, index_array, text_values, Dataset};
use crate::error::{PrepError, PrepResult};

/// Missing-value counts for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingReport {
    pub column: String,
    pub missing_count: usize,
    pub missing_percent: f64,
}

/// Dataset-wide missing-value totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingSummary {
    pub total_cells: usize,
    pub total_missing: usize,
    pub missing_percentage: f64,
    pub num_columns_with_missing: usize,
    pub num_complete_columns: usize,
}

/// Imputation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStrategy {
    #[default]
    Mean,
    Median,
    /// Most frequent value; ties go to the value seen first
    Mode,
    Constant(f64),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    pub strategy: FillStrategy,
    /// Columns to fill. When `None`, numeric strategies cover the numeric
    /// columns and `Mode` covers every column.
    pub columns: Option<Vec<String>>,
}

fn missing_mask(column: &Column) -> PrepResult<Vec<bool>> {
    let series = column.as_materialized_series();
    if series.dtype().is_float() {
        Ok(float_values(series)?.iter().map(Option::is_none).collect())
    } else {
        Ok(series
            .is_null()
            .into_iter()
            .map(|v| v.unwrap_or(false))
            .collect())
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn check_threshold(threshold: f64) -> PrepResult<()> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(PrepError::InvalidConfiguration(format!(
            "missing-value threshold must be a percentage in [0, 100], got {}",
            threshold
        )));
    }
    Ok(())
}

fn column_reports(dataset: &Dataset) -> PrepResult<Vec<MissingReport>> {
    let height = dataset.height();
    dataset
        .frame()
        .get_columns()
        .iter()
        .map(|column| {
            let missing_count = missing_mask(column)?.into_iter().filter(|&m| m).count();
            Ok(MissingReport {
                column: column.name().to_string(),
                missing_count,
                missing_percent: percent(missing_count, height),
            })
        })
        .collect()
}

/// Columns with at least one missing value, most missing first.
///
/// With a threshold, only columns whose missing percentage exceeds it are
/// reported.
pub fn analyze_missing_values(
    dataset: &Dataset,
    threshold_percent: Option<f64>,
) -> PrepResult<Vec<MissingReport>> {
    if let Some(t) = threshold_percent {
        check_threshold(t)?;
    }
    let mut reports: Vec<MissingReport> = column_reports(dataset)?
        .into_iter()
        .filter(|r| r.missing_count > 0)
        .filter(|r| threshold_percent.map_or(true, |t| r.missing_percent > t))
        .collect();
    reports.sort_by(|a, b| b.missing_count.cmp(&a.missing_count));
    Ok(reports)
}

pub fn quick_summary(dataset: &Dataset) -> PrepResult<MissingSummary> {
    let reports = column_reports(dataset)?;
    let total_cells = dataset.height() * dataset.width();
    let total_missing: usize = reports.iter().map(|r| r.missing_count).sum();
    let num_columns_with_missing = reports.iter().filter(|r| r.missing_count > 0).count();
    Ok(MissingSummary {
        total_cells,
        total_missing,
        missing_percentage: percent(total_missing, total_cells),
        num_columns_with_missing,
        num_complete_columns: reports.len() - num_columns_with_missing,
    })
}

/// Drop columns whose missing percentage exceeds `threshold_percent`.
/// Returns the reduced dataset and the dropped names in column order.
pub fn drop_missing_columns(
    dataset: &Dataset,
    threshold_percent: f64,
) -> PrepResult<(Dataset, Vec<String>)> {
    check_threshold(threshold_percent)?;
    let dropped: Vec<String> = column_reports(dataset)?
        .into_iter()
        .filter(|r| r.missing_percent > threshold_percent)
        .map(|r| r.column)
        .collect();

    if !dropped.is_empty() {
        info!(
            threshold = threshold_percent,
            dropped = dropped.len(),
            "dropping columns with missing values"
        );
    }
    Ok((dataset.drop_columns(&dropped)?, dropped))
}

/// Row of the most frequent present value; ties go to the earliest value.
fn mode_row(labels: &[Option<String>], mask: &[bool]) -> Option<usize> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (row, (label, &missing)) in labels.iter().zip(mask).enumerate() {
        if missing {
            continue;
        }
        if let Some(label) = label {
            counts.entry(label.as_str()).or_insert((0, row)).0 += 1;
        }
    }
    counts
        .into_values()
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, row)| row)
}

fn fill_column(dataset: &Dataset, name: &str, strategy: FillStrategy) -> PrepResult<Option<Column>> {
    let column = dataset.column(name)?;
    let mask = missing_mask(column)?;
    if !mask.iter().any(|&m| m) {
        return Ok(None);
    }

    if let FillStrategy::Mode = strategy {
        let labels = text_values(column.as_materialized_series())?;
        let Some(source) = mode_row(&labels, &mask) else {
            warn!(column = %name, "no present values to take a mode from");
            return Ok(None);
        };
        // gather keeps the column's dtype
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .map(|(row, &missing)| if missing { source } else { row })
            .collect();
        let filled = column.as_materialized_series().take(&index_array(&rows))?;
        return Ok(Some(filled.into()));
    }

    let ca = dataset.numeric_chunked(name)?;
    let fill = match strategy {
        FillStrategy::Constant(c) => c,
        _ if ca.null_count() == ca.len() => {
            warn!(column = %name, "no present values to impute from");
            return Ok(None);
        }
        FillStrategy::Median => ca.median().unwrap_or(0.0),
        _ => ca.mean().unwrap_or(0.0),
    };

    let filled = ca.fill_null_with_values(fill)?.with_name(name.into());
    debug!(column = %name, fill, "filled missing values");
    Ok(Some(Column::from(filled.into_series())))
}

/// Impute missing values with the configured strategy.
pub fn fill_missing(dataset: &Dataset, config: &FillConfig) -> PrepResult<Dataset> {
    let names = match &config.columns {
        Some(cols) => cols.clone(),
        None if config.strategy == FillStrategy::Mode => dataset.column_names(),
        None => dataset.numeric_columns(),
    };

    let mut result = dataset.clone();
    let mut filled = 0usize;
    for name in &names {
        if let Some(column) = fill_column(dataset, name, config.strategy)? {
            let kind = dataset
                .kind(name)
                .ok_or_else(|| PrepError::column_not_found(name))?;
            result = result.replace_column(name, column, kind)?;
            filled += 1;
        }
    }

    info!(strategy = ?config.strategy, columns = filled, "missing value imputation complete");
    Ok(result)
}
