//! Correlation matrix computation
//!
//! Only `Numeric` columns participate; other kinds are skipped silently.
//! Missing values are handled as pairwise-complete observations. When no
//! participating column has missing values, Pearson and Spearman use a matrix
//! product over standardized columns; otherwise (and always for Kendall) each
//! pair is computed independently in parallel.

use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

use super::dataset::Dataset;
use crate::error::{PrepError, PrepResult};
use crate::utils::stats;
use crate::utils::{create_progress_bar, finish_with_success};

/// Association statistic between two numeric columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
    Kendall,
}

impl FromStr for CorrelationMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            "kendall" => Ok(CorrelationMethod::Kendall),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown correlation method '{}' (expected pearson, spearman or kendall)",
                other
            ))),
        }
    }
}

/// Options for building a correlation matrix
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub method: CorrelationMethod,
    /// Render a progress bar while computing pairs
    pub show_progress: bool,
}

impl CorrelationConfig {
    pub fn new(method: CorrelationMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }
}

/// Represents a correlated pair of features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Square, symmetric matrix of pairwise correlations with a unit diagonal.
///
/// Built once and never mutated. A column with zero variance correlates 0.0
/// with every other column.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    values: Mat<f64>,
    method: CorrelationMethod,
}

impl CorrelationMatrix {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn method(&self) -> CorrelationMethod {
        self.method
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Correlation at matrix positions `(i, j)`.
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.value(self.index_of(a)?, self.index_of(b)?))
    }

    /// Every `(i, j)` entry with `i < j`, row by row.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.len();
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j, self.value(i, j))))
    }

    /// Off-diagonal pairs as named records, in upper-triangle order.
    pub fn pairs(&self) -> Vec<CorrelatedPair> {
        self.upper_triangle()
            .map(|(i, j, c)| CorrelatedPair {
                feature1: self.columns[i].clone(),
                feature2: self.columns[j].clone(),
                correlation: c,
            })
            .collect()
    }

    /// Matrix as a frame: a `feature` label column followed by one column per feature.
    pub fn to_frame(&self) -> PrepResult<DataFrame> {
        let n = self.len();
        let mut columns = Vec::with_capacity(n + 1);
        columns.push(Column::new("feature".into(), self.columns.clone()));
        for (j, name) in self.columns.iter().enumerate() {
            let values: Vec<f64> = (0..n).map(|i| self.value(i, j)).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Correlation of one column pair over rows where both are present.
pub fn pair_correlation(x: &[Option<f64>], y: &[Option<f64>], method: CorrelationMethod) -> f64 {
    let (x, y) = stats::complete_pairs(x, y);
    match method {
        CorrelationMethod::Pearson => stats::pearson(&x, &y),
        CorrelationMethod::Spearman => stats::spearman(&x, &y),
        CorrelationMethod::Kendall => stats::kendall_tau_b(&x, &y),
    }
}

/// Compute the correlation matrix over the dataset's numeric columns.
///
/// Fewer than two numeric columns yields an empty or 1x1 matrix, not an error.
pub fn correlation_matrix(
    dataset: &Dataset,
    config: &CorrelationConfig,
) -> PrepResult<CorrelationMatrix> {
    let names = dataset.numeric_columns();
    let columns = names
        .iter()
        .map(|name| dataset.numeric_values(name))
        .collect::<PrepResult<Vec<_>>>()?;
    Ok(correlation_matrix_from_values(names, &columns, config))
}

pub(crate) fn correlation_matrix_from_values(
    names: Vec<String>,
    columns: &[Vec<Option<f64>>],
    config: &CorrelationConfig,
) -> CorrelationMatrix {
    let has_missing = columns.iter().any(|c| c.iter().any(Option::is_none));
    let use_matrix = !has_missing && config.method != CorrelationMethod::Kendall;

    debug!(
        columns = names.len(),
        method = ?config.method,
        matrix_path = use_matrix,
        "computing correlation matrix"
    );

    let values = if use_matrix {
        let complete: Vec<Vec<f64>> = columns
            .iter()
            .map(|c| c.iter().flatten().copied().collect())
            .collect();
        compute_correlation_matrix_fast(&complete, config.method)
    } else {
        compute_correlation_matrix_pairwise(columns, config)
    };

    info!(columns = names.len(), "correlation matrix ready");

    CorrelationMatrix {
        columns: names,
        values,
        method: config.method,
    }
}

/// Matrix-based computation for complete data.
///
/// Algorithm:
/// 1. Rank each column for Spearman
/// 2. Standardize: Z = (X - mean) / (std * sqrt(n))
/// 3. R = Z^T * Z
fn compute_correlation_matrix_fast(columns: &[Vec<f64>], method: CorrelationMethod) -> Mat<f64> {
    let n_cols = columns.len();
    let n_rows = columns.first().map_or(0, Vec::len);

    let standardized: Vec<Vec<f64>> = columns
        .par_iter()
        .map(|col| {
            let col = match method {
                CorrelationMethod::Spearman => stats::average_ranks(col),
                _ => col.clone(),
            };
            if stats::is_constant(&col) {
                // zero correlation with everything else
                return vec![0.0; col.len()];
            }
            let mean = stats::mean(&col);
            let ss: f64 = col.iter().map(|x| (x - mean) * (x - mean)).sum();
            let denom = ss.sqrt();
            col.iter().map(|x| (x - mean) / denom).collect()
        })
        .collect();

    let mut z = Mat::<f64>::zeros(n_rows, n_cols);
    for (col_idx, col_data) in standardized.iter().enumerate() {
        for (row_idx, &val) in col_data.iter().enumerate() {
            z[(row_idx, col_idx)] = val;
        }
    }

    let product = z.transpose() * &z;

    let mut result = Mat::<f64>::zeros(n_cols, n_cols);
    for i in 0..n_cols {
        result[(i, i)] = 1.0;
        for j in (i + 1)..n_cols {
            let c = product[(i, j)].clamp(-1.0, 1.0);
            result[(i, j)] = c;
            result[(j, i)] = c;
        }
    }
    result
}

/// Pairwise-complete computation, one pair per task.
fn compute_correlation_matrix_pairwise(
    columns: &[Vec<Option<f64>>],
    config: &CorrelationConfig,
) -> Mat<f64> {
    let n_cols = columns.len();
    let pairs: Vec<(usize, usize)> = (0..n_cols)
        .flat_map(|i| ((i + 1)..n_cols).map(move |j| (i, j)))
        .collect();

    let pb = create_progress_bar(
        pairs.len() as u64,
        "Calculating correlations",
        config.show_progress,
    );

    let computed: Vec<(usize, usize, f64)> = pairs
        .par_iter()
        .map(|&(i, j)| {
            let c = pair_correlation(&columns[i], &columns[j], config.method);
            pb.inc(1);
            (i, j, c)
        })
        .collect();

    finish_with_success(&pb, &format!("Analyzed {} column pairs", pairs.len()));

    let mut result = Mat::<f64>::zeros(n_cols, n_cols);
    for i in 0..n_cols {
        result[(i, i)] = 1.0;
    }
    for (i, j, c) in computed {
        result[(i, j)] = c;
        result[(j, i)] = c;
    }
    result
}
