//! Correlation-based redundancy reduction
//!
//! Walks the upper triangle of the correlation matrix row by row. For every pair
//! `(i, j)` with `i < j` and `|corr| > threshold`, the later column `j` is
//! removed. Rows belonging to columns that were already removed are skipped, so
//! each removed column has a retained, earlier partner above the threshold.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::correlation::{correlation_matrix_from_values, CorrelationConfig, CorrelationMatrix};
use super::dataset::Dataset;
use crate::error::{PrepError, PrepResult};

/// Options for [`remove_highly_correlated`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedundancyConfig {
    /// Absolute correlation above which the later column of a pair is dropped
    pub threshold: f64,
    pub correlation: CorrelationConfig,
    /// Columns left out of the analysis entirely; never dropped
    pub exclude: Vec<String>,
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            threshold: 0.95,
            correlation: CorrelationConfig::default(),
            exclude: Vec::new(),
        }
    }
}

impl RedundancyConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> PrepResult<()> {
        validate_threshold(self.threshold)
    }
}

fn validate_threshold(threshold: f64) -> PrepResult<()> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(PrepError::InvalidConfiguration(format!(
            "correlation threshold must be a positive number, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Result of redundancy reduction
#[derive(Debug, Clone)]
pub struct Reduction {
    pub dataset: Dataset,
    /// Removed columns in increasing original column order
    pub removed: Vec<String>,
}

/// Determine which columns of a correlation matrix are redundant at `threshold`.
///
/// Returned names follow matrix (original column) order.
pub fn select_features_to_drop(
    matrix: &CorrelationMatrix,
    threshold: f64,
) -> PrepResult<Vec<String>> {
    validate_threshold(threshold)?;

    let n = matrix.len();
    let mut removed = vec![false; n];
    for i in 0..n {
        if removed[i] {
            continue;
        }
        for j in (i + 1)..n {
            if !removed[j] && matrix.value(i, j).abs() > threshold {
                debug!(
                    kept = %matrix.columns()[i],
                    dropped = %matrix.columns()[j],
                    correlation = matrix.value(i, j),
                    "redundant pair"
                );
                removed[j] = true;
            }
        }
    }

    Ok(matrix
        .columns()
        .iter()
        .zip(removed)
        .filter(|(_, r)| *r)
        .map(|(name, _)| name.clone())
        .collect())
}

/// Remove one column from each highly correlated pair.
///
/// Returns the input unchanged with an empty removal list when no pair exceeds
/// the threshold (always the case for thresholds of 1 or more).
pub fn remove_highly_correlated(
    dataset: &Dataset,
    config: &RedundancyConfig,
) -> PrepResult<Reduction> {
    config.validate()?;
    for name in &config.exclude {
        dataset.position(name)?;
    }

    let names: Vec<String> = dataset
        .numeric_columns()
        .into_iter()
        .filter(|name| !config.exclude.contains(name))
        .collect();
    let columns = names
        .iter()
        .map(|name| dataset.numeric_values(name))
        .collect::<PrepResult<Vec<_>>>()?;

    let matrix = correlation_matrix_from_values(names, &columns, &config.correlation);
    let removed = select_features_to_drop(&matrix, config.threshold)?;

    info!(
        threshold = config.threshold,
        removed = removed.len(),
        "redundancy reduction complete"
    );

    let dataset = if removed.is_empty() {
        dataset.clone()
    } else {
        dataset.drop_columns(&removed)?
    };
    Ok(Reduction { dataset, removed })
}
