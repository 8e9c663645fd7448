//! Ranking features by correlation strength
//!
//! Two modes:
//! - target mode: features ordered by absolute correlation with a target
//! - pairwise mode: the strongest off-diagonal pairs of the matrix
//!
//! Orderings are stable, so ties keep the original column order.

use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::correlation::{
    correlation_matrix_from_values, pair_correlation, CorrelatedPair, CorrelationConfig,
    CorrelationMatrix,
};
use super::dataset::{float_values, Dataset};
use crate::error::{PrepError, PrepResult};

/// A feature and its signed correlation with the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCorrelation {
    pub feature: String,
    pub correlation: f64,
}

/// Options for [`top_correlations`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopCorrelationConfig {
    /// Target column; `None` selects pairwise mode
    pub target: Option<String>,
    /// Number of rows to return
    pub n: usize,
    pub correlation: CorrelationConfig,
}

impl Default for TopCorrelationConfig {
    fn default() -> Self {
        Self {
            target: None,
            n: 10,
            correlation: CorrelationConfig::default(),
        }
    }
}

/// Options for [`correlation_with_target`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetRankConfig {
    /// Keep only the strongest `top_n` features
    pub top_n: Option<usize>,
    pub correlation: CorrelationConfig,
}

/// Output of [`top_correlations`]
#[derive(Debug, Clone, PartialEq)]
pub enum TopCorrelations {
    Target(Vec<FeatureCorrelation>),
    Pairwise(Vec<CorrelatedPair>),
}

impl TopCorrelations {
    pub fn len(&self) -> usize {
        match self {
            TopCorrelations::Target(rows) => rows.len(),
            TopCorrelations::Pairwise(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_count(n: usize) -> PrepResult<()> {
    if n == 0 {
        return Err(PrepError::InvalidConfiguration(
            "number of correlations to return must be at least 1".into(),
        ));
    }
    Ok(())
}

fn sort_by_strength(rows: &mut [FeatureCorrelation]) {
    rows.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
}

/// Features of `matrix` ordered by absolute correlation with `target`.
pub fn rank_by_target(
    matrix: &CorrelationMatrix,
    target: &str,
    top_n: Option<usize>,
) -> PrepResult<Vec<FeatureCorrelation>> {
    if let Some(n) = top_n {
        check_count(n)?;
    }
    let t = matrix.index_of(target).ok_or_else(|| {
        PrepError::ShapeMismatch(format!("target '{}' is not in the correlation matrix", target))
    })?;
    if matrix.len() < 2 {
        return Err(PrepError::InsufficientData(
            "no numeric feature columns besides the target".into(),
        ));
    }

    let mut rows: Vec<FeatureCorrelation> = matrix
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != t)
        .map(|(i, name)| FeatureCorrelation {
            feature: name.clone(),
            correlation: matrix.value(i, t),
        })
        .collect();
    sort_by_strength(&mut rows);
    if let Some(n) = top_n {
        rows.truncate(n);
    }
    Ok(rows)
}

/// The `n` strongest off-diagonal pairs, each pair reported once with `i < j`.
pub fn top_pairs(matrix: &CorrelationMatrix, n: usize) -> PrepResult<Vec<CorrelatedPair>> {
    check_count(n)?;
    if matrix.len() < 2 {
        return Err(PrepError::InsufficientData(format!(
            "pairwise ranking needs at least 2 numeric columns, found {}",
            matrix.len()
        )));
    }
    let mut pairs = matrix.pairs();
    pairs.sort_by(|a, b| b.correlation.abs().total_cmp(&a.correlation.abs()));
    pairs.truncate(n);
    Ok(pairs)
}

/// Strongest correlations in a dataset, either with a target column or pairwise.
pub fn top_correlations(
    dataset: &Dataset,
    config: &TopCorrelationConfig,
) -> PrepResult<TopCorrelations> {
    check_count(config.n)?;

    match &config.target {
        Some(target) => {
            let target_values = dataset.numeric_values(target)?;
            let mut names: Vec<String> = dataset
                .numeric_columns()
                .into_iter()
                .filter(|name| name != target)
                .collect();
            let mut columns = names
                .iter()
                .map(|name| dataset.numeric_values(name))
                .collect::<PrepResult<Vec<_>>>()?;
            names.push(target.clone());
            columns.push(target_values);

            let matrix = correlation_matrix_from_values(names, &columns, &config.correlation);
            let rows = rank_by_target(&matrix, target, Some(config.n))?;
            debug!(target = %target, returned = rows.len(), "ranked features by target");
            Ok(TopCorrelations::Target(rows))
        }
        None => {
            let names = dataset.numeric_columns();
            let columns = names
                .iter()
                .map(|name| dataset.numeric_values(name))
                .collect::<PrepResult<Vec<_>>>()?;
            let matrix = correlation_matrix_from_values(names, &columns, &config.correlation);
            let pairs = top_pairs(&matrix, config.n)?;
            debug!(returned = pairs.len(), "ranked correlated pairs");
            Ok(TopCorrelations::Pairwise(pairs))
        }
    }
}

/// Correlation of every numeric feature with an external target vector,
/// strongest first.
pub fn correlation_with_target(
    features: &Dataset,
    target: &Series,
    config: &TargetRankConfig,
) -> PrepResult<Vec<FeatureCorrelation>> {
    if let Some(n) = config.top_n {
        check_count(n)?;
    }
    if target.len() != features.height() {
        return Err(PrepError::ShapeMismatch(format!(
            "target has {} rows but features have {}",
            target.len(),
            features.height()
        )));
    }
    if !target.dtype().is_primitive_numeric() {
        return Err(PrepError::unsupported(
            target.name().as_str(),
            "target must be numeric for correlation",
        ));
    }

    let names = features.numeric_columns();
    if names.is_empty() {
        return Err(PrepError::InsufficientData(
            "no numeric feature columns to correlate with the target".into(),
        ));
    }
    let target_values = float_values(target)?;
    let columns = names
        .iter()
        .map(|name| features.numeric_values(name))
        .collect::<PrepResult<Vec<_>>>()?;

    let method = config.correlation.method;
    let mut rows: Vec<FeatureCorrelation> = names
        .into_par_iter()
        .zip(columns.par_iter())
        .map(|(feature, values)| FeatureCorrelation {
            correlation: pair_correlation(values, &target_values, method),
            feature,
        })
        .collect();

    sort_by_strength(&mut rows);
    if let Some(n) = config.top_n {
        rows.truncate(n);
    }
    Ok(rows)
}
