//! Univariate feature selection
//!
//! Each numeric feature is scored against the target on its own, features are
//! ranked by descending score (ties keep column order) and the best `k` are kept.

use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

use super::dataset::{float_values, text_values, Dataset};
use crate::error::{PrepError, PrepResult};
use crate::utils::stats;

/// Univariate scoring function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFunction {
    /// One-way ANOVA F statistic across target classes
    #[default]
    FClassif,
    /// F statistic of a simple linear regression on a numeric target
    FRegression,
}

impl FromStr for ScoreFunction {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "f_classif" | "fclassif" | "anova" => Ok(ScoreFunction::FClassif),
            "f_regression" | "fregression" => Ok(ScoreFunction::FRegression),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown score function '{}' (expected f_classif or f_regression)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub k: usize,
    pub score: ScoreFunction,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            k: 10,
            score: ScoreFunction::FClassif,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScore {
    pub feature: String,
    pub score: f64,
    /// 1 is the best score
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct Selection {
    /// Selected columns in their original order
    pub dataset: Dataset,
    /// Selected names, best first
    pub selected: Vec<String>,
    /// Every scored feature, best first
    pub scores: Vec<FeatureScore>,
}

/// Ratio of two mean squares with the degenerate cases pinned:
/// no signal scores 0, signal with no noise scores +inf.
fn f_ratio(signal: f64, noise: f64) -> f64 {
    if signal <= 0.0 {
        0.0
    } else if noise <= 0.0 {
        f64::INFINITY
    } else {
        signal / noise
    }
}

fn f_classif(x: &[f64], groups: &[usize], n_groups: usize) -> f64 {
    if stats::is_constant(x) {
        return 0.0;
    }
    let n = x.len();
    let grand = stats::mean(x);
    let mut members: Vec<Vec<f64>> = vec![Vec::new(); n_groups];
    for (&v, &g) in x.iter().zip(groups) {
        members[g].push(v);
    }
    let means: Vec<f64> = members.iter().map(|m| stats::mean(m)).collect();

    let ss_between: f64 = means
        .iter()
        .zip(&members)
        .map(|(m, g)| g.len() as f64 * (m - grand).powi(2))
        .sum();
    // constant within every class: perfect separation
    let ss_within: f64 = if members.iter().all(|g| stats::is_constant(g)) {
        0.0
    } else {
        x.iter()
            .zip(groups)
            .map(|(v, &g)| (v - means[g]).powi(2))
            .sum()
    };

    let df_between = (n_groups - 1) as f64;
    let df_within = (n - n_groups) as f64;
    f_ratio(ss_between / df_between, ss_within / df_within)
}

fn f_regression(x: &[f64], y: &[f64]) -> f64 {
    let r = stats::pearson(x, y);
    let r2 = r * r;
    let residual = if 1.0 - r2 < 1e-12 { 0.0 } else { 1.0 - r2 };
    f_ratio(r2, residual) * (x.len() - 2) as f64
}

fn complete(name: &str, values: Vec<Option<f64>>) -> PrepResult<Vec<f64>> {
    values
        .into_iter()
        .map(|v| v.ok_or_else(|| PrepError::MissingData(name.to_string())))
        .collect()
}

/// Target classes as dense group ids in first-appearance order.
fn class_ids(target: &Series) -> PrepResult<(Vec<usize>, usize)> {
    let mut ids: HashMap<String, usize> = HashMap::new();
    let groups = text_values(target)?
        .into_iter()
        .map(|v| {
            let label = v.ok_or_else(|| PrepError::MissingData(target.name().to_string()))?;
            let next = ids.len();
            Ok(*ids.entry(label).or_insert(next))
        })
        .collect::<PrepResult<Vec<_>>>()?;
    Ok((groups, ids.len()))
}

/// Score every numeric feature against `target` and keep the best `k`.
///
/// `k` larger than the feature count keeps every feature.
pub fn select_k_best(
    features: &Dataset,
    target: &Series,
    config: &SelectionConfig,
) -> PrepResult<Selection> {
    if config.k == 0 {
        return Err(PrepError::InvalidConfiguration(
            "k must be at least 1".to_string(),
        ));
    }
    let n = features.height();
    if target.len() != n {
        return Err(PrepError::ShapeMismatch(format!(
            "features have {} rows but target has {}",
            n,
            target.len()
        )));
    }
    let names = features.numeric_columns();
    if names.is_empty() {
        return Err(PrepError::InsufficientData(
            "no numeric features to score".to_string(),
        ));
    }
    let columns = names
        .iter()
        .map(|name| complete(name, features.numeric_values(name)?))
        .collect::<PrepResult<Vec<_>>>()?;

    let raw_scores: Vec<f64> = match config.score {
        ScoreFunction::FClassif => {
            let (groups, n_groups) = class_ids(target)?;
            if n_groups < 2 || n <= n_groups {
                return Err(PrepError::InsufficientData(format!(
                    "f_classif needs at least 2 classes and more rows than classes, got {} classes over {} rows",
                    n_groups, n
                )));
            }
            columns
                .par_iter()
                .map(|x| f_classif(x, &groups, n_groups))
                .collect()
        }
        ScoreFunction::FRegression => {
            if !target.dtype().is_primitive_numeric() {
                return Err(PrepError::unsupported(
                    target.name().as_str(),
                    "f_regression requires a numeric target",
                ));
            }
            if n < 3 {
                return Err(PrepError::InsufficientData(format!(
                    "f_regression needs at least 3 rows, got {}",
                    n
                )));
            }
            let y = complete(target.name().as_str(), float_values(target)?)?;
            columns.par_iter().map(|x| f_regression(x, &y)).collect()
        }
    };

    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|&a, &b| raw_scores[b].total_cmp(&raw_scores[a]));

    let scores: Vec<FeatureScore> = order
        .iter()
        .enumerate()
        .map(|(rank, &i)| FeatureScore {
            feature: names[i].clone(),
            score: raw_scores[i],
            rank: rank + 1,
        })
        .collect();
    for s in &scores {
        debug!(feature = %s.feature, score = s.score, rank = s.rank, "feature score");
    }

    let selected: Vec<String> = scores
        .iter()
        .take(config.k)
        .map(|s| s.feature.clone())
        .collect();
    let keep: Vec<String> = features
        .column_names()
        .into_iter()
        .filter(|c| selected.contains(c))
        .collect();
    let dataset = features.select(&keep)?;

    info!(
        score = ?config.score,
        scored = scores.len(),
        selected = selected.len(),
        "feature selection complete"
    );

    Ok(Selection {
        dataset,
        selected,
        scores,
    })
}
