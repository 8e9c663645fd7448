//! Model evaluation metrics
//!
//! Classification precision, recall and F1 are support-weighted averages over
//! the labels present in either vector; a zero denominator yields 0.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::info;

use super::dataset::{float_values, text_values};
use crate::error::{PrepError, PrepResult};

/// Most distinct values an integral target may have and still be treated as
/// class labels by [`TaskType::Auto`].
pub const MAX_AUTO_CLASSES: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Auto,
    Classification,
    Regression,
}

impl FromStr for TaskType {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(TaskType::Auto),
            "classification" => Ok(TaskType::Classification),
            "regression" => Ok(TaskType::Regression),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown task type '{}' (expected auto, classification or regression)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Row and column labels of the confusion matrix
    pub labels: Vec<String>,
    /// `confusion_matrix[true][predicted]`
    pub confusion_matrix: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", rename_all = "lowercase")]
pub enum EvaluationReport {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

impl EvaluationReport {
    /// Scalar metrics by name, for [`compare_models`].
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        let pairs: Vec<(&str, f64)> = match self {
            EvaluationReport::Classification(m) => vec![
                ("accuracy", m.accuracy),
                ("precision", m.precision),
                ("recall", m.recall),
                ("f1_score", m.f1_score),
            ],
            EvaluationReport::Regression(m) => vec![
                ("mse", m.mse),
                ("rmse", m.rmse),
                ("mae", m.mae),
                ("r2_score", m.r2_score),
            ],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

/// Named metrics of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub name: String,
    pub metrics: BTreeMap<String, f64>,
}

impl ModelResult {
    pub fn new(name: impl Into<String>, report: &EvaluationReport) -> Self {
        Self {
            name: name.into(),
            metrics: report.metrics(),
        }
    }
}

fn check_lengths(y_true: &Series, y_pred: &Series) -> PrepResult<()> {
    if y_true.len() != y_pred.len() {
        return Err(PrepError::ShapeMismatch(format!(
            "y_true has {} values but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(PrepError::InsufficientData(
            "cannot evaluate empty predictions".to_string(),
        ));
    }
    Ok(())
}

fn complete<T>(name: &str, values: Vec<Option<T>>) -> PrepResult<Vec<T>> {
    values
        .into_iter()
        .map(|v| v.ok_or_else(|| PrepError::MissingData(name.to_string())))
        .collect()
}

fn resolve_task(y_true: &Series) -> PrepResult<TaskType> {
    if !y_true.dtype().is_primitive_numeric() {
        return Ok(TaskType::Classification);
    }
    let values: Vec<f64> = float_values(y_true)?.into_iter().flatten().collect();
    let integral = values.iter().all(|v| v.fract() == 0.0);
    let mut distinct: Vec<f64> = values;
    distinct.sort_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    if integral && distinct.len() <= MAX_AUTO_CLASSES {
        Ok(TaskType::Classification)
    } else {
        Ok(TaskType::Regression)
    }
}

/// Class labels of a complete series. With `numeric` set, values are keyed by
/// their f64 value so `1` and `1.0` name the same class.
fn class_labels(series: &Series, numeric: bool) -> PrepResult<Vec<String>> {
    let name = series.name().as_str();
    if numeric {
        // `+ 0.0` folds -0.0 into 0.0
        Ok(complete(name, float_values(series)?)?
            .into_iter()
            .map(|v| (v + 0.0).to_string())
            .collect())
    } else {
        complete(name, text_values(series)?)
    }
}

/// Distinct labels, sorted numerically when they all parse as numbers, else lexically.
fn sorted_labels(y_true: &[String], y_pred: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = y_true.iter().chain(y_pred).cloned().collect();
    labels.sort();
    labels.dedup();
    let numeric: Option<Vec<f64>> = labels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if let Some(keys) = numeric {
        let mut keyed: Vec<(f64, String)> = keys.into_iter().zip(labels).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        labels = keyed.into_iter().map(|(_, l)| l).collect();
    }
    labels
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

pub fn classification_metrics(y_true: &Series, y_pred: &Series) -> PrepResult<ClassificationMetrics> {
    check_lengths(y_true, y_pred)?;
    let numeric = y_true.dtype().is_primitive_numeric() && y_pred.dtype().is_primitive_numeric();
    let truth = class_labels(y_true, numeric)?;
    let pred = class_labels(y_pred, numeric)?;

    let labels = sorted_labels(&truth, &pred);
    let index: HashMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();
    let k = labels.len();
    let mut confusion_matrix = vec![vec![0usize; k]; k];
    for (t, p) in truth.iter().zip(&pred) {
        confusion_matrix[index[t.as_str()]][index[p.as_str()]] += 1;
    }

    let n = truth.len() as f64;
    let correct: usize = (0..k).map(|i| confusion_matrix[i][i]).sum();
    let (mut precision, mut recall, mut f1_score) = (0.0, 0.0, 0.0);
    for i in 0..k {
        let tp = confusion_matrix[i][i] as f64;
        let support: usize = confusion_matrix[i].iter().sum();
        let predicted: usize = confusion_matrix.iter().map(|row| row[i]).sum();
        let p = ratio(tp, predicted as f64);
        let r = ratio(tp, support as f64);
        let f = ratio(2.0 * p * r, p + r);
        let weight = support as f64 / n;
        precision += weight * p;
        recall += weight * r;
        f1_score += weight * f;
    }

    Ok(ClassificationMetrics {
        accuracy: correct as f64 / n,
        precision,
        recall,
        f1_score,
        labels,
        confusion_matrix,
    })
}

pub fn regression_metrics(y_true: &Series, y_pred: &Series) -> PrepResult<RegressionMetrics> {
    check_lengths(y_true, y_pred)?;
    let truth = complete(y_true.name().as_str(), float_values(y_true)?)?;
    let pred = complete(y_pred.name().as_str(), float_values(y_pred)?)?;

    let n = truth.len() as f64;
    let ss_res: f64 = truth.iter().zip(&pred).map(|(t, p)| (t - p).powi(2)).sum();
    let mae = truth.iter().zip(&pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / n;
    let mean = truth.iter().sum::<f64>() / n;
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();

    // constant truth: perfect predictions score 1, anything else 0
    let r2_score = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    let mse = ss_res / n;
    Ok(RegressionMetrics {
        mse,
        rmse: mse.sqrt(),
        mae,
        r2_score,
    })
}

/// Evaluate predictions against ground truth.
pub fn quick_eval(y_true: &Series, y_pred: &Series, task: TaskType) -> PrepResult<EvaluationReport> {
    let task = match task {
        TaskType::Auto => resolve_task(y_true)?,
        explicit => explicit,
    };
    let report = match task {
        TaskType::Regression => EvaluationReport::Regression(regression_metrics(y_true, y_pred)?),
        _ => EvaluationReport::Classification(classification_metrics(y_true, y_pred)?),
    };
    info!(task = ?task, rows = y_true.len(), "evaluation complete");
    Ok(report)
}

/// Error metrics, where a smaller value is a better model.
pub const ERROR_METRICS: [&str; 3] = ["mse", "rmse", "mae"];

pub fn lower_is_better(metric: &str) -> bool {
    ERROR_METRICS.contains(&metric)
}

/// Order models by `metric`, best first: ascending for [`ERROR_METRICS`],
/// descending for everything else. Equal scores keep input order.
pub fn compare_models(results: &[ModelResult], metric: &str) -> PrepResult<Vec<ModelResult>> {
    let scores = results
        .iter()
        .map(|r| {
            r.metrics.get(metric).copied().ok_or_else(|| {
                PrepError::InvalidConfiguration(format!(
                    "model '{}' has no metric '{}'",
                    r.name, metric
                ))
            })
        })
        .collect::<PrepResult<Vec<f64>>>()?;

    let mut order: Vec<usize> = (0..results.len()).collect();
    if lower_is_better(metric) {
        order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    } else {
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    }
    Ok(order.into_iter().map(|i| results[i].clone()).collect())
}
