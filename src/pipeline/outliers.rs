//! Outlier detection and handling
//!
//! Bounds are computed per column on every call and never persisted:
//! - IQR: `[Q1 - k*IQR, Q3 + k*IQR]`, k defaults to 1.5
//! - Z-score: `[mean - k*std, mean + k*std]`, k defaults to 3
//!
//! Missing values are never outliers and pass through unchanged.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

use super::dataset::{ColumnKind, Dataset};
use crate::error::{PrepError, PrepResult};

/// Method for outlier detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    #[default]
    Iqr,
    ZScore,
}

impl OutlierMethod {
    pub fn default_threshold(self) -> f64 {
        match self {
            OutlierMethod::Iqr => 1.5,
            OutlierMethod::ZScore => 3.0,
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" | "z-score" | "z_score" => Ok(OutlierMethod::ZScore),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown outlier method '{}' (expected iqr or zscore)",
                other
            ))),
        }
    }
}

/// What to do with values outside their column's bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierAction {
    /// Drop every row where any selected column is out of bounds
    #[default]
    Remove,
    /// Cap values at the nearer bound
    Clip,
    /// Append a boolean `<column>_outlier` indicator per selected column
    Flag,
}

impl FromStr for OutlierAction {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remove" => Ok(OutlierAction::Remove),
            "clip" => Ok(OutlierAction::Clip),
            "flag" => Ok(OutlierAction::Flag),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown outlier action '{}' (expected remove, clip or flag)",
                other
            ))),
        }
    }
}

/// Options for [`handle_outliers`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Columns to inspect; all numeric columns when `None`
    pub columns: Option<Vec<String>>,
    pub method: OutlierMethod,
    /// Multiplier k; the method's default when `None`
    pub threshold: Option<f64>,
    pub action: OutlierAction,
}

impl OutlierConfig {
    pub fn new(method: OutlierMethod, action: OutlierAction) -> Self {
        Self {
            method,
            action,
            ..Default::default()
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
            .unwrap_or_else(|| self.method.default_threshold())
    }

    pub fn validate(&self) -> PrepResult<()> {
        let k = self.threshold();
        if !k.is_finite() || k <= 0.0 {
            return Err(PrepError::InvalidConfiguration(format!(
                "outlier threshold must be a positive number, got {}",
                k
            )));
        }
        Ok(())
    }
}

/// Lower and upper bound for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub column: String,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }
}

/// Result of [`handle_outliers`]
#[derive(Debug, Clone)]
pub struct OutlierResult {
    pub dataset: Dataset,
    pub bounds: Vec<OutlierBounds>,
    /// Number of out-of-bounds values per column, in bounds order
    pub outlier_counts: Vec<usize>,
    pub rows_removed: usize,
}

fn compute_column_bounds(
    column: &str,
    ca: &Float64Chunked,
    method: OutlierMethod,
    k: f64,
) -> PrepResult<OutlierBounds> {
    let (Some(min), Some(max)) = (ca.min(), ca.max()) else {
        return Ok(OutlierBounds {
            column: column.to_string(),
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        });
    };

    let (lower, upper) = match method {
        _ if min == max => (min, max),
        OutlierMethod::Iqr => {
            let q1 = ca.quantile(0.25, QuantileMethod::Linear)?.unwrap_or(min);
            let q3 = ca.quantile(0.75, QuantileMethod::Linear)?.unwrap_or(max);
            let iqr = q3 - q1;
            (q1 - k * iqr, q3 + k * iqr)
        }
        OutlierMethod::ZScore => {
            let mean = ca.mean().unwrap_or(0.0);
            // a single present value has no sample spread
            let std = ca.std(1).filter(|s| s.is_finite()).unwrap_or(0.0);
            (mean - k * std, mean + k * std)
        }
    };

    Ok(OutlierBounds {
        column: column.to_string(),
        lower,
        upper,
    })
}

fn selected_columns(dataset: &Dataset, config: &OutlierConfig) -> Vec<String> {
    config
        .columns
        .clone()
        .unwrap_or_else(|| dataset.numeric_columns())
}

/// Compute bounds for the selected columns without changing anything.
pub fn compute_bounds(dataset: &Dataset, config: &OutlierConfig) -> PrepResult<Vec<OutlierBounds>> {
    config.validate()?;
    let k = config.threshold();
    selected_columns(dataset, config)
        .iter()
        .map(|name| {
            let ca = dataset.numeric_chunked(name)?;
            compute_column_bounds(name, &ca, config.method, k)
        })
        .collect()
}

/// Detect and handle outliers with the configured method and action.
pub fn handle_outliers(dataset: &Dataset, config: &OutlierConfig) -> PrepResult<OutlierResult> {
    config.validate()?;
    let k = config.threshold();
    let names = selected_columns(dataset, config);

    let columns = names
        .iter()
        .map(|name| dataset.numeric_chunked(name))
        .collect::<PrepResult<Vec<_>>>()?;
    let bounds = names
        .iter()
        .zip(columns.iter())
        .map(|(name, ca)| compute_column_bounds(name, ca, config.method, k))
        .collect::<PrepResult<Vec<_>>>()?;

    let masks: Vec<Vec<bool>> = columns
        .iter()
        .zip(bounds.iter())
        .map(|(ca, b)| {
            ca.into_iter()
                .map(|v| v.is_some_and(|x| !b.contains(x)))
                .collect()
        })
        .collect();
    let outlier_counts: Vec<usize> = masks
        .iter()
        .map(|m| m.iter().filter(|&&o| o).count())
        .collect();

    for (b, count) in bounds.iter().zip(outlier_counts.iter()) {
        debug!(
            column = %b.column,
            lower = b.lower,
            upper = b.upper,
            outliers = count,
            "outlier bounds"
        );
    }

    let (result, rows_removed) = match config.action {
        OutlierAction::Remove => {
            let keep: Vec<bool> = (0..dataset.height())
                .map(|row| !masks.iter().any(|m| m[row]))
                .collect();
            let removed = keep.iter().filter(|&&k| !k).count();
            (dataset.filter_rows(&keep)?, removed)
        }
        OutlierAction::Clip => {
            let mut result = dataset.clone();
            for ((name, ca), b) in names.iter().zip(columns.iter()).zip(bounds.iter()) {
                let clipped: Float64Chunked = ca.into_iter().map(|v| v.map(|x| b.clip(x))).collect();
                let kind = dataset.kind(name).unwrap_or(ColumnKind::Numeric);
                let column = Column::from(clipped.with_name(name.as_str().into()).into_series());
                result = result.replace_column(name, column, kind)?;
            }
            (result, 0)
        }
        OutlierAction::Flag => {
            let mut result = dataset.clone();
            for (name, mask) in names.iter().zip(masks.iter()) {
                let flag = Column::new(format!("{}_outlier", name).into(), mask.clone());
                result = result.push_column(flag, ColumnKind::Categorical)?;
            }
            (result, 0)
        }
    };

    info!(
        method = ?config.method,
        action = ?config.action,
        columns = names.len(),
        rows_removed,
        "outlier handling complete"
    );

    Ok(OutlierResult {
        dataset: result,
        bounds,
        outlier_counts,
        rows_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[Option<f64>]) -> Float64Chunked {
        values.iter().copied().collect()
    }

    #[test]
    fn test_iqr_bounds() {
        let ca = Float64Chunked::from_slice(
            "a".into(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
        );
        // linear quartiles: Q1 = 3.25, Q3 = 7.75
        let b = compute_column_bounds("a", &ca, OutlierMethod::Iqr, 1.5).unwrap();
        assert!((b.lower - (-3.5)).abs() < 1e-12);
        assert!((b.upper - 14.5).abs() < 1e-12);
    }

    #[test]
    fn test_zscore_bounds_skip_missing() {
        // sample std of {1, 3} is sqrt(2)
        let b = compute_column_bounds("a", &column(&[Some(1.0), None, Some(3.0)]), OutlierMethod::ZScore, 1.0)
            .unwrap();
        assert!((b.lower - (2.0 - 2f64.sqrt())).abs() < 1e-12);
        assert!((b.upper - (2.0 + 2f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_has_no_outliers() {
        let ca = Float64Chunked::from_slice("a".into(), &[0.1; 6]);
        for method in [OutlierMethod::Iqr, OutlierMethod::ZScore] {
            let b = compute_column_bounds("a", &ca, method, 1.5).unwrap();
            assert!(b.contains(0.1));
        }
        let single = column(&[None, Some(4.0)]);
        let b = compute_column_bounds("a", &single, OutlierMethod::ZScore, 3.0).unwrap();
        assert!(b.contains(4.0));
    }

    #[test]
    fn test_all_missing_column_has_open_bounds() {
        let b = compute_column_bounds("a", &column(&[None, None]), OutlierMethod::ZScore, 3.0)
            .unwrap();
        assert!(b.contains(1e300));
    }

    #[test]
    fn test_default_thresholds() {
        assert_eq!(OutlierConfig::new(OutlierMethod::Iqr, OutlierAction::Clip).threshold(), 1.5);
        assert_eq!(
            OutlierConfig::new(OutlierMethod::ZScore, OutlierAction::Clip).threshold(),
            3.0
        );
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = OutlierConfig {
            threshold: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PrepError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("zscore".parse::<OutlierMethod>().unwrap(), OutlierMethod::ZScore);
        assert_eq!("CLIP".parse::<OutlierAction>().unwrap(), OutlierAction::Clip);
        assert!("winsorize".parse::<OutlierAction>().is_err());
    }
}
