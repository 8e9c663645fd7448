//! Feature scaling with fit/transform separation
//!
//! [`Scaler::fit`] learns per-column parameters from one partition and returns
//! a [`FittedScaler`]; only the fitted scaler can transform. Applying it to a
//! test partition reuses the frozen parameters and never recomputes them.
//!
//! A zero spread (standard deviation, range or IQR) is treated as 1.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

use super::dataset::{ColumnKind, Dataset};
use crate::error::{PrepError, PrepResult};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalerKind {
    /// (x - mean) / std, population standard deviation
    #[default]
    Standard,
    /// (x - min) / (max - min)
    MinMax,
    /// (x - median) / IQR
    Robust,
    /// Pass-through
    None,
}

impl FromStr for ScalerKind {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(ScalerKind::Standard),
            "minmax" | "min_max" => Ok(ScalerKind::MinMax),
            "robust" => Ok(ScalerKind::Robust),
            "none" => Ok(ScalerKind::None),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown scaler '{}' (expected standard, minmax, robust or none)",
                other
            ))),
        }
    }
}

/// Frozen location/scale for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScaling {
    pub column: String,
    /// mean, min or median
    pub center: f64,
    /// std, range or IQR; never zero
    pub scale: f64,
}

/// Unfitted scaler: a kind plus the columns to scale
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scaler {
    pub kind: ScalerKind,
    /// Columns to scale; all numeric columns when `None`
    pub columns: Option<Vec<String>>,
}

impl Scaler {
    pub fn new(kind: ScalerKind) -> Self {
        Self {
            kind,
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Learn parameters from `train`.
    pub fn fit(&self, train: &Dataset) -> PrepResult<FittedScaler> {
        let names = self
            .columns
            .clone()
            .unwrap_or_else(|| train.numeric_columns());

        let params = names
            .iter()
            .map(|name| {
                let ca = train.numeric_chunked(name)?;
                let (center, scale) = compute_params(self.kind, &ca)?;
                debug!(column = %name, center, scale, "fitted scaling");
                Ok(ColumnScaling {
                    column: name.clone(),
                    center,
                    scale,
                })
            })
            .collect::<PrepResult<Vec<_>>>()?;

        info!(kind = ?self.kind, columns = params.len(), rows = train.height(), "scaler fitted");
        Ok(FittedScaler {
            kind: self.kind,
            params,
        })
    }

    /// Fit on `train` and transform it in one step.
    pub fn fit_transform(&self, train: &Dataset) -> PrepResult<(FittedScaler, Dataset)> {
        let fitted = self.fit(train)?;
        let transformed = fitted.transform(train)?;
        Ok((fitted, transformed))
    }
}

/// Divisor used in place of zero: a zero spread is treated as 1.
fn nonzero_or_one(divisor: f64) -> f64 {
    if divisor == 0.0 || !divisor.is_finite() {
        1.0
    } else {
        divisor
    }
}

/// (center, scale) from the present values; nulls are skipped.
fn compute_params(kind: ScalerKind, ca: &Float64Chunked) -> PrepResult<(f64, f64)> {
    let (Some(min), Some(max)) = (ca.min(), ca.max()) else {
        return Ok((0.0, 1.0));
    };
    let params = match kind {
        ScalerKind::None => (0.0, 1.0),
        // constant column: centered on its value with unit spread
        _ if min == max => (min, 1.0),
        ScalerKind::Standard => (
            ca.mean().unwrap_or(0.0),
            nonzero_or_one(ca.std(0).unwrap_or(0.0)),
        ),
        ScalerKind::MinMax => (min, nonzero_or_one(max - min)),
        ScalerKind::Robust => {
            let q1 = ca.quantile(0.25, QuantileMethod::Linear)?.unwrap_or(0.0);
            let q3 = ca.quantile(0.75, QuantileMethod::Linear)?.unwrap_or(0.0);
            (ca.median().unwrap_or(0.0), nonzero_or_one(q3 - q1))
        }
    };
    Ok(params)
}

/// Scaler with frozen parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedScaler {
    kind: ScalerKind,
    params: Vec<ColumnScaling>,
}

impl FittedScaler {
    pub fn kind(&self) -> ScalerKind {
        self.kind
    }

    pub fn params(&self) -> &[ColumnScaling] {
        &self.params
    }

    pub fn param(&self, column: &str) -> Option<&ColumnScaling> {
        self.params.iter().find(|p| p.column == column)
    }

    /// Apply the frozen parameters. Scaled columns become Float64; missing
    /// values stay missing.
    pub fn transform(&self, dataset: &Dataset) -> PrepResult<Dataset> {
        self.apply(dataset, |v, p| (v - p.center) / p.scale)
    }

    /// Map scaled values back to original units.
    pub fn inverse_transform(&self, dataset: &Dataset) -> PrepResult<Dataset> {
        self.apply(dataset, |v, p| v * p.scale + p.center)
    }

    fn apply(&self, dataset: &Dataset, f: impl Fn(f64, &ColumnScaling) -> f64) -> PrepResult<Dataset> {
        if self.kind == ScalerKind::None {
            return Ok(dataset.clone());
        }
        let mut result = dataset.clone();
        for p in &self.params {
            let values = dataset.numeric_values(&p.column)?;
            let scaled: Vec<Option<f64>> = values.into_iter().map(|v| v.map(|x| f(x, p))).collect();
            let kind = dataset.kind(&p.column).unwrap_or(ColumnKind::Numeric);
            result = result.replace_column(
                &p.column,
                Column::new(p.column.as_str().into(), scaled),
                kind,
            )?;
        }
        Ok(result)
    }
}
