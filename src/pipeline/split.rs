//! Train/test splitting
//!
//! Row permutations come from an explicit RNG. [`train_test_split`] seeds a
//! `StdRng` from the config, so identical inputs and seed give identical
//! partitions. [`split_and_scale`] composes a split with a scaler fitted on the
//! training partition only.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use super::dataset::{index_array, text_values, Dataset};
use super::scaling::{FittedScaler, Scaler, ScalerKind};
use crate::error::{PrepError, PrepResult};

/// Options for [`train_test_split`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the test partition, in (0, 1)
    pub test_size: f64,
    /// Preserve each target class's proportion in both partitions
    pub stratify: bool,
    /// Seed for the row permutation
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            stratify: false,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> PrepResult<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PrepError::InvalidConfiguration(format!(
                "test_size must be between 0 and 1 (exclusive), got {}",
                self.test_size
            )));
        }
        Ok(())
    }
}

/// Train and test partitions of features and target
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Dataset,
    pub x_test: Dataset,
    pub y_train: Series,
    pub y_test: Series,
    /// Original row positions of the training rows, in partition order
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Split with an RNG seeded from `config.seed`.
pub fn train_test_split(
    features: &Dataset,
    target: &Series,
    config: &SplitConfig,
) -> PrepResult<Split> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    train_test_split_with_rng(features, target, config, &mut rng)
}

/// Split using a caller-owned RNG; `config.seed` is ignored.
pub fn train_test_split_with_rng<R: Rng + ?Sized>(
    features: &Dataset,
    target: &Series,
    config: &SplitConfig,
    rng: &mut R,
) -> PrepResult<Split> {
    config.validate()?;
    let n = features.height();
    if target.len() != n {
        return Err(PrepError::ShapeMismatch(format!(
            "features have {} rows but target has {}",
            n,
            target.len()
        )));
    }
    if n < 2 {
        return Err(PrepError::InsufficientData(format!(
            "splitting needs at least 2 rows, got {}",
            n
        )));
    }

    let n_test = (config.test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(PrepError::InsufficientData(format!(
            "test_size {} leaves an empty partition for {} rows",
            config.test_size, n
        )));
    }

    let (train_indices, test_indices) = if config.stratify {
        let labels = text_values(target)?;
        if labels.iter().any(Option::is_none) {
            return Err(PrepError::MissingData(target.name().to_string()));
        }
        let labels: Vec<String> = labels.into_iter().flatten().collect();
        stratified_indices(&labels, n_test, rng)
    } else {
        shuffled_indices(n, n_test, rng)
    };

    debug!(
        train = train_indices.len(),
        test = test_indices.len(),
        stratify = config.stratify,
        "split indices"
    );

    Ok(Split {
        x_train: features.take_rows(&train_indices)?,
        x_test: features.take_rows(&test_indices)?,
        y_train: target.take(&index_array(&train_indices))?,
        y_test: target.take(&index_array(&test_indices))?,
        train_indices,
        test_indices,
    })
}

fn shuffled_indices<R: Rng + ?Sized>(n: usize, n_test: usize, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);
    let train = perm.split_off(n_test);
    (train, perm)
}

/// Per-class test quotas: floor of the exact share, with leftover rows going to
/// the classes with the largest fractional remainder (earlier classes first).
fn class_quotas(counts: &[usize], n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let assigned: usize = quotas.iter().sum();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa)
    });
    for &class in order.iter().take(n_test.saturating_sub(assigned)) {
        if quotas[class] < counts[class] {
            quotas[class] += 1;
        }
    }
    quotas
}

fn stratified_indices<R: Rng + ?Sized>(
    labels: &[String],
    n_test: usize,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    // classes in first-appearance order keep the result independent of hashing
    let mut class_of: HashMap<&str, usize> = HashMap::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for (row, label) in labels.iter().enumerate() {
        let class = *class_of.entry(label.as_str()).or_insert_with(|| {
            members.push(Vec::new());
            members.len() - 1
        });
        members[class].push(row);
    }

    let counts: Vec<usize> = members.iter().map(Vec::len).collect();
    let quotas = class_quotas(&counts, labels.len(), n_test);

    let mut train = Vec::with_capacity(labels.len() - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (mut rows, quota) in members.into_iter().zip(quotas) {
        rows.shuffle(rng);
        let rest = rows.split_off(quota);
        test.extend(rows);
        train.extend(rest);
    }
    train.shuffle(rng);
    test.shuffle(rng);
    (train, test)
}

/// Options for [`split_and_scale`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitScaleConfig {
    pub split: SplitConfig,
    pub scaler: ScalerKind,
    /// Columns to scale; all numeric columns when `None`
    pub columns: Option<Vec<String>>,
}

/// Scaled partitions plus the scaler fitted on the training rows
#[derive(Debug, Clone)]
pub struct ScaledSplit {
    pub x_train: Dataset,
    pub x_test: Dataset,
    pub y_train: Series,
    pub y_test: Series,
    pub scaler: FittedScaler,
}

/// Split rows, fit the scaler on the training partition, and apply the same
/// fitted parameters to both partitions.
pub fn split_and_scale(
    features: &Dataset,
    target: &Series,
    config: &SplitScaleConfig,
) -> PrepResult<ScaledSplit> {
    let split = train_test_split(features, target, &config.split)?;

    let scaler = Scaler {
        kind: config.scaler,
        columns: config.columns.clone(),
    };
    let (fitted, x_train) = scaler.fit_transform(&split.x_train)?;
    let x_test = fitted.transform(&split.x_test)?;

    info!(
        train_rows = x_train.height(),
        test_rows = x_test.height(),
        scaler = ?config.scaler,
        "split and scale complete"
    );

    Ok(ScaledSplit {
        x_train,
        x_test,
        y_train: split.y_train,
        y_test: split.y_test,
        scaler: fitted,
    })
}
