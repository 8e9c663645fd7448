//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tabprep::pipeline::{ColumnKind, Dataset};

/// Mixed-kind dataset used across the preprocessing tests
///
/// - `target`: binary class label
/// - `feature_good`: rises with the row index
/// - `feature_corr`: `feature_good + 0.1`, correlation 1
/// - `feature_neg`: mirror of `feature_good`
/// - `feature_constant`: zero variance
/// - `city`: categorical with three levels
pub fn create_test_dataset() -> Dataset {
    Dataset::from_frame(
        df! {
            "target" => [0i32, 1, 0, 1, 0, 1, 0, 1, 0, 1],
            "feature_good" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            "feature_corr" => [1.1f64, 2.1, 3.1, 4.1, 5.1, 6.1, 7.1, 8.1, 9.1, 10.1],
            "feature_neg" => [10.0f64, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
            "feature_constant" => [5.0f64; 10],
            "city" => ["paris", "rome", "oslo", "rome", "paris", "paris", "oslo", "rome", "paris", "oslo"],
        }
        .unwrap(),
    )
}

/// Known correlation patterns: `b = 2a`, `c` mirrors `a`, `d` is scrambled.
pub fn create_correlation_dataset() -> Dataset {
    Dataset::from_frame(
        df! {
            "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            "b" => [2.0f64, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0],
            "c" => [10.0f64, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
            "d" => [5.0f64, 1.0, 8.0, 2.0, 9.0, 3.0, 7.0, 4.0, 6.0, 0.0],
        }
        .unwrap(),
    )
}

/// Specific missing-value patterns over five rows.
pub fn create_missing_dataset() -> Dataset {
    Dataset::from_frame(
        df! {
            "col_complete" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
            "col_20pct_missing" => [Some(1.0f64), None, Some(3.0), Some(4.0), Some(5.0)],
            "col_40pct_missing" => [Some(1.0f64), Some(2.0), None, None, Some(5.0)],
            "col_all_missing" => [None::<f64>, None, None, None, None],
            "label" => [Some("x"), None, Some("y"), Some("x"), Some("x")],
        }
        .unwrap(),
    )
}

/// Random numeric dataset with a binary target, reproducible from `seed`.
pub fn create_large_dataset(rows: usize, cols: usize, seed: u64) -> (Dataset, Series) {
    let mut rng = StdRng::seed_from_u64(seed);
    let target: Vec<i32> = (0..rows).map(|_| rng.gen_range(0..2)).collect();

    let columns: Vec<Column> = (0..cols)
        .map(|i| {
            let values: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>()).collect();
            Column::new(format!("feature_{}", i).into(), values)
        })
        .collect();

    (
        Dataset::new(columns).unwrap(),
        Series::new("target".into(), target),
    )
}

/// Float values of one column, with missing as `None`.
pub fn values(dataset: &Dataset, column: &str) -> Vec<Option<f64>> {
    dataset.numeric_values(column).unwrap()
}

/// Float values of one column, panicking on missing entries.
pub fn complete_values(dataset: &Dataset, column: &str) -> Vec<f64> {
    values(dataset, column)
        .into_iter()
        .map(|v| v.expect("unexpected missing value"))
        .collect()
}

/// Mean and population standard deviation of a column's present values.
pub fn mean_and_std(dataset: &Dataset, column: &str) -> (f64, f64) {
    let ca = dataset.numeric_chunked(column).unwrap();
    (ca.mean().unwrap(), ca.std(0).unwrap())
}

pub fn assert_kind(dataset: &Dataset, column: &str, kind: ColumnKind) {
    assert_eq!(
        dataset.kind(column),
        Some(kind),
        "column '{}' should be {:?}",
        column,
        kind
    );
}

pub fn assert_columns(dataset: &Dataset, expected: &[&str]) {
    assert_eq!(dataset.column_names(), expected);
}
