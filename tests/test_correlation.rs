//! Unit tests for correlation analysis, redundancy reduction and ranking

use approx::assert_abs_diff_eq;
use polars::prelude::*;
use tabprep::pipeline::{
    correlation_matrix, correlation_with_target, remove_highly_correlated,
    select_features_to_drop, top_correlations, CorrelationConfig, CorrelationMethod, Dataset,
    RedundancyConfig, TargetRankConfig, TopCorrelationConfig, TopCorrelations,
};
use tabprep::PrepError;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_matrix_symmetric_with_unit_diagonal() {
    let ds = common::create_correlation_dataset();
    for method in [
        CorrelationMethod::Pearson,
        CorrelationMethod::Spearman,
        CorrelationMethod::Kendall,
    ] {
        let m = correlation_matrix(&ds, &CorrelationConfig::new(method)).unwrap();
        assert_eq!(m.len(), 4);
        for i in 0..m.len() {
            assert_eq!(m.value(i, i), 1.0, "diagonal for {:?}", method);
            for j in 0..m.len() {
                assert_eq!(m.value(i, j), m.value(j, i), "symmetry for {:?}", method);
                assert!(m.value(i, j).abs() <= 1.0);
            }
        }
    }
}

#[test]
fn test_perfect_positive_and_negative_correlation() {
    let ds = common::create_correlation_dataset();
    let m = correlation_matrix(&ds, &CorrelationConfig::default()).unwrap();
    assert_abs_diff_eq!(m.get("a", "b").unwrap(), 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(m.get("a", "c").unwrap(), -1.0, epsilon = 1e-10);
    assert!(m.get("a", "d").unwrap().abs() < 0.5);
}

#[test]
fn test_rank_methods_agree_on_monotonic_data() {
    let ds = Dataset::from_frame(
        df! {
            "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
            "y" => [1.0f64, 4.0, 9.0, 16.0, 25.0],
        }
        .unwrap(),
    );
    for method in [CorrelationMethod::Spearman, CorrelationMethod::Kendall] {
        let m = correlation_matrix(&ds, &CorrelationConfig::new(method)).unwrap();
        assert_abs_diff_eq!(m.get("x", "y").unwrap(), 1.0, epsilon = 1e-10);
    }
    let pearson = correlation_matrix(&ds, &CorrelationConfig::default()).unwrap();
    assert!(pearson.get("x", "y").unwrap() < 1.0);
}

#[test]
fn test_zero_variance_column_correlates_zero() {
    let ds = common::create_test_dataset();
    let m = correlation_matrix(&ds, &CorrelationConfig::default()).unwrap();
    assert_eq!(m.get("feature_constant", "feature_good"), Some(0.0));
    assert_eq!(m.get("feature_constant", "feature_constant"), Some(1.0));
}

#[test]
fn test_inexact_float_constant_correlates_exactly_zero() {
    // both the matrix path (complete data) and the pairwise path (with a gap)
    let complete = Dataset::from_frame(
        df! {
            "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
            "z" => [0.1f64; 7],
        }
        .unwrap(),
    );
    let gappy = Dataset::from_frame(
        df! {
            "a" => [Some(1.0f64), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0), Some(7.0)],
            "z" => [Some(0.1f64); 7],
        }
        .unwrap(),
    );
    for ds in [complete, gappy] {
        for method in [
            CorrelationMethod::Pearson,
            CorrelationMethod::Spearman,
            CorrelationMethod::Kendall,
        ] {
            let m = correlation_matrix(&ds, &CorrelationConfig::new(method)).unwrap();
            assert_eq!(m.get("a", "z"), Some(0.0), "{:?}", method);
            assert_eq!(m.get("z", "z"), Some(1.0));
        }
    }
}

#[test]
fn test_non_numeric_columns_skipped() {
    let ds = common::create_test_dataset();
    let m = correlation_matrix(&ds, &CorrelationConfig::default()).unwrap();
    assert!(m.index_of("city").is_none());
    assert_eq!(m.len(), 5);
}

#[test]
fn test_missing_values_use_complete_pairs() {
    let ds = Dataset::from_frame(
        df! {
            "x" => [Some(1.0f64), Some(2.0), None, Some(4.0), Some(5.0)],
            "y" => [Some(2.0f64), Some(4.0), Some(-50.0), Some(8.0), Some(10.0)],
        }
        .unwrap(),
    );
    let m = correlation_matrix(&ds, &CorrelationConfig::default()).unwrap();
    assert_abs_diff_eq!(m.get("x", "y").unwrap(), 1.0, epsilon = 1e-10);
}

#[test]
fn test_to_frame_layout() {
    let ds = common::create_correlation_dataset();
    let m = correlation_matrix(&ds, &CorrelationConfig::default()).unwrap();
    let frame = m.to_frame().unwrap();
    assert_eq!(frame.shape(), (4, 5));
    assert_eq!(frame.get_column_names()[0].as_str(), "feature");
}

#[test]
fn test_reducer_drops_later_column_of_pair() {
    let ds = Dataset::from_frame(
        df! {
            "A" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
            "B" => [1.01f64, 2.01, 3.01, 4.01, 5.01],
            "C" => [5.0f64, 4.0, 3.0, 2.0, 1.0],
        }
        .unwrap(),
    );
    let result = remove_highly_correlated(&ds, &RedundancyConfig::with_threshold(0.99)).unwrap();

    // |corr| is compared, so the perfectly anti-correlated C goes too
    assert_eq!(result.removed, vec!["B", "C"]);
    common::assert_columns(&result.dataset, &["A"]);
}

#[test]
fn test_reducer_never_removes_both_members() {
    let ds = common::create_correlation_dataset();
    for threshold in [0.1, 0.5, 0.9, 0.99] {
        let matrix = correlation_matrix(&ds, &CorrelationConfig::default()).unwrap();
        let removed = select_features_to_drop(&matrix, threshold).unwrap();
        for name in &removed {
            let j = matrix.index_of(name).unwrap();
            // some kept, earlier column explains the removal
            let partner = (0..j).any(|i| {
                !removed.contains(&matrix.columns()[i]) && matrix.value(i, j).abs() > threshold
            });
            assert!(partner, "{} removed without a kept partner at {}", name, threshold);
        }
    }
}

#[test]
fn test_reducer_threshold_one_is_noop() {
    let ds = common::create_correlation_dataset();
    let result = remove_highly_correlated(&ds, &RedundancyConfig::with_threshold(1.0)).unwrap();
    assert!(result.removed.is_empty());
    assert_eq!(result.dataset.column_names(), ds.column_names());
}

#[test]
fn test_reducer_exclude_keeps_column() {
    let ds = common::create_test_dataset();
    let config = RedundancyConfig {
        threshold: 0.9,
        exclude: vec!["feature_corr".into()],
        ..Default::default()
    };
    let result = remove_highly_correlated(&ds, &config).unwrap();
    assert!(result.dataset.contains("feature_corr"));
    assert!(result.dataset.contains("feature_good"));
    // target is uncorrelated enough to survive; feature_neg mirrors feature_good
    assert_eq!(result.removed, vec!["feature_neg"]);
}

#[test]
fn test_reducer_rejects_bad_threshold() {
    let ds = common::create_correlation_dataset();
    let err = remove_highly_correlated(&ds, &RedundancyConfig::with_threshold(-0.5)).unwrap_err();
    assert!(matches!(err, PrepError::InvalidConfiguration(_)));
}

#[test]
fn test_top_correlations_target_mode() {
    let ds = common::create_correlation_dataset();
    let config = TopCorrelationConfig {
        target: Some("a".into()),
        n: 2,
        ..Default::default()
    };
    let TopCorrelations::Target(rows) = top_correlations(&ds, &config).unwrap() else {
        panic!("expected target mode");
    };
    assert_eq!(rows.len(), 2);
    let mut names: Vec<&str> = rows.iter().map(|r| r.feature.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["b", "c"]);
    assert!(rows[0].correlation.abs() >= rows[1].correlation.abs());
    let c = rows.iter().find(|r| r.feature == "c").unwrap();
    assert!(c.correlation < 0.0);
}

#[test]
fn test_top_correlations_pairwise_mode() {
    let ds = common::create_correlation_dataset();
    let config = TopCorrelationConfig {
        n: 100,
        ..Default::default()
    };
    let TopCorrelations::Pairwise(pairs) = top_correlations(&ds, &config).unwrap() else {
        panic!("expected pairwise mode");
    };
    // n beyond available pairs returns all 6, each once
    assert_eq!(pairs.len(), 6);
    // a, b and c are perfectly (anti-)correlated with each other
    for pair in &pairs[..3] {
        assert_ne!(pair.feature2, "d");
        assert_abs_diff_eq!(pair.correlation.abs(), 1.0, epsilon = 1e-10);
    }
    assert!(pairs.iter().all(|p| p.feature1 < p.feature2));
    for w in pairs.windows(2) {
        assert!(w[0].correlation.abs() >= w[1].correlation.abs());
    }
}

#[test]
fn test_top_correlations_errors() {
    let single = Dataset::from_frame(df! { "a" => [1.0f64, 2.0, 3.0] }.unwrap());
    let err = top_correlations(&single, &TopCorrelationConfig::default()).unwrap_err();
    assert!(matches!(err, PrepError::InsufficientData(_)));

    let ds = common::create_correlation_dataset();
    let zero = TopCorrelationConfig {
        n: 0,
        ..Default::default()
    };
    assert!(matches!(
        top_correlations(&ds, &zero),
        Err(PrepError::InvalidConfiguration(_))
    ));

    let missing_target = TopCorrelationConfig {
        target: Some("nope".into()),
        ..Default::default()
    };
    assert!(matches!(
        top_correlations(&ds, &missing_target),
        Err(PrepError::ShapeMismatch(_))
    ));
}

#[test]
fn test_correlation_with_target_vector() {
    let features = Dataset::from_frame(
        df! {
            "f1" => [1i64, 2, 3, 4, 5],
            "f2" => [2i64, 4, 6, 8, 10],
            "f3" => [5i64, 4, 3, 2, 1],
        }
        .unwrap(),
    );
    let y = Series::new("y".into(), [1i64, 2, 3, 4, 5]);
    let rows = correlation_with_target(&features, &y, &TargetRankConfig::default()).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.correlation.abs() > 0.9));
    let f3 = rows.iter().find(|r| r.feature == "f3").unwrap();
    assert_abs_diff_eq!(f3.correlation, -1.0, epsilon = 1e-10);

    let top = TargetRankConfig {
        top_n: Some(1),
        ..Default::default()
    };
    assert_eq!(correlation_with_target(&features, &y, &top).unwrap().len(), 1);
}

#[test]
fn test_correlation_with_target_length_mismatch() {
    let features = common::create_correlation_dataset();
    let y = Series::new("y".into(), [1.0f64, 2.0]);
    let err = correlation_with_target(&features, &y, &TargetRankConfig::default()).unwrap_err();
    assert!(matches!(err, PrepError::ShapeMismatch(_)));
}

#[test]
fn test_config_from_json() {
    let config: RedundancyConfig =
        serde_json::from_str(r#"{"threshold": 0.8, "correlation": {"method": "spearman"}}"#)
            .unwrap();
    assert_eq!(config.threshold, 0.8);
    assert_eq!(config.correlation.method, CorrelationMethod::Spearman);
    assert!(config.exclude.is_empty());
}
