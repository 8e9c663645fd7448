//! Categorical encoding
//!
//! Categories are ordered by first appearance in the column. The encoder is
//! single-call: no mapping is kept for later data.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info};

use super::dataset::{ColumnKind, Dataset};
use crate::error::{PrepError, PrepResult};

/// Encoding strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMethod {
    /// One Int32 indicator column per category, named `<column>_<category>`
    #[default]
    OneHot,
    /// Int64 codes `0..k-1`, replacing the column under the same name
    Label,
}

impl FromStr for EncodingMethod {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "onehot" | "one_hot" | "one-hot" => Ok(EncodingMethod::OneHot),
            "label" | "ordinal" => Ok(EncodingMethod::Label),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown encoding method '{}' (expected onehot or label)",
                other
            ))),
        }
    }
}

/// Options for [`encode_categorical`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Columns to encode; every categorical or ordinal column when `None`
    pub columns: Option<Vec<String>>,
    pub method: EncodingMethod,
}

impl EncoderConfig {
    pub fn new(columns: Vec<String>, method: EncodingMethod) -> Self {
        Self {
            columns: Some(columns),
            method,
        }
    }
}

/// Distinct categories in first-appearance order
pub fn categories_in_order(values: &[Option<String>]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();
    for v in values.iter().flatten() {
        if seen.insert(v.as_str()) {
            order.push(v.clone());
        }
    }
    order
}

fn one_hot_columns(
    dataset: &Dataset,
    name: &str,
    values: &[Option<String>],
) -> PrepResult<Vec<(Column, ColumnKind)>> {
    categories_in_order(values)
        .into_iter()
        .map(|category| {
            let new_name = format!("{}_{}", name, category);
            if dataset.contains(&new_name) {
                return Err(PrepError::InvalidConfiguration(format!(
                    "one-hot column '{}' already exists",
                    new_name
                )));
            }
            let indicator: Vec<i32> = values
                .iter()
                .map(|v| i32::from(v.as_deref() == Some(category.as_str())))
                .collect();
            Ok((Column::new(new_name.into(), indicator), ColumnKind::Numeric))
        })
        .collect()
}

fn label_column(name: &str, values: &[Option<String>]) -> Column {
    let mapping: HashMap<String, i64> = categories_in_order(values)
        .into_iter()
        .enumerate()
        .map(|(i, c)| (c, i as i64))
        .collect();
    let codes: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.as_ref().and_then(|s| mapping.get(s).copied()))
        .collect();
    Column::new(name.into(), codes)
}

/// Encode categorical columns into numeric representations.
///
/// Requesting a column that is already numeric is `UnsupportedColumnType`.
pub fn encode_categorical(dataset: &Dataset, config: &EncoderConfig) -> PrepResult<Dataset> {
    let names: Vec<String> = match &config.columns {
        Some(cols) => cols.clone(),
        None => dataset
            .kinds()
            .filter(|(_, kind)| kind.is_encodable())
            .map(|(name, _)| name.to_string())
            .collect(),
    };

    let mut result = dataset.clone();
    for name in &names {
        let values = result.category_values(name)?;
        result = match config.method {
            EncodingMethod::OneHot => {
                let indicators = one_hot_columns(&result, name, &values)?;
                debug!(column = %name, categories = indicators.len(), "one-hot encoded");
                result.splice_column(name, indicators)?
            }
            EncodingMethod::Label => {
                debug!(column = %name, "label encoded");
                result.replace_column(name, label_column(name, &values), ColumnKind::Numeric)?
            }
        };
    }

    info!(
        method = ?config.method,
        columns = names.len(),
        width = result.width(),
        "categorical encoding complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_appearance_order() {
        let values: Vec<Option<String>> = ["red", "blue", "red", "green", "blue"]
            .iter()
            .map(|s| Some(s.to_string()))
            .collect();
        assert_eq!(categories_in_order(&values), vec!["red", "blue", "green"]);
    }

    #[test]
    fn test_missing_values_are_not_categories() {
        let values = vec![None, Some("a".to_string()), None];
        assert_eq!(categories_in_order(&values), vec!["a"]);
    }

    #[test]
    fn test_parse_method() {
        assert_eq!("onehot".parse::<EncodingMethod>().unwrap(), EncodingMethod::OneHot);
        assert_eq!("label".parse::<EncodingMethod>().unwrap(), EncodingMethod::Label);
        assert!("target".parse::<EncodingMethod>().is_err());
    }
}
