//! Typed dataset wrapper
//!
//! A [`Dataset`] is a polars `DataFrame` plus a [`ColumnKind`] per column. Every
//! step dispatches on the kind rather than inspecting values at runtime, and
//! every operation returns a new dataset; the input is never mutated.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{PrepError, PrepResult};

/// Declared kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Continuous or count values; participates in numeric steps by default.
    Numeric,
    /// Unordered labels.
    Categorical,
    /// Ordered labels. Coercible to numbers when stored with a numeric dtype.
    Ordinal,
}

impl ColumnKind {
    /// Kind implied by a polars dtype: primitive numeric types are numeric,
    /// everything else (strings, booleans, dates) is categorical.
    pub fn infer(dtype: &DataType) -> Self {
        if dtype.is_primitive_numeric() {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }

    pub fn is_encodable(self) -> bool {
        matches!(self, ColumnKind::Categorical | ColumnKind::Ordinal)
    }

    /// Whether values of this kind stored as `dtype` may be read as numbers.
    pub fn can_coerce_numeric(self, dtype: &DataType) -> bool {
        match self {
            ColumnKind::Numeric => true,
            ColumnKind::Ordinal => dtype.is_primitive_numeric(),
            ColumnKind::Categorical => false,
        }
    }
}

impl FromStr for ColumnKind {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "numeric" => Ok(ColumnKind::Numeric),
            "categorical" => Ok(ColumnKind::Categorical),
            "ordinal" => Ok(ColumnKind::Ordinal),
            other => Err(PrepError::InvalidConfiguration(format!(
                "unknown column kind '{}'",
                other
            ))),
        }
    }
}

/// Cast any series to Float64 with NaN turned into null, so polars
/// aggregations skip it like any other missing value.
pub fn float_chunked(series: &Series) -> PrepResult<Float64Chunked> {
    let casted = series.cast(&DataType::Float64)?;
    let cleaned: Float64Chunked = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(cleaned.with_name(series.name().clone()))
}

/// Read any series as optional floats. NaN is reported as missing.
pub fn float_values(series: &Series) -> PrepResult<Vec<Option<f64>>> {
    Ok(float_chunked(series)?.into_iter().collect())
}

/// Read any series as optional strings.
pub fn text_values(series: &Series) -> PrepResult<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    let ca = casted.str()?;
    Ok(ca.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

pub(crate) fn index_array(indices: &[usize]) -> IdxCa {
    IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    )
}

/// An ordered set of named, kinded columns of equal length.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    kinds: Vec<ColumnKind>,
}

impl From<DataFrame> for Dataset {
    fn from(frame: DataFrame) -> Self {
        Dataset::from_frame(frame)
    }
}

impl Dataset {
    /// Wrap a frame, inferring each column's kind from its dtype.
    pub fn from_frame(frame: DataFrame) -> Self {
        let kinds = frame
            .get_columns()
            .iter()
            .map(|c| ColumnKind::infer(c.dtype()))
            .collect();
        Self { frame, kinds }
    }

    /// Build from columns; ragged lengths or duplicate names are a `ShapeMismatch`.
    pub fn new(columns: Vec<Column>) -> PrepResult<Self> {
        let frame =
            DataFrame::new(columns).map_err(|e| PrepError::ShapeMismatch(e.to_string()))?;
        Ok(Self::from_frame(frame))
    }

    fn from_parts(parts: Vec<(Column, ColumnKind)>) -> PrepResult<Self> {
        let (columns, kinds): (Vec<Column>, Vec<ColumnKind>) = parts.into_iter().unzip();
        let frame =
            DataFrame::new(columns).map_err(|e| PrepError::ShapeMismatch(e.to_string()))?;
        Ok(Self { frame, kinds })
    }

    fn parts(&self) -> Vec<(Column, ColumnKind)> {
        self.frame
            .get_columns()
            .iter()
            .cloned()
            .zip(self.kinds.iter().copied())
            .collect()
    }

    /// Override the kind of one column.
    pub fn with_kind(mut self, name: &str, kind: ColumnKind) -> PrepResult<Self> {
        let idx = self.position(name)?;
        let dtype = self.frame.get_columns()[idx].dtype();
        if kind.is_numeric() && !dtype.is_primitive_numeric() {
            return Err(PrepError::unsupported(
                name,
                format!("dtype {} cannot be declared numeric", dtype),
            ));
        }
        self.kinds[idx] = kind;
        Ok(self)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frame.get_column_index(name).is_some()
    }

    pub fn position(&self, name: &str) -> PrepResult<usize> {
        self.frame
            .get_column_index(name)
            .ok_or_else(|| PrepError::column_not_found(name))
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.frame.get_column_index(name).map(|i| self.kinds[i])
    }

    /// Column names paired with their kinds, in column order.
    pub fn kinds(&self) -> impl Iterator<Item = (&str, ColumnKind)> + '_ {
        self.frame
            .get_columns()
            .iter()
            .map(|c| c.name().as_str())
            .zip(self.kinds.iter().copied())
    }

    pub fn column(&self, name: &str) -> PrepResult<&Column> {
        let idx = self.position(name)?;
        Ok(&self.frame.get_columns()[idx])
    }

    /// Names of all `Numeric` columns, in column order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.kinds()
            .filter(|(_, kind)| kind.is_numeric())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Values of a column read as numbers, if its kind allows coercion.
    pub fn numeric_values(&self, name: &str) -> PrepResult<Vec<Option<f64>>> {
        Ok(self.numeric_chunked(name)?.into_iter().collect())
    }

    /// Same as [`Dataset::numeric_values`] as a Float64 array for polars aggregations.
    pub fn numeric_chunked(&self, name: &str) -> PrepResult<Float64Chunked> {
        let idx = self.position(name)?;
        let column = &self.frame.get_columns()[idx];
        if !self.kinds[idx].can_coerce_numeric(column.dtype()) {
            return Err(PrepError::unsupported(
                name,
                format!(
                    "{:?} column of dtype {} cannot be used as numeric",
                    self.kinds[idx],
                    column.dtype()
                ),
            ));
        }
        float_chunked(column.as_materialized_series())
    }

    /// Values of a categorical or ordinal column as labels.
    pub fn category_values(&self, name: &str) -> PrepResult<Vec<Option<String>>> {
        let idx = self.position(name)?;
        if !self.kinds[idx].is_encodable() {
            return Err(PrepError::unsupported(
                name,
                "column is already numeric and cannot be encoded",
            ));
        }
        text_values(self.frame.get_columns()[idx].as_materialized_series())
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> PrepResult<Self> {
        let columns = self.frame.get_columns();
        let parts = names
            .iter()
            .map(|name| {
                let idx = self.position(name)?;
                Ok((columns[idx].clone(), self.kinds[idx]))
            })
            .collect::<PrepResult<Vec<_>>>()?;
        Self::from_parts(parts)
    }

    /// Remove the named columns; every name must exist.
    pub fn drop_columns(&self, names: &[String]) -> PrepResult<Self> {
        for name in names {
            self.position(name)?;
        }
        let parts = self
            .parts()
            .into_iter()
            .filter(|(c, _)| !names.iter().any(|n| n.as_str() == c.name().as_str()))
            .collect();
        Self::from_parts(parts)
    }

    /// Rows at the given positions, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> PrepResult<Self> {
        Ok(Self {
            frame: self.frame.take(&index_array(indices))?,
            kinds: self.kinds.clone(),
        })
    }

    /// Rows where `mask` is true. The mask must cover every row.
    pub fn filter_rows(&self, mask: &[bool]) -> PrepResult<Self> {
        if mask.len() != self.height() {
            return Err(PrepError::ShapeMismatch(format!(
                "row mask has {} entries but dataset has {} rows",
                mask.len(),
                self.height()
            )));
        }
        let mask = BooleanChunked::from_slice("mask".into(), mask);
        Ok(Self {
            frame: self.frame.filter(&mask)?,
            kinds: self.kinds.clone(),
        })
    }

    /// Replace one column in place, keeping its position.
    pub fn replace_column(&self, name: &str, column: Column, kind: ColumnKind) -> PrepResult<Self> {
        self.splice_column(name, vec![(column, kind)])
    }

    /// Replace one column with zero or more columns at the same position.
    pub fn splice_column(
        &self,
        name: &str,
        replacement: Vec<(Column, ColumnKind)>,
    ) -> PrepResult<Self> {
        let idx = self.position(name)?;
        let mut parts = self.parts();
        parts.splice(idx..=idx, replacement);
        Self::from_parts(parts)
    }

    /// Append a column after the existing ones.
    pub fn push_column(&self, column: Column, kind: ColumnKind) -> PrepResult<Self> {
        let mut parts = self.parts();
        parts.push((column, kind));
        Self::from_parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_frame(
            df! {
                "age" => [25i64, 30, 35],
                "city" => ["a", "b", "a"],
                "grade" => [1i32, 2, 3],
            }
            .unwrap(),
        )
    }

    #[test]
    fn test_kinds_inferred_from_dtype() {
        let ds = sample();
        assert_eq!(ds.kind("age"), Some(ColumnKind::Numeric));
        assert_eq!(ds.kind("city"), Some(ColumnKind::Categorical));
        assert_eq!(ds.numeric_columns(), vec!["age", "grade"]);
    }

    #[test]
    fn test_ordinal_numeric_is_coercible_but_not_default_numeric() {
        let ds = sample().with_kind("grade", ColumnKind::Ordinal).unwrap();
        assert_eq!(ds.numeric_columns(), vec!["age"]);
        let values = ds.numeric_values("grade").unwrap();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_categorical_not_coercible() {
        let err = sample().numeric_values("city").unwrap_err();
        assert!(matches!(err, PrepError::UnsupportedColumnType { .. }));
    }

    #[test]
    fn test_cannot_declare_string_numeric() {
        let err = sample().with_kind("city", ColumnKind::Numeric).unwrap_err();
        assert!(matches!(err, PrepError::UnsupportedColumnType { .. }));
    }

    #[test]
    fn test_splice_keeps_position_and_kinds() {
        let ds = sample();
        let replaced = ds
            .splice_column(
                "city",
                vec![
                    (Column::new("city_a".into(), [1i32, 0, 1]), ColumnKind::Numeric),
                    (Column::new("city_b".into(), [0i32, 1, 0]), ColumnKind::Numeric),
                ],
            )
            .unwrap();
        assert_eq!(replaced.column_names(), vec!["age", "city_a", "city_b", "grade"]);
        assert_eq!(replaced.kind("city_b"), Some(ColumnKind::Numeric));
        // input untouched
        assert_eq!(ds.column_names(), vec!["age", "city", "grade"]);
    }

    #[test]
    fn test_filter_and_take_rows() {
        let ds = sample();
        let filtered = ds.filter_rows(&[true, false, true]).unwrap();
        assert_eq!(filtered.height(), 2);
        let taken = ds.take_rows(&[2, 0]).unwrap();
        assert_eq!(
            taken.numeric_values("age").unwrap(),
            vec![Some(35.0), Some(25.0)]
        );
        assert!(ds.filter_rows(&[true]).is_err());
    }

    #[test]
    fn test_missing_column_is_shape_mismatch() {
        let err = sample().drop_columns(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, PrepError::ShapeMismatch(_)));
    }

    #[test]
    fn test_column_kind_from_str() {
        assert_eq!("Ordinal".parse::<ColumnKind>().unwrap(), ColumnKind::Ordinal);
        assert!("text".parse::<ColumnKind>().is_err());
    }
}
