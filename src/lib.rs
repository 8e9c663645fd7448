//! tabprep: statistical preprocessing for tabular data
//!
//! Correlation analysis, redundancy reduction, outlier handling, categorical
//! encoding, scaling, train/test splitting and univariate feature selection
//! over polars-backed datasets.

pub mod error;
mod logging;
pub mod pipeline;
pub mod report;
pub mod utils;

pub use error::{PrepError, PrepResult};
pub use pipeline::dataset::{ColumnKind, Dataset};
