//! Report module - tabular summaries of preparation results

pub mod summary;
pub mod tables;

pub use summary::*;
pub use tables::*;
