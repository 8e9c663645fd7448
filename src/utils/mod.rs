//! Utility helpers: progress rendering and column statistics

pub mod progress;
pub mod stats;

pub use progress::*;
