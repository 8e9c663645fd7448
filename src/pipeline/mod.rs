//! Pipeline module - the preprocessing steps

pub mod correlation;
pub mod dataset;
pub mod encoding;
pub mod evaluation;
pub mod missing;
pub mod outliers;
pub mod ranking;
pub mod reduction;
pub mod scaling;
pub mod selection;
pub mod split;

pub use correlation::*;
pub use dataset::*;
pub use encoding::*;
pub use evaluation::*;
pub use missing::*;
pub use outliers::*;
pub use ranking::*;
pub use reduction::*;
pub use scaling::*;
pub use selection::*;
pub use split::*;
