//! Schema module - Defect values and batch configuration types.

mod batch;
mod defect;

pub use batch::*;
pub use defect::*;
