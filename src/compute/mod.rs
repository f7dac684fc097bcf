//! Compute module - Defect placement and batch selection.

mod batch;
mod batch_oper;
mod defect_set;
mod eval;

pub use batch::*;
pub use batch_oper::*;
pub use defect_set::*;
pub use eval::*;
