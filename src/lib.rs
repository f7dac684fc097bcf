//! Defect search - Energy-targeted evolution of point defect configurations.
//!
//! This crate provides the bookkeeping core of an evolutionary search over
//! defect placements in a lattice structure: a collision-aware defect
//! container and the selection machinery that picks sub-populations whose
//! energies lie closest to a target.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Defect value types and batch configuration
//! - `compute`: Defect sets, energy evaluation adapters, batches and the
//!   batch orchestrator
//!
//! Energy evaluation, move generation and mutation are supplied by the
//! caller as closures or [`compute::Evaluate`] implementations.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::HashSet;
//!
//! use defect_search::{
//!     compute::{Batch, BatchOper, DefectSet, EvalError},
//!     schema::Defect,
//! };
//!
//! fn count_energy(defects: &HashSet<Defect>, _debug: bool) -> Result<f64, EvalError> {
//!     Ok(defects.len() as f64)
//! }
//!
//! let mut population = Vec::new();
//! for x in 0..8 {
//!     let mut set = DefectSet::new(count_energy);
//!     set.add(Defect::new(1, (x, 0, 0))).unwrap();
//!     // Collides with the defect above, so lands on a neighbouring site.
//!     set.add_to_nearest(Defect::new(2, (x, 0, 0)), |frontier: &[Defect]| {
//!         frontier
//!             .iter()
//!             .map(|d| d.moved_to(d.coords().offset(0, 1, 0)))
//!             .collect::<Vec<_>>()
//!     })
//!     .unwrap();
//!     population.push(set);
//! }
//!
//! let mut oper = BatchOper::new(vec![Batch::top(2, 0.5), Batch::random(2, 0.5)], 1.0)
//!     .unwrap()
//!     .with_seed(42);
//! oper.process_members(&population).unwrap();
//!
//! for member in &oper {
//!     println!("{member}");
//! }
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{Batch, BatchError, BatchOper, DefectSet, DefectSetError, EvalFunction, Member};
pub use schema::{BatchConfig, BatchOperConfig, Coords, Defect, SelectionStrategy};
