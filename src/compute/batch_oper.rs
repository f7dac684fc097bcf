//! Energy-targeted selection over several batches.
//!
//! A [`BatchOper`] ranks the candidate population by squared distance of
//! each candidate's energy to a target, then hands the same ranked list to
//! every batch. Batches select independently, so their members may overlap.

use std::ops::Index;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, trace};

use super::batch::{Batch, BatchError, SelectionRng};
use super::defect_set::DefectSet;
use super::eval::EvalError;
use crate::schema::{BatchOperConfig, check_target_energy};

/// A population member with a scalar energy.
pub trait Member {
    fn energy(&self) -> Result<f64, EvalError>;
}

impl Member for DefectSet {
    fn energy(&self) -> Result<f64, EvalError> {
        Ok(DefectSet::energy(self, false)?)
    }
}

impl<T: Member + ?Sized> Member for Arc<T> {
    fn energy(&self) -> Result<f64, EvalError> {
        Member::energy(&**self)
    }
}

impl<T: Member + ?Sized> Member for Rc<T> {
    fn energy(&self) -> Result<f64, EvalError> {
        Member::energy(&**self)
    }
}

/// Orchestrates selection across an ordered list of batches.
#[derive(Debug)]
pub struct BatchOper<M> {
    batches: Vec<Batch<M>>,
    target_energy: f64,
    rng: SelectionRng,
}

impl<M: Member + Clone> BatchOper<M> {
    /// Create an orchestrator owning `batches`.
    ///
    /// Fails if the target is not finite, or if any batch has no selection
    /// strategy or an out-of-range selection fraction.
    pub fn new(batches: Vec<Batch<M>>, target_energy: f64) -> Result<Self, BatchError> {
        check_target_energy(target_energy)?;
        for (index, batch) in batches.iter().enumerate() {
            batch
                .validate()
                .map_err(|source| BatchError::InvalidBatch { index, source })?;
        }
        Ok(Self {
            batches,
            target_energy,
            rng: SelectionRng::random(),
        })
    }

    /// Build from a validated configuration.
    pub fn from_config(config: &BatchOperConfig) -> Result<Self, BatchError> {
        config.validate()?;
        let batches = config.batches.iter().map(Batch::from_config).collect();
        let oper = Self::new(batches, config.target_energy)?;
        Ok(match config.random_seed {
            Some(seed) => oper.with_seed(seed),
            None => oper,
        })
    }

    /// Reseed random selection for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SelectionRng::new(seed);
        self
    }

    /// Squared distance of `energy` from the target.
    pub fn distance(&self, energy: f64) -> f64 {
        (energy - self.target_energy).powi(2)
    }

    /// Candidates ordered by closeness to the target energy.
    ///
    /// Each energy is evaluated once. Ties keep their input order and NaN
    /// energies rank last. The input is left untouched.
    pub fn sort(&self, candidates: &[M]) -> Result<Vec<M>, BatchError> {
        let mut keyed = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            let energy = candidate
                .energy()
                .map_err(|source| BatchError::Energy { index, source })?;
            trace!("Candidate {index}: energy {energy}");
            keyed.push((self.distance(energy), candidate));
        }

        // NaN keeps its sign bit, so total_cmp alone would rank -NaN first.
        keyed.sort_by(|a, b| {
            a.0.is_nan()
                .cmp(&b.0.is_nan())
                .then_with(|| a.0.total_cmp(&b.0))
        });
        Ok(keyed.into_iter().map(|(_, c)| c.clone()).collect())
    }

    /// Sort `candidates` once and let every batch select from the result.
    ///
    /// Either every batch receives its new selection or none does.
    pub fn process_members(&mut self, candidates: &[M]) -> Result<(), BatchError> {
        let sorted = self.sort(candidates)?;
        debug!(
            "Dispatching {} candidates to {} batches (target energy {})",
            sorted.len(),
            self.batches.len(),
            self.target_energy
        );
        let selections = self
            .batches
            .iter()
            .map(|batch| batch.select(&sorted, &mut self.rng))
            .collect::<Result<Vec<_>, _>>()?;
        for (batch, members) in self.batches.iter_mut().zip(selections) {
            batch.replace_members(members);
        }
        Ok(())
    }

    /// Every member of every batch, batch by batch, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = &M> {
        self.batches.iter().flat_map(|batch| batch.iter())
    }

    pub fn batches(&self) -> &[Batch<M>] {
        &self.batches
    }

    pub fn get(&self, index: usize) -> Option<&Batch<M>> {
        self.batches.get(index)
    }

    /// Apply `f` to every member of batch `index`, as [`Batch::mutate`].
    pub fn mutate_batch<F>(&mut self, index: usize, f: F) -> Result<(), BatchError>
    where
        F: FnMut(&M) -> M,
    {
        let batch = self
            .batches
            .get_mut(index)
            .ok_or(BatchError::NoSuchBatch { index })?;
        batch.mutate(f);
        Ok(())
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn target_energy(&self) -> f64 {
        self.target_energy
    }
}

impl<M> Index<usize> for BatchOper<M> {
    type Output = Batch<M>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.batches[index]
    }
}

impl<'a, M> IntoIterator for &'a BatchOper<M> {
    type Item = &'a M;
    type IntoIter = std::iter::Flatten<std::slice::Iter<'a, Batch<M>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter().flatten()
    }
}
