//! Bounded sub-population selection.

use rand::prelude::*;

use super::eval::EvalError;
use crate::schema::{BatchConfig, ConfigError, SelectionStrategy, check_preferred_percent};

/// Random number generator wrapper for batch selection.
#[derive(Debug)]
pub struct SelectionRng {
    rng: StdRng,
}

impl SelectionRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Errors raised while building batches or selecting into them.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Batch {index} is invalid: {source}")]
    InvalidBatch {
        index: usize,
        #[source]
        source: ConfigError,
    },
    #[error("Batch has no selection strategy")]
    Unconfigured,
    #[error("Energy of candidate {index} could not be evaluated: {source}")]
    Energy {
        index: usize,
        #[source]
        source: EvalError,
    },
    #[error("No batch at index {index}")]
    NoSuchBatch { index: usize },
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// A bounded, strategy-selected subset of a candidate population.
///
/// Every selection round replaces `members` wholesale. Cloning copies the
/// configuration and the current members.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<M> {
    members: Vec<M>,
    max_members: usize,
    preferred_percent: f64,
    strategy: SelectionStrategy,
}

impl<M: Clone> Batch<M> {
    /// Blank batch with no strategy. Must be given one before use.
    pub fn new(max_members: usize, preferred_percent: f64) -> Self {
        Self::with_strategy(SelectionStrategy::Unset, max_members, preferred_percent)
    }

    /// Batch that keeps the leading candidates.
    pub fn top(max_members: usize, preferred_percent: f64) -> Self {
        Self::with_strategy(SelectionStrategy::Top, max_members, preferred_percent)
    }

    /// Batch that samples candidates uniformly with replacement.
    pub fn random(max_members: usize, preferred_percent: f64) -> Self {
        Self::with_strategy(SelectionStrategy::Random, max_members, preferred_percent)
    }

    /// Batch with an explicit strategy and no members.
    pub fn with_strategy(
        strategy: SelectionStrategy,
        max_members: usize,
        preferred_percent: f64,
    ) -> Self {
        Self {
            members: Vec::new(),
            max_members,
            preferred_percent,
            strategy,
        }
    }

    /// Empty batch described by `config`. Not validated here.
    pub fn from_config(config: &BatchConfig) -> Self {
        Self::with_strategy(
            config.strategy,
            config.max_members,
            config.preferred_percent,
        )
    }

    /// Check the strategy is set and the selection fraction is in (0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.strategy.is_set() {
            return Err(ConfigError::BlankStrategy);
        }
        check_preferred_percent(self.preferred_percent)
    }

    /// Number of members a selection from `candidates` candidates yields.
    pub fn selection_size(&self, candidates: usize) -> usize {
        let preferred = (candidates as f64 * self.preferred_percent).ceil() as usize;
        self.max_members.min(preferred)
    }

    /// Replace the members with a selection from `candidates`.
    ///
    /// `candidates` is expected to be sorted best first; the `Top` strategy
    /// relies on it and does no sorting of its own.
    pub fn process_members(
        &mut self,
        candidates: &[M],
        rng: &mut SelectionRng,
    ) -> Result<(), BatchError> {
        self.members = self.select(candidates, rng)?;
        Ok(())
    }

    /// Selection from `candidates` without touching the current members.
    pub fn select(&self, candidates: &[M], rng: &mut SelectionRng) -> Result<Vec<M>, BatchError> {
        let n = self.selection_size(candidates.len());
        match self.strategy {
            SelectionStrategy::Unset => Err(BatchError::Unconfigured),
            SelectionStrategy::Top => Ok(candidates.iter().take(n).cloned().collect()),
            SelectionStrategy::Random => Ok((0..n)
                .map(|_| candidates[rng.index(candidates.len())].clone())
                .collect()),
        }
    }

    pub(crate) fn replace_members(&mut self, members: Vec<M>) {
        self.members = members;
    }

    /// Replace every member with `f(member)`, keeping order and count.
    pub fn mutate<F>(&mut self, mut f: F)
    where
        F: FnMut(&M) -> M,
    {
        for member in &mut self.members {
            *member = f(member);
        }
    }

    /// Members chosen by the last selection round.
    pub fn members(&self) -> &[M] {
        &self.members
    }

    pub fn iter(&self) -> std::slice::Iter<'_, M> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Cap on the selection size.
    pub fn max_members(&self) -> usize {
        self.max_members
    }

    /// Fraction of the candidate pool to select.
    pub fn preferred_percent(&self) -> f64 {
        self.preferred_percent
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }
}

impl<'a, M> IntoIterator for &'a Batch<M> {
    type Item = &'a M;
    type IntoIter = std::slice::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
