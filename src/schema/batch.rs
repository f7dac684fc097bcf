//! Batch selection configuration types.
//!
//! These describe how a population of candidate defect configurations is
//! split into sub-populations for the next round of the search. The
//! stateful counterparts live in [`crate::compute`].

use serde::{Deserialize, Serialize};

/// How a batch picks its members from the fitness-sorted candidate list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Blank base form. Never valid for selection.
    #[default]
    Unset,
    /// Take the leading candidates in sorted order.
    Top,
    /// Draw uniformly with replacement.
    Random,
}

impl SelectionStrategy {
    /// False only for the blank [`SelectionStrategy::Unset`] form.
    pub fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

/// Configuration for a single batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Selection strategy.
    pub strategy: SelectionStrategy,
    /// Upper bound on the number of selected members.
    pub max_members: usize,
    /// Fraction of the candidate pool to select, in (0, 1].
    #[serde(default = "default_preferred_percent")]
    pub preferred_percent: f64,
}

impl BatchConfig {
    /// `Top` batch of at most `max_members`, default fraction.
    pub fn top(max_members: usize) -> Self {
        Self {
            strategy: SelectionStrategy::Top,
            max_members,
            preferred_percent: default_preferred_percent(),
        }
    }

    /// `Random` batch of at most `max_members`, default fraction.
    pub fn random(max_members: usize) -> Self {
        Self {
            strategy: SelectionStrategy::Random,
            max_members,
            preferred_percent: default_preferred_percent(),
        }
    }

    /// Override the selection fraction.
    pub fn with_preferred_percent(mut self, percent: f64) -> Self {
        self.preferred_percent = percent;
        self
    }

    /// Validate the batch configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.strategy.is_set() {
            return Err(ConfigError::BlankStrategy);
        }
        check_preferred_percent(self.preferred_percent)
    }
}

pub(crate) fn default_preferred_percent() -> f64 {
    0.2
}

/// Checks that a selection fraction lies in (0, 1].
pub(crate) fn check_preferred_percent(percent: f64) -> Result<(), ConfigError> {
    if percent > 0.0 && percent <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidPreferredPercent(percent))
    }
}

/// Checks that a target energy is finite.
pub(crate) fn check_target_energy(target: f64) -> Result<(), ConfigError> {
    if target.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidTargetEnergy(target))
    }
}

/// Configuration for a batch orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperConfig {
    /// Batches, in dispatch order.
    pub batches: Vec<BatchConfig>,
    /// Energy that candidates are ranked against.
    #[serde(default)]
    pub target_energy: f64,
    /// Random seed for reproducible random selection.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for BatchOperConfig {
    fn default() -> Self {
        Self {
            batches: vec![BatchConfig::top(10), BatchConfig::random(10)],
            target_energy: 0.0,
            random_seed: None,
        }
    }
}

impl BatchOperConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the orchestrator configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_target_energy(self.target_energy)?;
        for (index, batch) in self.batches.iter().enumerate() {
            batch.validate().map_err(|source| ConfigError::Batch {
                index,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }
}

/// Batch configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Batch has no selection strategy")]
    BlankStrategy,
    #[error("Preferred percent {0} must be in (0, 1]")]
    InvalidPreferredPercent(f64),
    #[error("Target energy must be finite, got {0}")]
    InvalidTargetEnergy(f64),
    #[error("Batch {index} is invalid: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<ConfigError>,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
