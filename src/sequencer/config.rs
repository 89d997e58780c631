//! Sequence generation configuration.
//!
//! [`SequenceConfig`] holds the factor declaration, proportions, rule sets
//! for every phase, and the search budget.

use crate::error::{ConfigError, Phase};
use crate::factors::{validate_proportions, FactorSpace};
use crate::rules::{validate_rules, TransitionRule};

/// Sampling attempts per position before the picker gives up.
pub const MAX_PICKER_ATTEMPTS: usize = 200;

/// Dead ends tolerated with one seed before drawing a new one.
pub const MAX_RETRY_ATTEMPTS: usize = 25;

/// New seeds drawn before the constraints are declared unsatisfiable.
pub const MAX_RESTART_ATTEMPTS: usize = 15;

/// Search budget of the backtracking sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchLimits {
    /// Draws per position before failing with `ExhaustedAttempts`.
    pub picker_attempts: usize,

    /// Dead ends allowed per seed. Exceeding it draws a new seed.
    pub max_retries: usize,

    /// Seeds allowed per call. Exceeding it fails with
    /// `UnsatisfiableConstraints`.
    pub max_restarts: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            picker_attempts: MAX_PICKER_ATTEMPTS,
            max_retries: MAX_RETRY_ATTEMPTS,
            max_restarts: MAX_RESTART_ATTEMPTS,
        }
    }
}

/// Which factors the feasibility check restricts to their admissible levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeasibilityScope {
    /// Every factor. Undeclared proportions count as uniform weights.
    #[default]
    AllFactors,

    /// Only factors with explicitly declared proportions; the others span
    /// all their levels. A dead end on an undeclared factor then surfaces
    /// in the picker instead of the retry loop.
    WeightedFactors,
}

/// Configuration of one generation call.
///
/// # Examples
///
/// ```
/// use counterbalance::rules::TransitionRule;
/// use counterbalance::sequencer::SequenceConfig;
///
/// // congruency, previous congruency, stimulus set, stimulus option
/// let config = SequenceConfig::new(vec![2, 2, 2, 2])
///     .with_rules(vec![
///         TransitionRule::Unconstrained,
///         TransitionRule::identical(1, 0),
///         TransitionRule::next(1),
///         TransitionRule::Unconstrained,
///     ])
///     .with_prepend(1, vec![
///         TransitionRule::identical(1, 1),
///         TransitionRule::Unconstrained,
///         TransitionRule::next(1),
///         TransitionRule::Unconstrained,
///     ])
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceConfig {
    /// Level count per factor.
    pub factors: Vec<usize>,

    /// Per-factor weights; `None` means uniform.
    pub proportions: Vec<Option<Vec<u32>>>,

    /// Transition rules of the pool-backed core, one per factor.
    pub rules: Vec<TransitionRule>,

    /// Repetitions of every (weighted) level combination.
    pub sets: u32,

    /// Trials added before the core, outside the pool.
    pub prepend_count: usize,

    /// Rules for prepended trials. Back-references count from the trial
    /// nearest the boundary, since prepending builds on the reversed list.
    pub prepend_rules: Vec<TransitionRule>,

    /// Trials added after the core, outside the pool.
    pub append_count: usize,

    /// Rules for appended trials.
    pub append_rules: Vec<TransitionRule>,

    /// Emit pool and decision traces through `log`.
    pub debug: bool,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,

    /// Picker, retry and restart budgets.
    pub limits: SearchLimits,

    /// Factors covered by the pre-pick feasibility check.
    pub feasibility: FeasibilityScope,
}

impl SequenceConfig {
    /// Uniform proportions, no rules, one set, no boundary trials.
    pub fn new(factors: Vec<usize>) -> Self {
        let n = factors.len();
        Self {
            factors,
            proportions: vec![None; n],
            rules: TransitionRule::unconstrained_set(n),
            sets: 1,
            prepend_count: 0,
            prepend_rules: TransitionRule::unconstrained_set(n),
            append_count: 0,
            append_rules: TransitionRule::unconstrained_set(n),
            debug: false,
            seed: None,
            limits: SearchLimits::default(),
            feasibility: FeasibilityScope::default(),
        }
    }

    pub fn with_proportions(mut self, proportions: Vec<Option<Vec<u32>>>) -> Self {
        self.proportions = proportions;
        self
    }

    pub fn with_rules(mut self, rules: Vec<TransitionRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_sets(mut self, sets: u32) -> Self {
        self.sets = sets;
        self
    }

    pub fn with_prepend(mut self, count: usize, rules: Vec<TransitionRule>) -> Self {
        self.prepend_count = count;
        self.prepend_rules = rules;
        self
    }

    pub fn with_append(mut self, count: usize, rules: Vec<TransitionRule>) -> Self {
        self.append_count = count;
        self.append_rules = rules;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_feasibility(mut self, scope: FeasibilityScope) -> Self {
        self.feasibility = scope;
        self
    }

    /// The declared factor space.
    pub fn factor_space(&self) -> Result<FactorSpace, ConfigError> {
        FactorSpace::new(self.factors.clone())
    }

    /// Validates the configuration.
    ///
    /// Boundary rule sets are checked only when their count is non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let space = self.factor_space()?;
        if self.sets == 0 {
            return Err(ConfigError::ZeroSets);
        }
        validate_rules(&self.rules, &space, Phase::Main)?;
        if self.prepend_count > 0 {
            validate_rules(&self.prepend_rules, &space, Phase::Prepend)?;
        }
        if self.append_count > 0 {
            validate_rules(&self.append_rules, &space, Phase::Append)?;
        }
        validate_proportions(&self.proportions, &space)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SequenceConfig::new(vec![2, 3]);
        assert_eq!(config.proportions, vec![None, None]);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.sets, 1);
        assert_eq!(config.limits.picker_attempts, 200);
        assert_eq!(config.limits.max_retries, 25);
        assert_eq!(config.limits.max_restarts, 15);
        assert_eq!(config.feasibility, FeasibilityScope::AllFactors);
    }

    #[test]
    fn test_validate_ok() {
        assert!(SequenceConfig::new(vec![2, 2]).validate().is_ok());
    }

    #[test]
    fn test_validate_zero_sets() {
        let config = SequenceConfig::new(vec![2]).with_sets(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroSets));
    }

    #[test]
    fn test_validate_bad_proportion() {
        let config = SequenceConfig::new(vec![2, 2]).with_proportions(vec![Some(vec![1, 0]), None]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightBelowOne { .. })
        ));
    }

    #[test]
    fn test_boundary_rules_checked_only_when_used() {
        let bad = vec![TransitionRule::identical(0, 0), TransitionRule::Unconstrained];
        let config = SequenceConfig::new(vec![2, 2]).with_append(0, bad.clone());
        assert!(config.validate().is_ok());
        let config = config.with_append(2, bad);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLag {
                phase: Phase::Append,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_empty_factor() {
        let config = SequenceConfig::new(vec![2, 0]);
        assert_eq!(config.validate(), Err(ConfigError::EmptyFactor { factor: 1 }));
    }
}
