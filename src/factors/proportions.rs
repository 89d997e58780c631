//! Proportion weights: normalization and validation.

use super::space::FactorSpace;
use crate::error::ConfigError;

/// Fills in uniform weights for factors without declared proportions.
///
/// Entries missing from the end of `declared` are treated as undeclared.
/// The result has one explicit weight vector per factor.
pub fn normalize_proportions(declared: &[Option<Vec<u32>>], space: &FactorSpace) -> Vec<Vec<u32>> {
    (0..space.len())
        .map(|f| match declared.get(f) {
            Some(Some(w)) => w.clone(),
            _ => vec![1; space.levels(f)],
        })
        .collect()
}

/// Checks declared proportion weights.
///
/// Fails when the array shape does not match the factor space or any
/// explicit weight is below one.
pub fn validate_proportions(
    declared: &[Option<Vec<u32>>],
    space: &FactorSpace,
) -> Result<(), ConfigError> {
    if declared.len() != space.len() {
        return Err(ConfigError::ProportionCount {
            expected: space.len(),
            found: declared.len(),
        });
    }
    for (factor, entry) in declared.iter().enumerate() {
        let Some(weights) = entry else { continue };
        if weights.len() != space.levels(factor) {
            return Err(ConfigError::WeightCount {
                factor,
                expected: space.levels(factor),
                found: weights.len(),
            });
        }
        if let Some(level) = weights.iter().position(|&w| w < 1) {
            return Err(ConfigError::WeightBelowOne { factor, level });
        }
    }
    Ok(())
}

/// Validated, normalized per-factor weights.
///
/// Remembers which factors had explicitly declared weights ("balanced"
/// factors), which matters for [`FeasibilityScope::WeightedFactors`].
///
/// [`FeasibilityScope::WeightedFactors`]: crate::sequencer::FeasibilityScope::WeightedFactors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proportions {
    weights: Vec<Vec<u32>>,
    declared: Vec<bool>,
}

impl Proportions {
    /// Validates and normalizes `declared` against `space`.
    pub fn new(declared: &[Option<Vec<u32>>], space: &FactorSpace) -> Result<Self, ConfigError> {
        validate_proportions(declared, space)?;
        Ok(Self {
            weights: normalize_proportions(declared, space),
            declared: declared.iter().map(Option::is_some).collect(),
        })
    }

    /// Uniform weights on every factor.
    pub fn uniform(space: &FactorSpace) -> Self {
        Self {
            weights: normalize_proportions(&[], space),
            declared: vec![false; space.len()],
        }
    }

    /// Weight vector of `factor`.
    pub fn weights(&self, factor: usize) -> &[u32] {
        &self.weights[factor]
    }

    /// Weight vectors of every factor, in factor order.
    pub fn all(&self) -> &[Vec<u32>] {
        &self.weights
    }

    /// Whether `factor` had explicitly declared weights.
    pub fn is_declared(&self, factor: usize) -> bool {
        self.declared[factor]
    }

    /// Weights of `factor` restricted to `levels`, widened for sampling.
    pub fn restricted(&self, factor: usize, levels: &[usize]) -> Vec<u64> {
        levels
            .iter()
            .map(|&l| u64::from(self.weights[factor][l]))
            .collect()
    }
}
