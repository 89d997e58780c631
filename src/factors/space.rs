//! Factor space and trial types.

use crate::error::ConfigError;

/// One trial: a level index per factor.
pub type Trial = Vec<usize>;

/// Declared factors and their level counts.
///
/// Levels of factor `f` are addressed `0..levels(f)`.
///
/// # Examples
///
/// ```
/// use counterbalance::factors::FactorSpace;
///
/// let space = FactorSpace::new(vec![2, 3]).unwrap();
/// assert_eq!(space.len(), 2);
/// assert_eq!(space.cell_count(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorSpace {
    levels: Vec<usize>,
}

impl FactorSpace {
    /// Creates a factor space. Every factor needs at least one level.
    pub fn new(levels: Vec<usize>) -> Result<Self, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::EmptyFactorSpace);
        }
        if let Some(factor) = levels.iter().position(|&l| l == 0) {
            return Err(ConfigError::EmptyFactor { factor });
        }
        Ok(Self { levels })
    }

    /// Number of factors.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; a valid space has at least one factor.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level count of `factor`.
    pub fn levels(&self, factor: usize) -> usize {
        self.levels[factor]
    }

    /// Level counts of every factor.
    pub fn as_slice(&self) -> &[usize] {
        &self.levels
    }

    /// Number of full level combinations.
    pub fn cell_count(&self) -> usize {
        self.levels.iter().product()
    }

    /// Whether `trial` has one in-range level per factor.
    pub fn contains(&self, trial: &[usize]) -> bool {
        trial.len() == self.levels.len() && trial.iter().zip(&self.levels).all(|(&v, &l)| v < l)
    }
}
