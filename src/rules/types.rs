//! Transition rule vocabulary.

use crate::factors::Trial;
use std::fmt;
use std::sync::Arc;

/// Result of a custom rule: one forced level or a set of admissible levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admissible {
    /// Exactly this level.
    Level(usize),
    /// Any of these levels.
    Levels(Vec<usize>),
}

impl From<usize> for Admissible {
    fn from(level: usize) -> Self {
        Admissible::Level(level)
    }
}

impl From<Vec<usize>> for Admissible {
    fn from(levels: Vec<usize>) -> Self {
        Admissible::Levels(levels)
    }
}

/// Signature of a custom rule: `(level_count, position, history) -> admissible`.
pub type CustomFn = dyn Fn(usize, usize, &[Trial]) -> Admissible + Send + Sync;

/// A user-supplied rule function.
///
/// # Examples
///
/// ```
/// use counterbalance::rules::{Admissible, CustomRule};
///
/// // ABBA pattern on a two-level factor.
/// let abba = CustomRule::new("abba", |_levels, position, _history| {
///     Admissible::Level([0, 1, 1, 0][position % 4])
/// });
/// assert_eq!(abba.name(), "abba");
/// ```
#[derive(Clone)]
pub struct CustomRule {
    name: String,
    func: Arc<CustomFn>,
}

impl CustomRule {
    /// Wraps `func` under a name used in debug output.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(usize, usize, &[Trial]) -> Admissible + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the rule.
    pub fn admissible(&self, levels: usize, position: usize, history: &[Trial]) -> Admissible {
        (self.func)(levels, position, history)
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule").field("name", &self.name).finish()
    }
}

/// Per-factor constraint on which levels may appear at a trial position.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionRule {
    /// Every level is admissible.
    #[default]
    Unconstrained,

    /// Level must equal the level factor `factor` held `lag` trials earlier.
    Identical { lag: usize, factor: usize },

    /// Level must differ from the level factor `factor` held `lag` trials earlier.
    Different { lag: usize, factor: usize },

    /// Previous trial's own level advanced cyclically by `step`.
    Next { step: usize },

    /// Arbitrary user logic.
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(CustomRule),
}

impl TransitionRule {
    pub fn identical(lag: usize, factor: usize) -> Self {
        TransitionRule::Identical { lag, factor }
    }

    pub fn different(lag: usize, factor: usize) -> Self {
        TransitionRule::Different { lag, factor }
    }

    pub fn next(step: usize) -> Self {
        TransitionRule::Next { step }
    }

    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(usize, usize, &[Trial]) -> Admissible + Send + Sync + 'static,
    {
        TransitionRule::Custom(CustomRule::new(name, func))
    }

    /// Rule set leaving every factor unconstrained.
    pub fn unconstrained_set(factors: usize) -> Vec<TransitionRule> {
        vec![TransitionRule::Unconstrained; factors]
    }
}

/// Normalized admissible levels for one factor at one position.
///
/// Levels are kept sorted and deduplicated. A forced set carries a single
/// level that is used as-is instead of being sampled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSet {
    levels: Vec<usize>,
    forced: bool,
}

impl LevelSet {
    /// All levels `0..count`.
    pub fn all(count: usize) -> Self {
        Self {
            levels: (0..count).collect(),
            forced: false,
        }
    }

    /// Exactly `level`, used without sampling.
    pub fn forced(level: usize) -> Self {
        Self {
            levels: vec![level],
            forced: true,
        }
    }

    /// Sampled from `levels`, which are sorted and deduplicated here.
    pub fn free(mut levels: Vec<usize>) -> Self {
        levels.sort_unstable();
        levels.dedup();
        Self {
            levels,
            forced: false,
        }
    }

    /// No admissible level.
    pub fn none() -> Self {
        Self {
            levels: Vec::new(),
            forced: false,
        }
    }

    /// Admissible levels in ascending order.
    pub fn as_slice(&self) -> &[usize] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// The forced level, if any.
    pub fn forced_level(&self) -> Option<usize> {
        if self.forced {
            self.levels.first().copied()
        } else {
            None
        }
    }
}
