//! Error types for sequence generation.

use std::fmt;

/// Generation phase in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Pool-backed core produced by the backtracking sequencer.
    Main,
    /// Trials added before the core.
    Prepend,
    /// Trials added after the core.
    Append,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Main => write!(f, "main"),
            Phase::Prepend => write!(f, "prepend"),
            Phase::Append => write!(f, "append"),
        }
    }
}

/// A malformed configuration, detected before or during rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No factors were declared.
    EmptyFactorSpace,

    /// A factor was declared with zero levels.
    EmptyFactor { factor: usize },

    /// `sets` must be at least one.
    ZeroSets,

    /// Rule array does not have one entry per factor.
    RuleCount {
        phase: Phase,
        expected: usize,
        found: usize,
    },

    /// Proportion array does not have one entry per factor.
    ProportionCount { expected: usize, found: usize },

    /// Explicit weight vector length differs from the factor's level count.
    WeightCount {
        factor: usize,
        expected: usize,
        found: usize,
    },

    /// Explicit weights must be at least one.
    WeightBelowOne { factor: usize, level: usize },

    /// `identical` / `different` must look back at least one trial.
    InvalidLag { phase: Phase, factor: usize, lag: usize },

    /// A rule references a factor that does not exist.
    UnknownFactor {
        phase: Phase,
        factor: usize,
        referenced: usize,
    },

    /// More than one `next` rule in a single rule set.
    DuplicateNext {
        phase: Phase,
        first: usize,
        second: usize,
    },

    /// Demand for some cell does not fit in a `u64`.
    DemandOverflow,

    /// A back-reference reaches before the start of the history.
    InsufficientHistory {
        factor: usize,
        lag: usize,
        available: usize,
    },

    /// A trial handed in as history does not have one in-range level per
    /// factor.
    TrialShape { position: usize },

    /// A custom rule returned a level outside `0..levels`.
    LevelOutOfRange {
        factor: usize,
        level: usize,
        levels: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyFactorSpace => write!(f, "at least one factor is required"),
            ConfigError::EmptyFactor { factor } => {
                write!(f, "factor {factor} must have at least one level")
            }
            ConfigError::ZeroSets => write!(f, "sets must be at least 1"),
            ConfigError::RuleCount {
                phase,
                expected,
                found,
            } => write!(
                f,
                "{phase} rules must have one entry per factor: expected {expected}, found {found}"
            ),
            ConfigError::ProportionCount { expected, found } => write!(
                f,
                "proportions must have one entry per factor: expected {expected}, found {found}"
            ),
            ConfigError::WeightCount {
                factor,
                expected,
                found,
            } => write!(
                f,
                "factor {factor} has {expected} levels but {found} proportion weights"
            ),
            ConfigError::WeightBelowOne { factor, level } => write!(
                f,
                "proportion weight for factor {factor} level {level} must be at least 1"
            ),
            ConfigError::InvalidLag { phase, factor, lag } => write!(
                f,
                "{phase} rule on factor {factor} looks back {lag} trials; must be at least 1"
            ),
            ConfigError::UnknownFactor {
                phase,
                factor,
                referenced,
            } => write!(
                f,
                "{phase} rule on factor {factor} references unknown factor {referenced}"
            ),
            ConfigError::DuplicateNext {
                phase,
                first,
                second,
            } => write!(
                f,
                "only one next rule is allowed per {phase} rule set (factors {first} and {second})"
            ),
            ConfigError::DemandOverflow => write!(f, "demand pool cell overflows u64"),
            ConfigError::InsufficientHistory {
                factor,
                lag,
                available,
            } => write!(
                f,
                "rule on factor {factor} looks back {lag} trials but only {available} precede it"
            ),
            ConfigError::TrialShape { position } => write!(
                f,
                "trial at position {position} does not match the factor space"
            ),
            ConfigError::LevelOutOfRange {
                factor,
                level,
                levels,
            } => write!(
                f,
                "custom rule on factor {factor} returned level {level}; factor has {levels} levels"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure of a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Malformed configuration. Never retried.
    Configuration(ConfigError),

    /// The picker ran out of sampling attempts although the feasibility
    /// check reported an available cell.
    ExhaustedAttempts {
        phase: Phase,
        position: usize,
        attempts: usize,
    },

    /// No admissible combination exists at `position` after all retries and
    /// restarts.
    UnsatisfiableConstraints {
        phase: Phase,
        position: usize,
        /// Demand still left in the pool when giving up.
        remaining_mass: u64,
        /// Demand inside the admissible cross product at `position`.
        admissible_mass: u64,
        restarts: usize,
    },

    /// Consumed a cell whose demand was already zero.
    PoolUnderflow { cell: Vec<usize> },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::Configuration(e) => write!(f, "configuration error: {e}"),
            GenerationError::ExhaustedAttempts {
                phase,
                position,
                attempts,
            } => write!(
                f,
                "{phase} phase: no pool-available combination found at position {position} \
                 after {attempts} attempts; consider using fewer restrictions"
            ),
            GenerationError::UnsatisfiableConstraints {
                phase,
                position,
                remaining_mass,
                admissible_mass,
                restarts,
            } => write!(
                f,
                "{phase} phase: constraints unsatisfiable at position {position} after \
                 {restarts} restarts (remaining mass {remaining_mass}, admissible mass \
                 {admissible_mass})"
            ),
            GenerationError::PoolUnderflow { cell } => {
                write!(f, "demand pool underflow at cell {cell:?}")
            }
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GenerationError::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for GenerationError {
    fn from(e: ConfigError) -> Self {
        GenerationError::Configuration(e)
    }
}

impl GenerationError {
    /// Whether this is a configuration fault (as opposed to a search failure).
    pub fn is_configuration(&self) -> bool {
        matches!(self, GenerationError::Configuration(_))
    }
}
