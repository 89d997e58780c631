//! Counterbalanced trial sequence generation.
//!
//! Produces pseudo-random orders of multi-factor experimental trials such
//! that:
//!
//! - every full factor-level combination occurs the prescribed number of
//!   times (`sets`, scaled by proportion weights),
//! - level frequencies follow the declared proportions exactly,
//! - trial-to-trial transitions obey per-factor rules (repetition,
//!   avoidance, cyclic progression, or custom logic).
//!
//! # Modules
//!
//! - [`factors`]: factor space, trials, proportion weights.
//! - [`rules`]: transition rule vocabulary and the rule engine.
//! - [`pool`]: N-dimensional demand table.
//! - [`sequencer`]: backtracking sequencer, boundary extension, config.
//! - [`diagnostics`]: debug summaries of pool state.
//!
//! # Example
//!
//! ```
//! use counterbalance::{create_trial_sequence, SequenceConfig, TransitionRule};
//!
//! let config = SequenceConfig::new(vec![2, 2])
//!     .with_rules(vec![TransitionRule::Unconstrained, TransitionRule::identical(1, 0)])
//!     .with_seed(3);
//! let trials = create_trial_sequence(&config).unwrap();
//! assert_eq!(trials.len(), 4);
//! for w in trials.windows(2) {
//!     assert_eq!(w[1][1], w[0][0]);
//! }
//! ```
//!
//! A call holds no state between invocations; independent calls may run
//! concurrently.

pub mod diagnostics;
pub mod error;
pub mod factors;
pub mod pool;
pub mod random;
pub mod rules;
pub mod sequencer;

pub use error::{ConfigError, GenerationError, Phase};
pub use factors::{FactorSpace, Trial};
pub use rules::{Admissible, TransitionRule};
pub use sequencer::{SequenceConfig, SequenceResult, SequenceRunner};

/// Generates the complete ordered trial list for `config`.
pub fn create_trial_sequence(config: &SequenceConfig) -> Result<Vec<Trial>, GenerationError> {
    SequenceRunner::run(config).map(|r| r.trials)
}
