//! Backtracking sequencer.
//!
//! Builds the pool-backed core of a trial sequence one position at a time:
//!
//! 1. Draw a seed trial in proportion to the level weights and consume it.
//! 2. At each position, ask the rule engine for admissible levels and check
//!    that the pool still has demand inside their cross product.
//! 3. If so, sample candidates until one hits a cell with demand, consume
//!    it, and advance.
//! 4. If not, restart from the same seed; after too many dead ends draw a
//!    new seed; after too many seeds give up.
//!
//! The core is then extended with prepended and appended boundary trials
//! that obey their own rule sets but draw nothing from the pool.

mod boundary;
mod config;
mod runner;

pub use boundary::{append, prepend};
pub use config::{
    FeasibilityScope, SearchLimits, SequenceConfig, MAX_PICKER_ATTEMPTS, MAX_RESTART_ATTEMPTS,
    MAX_RETRY_ATTEMPTS,
};
pub use runner::{SequenceResult, SequenceRunner};
