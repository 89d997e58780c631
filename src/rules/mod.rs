//! Transition rules.
//!
//! A rule constrains which levels of one factor are admissible at a trial
//! position, given the trials before it:
//!
//! - **Unconstrained**: any level.
//! - **Identical(x, y)**: the level factor `y` held `x` trials earlier.
//! - **Different(x, y)**: any level except that one.
//! - **Next(step)**: the factor's own previous level advanced by `step`,
//!   wrapping at the level count. At most one per rule set.
//! - **Custom**: a user function returning one level or a set.
//!
//! The same engine serves the pool-backed sequencer and the boundary
//! extender.

mod engine;
mod types;

pub use engine::{valid_levels, validate_rules};
pub use types::{Admissible, CustomFn, CustomRule, LevelSet, TransitionRule};
