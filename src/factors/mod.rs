//! Factor space model and proportion weights.
//!
//! A factor is an experimental dimension with a fixed number of discrete
//! levels. Proportion weights set how often each level occurs relative to
//! the others; undeclared factors are uniform.

mod proportions;
mod space;

pub use proportions::{normalize_proportions, validate_proportions, Proportions};
pub use space::{FactorSpace, Trial};
