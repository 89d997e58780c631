//! Random sampling helpers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draws an index with probability proportional to its weight.
///
/// Returns `None` when `weights` is empty or sums to zero.
///
/// # Examples
///
/// ```
/// use counterbalance::random::{create_rng, proportional_index};
///
/// let mut rng = create_rng(7);
/// let i = proportional_index(&[0, 5, 0], &mut rng);
/// assert_eq!(i, Some(1));
/// ```
pub fn proportional_index<R: Rng + ?Sized>(weights: &[u64], rng: &mut R) -> Option<usize> {
    let total: u64 = weights.iter().sum();
    if total == 0 {
        return None;
    }
    let pick = rng.random_range(0..total);
    let mut steps = 0u64;
    for (i, &w) in weights.iter().enumerate() {
        steps += w;
        if pick < steps {
            return Some(i);
        }
    }
    None
}

/// Draws an index uniformly from `0..len`. `None` when `len == 0`.
pub fn uniform_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(rng.random_range(0..len))
    }
}
