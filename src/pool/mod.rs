//! Demand pool.
//!
//! An N-dimensional table with one cell per full combination of factor
//! levels, holding how many more times that combination must occur. Cells
//! are stored flat in row-major order over the factor space.
//!
//! Initial demand of a cell is the product of its per-factor level weights
//! times `sets`; the sequence length is the sum over all cells.

use crate::error::{ConfigError, GenerationError};
use crate::factors::FactorSpace;

/// Remaining-occurrence counts for every level combination.
///
/// # Examples
///
/// ```
/// use counterbalance::factors::FactorSpace;
/// use counterbalance::pool::DemandPool;
///
/// let space = FactorSpace::new(vec![2]).unwrap();
/// let mut pool = DemandPool::build(&space, &[vec![2, 1]], 1).unwrap();
/// assert_eq!(pool.total(), 3);
/// pool.consume(&[0]).unwrap();
/// assert_eq!(pool.demand(&[0]), 1);
/// assert_eq!(pool.remaining(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandPool {
    dims: Vec<usize>,
    strides: Vec<usize>,
    initial: Vec<u64>,
    cells: Vec<u64>,
    total: u64,
    remaining: u64,
}

impl DemandPool {
    /// Builds the pool from normalized per-factor weights.
    ///
    /// Every cell starts at one, is multiplied by the weight of its level on
    /// each factor, then by `sets`.
    pub fn build(space: &FactorSpace, weights: &[Vec<u32>], sets: u32) -> Result<Self, ConfigError> {
        if sets == 0 {
            return Err(ConfigError::ZeroSets);
        }
        if weights.len() != space.len() {
            return Err(ConfigError::ProportionCount {
                expected: space.len(),
                found: weights.len(),
            });
        }
        for (factor, w) in weights.iter().enumerate() {
            if w.len() != space.levels(factor) {
                return Err(ConfigError::WeightCount {
                    factor,
                    expected: space.levels(factor),
                    found: w.len(),
                });
            }
        }

        let dims = space.as_slice().to_vec();
        let strides = row_major_strides(&dims);
        let mut cells = vec![1u64; space.cell_count()];

        for (factor, w) in weights.iter().enumerate() {
            for (index, cell) in cells.iter_mut().enumerate() {
                let level = (index / strides[factor]) % dims[factor];
                *cell = cell
                    .checked_mul(u64::from(w[level]))
                    .ok_or(ConfigError::DemandOverflow)?;
            }
        }
        let mut total = 0u64;
        for cell in cells.iter_mut() {
            *cell = cell
                .checked_mul(u64::from(sets))
                .ok_or(ConfigError::DemandOverflow)?;
            total = total
                .checked_add(*cell)
                .ok_or(ConfigError::DemandOverflow)?;
        }

        Ok(Self {
            dims,
            strides,
            initial: cells.clone(),
            cells,
            total,
            remaining: total,
        })
    }

    /// Flat index of a coordinate tuple.
    pub fn index(&self, trial: &[usize]) -> usize {
        trial.iter().zip(&self.strides).map(|(&l, &s)| l * s).sum()
    }

    /// Remaining demand of one cell.
    pub fn demand(&self, trial: &[usize]) -> u64 {
        self.cells[self.index(trial)]
    }

    /// Decrements the cell addressed by `trial` by one.
    pub fn consume(&mut self, trial: &[usize]) -> Result<(), GenerationError> {
        let index = self.index(trial);
        let cell = &mut self.cells[index];
        if *cell == 0 {
            return Err(GenerationError::PoolUnderflow {
                cell: trial.to_vec(),
            });
        }
        *cell -= 1;
        self.remaining -= 1;
        Ok(())
    }

    /// Restores every cell to its initial demand.
    pub fn reset(&mut self) {
        self.cells.copy_from_slice(&self.initial);
        self.remaining = self.total;
    }

    /// Sum of initial demand; the length of the pool-backed sequence.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Demand not yet consumed.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether every cell has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Number of cells that still have demand.
    pub fn open_cells(&self) -> usize {
        self.cells.iter().filter(|&&c| c > 0).count()
    }

    /// Total demand over the cross product of `levels` (one slice per factor).
    pub fn mass_within(&self, levels: &[&[usize]]) -> u64 {
        let mut mass = 0u64;
        self.for_each_within(levels, |c| {
            mass += c;
            true
        });
        mass
    }

    /// Whether any cell inside the cross product of `levels` has demand.
    pub fn any_within(&self, levels: &[&[usize]]) -> bool {
        let mut found = false;
        self.for_each_within(levels, |c| {
            found = c > 0;
            !found
        });
        found
    }

    /// Remaining demand summed per factor level.
    pub fn marginals(&self) -> Vec<Vec<u64>> {
        let mut out: Vec<Vec<u64>> = self.dims.iter().map(|&d| vec![0; d]).collect();
        for (index, &c) in self.cells.iter().enumerate() {
            if c == 0 {
                continue;
            }
            for (factor, m) in out.iter_mut().enumerate() {
                m[(index / self.strides[factor]) % self.dims[factor]] += c;
            }
        }
        out
    }

    /// Visits cell values inside the cross product until `visit` returns false.
    fn for_each_within<F: FnMut(u64) -> bool>(&self, levels: &[&[usize]], mut visit: F) {
        if levels.len() != self.dims.len() || levels.iter().any(|l| l.is_empty()) {
            return;
        }
        let mut cursor = vec![0usize; levels.len()];
        loop {
            let index: usize = cursor
                .iter()
                .enumerate()
                .map(|(f, &k)| levels[f][k] * self.strides[f])
                .sum();
            if !visit(self.cells[index]) {
                return;
            }
            // Odometer increment, last factor fastest.
            let mut f = levels.len();
            loop {
                if f == 0 {
                    return;
                }
                f -= 1;
                cursor[f] += 1;
                if cursor[f] < levels[f].len() {
                    break;
                }
                cursor[f] = 0;
            }
        }
    }
}

fn row_major_strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; dims.len()];
    for f in (0..dims.len().saturating_sub(1)).rev() {
        strides[f] = strides[f + 1] * dims[f + 1];
    }
    strides
}
