//! Debug diagnostics.
//!
//! Human-readable summaries of pool state, emitted through the `log`
//! facade only when a run has `debug` enabled. Nothing here affects the
//! generated sequence.

use crate::factors::Trial;
use crate::pool::DemandPool;
use crate::rules::LevelSet;
use std::fmt;

/// Snapshot of pool mass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub total: u64,
    pub remaining: u64,
    pub open_cells: usize,
    /// Remaining demand per factor level.
    pub marginals: Vec<Vec<u64>>,
}

impl PoolSummary {
    pub fn of(pool: &DemandPool) -> Self {
        Self {
            total: pool.total(),
            remaining: pool.remaining(),
            open_cells: pool.open_cells(),
            marginals: pool.marginals(),
        }
    }
}

impl fmt::Display for PoolSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pool {}/{} remaining in {} open cells",
            self.remaining, self.total, self.open_cells
        )?;
        for (factor, m) in self.marginals.iter().enumerate() {
            write!(f, "; f{factor}={m:?}")?;
        }
        Ok(())
    }
}

/// Debug tracer carried through one generation call.
#[derive(Debug, Clone, Copy)]
pub struct Tracer {
    enabled: bool,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn pool(&self, label: &str, pool: &DemandPool) {
        if self.enabled {
            log::debug!("{label}: {}", PoolSummary::of(pool));
        }
    }

    pub fn seed(&self, seed: &Trial) {
        if self.enabled {
            log::debug!("seed trial {seed:?}");
        }
    }

    pub fn pick(&self, position: usize, trial: &Trial, valid: &[LevelSet], draws: usize) {
        if self.enabled {
            let valid: Vec<&[usize]> = valid.iter().map(LevelSet::as_slice).collect();
            log::trace!("position {position}: picked {trial:?} from {valid:?} in {draws} draws");
        }
    }

    pub fn retry(&self, position: usize, local_tries: usize, admissible_mass: u64) {
        if self.enabled {
            log::debug!(
                "dead end at position {position} (admissible mass {admissible_mass}); \
                 retry {local_tries}"
            );
        }
    }

    pub fn message(&self, msg: fmt::Arguments<'_>) {
        if self.enabled {
            log::debug!("{msg}");
        }
    }
}
