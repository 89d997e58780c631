//! Backtracking sequencer and top-level orchestration.

use super::boundary::{append, prepend};
use super::config::{FeasibilityScope, SearchLimits, SequenceConfig};
use crate::diagnostics::Tracer;
use crate::error::{ConfigError, GenerationError, Phase};
use crate::factors::{FactorSpace, Proportions, Trial};
use crate::pool::DemandPool;
use crate::random::{create_rng, proportional_index};
use crate::rules::{valid_levels, LevelSet, TransitionRule};
use rand::Rng;
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceResult {
    /// Complete ordered sequence, boundary trials included.
    pub trials: Vec<Trial>,

    /// Positions of the pool-backed core inside `trials`.
    pub core: Range<usize>,

    /// Dead ends hit across all seeds.
    pub retries: usize,

    /// New seeds drawn after a seed ran out of retries.
    pub restarts: usize,

    /// Picker draws spent on the returned core.
    pub draws: usize,
}

impl SequenceResult {
    /// The pool-backed portion of the sequence.
    pub fn core_trials(&self) -> &[Trial] {
        &self.trials[self.core.clone()]
    }
}

/// Generates counterbalanced trial sequences.
///
/// # Usage
///
/// ```
/// use counterbalance::sequencer::{SequenceConfig, SequenceRunner};
///
/// let config = SequenceConfig::new(vec![2, 2]).with_sets(2).with_seed(42);
/// let result = SequenceRunner::run(&config).unwrap();
/// assert_eq!(result.trials.len(), 8);
/// ```
pub struct SequenceRunner;

impl SequenceRunner {
    /// Runs one generation call with the configured (or a random) seed.
    pub fn run(config: &SequenceConfig) -> Result<SequenceResult, GenerationError> {
        let mut rng = match config.seed {
            Some(seed) => create_rng(seed),
            None => create_rng(rand::random()),
        };
        Self::run_with_rng(config, &mut rng)
    }

    /// Runs one generation call drawing from `rng`.
    ///
    /// Every configuration check completes before the first draw.
    pub fn run_with_rng<R: Rng + ?Sized>(
        config: &SequenceConfig,
        rng: &mut R,
    ) -> Result<SequenceResult, GenerationError> {
        config.validate()?;

        let space = config.factor_space()?;
        let proportions = Proportions::new(&config.proportions, &space)?;
        let mut pool = DemandPool::build(&space, proportions.all(), config.sets)?;
        check_core_length(&pool)?;
        let tracer = Tracer::new(config.debug);
        tracer.pool("initial", &pool);

        let context = Generation {
            space: &space,
            proportions: &proportions,
            rules: &config.rules,
            limits: config.limits,
            scope: config.feasibility,
            full_levels: space.as_slice().iter().map(|&l| (0..l).collect()).collect(),
            tracer,
        };
        let core = context.sequence(&mut pool, rng)?;
        tracer.pool("final", &pool);

        let core_len = core.trials.len();
        let trials = prepend(
            &core.trials,
            config.prepend_count,
            &config.prepend_rules,
            &space,
            rng,
        )?;
        let trials = append(
            &trials,
            config.append_count,
            &config.append_rules,
            &space,
            rng,
        )?;
        tracer.message(format_args!(
            "sequence complete: {} trials ({} prepended, {} core, {} appended)",
            trials.len(),
            config.prepend_count,
            core_len,
            config.append_count
        ));

        Ok(SequenceResult {
            trials,
            core: config.prepend_count..config.prepend_count + core_len,
            retries: core.retries,
            restarts: core.restarts,
            draws: core.draws,
        })
    }

    /// Generates `count` independent sequences.
    ///
    /// Sequence `i` uses seed `base + i`, where `base` is the configured seed
    /// or a random one. Runs in parallel with the `parallel` feature.
    pub fn run_batch(
        config: &SequenceConfig,
        count: usize,
    ) -> Result<Vec<SequenceResult>, GenerationError> {
        config.validate()?;
        let base = config.seed.unwrap_or_else(rand::random);
        let one = |i: usize| {
            let mut rng = create_rng(base.wrapping_add(i as u64));
            Self::run_with_rng(config, &mut rng)
        };

        #[cfg(feature = "parallel")]
        {
            (0..count).into_par_iter().map(one).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            (0..count).map(one).collect()
        }
    }
}

/// Rejects pools whose core could never fit in a `Vec<Trial>`.
fn check_core_length(pool: &DemandPool) -> Result<(), ConfigError> {
    let limit = isize::MAX as usize / std::mem::size_of::<Trial>();
    match usize::try_from(pool.total()) {
        Ok(total) if total <= limit => Ok(()),
        _ => Err(ConfigError::DemandOverflow),
    }
}

/// Pool-backed core of one call.
struct Core {
    trials: Vec<Trial>,
    retries: usize,
    restarts: usize,
    draws: usize,
}

/// Everything one generation attempt reads; the pool is passed separately
/// because it is the only mutable state.
struct Generation<'a> {
    space: &'a FactorSpace,
    proportions: &'a Proportions,
    rules: &'a [TransitionRule],
    limits: SearchLimits,
    scope: FeasibilityScope,
    full_levels: Vec<Vec<usize>>,
    tracer: Tracer,
}

impl Generation<'_> {
    /// Runs the seed / check / pick loop until the pool is drained.
    fn sequence<R: Rng + ?Sized>(
        &self,
        pool: &mut DemandPool,
        rng: &mut R,
    ) -> Result<Core, GenerationError> {
        let mut seed = self.draw_seed(rng);
        let mut trials = self.reseed(pool, &seed)?;

        let mut local_tries = 0usize;
        let mut retries = 0usize;
        let mut restarts = 0usize;
        let mut draws = 0usize;

        while !pool.is_exhausted() {
            let position = trials.len();
            let valid = valid_levels(self.space, self.rules, &trials, position)?;
            let scoped = self.scoped(&valid);

            if pool.any_within(&scoped) {
                let (trial, used) = self.pick(pool, &valid, position, rng)?;
                self.tracer.pick(position, &trial, &valid, used);
                pool.consume(&trial)?;
                trials.push(trial);
                draws += used;
                continue;
            }

            let admissible_mass = pool.mass_within(&scoped);
            local_tries += 1;
            retries += 1;
            self.tracer.retry(position, local_tries, admissible_mass);

            if local_tries > self.limits.max_retries {
                local_tries = 0;
                restarts += 1;
                if restarts > self.limits.max_restarts {
                    return Err(GenerationError::UnsatisfiableConstraints {
                        phase: Phase::Main,
                        position,
                        remaining_mass: pool.remaining(),
                        admissible_mass,
                        restarts,
                    });
                }
                log::info!("no valid continuation at position {position}; picking new seed");
                seed = self.draw_seed(rng);
            }
            trials = self.reseed(pool, &seed)?;
            draws = 0;
        }

        Ok(Core {
            trials,
            retries,
            restarts,
            draws,
        })
    }

    /// Restores the pool and starts a fresh sequence from `seed`.
    fn reseed(&self, pool: &mut DemandPool, seed: &Trial) -> Result<Vec<Trial>, GenerationError> {
        pool.reset();
        pool.consume(seed)?;
        self.tracer.seed(seed);
        Ok(vec![seed.clone()])
    }

    /// One level per factor, each drawn in proportion to its weights.
    fn draw_seed<R: Rng + ?Sized>(&self, rng: &mut R) -> Trial {
        (0..self.space.len())
            .map(|factor| {
                let widened: Vec<u64> = self
                    .proportions
                    .weights(factor)
                    .iter()
                    .map(|&x| u64::from(x))
                    .collect();
                // Weights are validated to be >= 1, so a draw always exists.
                proportional_index(&widened, rng).unwrap_or(0)
            })
            .collect()
    }

    /// Admissible levels the feasibility check looks at, per factor.
    fn scoped<'s>(&'s self, valid: &'s [LevelSet]) -> Vec<&'s [usize]> {
        valid
            .iter()
            .enumerate()
            .map(|(factor, set)| match self.scope {
                FeasibilityScope::AllFactors => set.as_slice(),
                FeasibilityScope::WeightedFactors if self.proportions.is_declared(factor) => {
                    set.as_slice()
                }
                FeasibilityScope::WeightedFactors => self.full_levels[factor].as_slice(),
            })
            .collect()
    }

    /// Samples candidate trials until one addresses a cell with demand.
    fn pick<R: Rng + ?Sized>(
        &self,
        pool: &DemandPool,
        valid: &[LevelSet],
        position: usize,
        rng: &mut R,
    ) -> Result<(Trial, usize), GenerationError> {
        let attempts = self.limits.picker_attempts;
        for attempt in 1..=attempts {
            if let Some(trial) = self.sample(valid, rng) {
                if pool.demand(&trial) > 0 {
                    return Ok((trial, attempt));
                }
            }
        }
        Err(GenerationError::ExhaustedAttempts {
            phase: Phase::Main,
            position,
            attempts,
        })
    }

    fn sample<R: Rng + ?Sized>(&self, valid: &[LevelSet], rng: &mut R) -> Option<Trial> {
        valid
            .iter()
            .enumerate()
            .map(|(factor, set)| match set.forced_level() {
                Some(level) => Some(level),
                None => {
                    let weights = self.proportions.restricted(factor, set.as_slice());
                    proportional_index(&weights, rng).map(|i| set.as_slice()[i])
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Admissible;
    use crate::sequencer::MAX_PICKER_ATTEMPTS;
    use std::collections::HashMap;

    /// Always yields zero bits, so every draw lands on its first option.
    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn counts(trials: &[Trial]) -> HashMap<Trial, usize> {
        let mut map = HashMap::new();
        for t in trials {
            *map.entry(t.clone()).or_insert(0) += 1;
        }
        map
    }

    #[test]
    fn test_uniform_sets_balanced() {
        let config = SequenceConfig::new(vec![2, 2]).with_sets(2).with_seed(42);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 8);
        let c = counts(&result.trials);
        assert_eq!(c.len(), 4);
        assert!(c.values().all(|&n| n == 2));
    }

    #[test]
    fn test_proportions_exact() {
        let config = SequenceConfig::new(vec![2])
            .with_proportions(vec![Some(vec![2, 1])])
            .with_seed(1);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 3);
        assert_eq!(result.trials.iter().filter(|t| t[0] == 0).count(), 2);
        assert_eq!(result.trials.iter().filter(|t| t[0] == 1).count(), 1);
    }

    #[test]
    fn test_unequal_proportions_two_factors() {
        let config = SequenceConfig::new(vec![2, 3])
            .with_proportions(vec![Some(vec![3, 1]), Some(vec![1, 1, 1])])
            .with_seed(3);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 12);
        assert_eq!(result.trials.iter().filter(|t| t[0] == 0).count(), 9);
        assert_eq!(result.trials.iter().filter(|t| t[0] == 1).count(), 3);
    }

    #[test]
    fn test_identical_rule_holds() {
        let config = SequenceConfig::new(vec![2, 2])
            .with_rules(vec![
                TransitionRule::Unconstrained,
                TransitionRule::identical(1, 0),
            ])
            .with_seed(11);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 4);
        for w in result.trials.windows(2) {
            assert_eq!(w[1][1], w[0][0]);
        }
    }

    #[test]
    fn test_custom_alternation_rule() {
        let alternate = TransitionRule::custom("alternate", |levels, _position, history| {
            let prev = history.last().map_or(0, |t| t[0]);
            Admissible::Level((prev + 1) % levels)
        });
        let config = SequenceConfig::new(vec![2, 2])
            .with_sets(2)
            .with_rules(vec![alternate, TransitionRule::Unconstrained])
            .with_seed(5);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 8);
        for w in result.trials.windows(2) {
            assert_ne!(w[1][0], w[0][0]);
        }
        assert!(counts(&result.trials).values().all(|&n| n == 2));
    }

    #[test]
    fn test_unsatisfiable_constraints() {
        let config = SequenceConfig::new(vec![2, 2])
            .with_proportions(vec![Some(vec![10, 1]), Some(vec![10, 1])])
            .with_rules(vec![
                TransitionRule::different(1, 1),
                TransitionRule::different(1, 0),
            ])
            .with_seed(9);
        match SequenceRunner::run(&config) {
            Err(GenerationError::UnsatisfiableConstraints {
                phase,
                remaining_mass,
                restarts,
                ..
            }) => {
                assert_eq!(phase, Phase::Main);
                assert!(remaining_mass > 0);
                assert_eq!(restarts, config.limits.max_restarts + 1);
            }
            other => panic!("expected unsatisfiable, got {other:?}"),
        }
    }

    #[test]
    fn test_smaller_limits_fail_sooner() {
        let config = SequenceConfig::new(vec![2, 2])
            .with_proportions(vec![Some(vec![10, 1]), Some(vec![10, 1])])
            .with_rules(vec![
                TransitionRule::different(1, 1),
                TransitionRule::different(1, 0),
            ])
            .with_limits(SearchLimits {
                picker_attempts: 200,
                max_retries: 1,
                max_restarts: 0,
            })
            .with_seed(9);
        assert!(matches!(
            SequenceRunner::run(&config),
            Err(GenerationError::UnsatisfiableConstraints { restarts: 1, .. })
        ));
    }

    #[test]
    fn test_picker_exhaustion_is_not_retried() {
        // Seed takes level 0; the picker then keeps drawing the empty cell.
        let config = SequenceConfig::new(vec![2]);
        let err = SequenceRunner::run_with_rng(&config, &mut ZeroRng).unwrap_err();
        assert_eq!(
            err,
            GenerationError::ExhaustedAttempts {
                phase: Phase::Main,
                position: 1,
                attempts: MAX_PICKER_ATTEMPTS,
            }
        );
    }

    #[test]
    fn test_oversized_demand_rejected_before_sampling() {
        let config = SequenceConfig::new(vec![1])
            .with_proportions(vec![Some(vec![u32::MAX])])
            .with_sets(u32::MAX);
        assert_eq!(
            SequenceRunner::run_with_rng(&config, &mut ZeroRng).unwrap_err(),
            GenerationError::Configuration(ConfigError::DemandOverflow)
        );
    }

    #[test]
    fn test_next_rule_with_huge_step() {
        let config = SequenceConfig::new(vec![2])
            .with_sets(3)
            .with_rules(vec![TransitionRule::next(usize::MAX)])
            .with_seed(12);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 6);
        for w in result.trials.windows(2) {
            assert_ne!(w[1][0], w[0][0]);
        }
    }

    #[test]
    fn test_seed_is_deterministic() {
        let config = SequenceConfig::new(vec![2, 3])
            .with_sets(2)
            .with_append(2, TransitionRule::unconstrained_set(2))
            .with_seed(77);
        let a = SequenceRunner::run(&config).unwrap();
        let b = SequenceRunner::run(&config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_core_range_with_boundaries() {
        let config = SequenceConfig::new(vec![2, 2])
            .with_prepend(2, TransitionRule::unconstrained_set(2))
            .with_append(1, TransitionRule::unconstrained_set(2))
            .with_seed(8);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 7);
        assert_eq!(result.core, 2..6);
        assert_eq!(counts(result.core_trials()).len(), 4);
    }

    #[test]
    fn test_weighted_scope_matches_when_all_declared() {
        let config = SequenceConfig::new(vec![2, 2])
            .with_proportions(vec![Some(vec![1, 2]), Some(vec![1, 1])])
            .with_feasibility(FeasibilityScope::WeightedFactors)
            .with_seed(21);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials.len(), 6);
        assert_eq!(result.trials.iter().filter(|t| t[0] == 1).count(), 4);
    }

    #[test]
    fn test_configuration_error_surfaces() {
        let config = SequenceConfig::new(vec![2, 2]).with_rules(vec![TransitionRule::next(1)]);
        assert!(matches!(
            SequenceRunner::run(&config),
            Err(GenerationError::Configuration(ConfigError::RuleCount { .. }))
        ));
    }

    #[test]
    fn test_history_underflow_in_core() {
        let config = SequenceConfig::new(vec![2, 2])
            .with_rules(vec![
                TransitionRule::identical(2, 1),
                TransitionRule::Unconstrained,
            ])
            .with_seed(4);
        assert!(matches!(
            SequenceRunner::run(&config),
            Err(GenerationError::Configuration(
                ConfigError::InsufficientHistory { lag: 2, .. }
            ))
        ));
    }

    #[test]
    fn test_single_cell_space() {
        let config = SequenceConfig::new(vec![1]).with_sets(3).with_seed(0);
        let result = SequenceRunner::run(&config).unwrap();
        assert_eq!(result.trials, vec![vec![0], vec![0], vec![0]]);
        assert_eq!(result.retries, 0);
    }

    #[test]
    fn test_debug_run_succeeds() {
        let config = SequenceConfig::new(vec![2, 2]).with_debug(true).with_seed(2);
        assert_eq!(SequenceRunner::run(&config).unwrap().trials.len(), 4);
    }

    #[test]
    fn test_run_batch() {
        let config = SequenceConfig::new(vec![2, 2]).with_sets(2).with_seed(100);
        let results = SequenceRunner::run_batch(&config, 4).unwrap();
        assert_eq!(results.len(), 4);
        for r in &results {
            assert_eq!(r.trials.len(), 8);
        }
        let again = SequenceRunner::run_batch(&config, 4).unwrap();
        assert_eq!(results, again);
    }
}
