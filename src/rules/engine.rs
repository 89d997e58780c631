//! Rule validation and per-position level computation.

use super::types::{Admissible, LevelSet, TransitionRule};
use crate::error::{ConfigError, Phase};
use crate::factors::{FactorSpace, Trial};

/// Checks a rule set before any generation starts.
///
/// Fails when there is not exactly one rule per factor, when an
/// `identical`/`different` rule looks back less than one trial or names a
/// factor that does not exist, or when more than one `next` rule appears.
pub fn validate_rules(
    rules: &[TransitionRule],
    space: &FactorSpace,
    phase: Phase,
) -> Result<(), ConfigError> {
    if rules.len() != space.len() {
        return Err(ConfigError::RuleCount {
            phase,
            expected: space.len(),
            found: rules.len(),
        });
    }

    let mut next_rule: Option<usize> = None;
    for (factor, rule) in rules.iter().enumerate() {
        match rule {
            TransitionRule::Identical {
                lag,
                factor: referenced,
            }
            | TransitionRule::Different {
                lag,
                factor: referenced,
            } => {
                if *lag < 1 {
                    return Err(ConfigError::InvalidLag {
                        phase,
                        factor,
                        lag: *lag,
                    });
                }
                if *referenced >= space.len() {
                    return Err(ConfigError::UnknownFactor {
                        phase,
                        factor,
                        referenced: *referenced,
                    });
                }
            }
            TransitionRule::Next { .. } => {
                if let Some(first) = next_rule {
                    return Err(ConfigError::DuplicateNext {
                        phase,
                        first,
                        second: factor,
                    });
                }
                next_rule = Some(factor);
            }
            TransitionRule::Unconstrained | TransitionRule::Custom(_) => {}
        }
    }
    Ok(())
}

/// Computes the admissible levels of every factor at `position`.
///
/// `history[i]` is the trial at position `i`; back-references read
/// `history[position - lag]`. A reference before the start of the history
/// is a configuration fault.
pub fn valid_levels(
    space: &FactorSpace,
    rules: &[TransitionRule],
    history: &[Trial],
    position: usize,
) -> Result<Vec<LevelSet>, ConfigError> {
    rules
        .iter()
        .enumerate()
        .map(|(factor, rule)| factor_levels(space, factor, rule, history, position))
        .collect()
}

fn factor_levels(
    space: &FactorSpace,
    factor: usize,
    rule: &TransitionRule,
    history: &[Trial],
    position: usize,
) -> Result<LevelSet, ConfigError> {
    let count = space.levels(factor);
    let set = match rule {
        TransitionRule::Unconstrained => LevelSet::all(count),
        TransitionRule::Identical {
            lag,
            factor: referenced,
        } => {
            let level = lookup(history, position, *lag, factor, *referenced)?;
            // A reference to a wider factor can name a level this one lacks.
            if level < count {
                LevelSet::forced(level)
            } else {
                LevelSet::none()
            }
        }
        TransitionRule::Different {
            lag,
            factor: referenced,
        } => {
            let excluded = lookup(history, position, *lag, factor, *referenced)?;
            LevelSet::free((0..count).filter(|&l| l != excluded).collect())
        }
        TransitionRule::Next { step } => {
            let previous = lookup(history, position, 1, factor, factor)?;
            LevelSet::forced((previous % count + step % count) % count)
        }
        TransitionRule::Custom(custom) => {
            let visible = &history[..position.min(history.len())];
            match custom.admissible(count, position, visible) {
                Admissible::Level(level) => {
                    check_range(factor, level, count)?;
                    LevelSet::forced(level)
                }
                Admissible::Levels(levels) => {
                    for &level in &levels {
                        check_range(factor, level, count)?;
                    }
                    LevelSet::free(levels)
                }
            }
        }
    };
    Ok(set)
}

/// Level `referenced` held `lag` trials before `position`.
fn lookup(
    history: &[Trial],
    position: usize,
    lag: usize,
    factor: usize,
    referenced: usize,
) -> Result<usize, ConfigError> {
    let index = position
        .checked_sub(lag)
        .filter(|&i| i < history.len())
        .ok_or(ConfigError::InsufficientHistory {
            factor,
            lag,
            available: position.min(history.len()),
        })?;
    history[index]
        .get(referenced)
        .copied()
        .ok_or(ConfigError::TrialShape { position: index })
}

fn check_range(factor: usize, level: usize, levels: usize) -> Result<(), ConfigError> {
    if level < levels {
        Ok(())
    } else {
        Err(ConfigError::LevelOutOfRange {
            factor,
            level,
            levels,
        })
    }
}
