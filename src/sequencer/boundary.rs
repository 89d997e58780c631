//! Boundary extension: rule-constrained trials outside the demand pool.
//!
//! Free factors are drawn uniformly among the currently admissible levels;
//! proportions and pool demand play no part here.

use crate::error::{ConfigError, GenerationError, Phase};
use crate::factors::{FactorSpace, Trial};
use crate::random::uniform_index;
use crate::rules::{valid_levels, validate_rules, LevelSet, TransitionRule};
use rand::Rng;

/// Adds `count` trials before `sequence`.
///
/// The sequence is reversed, extended at its end, and reversed back, so
/// rule back-references in `rules` read from the trial nearest the
/// boundary outward: `Identical { lag: 1, .. }` on a prepended trial refers
/// to the trial right after it, not to the one before it.
pub fn prepend<R: Rng + ?Sized>(
    sequence: &[Trial],
    count: usize,
    rules: &[TransitionRule],
    space: &FactorSpace,
    rng: &mut R,
) -> Result<Vec<Trial>, GenerationError> {
    if count == 0 {
        return Ok(sequence.to_vec());
    }
    validate_rules(rules, space, Phase::Prepend)?;
    check_shape(sequence, space)?;
    let mut reversed: Vec<Trial> = sequence.iter().rev().cloned().collect();
    extend(&mut reversed, count, rules, space, Phase::Prepend, rng)?;
    reversed.reverse();
    Ok(reversed)
}

/// Adds `count` trials after `sequence`.
pub fn append<R: Rng + ?Sized>(
    sequence: &[Trial],
    count: usize,
    rules: &[TransitionRule],
    space: &FactorSpace,
    rng: &mut R,
) -> Result<Vec<Trial>, GenerationError> {
    if count == 0 {
        return Ok(sequence.to_vec());
    }
    validate_rules(rules, space, Phase::Append)?;
    check_shape(sequence, space)?;
    let mut list = sequence.to_vec();
    extend(&mut list, count, rules, space, Phase::Append, rng)?;
    Ok(list)
}

fn check_shape(sequence: &[Trial], space: &FactorSpace) -> Result<(), ConfigError> {
    match sequence.iter().position(|trial| !space.contains(trial)) {
        Some(position) => Err(ConfigError::TrialShape { position }),
        None => Ok(()),
    }
}

fn extend<R: Rng + ?Sized>(
    list: &mut Vec<Trial>,
    count: usize,
    rules: &[TransitionRule],
    space: &FactorSpace,
    phase: Phase,
    rng: &mut R,
) -> Result<(), GenerationError> {
    list.reserve(count);
    for _ in 0..count {
        let position = list.len();
        let valid = valid_levels(space, rules, list.as_slice(), position)?;
        let trial = pick_uniform(&valid, rng).ok_or(GenerationError::UnsatisfiableConstraints {
            phase,
            position,
            remaining_mass: 0,
            admissible_mass: 0,
            restarts: 0,
        })?;
        list.push(trial);
    }
    Ok(())
}

/// One level per factor: forced levels as given, free ones uniformly.
fn pick_uniform<R: Rng + ?Sized>(valid: &[LevelSet], rng: &mut R) -> Option<Trial> {
    valid
        .iter()
        .map(|set| match set.forced_level() {
            Some(level) => Some(level),
            None => uniform_index(set.len(), rng).map(|i| set.as_slice()[i]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    fn space(levels: &[usize]) -> FactorSpace {
        FactorSpace::new(levels.to_vec()).unwrap()
    }

    #[test]
    fn test_zero_count_is_identity() {
        let mut rng = create_rng(1);
        let list = vec![vec![0, 0], vec![1, 1]];
        let rules = TransitionRule::unconstrained_set(2);
        assert_eq!(prepend(&list, 0, &rules, &space(&[2, 2]), &mut rng).unwrap(), list);
        assert_eq!(append(&list, 0, &rules, &space(&[2, 2]), &mut rng).unwrap(), list);
    }

    #[test]
    fn test_zero_count_skips_validation() {
        let mut rng = create_rng(1);
        let list = vec![vec![0, 0]];
        let bad = vec![TransitionRule::identical(0, 0)];
        assert!(append(&list, 0, &bad, &space(&[2, 2]), &mut rng).is_ok());
    }

    #[test]
    fn test_append_adds_trials() {
        let mut rng = create_rng(2);
        let list = vec![vec![0, 0], vec![1, 1]];
        let rules = TransitionRule::unconstrained_set(2);
        let out = append(&list, 3, &rules, &space(&[2, 2]), &mut rng).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(&out[..2], &list[..]);
    }

    #[test]
    fn test_prepend_reads_reversed_history() {
        let mut rng = create_rng(3);
        let list = vec![vec![0, 1], vec![1, 0], vec![0, 0]];
        let rules = vec![TransitionRule::identical(1, 1), TransitionRule::Unconstrained];
        let out = prepend(&list, 1, &rules, &space(&[2, 2]), &mut rng).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(&out[1..], &list[..]);
        // Nearest trial is the input's first one, whose factor 1 is 1.
        assert_eq!(out[0][0], 1);
    }

    #[test]
    fn test_prepend_chains_outward() {
        let mut rng = create_rng(4);
        let list = vec![vec![0]];
        let rules = vec![TransitionRule::next(1)];
        let out = prepend(&list, 3, &rules, &space(&[3]), &mut rng).unwrap();
        assert_eq!(out, vec![vec![0], vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn test_append_different_rule() {
        let mut rng = create_rng(5);
        let list = vec![vec![1]];
        let rules = vec![TransitionRule::different(1, 0)];
        let out = append(&list, 4, &rules, &space(&[2]), &mut rng).unwrap();
        assert_eq!(out, vec![vec![1], vec![0], vec![1], vec![0], vec![1]]);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let mut rng = create_rng(6);
        let list = vec![vec![0, 0]];
        let rules = vec![TransitionRule::next(1), TransitionRule::next(1)];
        let err = prepend(&list, 1, &rules, &space(&[2, 2]), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Configuration(ConfigError::DuplicateNext {
                phase: Phase::Prepend,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_admissible_set_fails() {
        let mut rng = create_rng(7);
        let list = vec![vec![0]];
        let rules = vec![TransitionRule::different(1, 0)];
        let err = append(&list, 1, &rules, &space(&[1]), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            GenerationError::UnsatisfiableConstraints {
                phase: Phase::Append,
                position: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_input_trials_rejected() {
        let mut rng = create_rng(8);
        let rules = vec![TransitionRule::Unconstrained, TransitionRule::identical(1, 1)];
        let s = space(&[2, 2]);
        assert_eq!(
            append(&[vec![0]], 1, &rules, &s, &mut rng),
            Err(GenerationError::Configuration(ConfigError::TrialShape { position: 0 }))
        );
        assert_eq!(
            prepend(&[vec![0, 1], vec![0, 2]], 1, &rules, &s, &mut rng),
            Err(GenerationError::Configuration(ConfigError::TrialShape { position: 1 }))
        );
    }
}
