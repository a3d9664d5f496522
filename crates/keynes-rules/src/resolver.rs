//! Round resolution: submissions in, [`RoundResult`] out.

use std::collections::HashMap;

use keynes_protocol::{ChoiceRecord, Player, PlayerId, PointChange, RoundResult};

use crate::constants::{EXACT_HIT_EPSILON, EXACT_HIT_LOSS, LOSS, MAX_CHOICE, MIN_CHOICE, TARGET_RATIO};
use crate::RuleSet;

/// One active player's entry for the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub player_id: PlayerId,
    pub name: String,
    pub choice: Option<u8>,
}

impl Submission {
    pub fn new(player_id: PlayerId, name: impl Into<String>, choice: Option<u8>) -> Self {
        Self {
            player_id,
            name: name.into(),
            choice,
        }
    }
}

impl From<&Player> for Submission {
    fn from(player: &Player) -> Self {
        Self::new(player.id, player.name.clone(), player.choice)
    }
}

/// Resolves one round.
///
/// `submissions` holds one entry per *active* player, in seating order;
/// eliminated players must not be passed in. `eliminated_count` is the
/// number of players out before this round is applied and decides which
/// rules are in force.
///
/// The result has exactly one [`ChoiceRecord`] and one [`PointChange`]
/// per submission, in the same order.
pub fn resolve_round(submissions: &[Submission], eliminated_count: usize) -> RoundResult {
    let rules = RuleSet::for_eliminated(eliminated_count);

    let mut choices: Vec<ChoiceRecord> = submissions
        .iter()
        .map(|s| ChoiceRecord {
            player_id: s.player_id,
            name: s.name.clone(),
            choice: s.choice,
            is_valid: s.choice.is_some_and(|c| (MIN_CHOICE..=MAX_CHOICE).contains(&c)),
        })
        .collect();

    if rules.duplicates_invalid {
        let mut counts: HashMap<u8, usize> = HashMap::new();
        for c in choices.iter().filter_map(|r| r.choice) {
            *counts.entry(c).or_default() += 1;
        }
        for record in &mut choices {
            if record.choice.is_some_and(|c| counts[&c] > 1) {
                record.is_valid = false;
            }
        }
    }

    let valid: Vec<(PlayerId, u8)> = choices
        .iter()
        .filter(|r| r.is_valid)
        .filter_map(|r| r.choice.map(|c| (r.player_id, c)))
        .collect();

    let average = if valid.is_empty() {
        0.0
    } else {
        let sum: u32 = valid.iter().map(|(_, c)| u32::from(*c)).sum();
        f64::from(sum) / valid.len() as f64
    };
    let target = average * TARGET_RATIO;

    let mut winner = None;
    let mut zero_hundred_rule = false;

    if submissions.len() == 2 && rules.hundred_beats_zero {
        let chose_zero = valid.iter().any(|(_, c)| *c == 0);
        let chose_hundred = valid.iter().find(|(_, c)| *c == 100);
        if let (true, Some((id, _))) = (chose_zero, chose_hundred) {
            winner = Some((*id, 100u8));
            zero_hundred_rule = true;
        }
    }

    if winner.is_none() {
        winner = closest_unique(&valid, target);
    }

    let exact_hit = winner
        .is_some_and(|(_, c)| (f64::from(c) - target).abs() < EXACT_HIT_EPSILON);
    let loss = if rules.exact_hit_doubles_loss && exact_hit {
        EXACT_HIT_LOSS
    } else {
        LOSS
    };

    let winner = winner.map(|(id, _)| id);
    let point_changes = submissions
        .iter()
        .map(|s| PointChange {
            player_id: s.player_id,
            change: if Some(s.player_id) == winner { 0 } else { loss },
        })
        .collect();

    RoundResult {
        average,
        target,
        winner,
        choices,
        point_changes,
        exact_hit,
        zero_hundred_rule,
    }
}

/// The single valid choice nearest to `target`. Two or more at the same
/// minimum distance means nobody wins.
fn closest_unique(valid: &[(PlayerId, u8)], target: f64) -> Option<(PlayerId, u8)> {
    let mut best = f64::INFINITY;
    let mut leaders: Vec<(PlayerId, u8)> = Vec::new();

    for &(id, c) in valid {
        let diff = (f64::from(c) - target).abs();
        if diff < best {
            best = diff;
            leaders.clear();
            leaders.push((id, c));
        } else if diff == best {
            leaders.push((id, c));
        }
    }

    match leaders.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}
