//! The rule table.
//!
//! Rules unlock as players drop out. Whether a rule is in force is a
//! function of the eliminated count *before* the current round is
//! applied, and it is recomputed for every round; nothing is cached.

/// One escalating rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub id: u8,
    pub description: &'static str,
    /// Eliminated players needed for the rule to apply.
    pub threshold: usize,
}

impl Rule {
    /// Returns `true` if the rule applies with `eliminated_count`
    /// players out.
    pub fn is_active(&self, eliminated_count: usize) -> bool {
        eliminated_count >= self.threshold
    }
}

/// The three rules, in the order they unlock.
pub const RULES: [Rule; 3] = [
    Rule {
        id: 1,
        description: "If two or more players choose the same number, their choice becomes invalid.",
        threshold: 1,
    },
    Rule {
        id: 2,
        description: "Choosing the exact correct number will cause other players to lose two points instead of one.",
        threshold: 2,
    },
    Rule {
        id: 3,
        description: "If one player chooses 0, another player can win by choosing 100.",
        threshold: 3,
    },
];

/// Rules in force for `eliminated_count`.
pub fn active_rules(eliminated_count: usize) -> impl Iterator<Item = &'static Rule> {
    RULES.iter().filter(move |r| r.is_active(eliminated_count))
}

/// Rules that were not in force at `before` but are at `after`.
pub fn newly_active_rules(before: usize, after: usize) -> impl Iterator<Item = &'static Rule> {
    RULES
        .iter()
        .filter(move |r| !r.is_active(before) && r.is_active(after))
}

/// The rule table evaluated for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleSet {
    /// Rule 1: numbers picked by two or more players are void.
    pub duplicates_invalid: bool,
    /// Rule 2: an exact hit doubles everyone else's loss.
    pub exact_hit_doubles_loss: bool,
    /// Rule 3: head-to-head, 100 beats 0.
    pub hundred_beats_zero: bool,
}

impl RuleSet {
    pub fn for_eliminated(eliminated_count: usize) -> Self {
        Self {
            duplicates_invalid: RULES[0].is_active(eliminated_count),
            exact_hit_doubles_loss: RULES[1].is_active(eliminated_count),
            hundred_beats_zero: RULES[2].is_active(eliminated_count),
        }
    }
}
