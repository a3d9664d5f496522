//! Game rules for Keynes.
//!
//! Everything in this crate is pure: no I/O, no clocks, no shared
//! state. Given the same inputs the functions always return the same
//! output, which is what lets the room layer resolve a round from either
//! a timer or a player action without caring which one fired.
//!
//! # Key items
//!
//! - [`RULES`] / [`RuleSet`] - the three escalating rules and which of
//!   them are in force for a given eliminated count
//! - [`resolve_round`] - turns a round's submissions into a
//!   [`RoundResult`](keynes_protocol::RoundResult)
//! - [`constants`] - scoring constants shared with the room layer

pub mod constants;
mod resolver;
mod rule;

pub use resolver::{resolve_round, Submission};
pub use rule::{active_rules, newly_active_rules, Rule, RuleSet, RULES};
