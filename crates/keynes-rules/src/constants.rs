//! Scoring constants.

/// Seats per room. Latecomers beyond this become spectators.
pub const MAX_PLAYERS: usize = 5;

/// Players needed before the host can start.
pub const MIN_PLAYERS: usize = 2;

/// Score every player starts with.
pub const STARTING_SCORE: i32 = 0;

/// A player at or below this score is eliminated.
pub const ELIMINATION_SCORE: i32 = -10;

/// The game ends once this many (or fewer) players remain active.
pub const WINNING_PLAYER_COUNT: usize = 1;

/// The target is this fraction of the average.
pub const TARGET_RATIO: f64 = 0.8;

/// Distance below which a winning choice counts as an exact hit.
pub const EXACT_HIT_EPSILON: f64 = 1e-3;

/// Lowest number a player may choose.
pub const MIN_CHOICE: u8 = 0;

/// Highest number a player may choose.
pub const MAX_CHOICE: u8 = 100;

/// Points a losing player normally gives up.
pub const LOSS: i32 = -1;

/// Points a losing player gives up when the exact-hit rule applies.
pub const EXACT_HIT_LOSS: i32 = -2;
