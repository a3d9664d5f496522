//! The per-room snapshot: players, spectators, phase, timer and the
//! last round's result.
//!
//! A [`GameState`] is what every member of a room sees. The room actor
//! owns the only mutable copy and broadcasts a clone after each change.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomId};

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// A seated participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: i32,
    /// This round's number, `None` until submitted. Cleared whenever a
    /// new round starts.
    pub choice: Option<u8>,
    pub is_eliminated: bool,
    pub is_winner: bool,
    pub is_host: bool,
}

impl Player {
    /// A fresh player with the given starting score.
    pub fn new(id: PlayerId, name: impl Into<String>, score: i32, is_host: bool) -> Self {
        Self {
            id,
            name: name.into(),
            score,
            choice: None,
            is_eliminated: false,
            is_winner: false,
            is_host,
        }
    }

    /// Not yet eliminated.
    pub fn is_active(&self) -> bool {
        !self.is_eliminated
    }
}

/// A watcher. Spectators receive snapshots but cannot act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spectator {
    pub id: PlayerId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a room is in its lifecycle.
///
/// ```text
/// Lobby → Introduction → Choosing → Results ─┬→ Choosing
///                                            ├→ GameOver
///                                            └→ GameClear
/// ```
///
/// `GameOver` and `GameClear` are terminal until the host restarts,
/// which returns the room to `Lobby`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    #[default]
    Lobby,
    Introduction,
    Choosing,
    Results,
    /// Nobody survived (the last players were eliminated together, or
    /// everyone left).
    GameOver,
    /// Exactly one player survived and is marked the winner.
    GameClear,
}

impl GamePhase {
    /// Returns `true` if newcomers are seated as players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` from the introduction until the game ends.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Introduction | Self::Choosing | Self::Results)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Lobby => "LOBBY",
            Self::Introduction => "INTRODUCTION",
            Self::Choosing => "CHOOSING",
            Self::Results => "RESULTS",
            Self::GameOver => "GAME_OVER",
            Self::GameClear => "GAME_CLEAR",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Round result
// ---------------------------------------------------------------------------

/// How one active player's submission was judged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub player_id: PlayerId,
    pub name: String,
    pub choice: Option<u8>,
    /// `false` for a missing choice or one voided by the duplicate rule.
    pub is_valid: bool,
}

/// Score delta for one active player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointChange {
    pub player_id: PlayerId,
    pub change: i32,
}

/// The outcome of one round. Produced once, applied once, then kept for
/// display until the next round begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Mean of the valid choices, 0 when there are none.
    pub average: f64,
    /// `average * 0.8`.
    pub target: f64,
    /// At most one winner; a tie leaves this empty.
    pub winner: Option<PlayerId>,
    pub choices: Vec<ChoiceRecord>,
    pub point_changes: Vec<PointChange>,
    pub exact_hit: bool,
    pub zero_hundred_rule: bool,
}

impl RoundResult {
    /// The delta for `player_id`, if they took part in the round.
    pub fn change_for(&self, player_id: PlayerId) -> Option<i32> {
        self.point_changes
            .iter()
            .find(|c| c.player_id == player_id)
            .map(|c| c.change)
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The authoritative snapshot of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub room_id: RoomId,
    /// Seating order. The first player is host unless the host left.
    pub players: Vec<Player>,
    pub spectators: Vec<Spectator>,
    pub phase: GamePhase,
    /// 1-based round counter.
    pub round: u32,
    /// Seconds left in the current round.
    pub timer: u32,
    pub results: Option<RoundResult>,
    /// Set when the last applied round eliminated someone, i.e. a new
    /// rule may now be in force. Starts `true` so the first round is
    /// played with the long timer while the rules are introduced.
    pub new_rule_introduced: bool,
}

impl GameState {
    /// An empty lobby whose first round will last `first_round_secs`.
    pub fn new(room_id: RoomId, first_round_secs: u32) -> Self {
        Self {
            room_id,
            players: Vec::new(),
            spectators: Vec::new(),
            phase: GamePhase::Lobby,
            round: 1,
            timer: first_round_secs,
            results: None,
            new_rule_introduced: true,
        }
    }

    /// Players still in the game, in seating order.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active_players().count()
    }

    pub fn eliminated_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_eliminated).count()
    }

    /// The current host, if anyone is seated.
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Seated or watching.
    pub fn is_member(&self, id: PlayerId) -> bool {
        self.player(id).is_some() || self.spectators.iter().any(|s| s.id == id)
    }

    /// No players and no spectators.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.spectators.is_empty()
    }

    /// Every member's id, players first. This is the broadcast audience.
    pub fn member_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players
            .iter()
            .map(|p| p.id)
            .chain(self.spectators.iter().map(|s| s.id))
    }
}
