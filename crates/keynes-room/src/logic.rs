//! The game session state machine.
//!
//! [`Game`] owns one room's [`GameState`] and applies player actions and
//! timer events to it. It never touches a clock or a socket: every
//! operation returns the [`Effect`]s the caller must carry out, in order.
//! The room actor is the only caller in production; tests drive it
//! directly.
//!
//! ```text
//! Lobby ──start──▶ Introduction ──intro delay──▶ Choosing
//!                                                  │ last choice, or timer hits 0
//!                                                  ▼
//!                       Choosing ◀──results delay── Results
//!                                                  │ ≤ 1 active player left
//!                                                  ▼
//!                                       GameOver / GameClear ──restart──▶ Lobby
//! ```
//!
//! Invalid actions are ignored rather than rejected. Round resolution
//! checks the phase first, so a round resolves once no matter whether
//! the last choice or the countdown gets there first.

use std::collections::HashSet;
use std::time::Duration;

use keynes_protocol::{GamePhase, GameState, Player, PlayerId, RoomId, Spectator};
use keynes_rules::constants::{ELIMINATION_SCORE, MAX_CHOICE, STARTING_SCORE, WINNING_PLAYER_COUNT};
use keynes_rules::{active_rules, newly_active_rules, resolve_round, Submission};

use crate::RoomConfig;

/// Something the room actor must do after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Publish the current snapshot to the room's members.
    Broadcast,
    /// (Re)start the one-second countdown. Supersedes a running one.
    StartCountdown,
    StopCountdown,
    /// Run `step` after `after`, replacing any pending step.
    Schedule { after: Duration, step: Step },
    /// Drop the pending step, if any.
    CancelSchedule,
}

/// A delayed phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Introduction is over; open the first round.
    BeginChoosing,
    /// Results have been shown; apply the point changes.
    ApplyResults,
}

/// Where a joining connection ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Player,
    Spectator,
    /// Already a member; nothing changed.
    AlreadyPresent,
}

/// One room's game.
#[derive(Debug, Clone)]
pub struct Game {
    state: GameState,
    config: RoomConfig,
    /// Members restored from a snapshot. They have no connection and give
    /// up their seats to the first live arrival.
    offline: HashSet<PlayerId>,
}

impl Game {
    /// A fresh lobby.
    pub fn new(room_id: RoomId, config: RoomConfig) -> Self {
        let state = GameState::new(room_id, config.round_time_special);
        Self::from_state(state, config)
    }

    /// Resumes from a state, keeping every member as is.
    pub fn from_state(state: GameState, config: RoomConfig) -> Self {
        Self {
            state,
            config,
            offline: HashSet::new(),
        }
    }

    /// Resumes a lobby loaded from a snapshot. Its members are marked
    /// offline until the first live player joins.
    pub fn restored(state: GameState, config: RoomConfig) -> Self {
        let offline = state.member_ids().collect();
        Self { state, config, offline }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn room_id(&self) -> &RoomId {
        &self.state.room_id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Whether any member has a live connection.
    pub fn has_live_members(&self) -> bool {
        self.state.member_ids().any(|id| !self.offline.contains(&id))
    }

    // -----------------------------------------------------------------
    // Player actions
    // -----------------------------------------------------------------

    /// Seats `id` as a player, or as a spectator when the room is full or
    /// a game is under way. Known ids are left alone.
    ///
    /// The first new arrival in a restored room clears out the offline
    /// members first, so it takes over as host.
    pub fn add_player(&mut self, id: PlayerId, name: impl Into<String>) -> (Admission, Vec<Effect>) {
        let mut effects = Vec::new();
        if !self.state.is_member(id) {
            effects.extend(self.evict_offline());
        }

        let admission = self.admit(id, name.into());
        if admission != Admission::AlreadyPresent {
            effects.push(Effect::Broadcast);
        }
        effects.dedup();
        (admission, effects)
    }

    /// Removes `id` from the players or the spectators.
    ///
    /// A departing host hands the role to the next seated player. If a
    /// game is under way and fewer than two active players remain, the
    /// game ends on the spot.
    pub fn remove_player(&mut self, id: PlayerId) -> Vec<Effect> {
        self.offline.remove(&id);
        let mut effects = Vec::new();

        if let Some(index) = self.state.players.iter().position(|p| p.id == id) {
            let removed = self.state.players.remove(index);
            if removed.is_host {
                if let Some(next) = self.state.players.first_mut() {
                    next.is_host = true;
                    tracing::debug!(room_id = %self.state.room_id, host = %next.id, "host handed over");
                }
            }

            if self.state.phase.is_in_progress() && self.state.active_count() < 2 {
                effects.extend(self.end_game());
            }
        } else if let Some(index) = self.state.spectators.iter().position(|s| s.id == id) {
            self.state.spectators.remove(index);
        } else {
            return effects;
        }

        effects.push(Effect::Broadcast);
        effects
    }

    /// Moves a lobby with enough players into the introduction. Only the
    /// host may start.
    pub fn start_game(&mut self, requester: PlayerId) -> Vec<Effect> {
        if !self.is_host(requester) {
            tracing::debug!(room_id = %self.state.room_id, %requester, "start ignored: not the host");
            return Vec::new();
        }
        if self.state.phase != GamePhase::Lobby {
            tracing::debug!(room_id = %self.state.room_id, phase = %self.state.phase, "start ignored: not in lobby");
            return Vec::new();
        }
        if self.state.players.len() < self.config.min_players {
            tracing::debug!(
                room_id = %self.state.room_id,
                players = self.state.players.len(),
                "start ignored: not enough players"
            );
            return Vec::new();
        }

        self.state.phase = GamePhase::Introduction;
        tracing::info!(
            room_id = %self.state.room_id,
            players = self.state.players.len(),
            "game started"
        );

        vec![
            Effect::Broadcast,
            Effect::Schedule {
                after: self.config.intro_delay,
                step: Step::BeginChoosing,
            },
        ]
    }

    /// Records an active player's number for this round, overwriting an
    /// earlier pick. The last outstanding choice resolves the round.
    pub fn submit_choice(&mut self, id: PlayerId, choice: u8) -> Vec<Effect> {
        if self.state.phase != GamePhase::Choosing {
            tracing::debug!(room_id = %self.state.room_id, player_id = %id, "choice ignored: not choosing");
            return Vec::new();
        }
        if choice > MAX_CHOICE {
            tracing::debug!(room_id = %self.state.room_id, player_id = %id, choice, "choice ignored: out of range");
            return Vec::new();
        }

        let Some(player) = self.state.player_mut(id).filter(|p| p.is_active()) else {
            tracing::debug!(room_id = %self.state.room_id, player_id = %id, "choice ignored: not an active player");
            return Vec::new();
        };
        player.choice = Some(choice);

        if self.state.active_players().all(|p| p.choice.is_some()) {
            let mut effects = vec![Effect::StopCountdown];
            effects.extend(self.resolve());
            effects
        } else {
            vec![Effect::Broadcast]
        }
    }

    /// Resets the room to a fresh lobby and re-admits every member,
    /// players first, through the normal admission rules. Host only.
    pub fn restart(&mut self, requester: PlayerId) -> Vec<Effect> {
        if !self.is_host(requester) {
            tracing::debug!(room_id = %self.state.room_id, %requester, "restart ignored: not the host");
            return Vec::new();
        }

        let members: Vec<(PlayerId, String)> = self
            .state
            .players
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .chain(self.state.spectators.iter().map(|s| (s.id, s.name.clone())))
            .collect();

        self.state = GameState::new(self.state.room_id.clone(), self.config.round_time_special);
        for (id, name) in members {
            self.admit(id, name);
        }

        tracing::info!(
            room_id = %self.state.room_id,
            players = self.state.players.len(),
            spectators = self.state.spectators.len(),
            "game restarted"
        );

        vec![Effect::StopCountdown, Effect::CancelSchedule, Effect::Broadcast]
    }

    // -----------------------------------------------------------------
    // Timer events
    // -----------------------------------------------------------------

    /// One countdown second has passed.
    pub fn tick(&mut self) -> Vec<Effect> {
        if self.state.phase != GamePhase::Choosing {
            return vec![Effect::StopCountdown];
        }

        self.state.timer = self.state.timer.saturating_sub(1);
        if self.state.timer == 0 {
            let mut effects = vec![Effect::StopCountdown];
            effects.extend(self.resolve());
            effects
        } else {
            vec![Effect::Broadcast]
        }
    }

    /// Runs a delayed step if the room is still in the phase it was
    /// scheduled from.
    pub fn advance(&mut self, step: Step) -> Vec<Effect> {
        match (step, self.state.phase) {
            (Step::BeginChoosing, GamePhase::Introduction) => self.begin_choosing(),
            (Step::ApplyResults, GamePhase::Results) => self.apply_results(),
            (step, phase) => {
                tracing::debug!(room_id = %self.state.room_id, ?step, %phase, "stale step ignored");
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    fn is_host(&self, id: PlayerId) -> bool {
        self.state.player(id).is_some_and(|p| p.is_host)
    }

    fn evict_offline(&mut self) -> Vec<Effect> {
        if self.offline.is_empty() {
            return Vec::new();
        }
        let offline = std::mem::take(&mut self.offline);
        let seated: Vec<PlayerId> = self.state.member_ids().filter(|id| offline.contains(id)).collect();
        tracing::info!(room_id = %self.state.room_id, count = seated.len(), "offline members evicted");

        let mut effects = Vec::new();
        for id in seated {
            effects.extend(self.remove_player(id));
        }
        effects
    }

    fn admit(&mut self, id: PlayerId, name: String) -> Admission {
        if self.state.is_member(id) {
            return Admission::AlreadyPresent;
        }

        let full = self.state.players.len() >= self.config.max_players;
        if full || !self.state.phase.is_joinable() {
            self.state.spectators.push(Spectator { id, name });
            tracing::debug!(room_id = %self.state.room_id, player_id = %id, "spectator joined");
            return Admission::Spectator;
        }

        let is_host = self.state.players.is_empty();
        self.state.players.push(Player::new(id, name, STARTING_SCORE, is_host));
        tracing::debug!(room_id = %self.state.room_id, player_id = %id, is_host, "player joined");
        Admission::Player
    }

    fn begin_choosing(&mut self) -> Vec<Effect> {
        self.state.phase = GamePhase::Choosing;
        self.state.results = None;
        for player in &mut self.state.players {
            player.choice = None;
        }

        tracing::debug!(
            room_id = %self.state.room_id,
            round = self.state.round,
            timer = self.state.timer,
            "round open"
        );

        vec![Effect::StartCountdown, Effect::Broadcast]
    }

    /// Scores the round. Only valid from `Choosing`.
    fn resolve(&mut self) -> Vec<Effect> {
        if self.state.phase != GamePhase::Choosing {
            return Vec::new();
        }

        let eliminated = self.state.eliminated_count();
        let submissions: Vec<Submission> = self.state.active_players().map(Submission::from).collect();
        let result = resolve_round(&submissions, eliminated);

        tracing::info!(
            room_id = %self.state.room_id,
            round = self.state.round,
            rules = ?active_rules(eliminated).map(|r| r.id).collect::<Vec<_>>(),
            average = result.average,
            target = result.target,
            winner = ?result.winner,
            "round resolved"
        );

        self.state.results = Some(result);
        self.state.phase = GamePhase::Results;

        vec![
            Effect::Broadcast,
            Effect::Schedule {
                after: self.config.results_delay,
                step: Step::ApplyResults,
            },
        ]
    }

    fn apply_results(&mut self) -> Vec<Effect> {
        let Some(results) = self.state.results.as_ref() else {
            return Vec::new();
        };

        let before = self.state.eliminated_count();
        for player in &mut self.state.players {
            if let Some(change) = results.change_for(player.id) {
                player.score += change;
                if player.score <= ELIMINATION_SCORE {
                    player.is_eliminated = true;
                }
            }
        }
        let after = self.state.eliminated_count();
        self.state.new_rule_introduced = after > before;

        for rule in newly_active_rules(before, after) {
            tracing::info!(room_id = %self.state.room_id, rule = rule.id, "rule now in force");
        }

        if self.state.active_count() <= WINNING_PLAYER_COUNT {
            let mut effects = self.end_game();
            effects.push(Effect::Broadcast);
            return effects;
        }

        self.state.round += 1;
        self.state.timer = if self.state.new_rule_introduced {
            self.config.round_time_special
        } else {
            self.config.round_time_default
        };
        self.begin_choosing()
    }

    fn end_game(&mut self) -> Vec<Effect> {
        let mut active = self.state.players.iter_mut().filter(|p| p.is_active());
        let survivor = match (active.next(), active.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        };

        match survivor {
            Some(winner) => {
                winner.is_winner = true;
                tracing::info!(room_id = %self.state.room_id, winner = %winner.id, "game clear");
                self.state.phase = GamePhase::GameClear;
            }
            None => {
                tracing::info!(room_id = %self.state.room_id, "game over");
                self.state.phase = GamePhase::GameOver;
            }
        }

        vec![Effect::StopCountdown, Effect::CancelSchedule]
    }
}
