//! Room actor: an isolated Tokio task that owns one [`Game`].
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. The same task owns the round countdown and
//! the pending phase alarm, so commands and timer events are handled one
//! at a time.

use std::sync::Arc;

use keynes_protocol::{GamePhase, GameState, PlayerId, RoomId};
use keynes_tick::{Alarm, Countdown};
use tokio::sync::{mpsc, oneshot};

use crate::{Admission, BroadcastSink, Effect, Game, RoomError, Step};

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        reply: oneshot::Sender<Admission>,
    },

    /// Replies with the number of members left. The actor stops once
    /// that reaches zero.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<usize>,
    },

    StartGame {
        player_id: PlayerId,
    },

    SubmitChoice {
        player_id: PlayerId,
        choice: u8,
    },

    Restart {
        player_id: PlayerId,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Snapshot {
        reply: oneshot::Sender<GameState>,
    },

    Shutdown,
}

/// A summary of a room for the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: GamePhase,
    pub player_count: usize,
    pub max_players: usize,
    /// `false` for a restored room nobody has joined since.
    pub has_live_members: bool,
    /// `None` only while the room has no players.
    pub host_name: Option<String>,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: it's an `mpsc::Sender` wrapper. The registry holds
/// one per room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns `true` if both handles drive the same actor.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    async fn request<T>(&self, cmd: impl FnOnce(oneshot::Sender<T>) -> RoomCommand) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(cmd(reply_tx)).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Admits a player (or spectator).
    pub async fn join(&self, player_id: PlayerId, name: impl Into<String>) -> Result<Admission, RoomError> {
        let name = name.into();
        self.request(|reply| RoomCommand::Join { player_id, name, reply }).await
    }

    /// Removes a member and returns how many remain.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply }).await
    }

    /// Asks the room to start (fire-and-forget).
    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.send(RoomCommand::StartGame { player_id }).await
    }

    /// Submits a choice (fire-and-forget).
    pub async fn submit_choice(&self, player_id: PlayerId, choice: u8) -> Result<(), RoomError> {
        self.send(RoomCommand::SubmitChoice { player_id, choice }).await
    }

    /// Asks the room to restart (fire-and-forget).
    pub async fn restart(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.send(RoomCommand::Restart { player_id }).await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// A copy of the room's current state.
    pub async fn snapshot(&self) -> Result<GameState, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    game: Game,
    sink: Arc<dyn BroadcastSink>,
    countdown: Countdown,
    alarm: Alarm<Step>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown, until the last member leaves,
    /// or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(room_id = %self.game.room_id(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                _ = self.countdown.wait_for_tick() => {
                    let effects = self.game.tick();
                    self.apply(effects);
                }
                step = self.alarm.wait() => {
                    let effects = self.game.advance(step);
                    self.apply(effects);
                }
            }
        }

        self.countdown.stop();
        self.alarm.disarm();
        tracing::info!(room_id = %self.game.room_id(), "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join { player_id, name, reply } => {
                let (admission, effects) = self.game.add_player(player_id, name);
                self.apply(effects);
                let _ = reply.send(admission);
            }
            RoomCommand::Leave { player_id, reply } => {
                let effects = self.game.remove_player(player_id);
                self.apply(effects);
                let state = self.game.state();
                let _ = reply.send(state.players.len() + state.spectators.len());
                if state.is_empty() {
                    tracing::info!(room_id = %self.game.room_id(), "room empty");
                    return false;
                }
            }
            RoomCommand::StartGame { player_id } => {
                let effects = self.game.start_game(player_id);
                self.apply(effects);
            }
            RoomCommand::SubmitChoice { player_id, choice } => {
                let effects = self.game.submit_choice(player_id, choice);
                self.apply(effects);
            }
            RoomCommand::Restart { player_id } => {
                let effects = self.game.restart(player_id);
                self.apply(effects);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.game.state().clone());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.game.room_id(), "room shutting down");
                return false;
            }
        }
        true
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Broadcast => self.sink.publish(self.game.room_id(), self.game.state()),
                Effect::StartCountdown => self.countdown.start(),
                Effect::StopCountdown => self.countdown.stop(),
                Effect::Schedule { after, step } => self.alarm.arm(after, step),
                Effect::CancelSchedule => {
                    self.alarm.disarm();
                }
            }
        }
    }

    fn info(&self) -> RoomInfo {
        let state = self.game.state();
        RoomInfo {
            room_id: state.room_id.clone(),
            phase: state.phase,
            player_count: state.players.len(),
            max_players: self.game.config().max_players,
            has_live_members: self.game.has_live_members(),
            host_name: state.host().map(|p| p.name.clone()),
        }
    }
}

/// Spawns a room actor task around `game` and returns a handle to
/// communicate with it. No broadcast is sent on spawn.
pub(crate) fn spawn_room(game: Game, sink: Arc<dyn BroadcastSink>) -> RoomHandle {
    let room_id = game.room_id().clone();
    let (tx, rx) = mpsc::channel(game.config().channel_size);
    let countdown = Countdown::new(game.config().tick_interval);

    let actor = RoomActor {
        game,
        sink,
        countdown,
        alarm: Alarm::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
