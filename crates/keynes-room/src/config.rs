//! Room configuration.

use std::time::Duration;

use keynes_rules::constants::{MAX_PLAYERS, MIN_PLAYERS};
use serde::{Deserialize, Serialize};

/// Settings shared by every room a registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Players needed before the host can start.
    pub min_players: usize,

    /// Seats per room. Anyone joining beyond this becomes a spectator.
    pub max_players: usize,

    /// How long the introduction screen shows before the first round.
    pub intro_delay: Duration,

    /// How long round results show before scores are applied.
    pub results_delay: Duration,

    /// Round length in seconds when no rule was just introduced.
    pub round_time_default: u32,

    /// Round length in seconds for the first round and for any round
    /// right after an elimination.
    pub round_time_special: u32,

    /// Wall-clock length of one countdown second. Tests shrink this.
    pub tick_interval: Duration,

    /// Command channel capacity per room actor.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            intro_delay: Duration::from_secs(5),
            results_delay: Duration::from_secs(10),
            round_time_default: 60,
            round_time_special: 300,
            tick_interval: Duration::from_secs(1),
            channel_size: 64,
        }
    }
}

impl RoomConfig {
    /// Clamps values that would break a room.
    ///
    /// - `min_players` is at least 2 (a round needs an opponent).
    /// - `max_players` is at least `min_players`.
    /// - round times and `channel_size` are at least 1.
    pub fn validated(mut self) -> Self {
        if self.min_players < MIN_PLAYERS {
            tracing::warn!(min_players = self.min_players, "min_players below 2, clamping");
            self.min_players = MIN_PLAYERS;
        }
        if self.max_players < self.min_players {
            tracing::warn!(
                max_players = self.max_players,
                min_players = self.min_players,
                "max_players below min_players, clamping"
            );
            self.max_players = self.min_players;
        }
        self.round_time_default = self.round_time_default.max(1);
        self.round_time_special = self.round_time_special.max(1);
        self.channel_size = self.channel_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 5);
        assert_eq!(config.intro_delay, Duration::from_secs(5));
        assert_eq!(config.results_delay, Duration::from_secs(10));
        assert_eq!(config.round_time_default, 60);
        assert_eq!(config.round_time_special, 300);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_validated_leaves_default_alone() {
        assert_eq!(RoomConfig::default().validated(), RoomConfig::default());
    }

    #[test]
    fn test_validated_clamps_bad_values() {
        let config = RoomConfig {
            min_players: 0,
            max_players: 1,
            round_time_default: 0,
            channel_size: 0,
            ..RoomConfig::default()
        }
        .validated();

        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 2);
        assert_eq!(config.round_time_default, 1);
        assert_eq!(config.channel_size, 1);
    }
}
