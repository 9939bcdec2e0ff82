//! Seat assignment

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BridgeError, Result};

/// The only table size the opponent derivation is defined for
pub const SUPPORTED_PLAYER_COUNT: u32 = 2;

/// 1-based seat at the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub struct PlayerIndex(u32);

impl PlayerIndex {
    /// Validate `index` against a table of `player_count` seats
    pub fn new(index: u32, player_count: u32) -> Result<Self> {
        if index == 0 || index > player_count {
            return Err(BridgeError::InvalidPlayer {
                player: index,
                player_count,
            });
        }
        Ok(Self(index))
    }

    /// Raw 1-based index
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PlayerIndex {
    type Error = BridgeError;

    /// Seat at a standard two-seat table
    fn try_from(index: u32) -> Result<Self> {
        Self::new(index, SUPPORTED_PLAYER_COUNT)
    }
}

impl From<PlayerIndex> for u32 {
    fn from(player: PlayerIndex) -> u32 {
        player.0
    }
}

impl fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Player and opponent seats, fixed when an agent is initialized
///
/// Only [`Seats::assign`] builds one, so the pair is always consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Seats {
    pub player: PlayerIndex,
    pub opponent: PlayerIndex,
    pub player_count: u32,
}

impl Seats {
    /// Assign seats with `opponent = player_count - player + 1`.
    ///
    /// The formula only mirrors seats correctly at a two-seat table, so any
    /// other `player_count` is rejected rather than guessed at.
    pub fn assign(player: u32, player_count: u32) -> Result<Self> {
        if player_count != SUPPORTED_PLAYER_COUNT {
            return Err(BridgeError::UnsupportedPlayerCount(player_count));
        }
        let player = PlayerIndex::new(player, player_count)?;
        let opponent = PlayerIndex::new(player_count - player.get() + 1, player_count)?;
        Ok(Self {
            player,
            opponent,
            player_count,
        })
    }
}
