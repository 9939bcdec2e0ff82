//! Game descriptors, state snapshots and moves
//!
//! These are the host's handles. The bridge never interprets game rules; it
//! reads seat notes from a snapshot and passes everything else through.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::notes::NoteLog;
use crate::player::{PlayerIndex, SUPPORTED_PLAYER_COUNT};

/// Ruleset summary for the game being played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameDescriptor {
    pub name: String,
    pub num_players: u32,
    #[serde(default)]
    pub stochastic: bool,
    #[serde(default)]
    pub imperfect_information: bool,
    #[serde(default)]
    pub simultaneous_moves: bool,
}

impl GameDescriptor {
    /// Standard two-player Kriegspiel
    pub fn kriegspiel() -> Self {
        Self {
            name: "Kriegspiel (Chess)".into(),
            num_players: SUPPORTED_PLAYER_COUNT,
            stochastic: false,
            imperfect_information: true,
            simultaneous_moves: false,
        }
    }

    /// Hidden-information, alternating-move games mediated by a referee
    pub fn is_kriegspiel_family(&self) -> bool {
        self.imperfect_information && !self.simultaneous_moves
    }
}

/// A move, or "try", as produced by the host's move generator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Move {
    pub from: i32,
    pub to: i32,
    /// Piece involved; for promotions the piece promoted to
    #[serde(default)]
    pub what: i32,
    /// Short action description, e.g. "Move" or "Promote"
    #[serde(default)]
    pub description: String,
}

impl Move {
    pub fn new(from: i32, to: i32) -> Self {
        Self {
            from,
            to,
            what: 0,
            description: "Move".into(),
        }
    }
}

/// Current position as visible to the bridge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateSnapshot {
    /// Seat to move
    pub mover: u32,
    #[serde(default)]
    pub terminal: bool,
    /// Pseudo-legal tries available to the mover
    #[serde(default)]
    pub legal_moves: Vec<Move>,
    /// Per-seat scores, indexed by `player - 1` (tries available)
    #[serde(default)]
    pub scores: Vec<i32>,
    /// Per-seat note logs, indexed by `player - 1`
    #[serde(default)]
    pub notes: Vec<NoteLog>,
}

impl StateSnapshot {
    /// Note log revealed to `player`; empty when the seat has none yet
    pub fn notes_for(&self, player: PlayerIndex) -> &NoteLog {
        static EMPTY: NoteLog = NoteLog::new();
        self.notes
            .get(seat_slot(player))
            .unwrap_or(&EMPTY)
    }

    /// Mutable log for `player`, growing the table as needed
    pub fn notes_mut(&mut self, player: PlayerIndex) -> &mut NoteLog {
        let slot = seat_slot(player);
        if self.notes.len() <= slot {
            self.notes.resize_with(slot + 1, NoteLog::default);
        }
        &mut self.notes[slot]
    }

    /// Score recorded for `player`, zero if absent
    pub fn score(&self, player: PlayerIndex) -> i32 {
        self.scores.get(seat_slot(player)).copied().unwrap_or(0)
    }

    /// Hex SHA-256 of the snapshot's JSON form
    pub fn state_hash(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

fn seat_slot(player: PlayerIndex) -> usize {
    (player.get() - 1) as usize
}
