//! Owned buffers backing the views for one native call

use kriegspiel_core::{BridgeError, GameDescriptor, Result, StateSnapshot};
use std::ffi::CString;

use crate::view::{GameView, MoveView, StateView, game_flags};

/// Convert `value` to a C string, naming `what` on interior NUL bytes
pub fn c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|e| BridgeError::Marshal(format!("{} contains a NUL byte at {}", what, e.nul_position())))
}

/// A [`GameView`] together with the storage it points into
#[derive(Debug)]
pub struct OwnedGameView {
    _name: CString,
    view: GameView,
}

impl OwnedGameView {
    pub fn new(game: &GameDescriptor) -> Result<Self> {
        let name = c_string(&game.name, "game name")?;
        let mut flags = 0;
        if game.stochastic {
            flags |= game_flags::STOCHASTIC;
        }
        if game.imperfect_information {
            flags |= game_flags::IMPERFECT_INFORMATION;
        }
        if game.simultaneous_moves {
            flags |= game_flags::SIMULTANEOUS_MOVES;
        }

        let view = GameView {
            name: name.as_ptr(),
            num_players: game.num_players,
            flags,
        };
        Ok(Self { _name: name, view })
    }

    pub fn view(&self) -> &GameView {
        &self.view
    }

    pub fn as_ptr(&self) -> *const GameView {
        &self.view
    }
}

/// A [`StateView`] together with the storage it points into
#[derive(Debug)]
pub struct OwnedStateView {
    _descriptions: Vec<CString>,
    _moves: Vec<MoveView>,
    _scores: Vec<i32>,
    view: StateView,
}

impl OwnedStateView {
    pub fn new(state: &StateSnapshot) -> Result<Self> {
        let descriptions = state
            .legal_moves
            .iter()
            .map(|mv| c_string(&mv.description, "move description"))
            .collect::<Result<Vec<_>>>()?;

        // Heap buffers stay put when the Vecs move into Self
        let moves: Vec<MoveView> = state
            .legal_moves
            .iter()
            .zip(&descriptions)
            .map(|(mv, description)| MoveView {
                from: mv.from,
                to: mv.to,
                what: mv.what,
                description: description.as_ptr(),
            })
            .collect();
        let scores = state.scores.clone();

        let view = StateView {
            mover: state.mover,
            terminal: state.terminal,
            moves: moves.as_ptr(),
            num_moves: moves.len(),
            scores: scores.as_ptr(),
            num_scores: scores.len(),
        };

        Ok(Self {
            _descriptions: descriptions,
            _moves: moves,
            _scores: scores,
            view,
        })
    }

    pub fn view(&self) -> &StateView {
        &self.view
    }

    pub fn as_ptr(&self) -> *const StateView {
        &self.view
    }
}
