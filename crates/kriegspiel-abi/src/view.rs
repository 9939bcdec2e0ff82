//! `#[repr(C)]` views passed across the boundary
//!
//! Every pointer inside a view is borrowed from the caller and valid only for
//! the duration of the call it was passed to.

use kriegspiel_core::{GameDescriptor, Move};
use std::ffi::{CStr, c_char};

/// Bits of [`GameView::flags`]
pub mod game_flags {
    pub const STOCHASTIC: u32 = 1 << 0;
    pub const IMPERFECT_INFORMATION: u32 = 1 << 1;
    pub const SIMULTANEOUS_MOVES: u32 = 1 << 2;
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GameView {
    pub name: *const c_char,
    pub num_players: u32,
    pub flags: u32,
}

impl GameView {
    pub fn has(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }

    /// # Safety
    /// `name` must be null or a valid NUL-terminated string.
    pub unsafe fn name(&self) -> &str {
        unsafe { str_from_ptr(self.name) }
    }

    /// # Safety
    /// See [`GameView::name`].
    pub unsafe fn to_descriptor(&self) -> GameDescriptor {
        GameDescriptor {
            name: unsafe { self.name() }.to_owned(),
            num_players: self.num_players,
            stochastic: self.has(game_flags::STOCHASTIC),
            imperfect_information: self.has(game_flags::IMPERFECT_INFORMATION),
            simultaneous_moves: self.has(game_flags::SIMULTANEOUS_MOVES),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MoveView {
    pub from: i32,
    pub to: i32,
    pub what: i32,
    pub description: *const c_char,
}

impl MoveView {
    /// # Safety
    /// `description` must be null or a valid NUL-terminated string.
    pub unsafe fn description(&self) -> &str {
        unsafe { str_from_ptr(self.description) }
    }

    /// # Safety
    /// See [`MoveView::description`].
    pub unsafe fn to_move(&self) -> Move {
        Move {
            from: self.from,
            to: self.to,
            what: self.what,
            description: unsafe { self.description() }.to_owned(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StateView {
    pub mover: u32,
    pub terminal: bool,
    pub moves: *const MoveView,
    pub num_moves: usize,
    /// Indexed by `player - 1`
    pub scores: *const i32,
    pub num_scores: usize,
}

impl StateView {
    /// # Safety
    /// `moves` must point to `num_moves` initialized views, or be null.
    pub unsafe fn moves(&self) -> &[MoveView] {
        if self.moves.is_null() || self.num_moves == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.moves, self.num_moves) }
    }

    /// # Safety
    /// `scores` must point to `num_scores` values, or be null.
    pub unsafe fn scores(&self) -> &[i32] {
        if self.scores.is_null() || self.num_scores == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.scores, self.num_scores) }
    }

    /// Score for a 1-based seat, zero if absent
    ///
    /// # Safety
    /// See [`StateView::scores`].
    pub unsafe fn score(&self, player: u32) -> i32 {
        let scores = unsafe { self.scores() };
        player
            .checked_sub(1)
            .and_then(|slot| scores.get(slot as usize))
            .copied()
            .unwrap_or(0)
    }
}

/// Borrow a C string as UTF-8; null and invalid input read as empty.
///
/// # Safety
/// `ptr` must be null or a valid NUL-terminated string outliving `'a`.
pub unsafe fn str_from_ptr<'a>(ptr: *const c_char) -> &'a str {
    if ptr.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("")
}
