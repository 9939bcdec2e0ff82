//! C ABI shared by the Kriegspiel bridge and native agents
//!
//! This crate provides:
//! - Exported symbol names and their function pointer types
//! - `#[repr(C)]` views of games, states and moves
//! - Owned marshaling buffers that keep views valid for one call
//! - Helpers for native agents reading views back into Rust

pub mod marshal;
pub mod view;

pub use marshal::{OwnedGameView, OwnedStateView, c_string};
pub use view::{GameView, MoveView, StateView, game_flags};

use std::ffi::{c_char, c_void};

/// Version of this ABI; libraries reporting anything else are refused
pub const ABI_VERSION: u32 = 1;

/// Encoding of an unbounded iteration or depth limit
pub const UNBOUNDED: i32 = -1;

/// Status codes returned by every fallible export
pub mod status {
    pub const OK: i32 = 0;
    pub const FAULT: i32 = -1;
    pub const NO_MOVE: i32 = -2;
    pub const INVALID_ARGUMENT: i32 = -3;

    /// Human-readable name of a status code
    pub fn describe(code: i32) -> &'static str {
        match code {
            OK => "ok",
            FAULT => "fault",
            NO_MOVE => "no move available",
            INVALID_ARGUMENT => "invalid argument",
            _ => "unknown status",
        }
    }
}

/// Exported symbol names, NUL-terminated for symbol lookup
pub mod symbols {
    pub const ABI_VERSION: &[u8] = b"kriegspiel_abi_version\0";
    pub const STATIC_INIT: &[u8] = b"kriegspiel_static_init\0";
    pub const INIT: &[u8] = b"kriegspiel_init\0";
    pub const SELECT: &[u8] = b"kriegspiel_select\0";
    pub const CLOSE: &[u8] = b"kriegspiel_close\0";
    pub const SUPPORTS_GAME: &[u8] = b"kriegspiel_supports_game\0";
    pub const LAST_ERROR: &[u8] = b"kriegspiel_last_error\0";

    /// Symbol name without the trailing NUL, for diagnostics
    pub fn display(symbol: &[u8]) -> String {
        String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
    }
}

pub type AbiVersionFn = unsafe extern "C" fn() -> u32;

pub type StaticInitFn = unsafe extern "C" fn() -> i32;

pub type InitFn =
    unsafe extern "C" fn(game: *const GameView, player: i32, out_agent: *mut *mut c_void) -> i32;

pub type SelectFn = unsafe extern "C" fn(
    agent: *mut c_void,
    game: *const GameView,
    state: *const StateView,
    max_seconds: f64,
    max_iterations: i32,
    max_depth: i32,
    own_message: *const c_char,
    referee_message: *const c_char,
    out_move: *mut usize,
) -> i32;

pub type CloseFn = unsafe extern "C" fn(agent: *mut c_void) -> i32;

/// Returns 1 when supported, 0 when not, or a negative status
pub type SupportsGameFn = unsafe extern "C" fn(game: *const GameView) -> i32;

/// Message for the most recent failure on the calling thread, or null
pub type LastErrorFn = unsafe extern "C" fn() -> *const c_char;

/// Encode an optional limit for the ABI
pub fn encode_limit(limit: Option<u32>) -> i32 {
    match limit {
        Some(value) => i32::try_from(value).unwrap_or(i32::MAX),
        None => UNBOUNDED,
    }
}

/// Decode a limit received over the ABI
pub fn decode_limit(raw: i32) -> Option<u32> {
    u32::try_from(raw).ok()
}
