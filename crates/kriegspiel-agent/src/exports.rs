//! C ABI exports
//!
//! Every export catches panics and reports failures through a status code,
//! with a per-thread message available from `kriegspiel_last_error`.

use kriegspiel_abi::view::str_from_ptr;
use kriegspiel_abi::{ABI_VERSION, GameView, StateView, decode_limit, status};
use kriegspiel_core::{DecisionBudget, Move};
use std::cell::RefCell;
use std::ffi::{CString, c_char, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::agent::{Position, RandomAgent};

/// Environment variable fixing the agents' random seed
pub const SEED_ENV: &str = "KRIEGSPIEL_AGENT_SEED";

/// Process-wide state prepared by `kriegspiel_static_init`
#[derive(Debug)]
struct Statics {
    seed: Option<u64>,
}

static STATICS: OnceLock<Statics> = OnceLock::new();

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: impl Into<String>) {
    let message = message.into().replace('\0', " ");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = CString::new(message).ok());
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Fail with `code`, recording `message` for the caller
fn fail(code: i32, message: impl Into<String>) -> i32 {
    set_last_error(message);
    code
}

/// Run an export body, turning a panic into `FAULT`
fn guard(body: impl FnOnce() -> i32) -> i32 {
    clear_last_error();
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(code) => code,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_owned());
            fail(status::FAULT, format!("agent panicked: {}", reason))
        }
    }
}

fn seed_from_env() -> Option<u64> {
    let raw = std::env::var(SEED_ENV).ok()?;
    match raw.trim().parse() {
        Ok(seed) => Some(seed),
        Err(_) => {
            info!("Ignoring {}={:?}: not an integer", SEED_ENV, raw);
            None
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn kriegspiel_abi_version() -> u32 {
    ABI_VERSION
}

/// One-time setup; repeated calls are no-ops
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kriegspiel_static_init() -> i32 {
    guard(|| {
        let statics = STATICS.get_or_init(|| Statics {
            seed: seed_from_env(),
        });
        debug!("Reference agent ready (seed: {:?})", statics.seed);
        status::OK
    })
}

/// Create an agent for seat `player` and hand it back through `out_agent`
///
/// # Safety
/// `game` must point to a valid view and `out_agent` to writable storage.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kriegspiel_init(
    game: *const GameView,
    player: i32,
    out_agent: *mut *mut c_void,
) -> i32 {
    guard(|| {
        let Some(statics) = STATICS.get() else {
            return fail(status::FAULT, "kriegspiel_static_init has not been called");
        };
        if game.is_null() || out_agent.is_null() {
            return fail(status::INVALID_ARGUMENT, "null game or output slot");
        }
        let Ok(player) = u32::try_from(player) else {
            return fail(status::INVALID_ARGUMENT, format!("negative player {}", player));
        };

        let game = unsafe { (*game).to_descriptor() };
        if !RandomAgent::supports(&game) {
            return fail(
                status::INVALID_ARGUMENT,
                format!("cannot play {} with {} players", game.name, game.num_players),
            );
        }
        let agent = match RandomAgent::new(player, statics.seed) {
            Ok(agent) => agent,
            Err(e) => return fail(status::INVALID_ARGUMENT, e.to_string()),
        };
        debug!("Agent created for {} as P{}", game.name, player);

        unsafe { *out_agent = Box::into_raw(Box::new(agent)).cast() };
        status::OK
    })
}

/// Choose a move, writing its index in the state's move array to `out_move`
///
/// # Safety
/// `agent` must come from `kriegspiel_init` and not be closed. The views and
/// strings must be valid for the call and `out_move` writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kriegspiel_select(
    agent: *mut c_void,
    game: *const GameView,
    state: *const StateView,
    max_seconds: f64,
    max_iterations: i32,
    max_depth: i32,
    own_message: *const c_char,
    referee_message: *const c_char,
    out_move: *mut usize,
) -> i32 {
    guard(|| {
        if agent.is_null() || game.is_null() || state.is_null() || out_move.is_null() {
            return fail(status::INVALID_ARGUMENT, "null agent, game, state or output slot");
        }
        let agent = unsafe { &mut *agent.cast::<RandomAgent>() };
        let state = unsafe { &*state };

        let moves: Vec<Move> = unsafe { state.moves() }
            .iter()
            .map(|view| unsafe { view.to_move() })
            .collect();
        let seats = agent.seats();
        let position = Position {
            moves: &moves,
            pawn_tries: unsafe { state.score(seats.player.get()) },
            opponent_tries: unsafe { state.score(seats.opponent.get()) },
            own_message: unsafe { str_from_ptr(own_message) },
            referee_message: unsafe { str_from_ptr(referee_message) },
            budget: DecisionBudget {
                max_seconds,
                max_iterations: decode_limit(max_iterations),
                max_depth: decode_limit(max_depth),
            },
        };

        match agent.select(&position) {
            Some(index) => {
                unsafe { *out_move = index };
                status::OK
            }
            None => fail(status::NO_MOVE, "state offers no pseudo-legal moves"),
        }
    })
}

/// Release an agent; null is accepted and ignored
///
/// # Safety
/// `agent` must be null or come from `kriegspiel_init`, and is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kriegspiel_close(agent: *mut c_void) -> i32 {
    guard(|| {
        if agent.is_null() {
            return status::OK;
        }
        let agent = unsafe { Box::from_raw(agent.cast::<RandomAgent>()) };
        debug!(
            "Agent for {} closed after {} decisions",
            agent.seats().player,
            agent.decisions()
        );
        status::OK
    })
}

/// 1 when the game is playable, 0 when not
///
/// # Safety
/// `game` must be null or point to a valid view.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kriegspiel_supports_game(game: *const GameView) -> i32 {
    guard(|| {
        if game.is_null() {
            return fail(status::INVALID_ARGUMENT, "null game");
        }
        let game = unsafe { (*game).to_descriptor() };
        i32::from(RandomAgent::supports(&game))
    })
}

/// Message for the last failure on this thread, or null
///
/// The pointer stays valid until the next export call on the same thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kriegspiel_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(std::ptr::null(), |message| message.as_ptr())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kriegspiel_abi::{OwnedGameView, OwnedStateView, UNBOUNDED};
    use kriegspiel_core::{GameDescriptor, StateSnapshot};
    use std::ffi::CStr;

    fn last_error() -> String {
        let ptr = unsafe { kriegspiel_last_error() };
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    fn init(game: &GameDescriptor, player: i32) -> (i32, *mut c_void) {
        assert_eq!(unsafe { kriegspiel_static_init() }, status::OK);
        let view = OwnedGameView::new(game).unwrap();
        let mut agent = std::ptr::null_mut();
        let code = unsafe { kriegspiel_init(view.as_ptr(), player, &mut agent) };
        (code, agent)
    }

    fn select(agent: *mut c_void, state: &StateSnapshot, own: &str) -> (i32, usize) {
        let game = OwnedGameView::new(&GameDescriptor::kriegspiel()).unwrap();
        let state = OwnedStateView::new(state).unwrap();
        let own = CString::new(own).unwrap();
        let referee = CString::new("").unwrap();
        let mut chosen = usize::MAX;
        let code = unsafe {
            kriegspiel_select(
                agent,
                game.as_ptr(),
                state.as_ptr(),
                0.5,
                UNBOUNDED,
                UNBOUNDED,
                own.as_ptr(),
                referee.as_ptr(),
                &mut chosen,
            )
        };
        (code, chosen)
    }

    #[test]
    fn test_static_init_is_idempotent() {
        assert_eq!(unsafe { kriegspiel_static_init() }, status::OK);
        assert_eq!(unsafe { kriegspiel_static_init() }, status::OK);
        assert_eq!(unsafe { kriegspiel_abi_version() }, ABI_VERSION);
    }

    #[test]
    fn test_full_match_through_exports() {
        let (code, agent) = init(&GameDescriptor::kriegspiel(), 2);
        assert_eq!(code, status::OK);
        assert!(!agent.is_null());

        let state = StateSnapshot {
            mover: 2,
            legal_moves: vec![Move::new(52, 36), Move::new(57, 42)],
            scores: vec![1, 0],
            ..Default::default()
        };
        let (code, first) = select(agent, &state, "");
        assert_eq!(code, status::OK);
        assert!(first < 2);

        let (code, retry) = select(agent, &state, "Illegal move");
        assert_eq!(code, status::OK);
        assert_ne!(first, retry);

        assert_eq!(unsafe { kriegspiel_close(agent) }, status::OK);
    }

    #[test]
    fn test_empty_state_reports_no_move() {
        let (_, agent) = init(&GameDescriptor::kriegspiel(), 1);
        let (code, chosen) = select(agent, &StateSnapshot::default(), "");
        assert_eq!(code, status::NO_MOVE);
        assert_eq!(chosen, usize::MAX);
        assert!(last_error().contains("no pseudo-legal moves"));
        assert_eq!(unsafe { kriegspiel_close(agent) }, status::OK);
    }

    #[test]
    fn test_init_rejects_bad_arguments() {
        let (code, agent) = init(&GameDescriptor::kriegspiel(), -1);
        assert_eq!(code, status::INVALID_ARGUMENT);
        assert!(agent.is_null());

        let (code, _) = init(&GameDescriptor::kriegspiel(), 3);
        assert_eq!(code, status::INVALID_ARGUMENT);

        let crowd = GameDescriptor {
            num_players: 3,
            ..GameDescriptor::kriegspiel()
        };
        let (code, _) = init(&crowd, 1);
        assert_eq!(code, status::INVALID_ARGUMENT);
        assert!(last_error().contains("3 players"));
    }

    #[test]
    fn test_supports_game_answers() {
        let kriegspiel = OwnedGameView::new(&GameDescriptor::kriegspiel()).unwrap();
        let chess = OwnedGameView::new(&GameDescriptor {
            name: "Chess".into(),
            imperfect_information: false,
            ..GameDescriptor::kriegspiel()
        })
        .unwrap();

        assert_eq!(unsafe { kriegspiel_supports_game(kriegspiel.as_ptr()) }, 1);
        assert_eq!(unsafe { kriegspiel_supports_game(chess.as_ptr()) }, 0);
        assert_eq!(
            unsafe { kriegspiel_supports_game(std::ptr::null()) },
            status::INVALID_ARGUMENT
        );
    }

    #[test]
    fn test_null_arguments_are_rejected() {
        assert_eq!(unsafe { kriegspiel_close(std::ptr::null_mut()) }, status::OK);
        let (code, _) = select(std::ptr::null_mut(), &StateSnapshot::default(), "");
        assert_eq!(code, status::INVALID_ARGUMENT);
    }

    #[test]
    fn test_successful_call_clears_last_error() {
        let _ = unsafe { kriegspiel_supports_game(std::ptr::null()) };
        assert!(!unsafe { kriegspiel_last_error() }.is_null());
        let _ = unsafe { kriegspiel_static_init() };
        assert!(unsafe { kriegspiel_last_error() }.is_null());
    }
}
