//! Host-facing agent trait

use crate::budget::DecisionBudget;
use crate::error::Result;
use crate::game::{GameDescriptor, Move, StateSnapshot};

/// A move-selecting agent as seen by the game host.
///
/// One instance plays one match: `init_ai` once, `select_action` any number
/// of times, then `close_ai`. Calls on a single instance are sequential.
pub trait Agent: Send {
    /// Display name shown to the operator
    fn name(&self) -> &str;

    /// Prepare for a match as seat `player` (1-based)
    fn init_ai(&mut self, game: &GameDescriptor, player: u32) -> Result<()>;

    /// Choose the next try for the current position
    fn select_action(
        &mut self,
        game: &GameDescriptor,
        state: &StateSnapshot,
        budget: &DecisionBudget,
    ) -> Result<Move>;

    /// Release per-match resources
    fn close_ai(&mut self) -> Result<()>;

    /// Whether this agent can play `game`. `Ok(false)` is an answer, not a fault.
    fn supports_game(&self, game: &GameDescriptor) -> Result<bool>;
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init_ai(&mut self, game: &GameDescriptor, player: u32) -> Result<()> {
        (**self).init_ai(game, player)
    }

    fn select_action(
        &mut self,
        game: &GameDescriptor,
        state: &StateSnapshot,
        budget: &DecisionBudget,
    ) -> Result<Move> {
        (**self).select_action(game, state, budget)
    }

    fn close_ai(&mut self) -> Result<()> {
        (**self).close_ai()
    }

    fn supports_game(&self, game: &GameDescriptor) -> Result<bool> {
        (**self).supports_game(game)
    }
}
