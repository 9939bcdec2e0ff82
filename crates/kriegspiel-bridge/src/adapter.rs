//! Native call surface
//!
//! `NativeModule` is the process-wide side of a loaded agent (static setup,
//! minting per-match adapters). `NativeAgent` is the per-match side carrying
//! the four calls that cross the boundary. Test doubles implement both to
//! stand in for a compiled agent without touching the loader.

use kriegspiel_core::{
    DecisionBudget, GameDescriptor, Move, PlayerIndex, Result, StateSnapshot,
};
use std::sync::Arc;

/// Per-match native calls.
///
/// Game and state are borrowed for the duration of one call; implementations
/// must not retain them. A fault returns `BridgeError::NativeCall` naming the
/// operation that raised it.
pub trait NativeAgent: Send {
    fn call_init(&mut self, game: &GameDescriptor, player: PlayerIndex) -> Result<()>;

    fn call_select(
        &mut self,
        game: &GameDescriptor,
        state: &StateSnapshot,
        budget: &DecisionBudget,
        own_message: &str,
        referee_message: &str,
    ) -> Result<Move>;

    fn call_close(&mut self) -> Result<()>;

    fn call_supports(&self, game: &GameDescriptor) -> Result<bool>;
}

/// A loaded agent module, shared by every match in the process
pub trait NativeModule: Send + Sync + 'static {
    type Agent: NativeAgent + 'static;

    /// Logical library name, used in diagnostics
    fn library_name(&self) -> &str;

    /// Game-independent setup, run exactly once by the loader
    fn static_setup(&self) -> Result<()>;

    /// Fresh adapter for one match
    fn new_agent(module: &Arc<Self>) -> Self::Agent;
}
