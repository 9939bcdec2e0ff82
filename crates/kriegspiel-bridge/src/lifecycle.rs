//! Agent lifecycle management
//!
//! ```text
//! LoaderReady --initialize--> Initialized --close--> Closed
//!                              |      ^
//!                              +------+ select_action (any number of times)
//! ```
//!
//! A `KriegspielAgent` can only be built from an adapter minted by a loaded
//! module, so the `Unloaded` state is unrepresentable here. `supports_game`
//! is a pure query valid in every state. A closed handle is never reused.

use kriegspiel_core::{
    Agent, BridgeError, DecisionBudget, GameDescriptor, Misuse, Move, Result, SUPPORTED_PLAYER_COUNT,
    Seats, StateSnapshot, TransportMessages,
};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::adapter::NativeAgent;

/// Where a handle is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    LoaderReady,
    Initialized(Seats),
    Closed,
}

/// One native agent playing one match
pub struct KriegspielAgent<A: NativeAgent> {
    name: String,
    adapter: A,
    state: LifecycleState,
    decisions: u64,
}

impl<A: NativeAgent> KriegspielAgent<A> {
    pub fn new(name: impl Into<String>, adapter: A) -> Self {
        Self {
            name: name.into(),
            adapter,
            state: LifecycleState::LoaderReady,
            decisions: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Seats assigned at initialization, if initialized
    pub fn seats(&self) -> Option<Seats> {
        match self.state {
            LifecycleState::Initialized(seats) => Some(seats),
            _ => None,
        }
    }

    /// Number of completed decisions this match
    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Bind the agent to seat `player` of a `player_count` table.
    ///
    /// A native fault leaves the handle in `LoaderReady`.
    pub fn initialize(
        &mut self,
        game: &GameDescriptor,
        player: u32,
        player_count: u32,
    ) -> Result<()> {
        match self.state {
            LifecycleState::LoaderReady => {}
            LifecycleState::Initialized(_) => return Err(Misuse::AlreadyInitialized.into()),
            LifecycleState::Closed => return Err(Misuse::Closed.into()),
        }

        let seats = Seats::assign(player, player_count)?;
        self.adapter.call_init(game, seats.player)?;
        self.state = LifecycleState::Initialized(seats);
        self.decisions = 0;

        info!(
            "{} initialized for {} as {} (opponent {})",
            self.name, game.name, seats.player, seats.opponent
        );
        Ok(())
    }

    /// Ask the native side for the next move.
    ///
    /// Both transport messages are rebuilt from the snapshot on every call.
    /// The budget is forwarded as a ceiling; the bridge has no way to stop a
    /// native call that ignores it. A native fault leaves the handle
    /// initialized and still owing a `close`.
    pub fn select_action(
        &mut self,
        game: &GameDescriptor,
        state: &StateSnapshot,
        budget: &DecisionBudget,
    ) -> Result<Move> {
        let seats = match self.state {
            LifecycleState::Initialized(seats) => seats,
            LifecycleState::LoaderReady => return Err(Misuse::NotInitialized.into()),
            LifecycleState::Closed => return Err(Misuse::Closed.into()),
        };
        budget.validate()?;

        let messages = TransportMessages::collect(state, &seats);
        debug!(
            "{} selecting: own=\"{}\" referee=\"{}\" budget={:?}",
            self.name, messages.own, messages.referee, budget
        );

        let started = Instant::now();
        let chosen = self.adapter.call_select(
            game,
            state,
            budget,
            &messages.own,
            &messages.referee,
        )?;
        let elapsed = started.elapsed();

        if let Some(limit) = budget.time_limit() {
            if elapsed > limit {
                warn!(
                    "{} overran its time budget: {:?} > {:?}",
                    self.name, elapsed, limit
                );
            }
        }
        self.decisions += 1;
        debug!(
            "{} chose {}->{} in {:?} (decision {})",
            self.name, chosen.from, chosen.to, elapsed, self.decisions
        );
        Ok(chosen)
    }

    /// Release the native instance.
    ///
    /// Closing an already closed handle is a no-op. The handle is closed even
    /// when native teardown faults; the fault is still returned.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Initialized(_) => {}
            LifecycleState::Closed => {
                debug!("{} already closed", self.name);
                return Ok(());
            }
            LifecycleState::LoaderReady => return Err(Misuse::NotInitialized.into()),
        }

        self.state = LifecycleState::Closed;
        let result = self.adapter.call_close();
        info!("{} closed after {} decisions", self.name, self.decisions);
        result
    }

    /// Whether the native agent can play `game`.
    ///
    /// Games without exactly two seats are refused without asking the
    /// native side, since no opponent seat could be derived for them.
    pub fn supports_game(&self, game: &GameDescriptor) -> Result<bool> {
        if game.num_players != SUPPORTED_PLAYER_COUNT {
            debug!(
                "{} declines {}: {} players",
                self.name, game.name, game.num_players
            );
            return Ok(false);
        }
        self.adapter.call_supports(game)
    }
}

impl<A: NativeAgent> Agent for KriegspielAgent<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn init_ai(&mut self, game: &GameDescriptor, player: u32) -> Result<()> {
        self.initialize(game, player, game.num_players)
    }

    fn select_action(
        &mut self,
        game: &GameDescriptor,
        state: &StateSnapshot,
        budget: &DecisionBudget,
    ) -> Result<Move> {
        KriegspielAgent::select_action(self, game, state, budget)
    }

    fn close_ai(&mut self) -> Result<()> {
        self.close()
    }

    fn supports_game(&self, game: &GameDescriptor) -> Result<bool> {
        KriegspielAgent::supports_game(self, game)
    }
}

impl<A: NativeAgent> Drop for KriegspielAgent<A> {
    fn drop(&mut self) {
        if let LifecycleState::Initialized(_) = self.state {
            warn!("{} dropped while initialized; closing", self.name);
            if let Err(e) = self.close() {
                warn!("{} failed to close on drop: {}", self.name, e);
            }
        }
    }
}

/// True when `err` reports a lifecycle call made out of order
pub fn is_misuse(err: &BridgeError) -> bool {
    matches!(err, BridgeError::Misuse(_))
}
