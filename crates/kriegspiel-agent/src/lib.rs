//! Reference native Kriegspiel agent
//!
//! Built as a `cdylib` named `kriegspiel_agent`, this is the library the
//! bridge loads by default. It plays random pseudo-legal tries, retries after
//! the referee rejects one, and handles pawn promotion, which is enough to
//! exercise every call of the ABI.
//!
//! Set `KRIEGSPIEL_AGENT_SEED` to make its choices reproducible.

pub mod agent;
pub mod exports;

pub use agent::{Position, RandomAgent};
