//! # kriegspiel-core
//!
//! Core types and traits for the Kriegspiel native agent bridge.
//!
//! This crate provides the foundational types shared by the host-side bridge
//! and the native agents it drives:
//! - Seat assignment (player and opponent indices)
//! - Per-player note logs and the transport messages built from them
//! - Decision budgets
//! - Game descriptors, state snapshots and moves
//! - The host-facing `Agent` trait
//! - The bridge error taxonomy

pub mod agent;
pub mod budget;
pub mod error;
pub mod game;
pub mod notes;
pub mod player;

pub use agent::Agent;
pub use budget::DecisionBudget;
pub use error::{BridgeError, Misuse, NativeOperation, Result};
pub use game::{GameDescriptor, Move, StateSnapshot};
pub use notes::{NOTE_DELIMITER, NoteLog, TransportMessages, join_notes, split_transport};
pub use player::{PlayerIndex, SUPPORTED_PLAYER_COUNT, Seats};
