//! Error types for the Kriegspiel bridge

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// Native library could not be located or loaded
    #[error("Failed to load native library `{library}` (search path: {search_path}): {reason}")]
    LibraryLoad {
        library: String,
        search_path: String,
        reason: String,
    },

    /// Native library lacks a required export
    #[error("Native library `{library}` does not export `{symbol}`")]
    MissingSymbol { library: String, symbol: String },

    /// Native library was built against a different ABI
    #[error("Native library `{library}` speaks ABI v{found}, host expects v{expected}")]
    AbiMismatch {
        library: String,
        expected: u32,
        found: u32,
    },

    /// Lifecycle call out of order
    #[error("Lifecycle misuse: {0}")]
    Misuse(Misuse),

    /// Fault raised while executing a native call
    #[error("Native call `{operation}` failed: {message}")]
    NativeCall {
        operation: NativeOperation,
        message: String,
    },

    /// Player index outside `1..=player_count`
    #[error("Invalid player index {player} for {player_count} players")]
    InvalidPlayer { player: u32, player_count: u32 },

    /// Opponent derivation is only defined for two seats
    #[error("Unsupported player count {0}: only two-player games can derive an opponent seat")]
    UnsupportedPlayerCount(u32),

    /// Budget values the native side cannot honour
    #[error("Invalid decision budget: {0}")]
    InvalidBudget(String),

    /// Value could not be marshaled across the native boundary
    #[error("Marshaling error: {0}")]
    Marshal(String),

    /// Watchdog gave up waiting for the native decision
    #[error("Agent missed decision deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BridgeError {
    /// Build a fault attributed to `operation`
    pub fn native(operation: NativeOperation, message: impl Into<String>) -> Self {
        BridgeError::NativeCall {
            operation,
            message: message.into(),
        }
    }

    /// Whether this error means the agent type is unusable in this process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::LibraryLoad { .. }
                | BridgeError::MissingSymbol { .. }
                | BridgeError::AbiMismatch { .. }
        ) || matches!(
            self,
            BridgeError::NativeCall {
                operation: NativeOperation::StaticSetup,
                ..
            }
        )
    }
}

impl From<Misuse> for BridgeError {
    fn from(misuse: Misuse) -> Self {
        BridgeError::Misuse(misuse)
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

/// Lifecycle calls issued in the wrong state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Misuse {
    #[error("agent has not been initialized")]
    NotInitialized,
    #[error("agent is already initialized; close it first")]
    AlreadyInitialized,
    #[error("agent handle has been closed and cannot be reused")]
    Closed,
}

/// Operations that cross the native boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOperation {
    StaticSetup,
    Init,
    Select,
    Close,
    SupportsGame,
}

impl fmt::Display for NativeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeOperation::StaticSetup => "static_setup",
            NativeOperation::Init => "init",
            NativeOperation::Select => "select",
            NativeOperation::Close => "close",
            NativeOperation::SupportsGame => "supports_game",
        };
        f.write_str(name)
    }
}
