//! Configuration constants for the parlor game server
//!
//! This module contains the limits and defaults used throughout the engine
//! to keep lobbies, logs, and player input inside consistent boundaries.

/// Lobby and seating limits
pub mod lobby {
    /// Maximum number of live (connected) player slots in a lobby
    pub const MAX_LIVE_PLAYERS: usize = 2;
    /// Maximum length of a lobby name in bytes
    pub const MAX_NAME_LENGTH: usize = 40;
    /// Maximum length of a lobby password in bytes
    pub const MAX_PASSWORD_LENGTH: usize = 64;
}

/// Player name limits
pub mod names {
    /// Maximum length of a display name in bytes
    pub const MAX_LENGTH: usize = 30;
}

/// Turn timer configuration
pub mod timer {
    /// Interval between two countdown ticks, in seconds
    pub const TICK_SECONDS: u64 = 1;
    /// Default turn duration, in seconds, for every game mode
    pub const DEFAULT_TURN_SECONDS: u64 = 60 * 60;
    /// Shortest configurable turn duration, in seconds
    pub const MIN_TURN_SECONDS: u64 = 5;
    /// Longest configurable turn duration, in seconds
    pub const MAX_TURN_SECONDS: u64 = 24 * 60 * 60;
}

/// Chat configuration
pub mod chat {
    /// Default number of chat messages kept per lobby
    pub const HISTORY_LIMIT: usize = 500;
    /// Upper bound for a configured chat history limit
    pub const MAX_HISTORY_LIMIT: usize = 5_000;
    /// Maximum length of a single chat message in bytes
    pub const MAX_LENGTH: usize = 1_000;
}

/// Round history configuration
pub mod history {
    /// Default number of round records kept per lobby
    pub const LIMIT: usize = 500;
    /// Upper bound for a configured round history limit
    pub const MAX_LIMIT: usize = 5_000;
}

/// Submission limits shared by every game mode
pub mod submission {
    /// Maximum length of an answer, choice, or statement in bytes
    pub const MAX_TEXT_LENGTH: usize = 500;
    /// Maximum length of an image reference in bytes
    pub const MAX_IMAGE_REFERENCE_LENGTH: usize = 2_048;
    /// Number of statements in a two truths one lie set
    pub const STATEMENT_COUNT: usize = 3;
}
