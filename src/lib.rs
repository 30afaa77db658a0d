//! # Oddest One Out
//!
//! Core of a daily word puzzle: sixteen words in four rows, each row hides
//! one word that does not fit its category, and exactly one of those
//! outliers also stands apart from the other three.
//!
//! ## Features
//!
//! - **Game Engine**: puzzle randomization, session state machine, scoring
//!   and win/loss animation sequences, contextual tips
//! - **Puzzle Sources**: CSV puzzle sheet from a file or URL, cached, with a
//!   built-in fallback puzzle
//! - **Server Components**: HTTP JSON API over live game sessions
//!
//! ## Usage
//!
//! ```rust
//! use oddest_one_out::game::{fallback::fallback_puzzle, session::GameSession};
//!
//! let mut session = GameSession::new(fallback_puzzle());
//! let snapshot = session.select_word(0, 3);
//! assert_eq!(snapshot.selections().len(), 1);
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// Core game logic and rules
pub mod game;

/// Puzzle sources and live session management
pub mod services;

/// Server components (Web UI)
pub mod servers;

/// Logger setup
pub mod logging;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use game::puzzle::{Puzzle, RawCategory, RawPuzzle, Row, Word};
pub use game::session::{GameSession, GameSnapshot, Phase};
pub use servers::{WebUiConfig, WebUiServer};
pub use services::session_manager::SessionManager;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Main error type for the Oddest One Out library
#[derive(Debug, thiserror::Error)]
pub enum OddestOneOutError {
    #[error("Malformed puzzle input: {0}")]
    MalformedPuzzleInput(String),

    #[error("Puzzle source error: {0}")]
    PuzzleSource(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logger error: {0}")]
    Logger(#[from] flexi_logger::FlexiLoggerError),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OddestOneOutError>;

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
