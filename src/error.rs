//! Error types for lexmode

use thiserror::Error;

/// Result type alias for lexmode operations
pub type Result<T> = std::result::Result<T, ModeError>;

/// Mode framework error types
#[derive(Error, Debug)]
pub enum ModeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("MIME alias cycle: {}", .0.join(" -> "))]
    AliasCycle(Vec<String>),

    #[error("No such mode: {0}")]
    UnknownMode(String),

    #[error("{0}")]
    Message(String),
}
