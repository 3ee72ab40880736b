use std::path::PathBuf;

/// Returned by a queue operation attempted after the queue was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue closed")]
pub struct QueueClosed;

/// Errors that can occur while starting or joining a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    #[error("thread {0} panicked")]
    Panicked(String),

    #[error("player {player} out of range (players: {players})")]
    UnknownPlayer { player: usize, players: usize },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
