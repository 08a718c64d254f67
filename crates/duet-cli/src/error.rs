use std::io;

use duet_core::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] duet_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Message count must be at least 1")]
    EmptyScript,
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    #[error("Update queue of {0} closed")]
    QueueClosed(String),
}
