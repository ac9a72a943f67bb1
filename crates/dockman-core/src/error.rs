//! Error types for dockman-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] dockman_config::ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] dockman_provider::ProviderError),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("No containers belong to project '{0}'")]
    EmptyProject(String),

    #[error("No open session for container {0}")]
    SessionNotFound(String),

    #[error("Shell unavailable: {0}")]
    ShellUnavailable(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// The runtime could not be reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_transport())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
