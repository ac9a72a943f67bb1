//! Error types for the runtime client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Socket or connection level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The runtime answered with an unexpected status or body
    #[error("Runtime returned {status}: {message}")]
    Protocol { status: u16, message: String },

    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("No usable shell found in container {0}")]
    NoShellAvailable(String),

    #[error("Container is not running: {0}")]
    ContainerNotRunning(String),

    #[error("Failed to connect to container runtime: {0}")]
    ConnectionFailed(String),

    #[error("Timeout waiting for operation")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// True for failures of the connection itself rather than of the request
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionFailed(_) | Self::Timeout | Self::Io(_)
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

impl From<bollard::errors::Error> for ProviderError {
    fn from(err: bollard::errors::Error) -> Self {
        use bollard::errors::Error as E;
        match err {
            E::DockerResponseServerError {
                status_code,
                message,
            } => match status_code {
                404 => Self::NotFound(message),
                409 if mentions_not_running(&message) => Self::ContainerNotRunning(message),
                _ => Self::Protocol {
                    status: status_code,
                    message,
                },
            },
            E::RequestTimeoutError => Self::Timeout,
            E::IOError { err } => Self::Io(err),
            other => Self::Transport(other.to_string()),
        }
    }
}

fn mentions_not_running(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("not running") || lower.contains("is paused") || lower.contains("is restarting")
}

pub type Result<T> = std::result::Result<T, ProviderError>;
