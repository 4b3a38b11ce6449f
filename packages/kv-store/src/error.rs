//! Error types for the backend layer.
//!
//! Errors at this level are transport-focused. Schemes, endpoints and path
//! validity belong in higher layers.

/// Errors at the backend layer.
#[derive(thiserror::Error, Debug)]
pub enum KvError {
    /// The backend could not be reached, or the connection dropped mid-call.
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No connection could be checked out of the pool.
    #[error("pool error: {message}")]
    Pool { message: String },

    /// A command that needs an existing key was issued against an absent one.
    #[error("no such key: {key}")]
    NoSuchKey { key: String },

    /// The backend rejected the command.
    #[error("command failed: {message}")]
    Command { message: String },

    /// The backend answered with something that could not be interpreted.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl KvError {
    pub fn command(message: impl Into<String>) -> Self {
        KvError::Command {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        KvError::Protocol {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for KvError {
    fn from(e: std::io::Error) -> Self {
        KvError::Connection(Box::new(e))
    }
}
