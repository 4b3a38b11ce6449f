//! Error types for the core layer.

use std::io;

use kvfs_kv_store::KvError;

use crate::Endpoint;

/// Errors at the core layer.
///
/// These include semantic errors (bad URIs, unknown endpoints, missing keys)
/// in addition to the transport errors from the backend layer.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The URI names a scheme this provider does not serve.
    #[error("unsupported scheme {found:?}, expected {expected:?}")]
    UnsupportedScheme { found: String, expected: String },

    /// A filesystem is already registered for this endpoint.
    #[error("filesystem already exists for {endpoint}")]
    AlreadyExists { endpoint: Endpoint },

    /// No filesystem has been created for this endpoint.
    #[error("no filesystem for {endpoint}")]
    FileSystemNotFound { endpoint: Endpoint },

    /// The content key does not exist.
    #[error("no such key: {key}")]
    NoSuchKey { key: String },

    /// The content key exists but the caller asked for a fresh one.
    #[error("key already exists: {key}")]
    KeyExists { key: String },

    /// Copy and move only work within one endpoint.
    #[error("cannot copy or move between {from} and {to}")]
    CrossEndpoint { from: Endpoint, to: Endpoint },

    /// The operation has no meaning over a key/value backend.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: &'static str },

    /// A backend call failed.
    #[error("backend error: {0}")]
    Backend(#[source] KvError),

    /// The filesystem or channel has been closed.
    #[error("{resource} is closed")]
    Closed { resource: String },

    #[error("invalid URI {uri:?}: {message}")]
    InvalidUri { uri: String, message: String },

    #[error("invalid path: {message}")]
    InvalidPath { message: String },

    #[error("invalid path matcher {pattern:?}: {message}")]
    InvalidMatcher { pattern: String, message: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl Error {
    pub fn unsupported(operation: &'static str) -> Self {
        Error::Unsupported { operation }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// True for both a missing filesystem and a missing key.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::FileSystemNotFound { .. } | Error::NoSuchKey { .. }
        )
    }
}

impl From<KvError> for Error {
    fn from(e: KvError) -> Self {
        match e {
            KvError::NoSuchKey { key } => Error::NoSuchKey { key },
            other => Error::Backend(other),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match &e {
            Error::FileSystemNotFound { .. } | Error::NoSuchKey { .. } => io::ErrorKind::NotFound,
            Error::AlreadyExists { .. } | Error::KeyExists { .. } => io::ErrorKind::AlreadyExists,
            Error::Unsupported { .. } => io::ErrorKind::Unsupported,
            Error::UnsupportedScheme { .. }
            | Error::InvalidUri { .. }
            | Error::InvalidPath { .. }
            | Error::InvalidMatcher { .. }
            | Error::InvalidArgument { .. } => io::ErrorKind::InvalidInput,
            Error::CrossEndpoint { .. } | Error::Backend(_) | Error::Closed { .. } => {
                io::ErrorKind::Other
            }
        };
        io::Error::new(kind, e)
    }
}
