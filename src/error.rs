//! Error handling for the pact library.
//!
//! Internally, functions return `Res<T>`, which is an `anyhow::Result`, and add context as errors
//! propagate. At the public boundary (the command handlers), errors are tagged with an `ErrorType`
//! so that the CLI and the MCP server can report what category of problem occurred.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type returned by command handlers.
pub type Result<T> = std::result::Result<T, Error>;

/// The broad category of a public error.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The pact home directory or its config file is missing or invalid.
    Config,
    /// A read or write against the local trip store failed.
    Database,
    /// The caller supplied a bad request, e.g. an unknown trip or a missing member identity.
    Request,
    /// The text-generation service failed or returned something unusable.
    Generation,
    /// The MCP service failed.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// A public error: an `anyhow::Error` tagged with its `ErrorType`.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Error")
            .field("error_type", &self.error_type)
            .field("inner", &self.inner)
            .finish()
    }
}

impl std::error::Error for Error {}

/// Converts an internal result into a public `Result` with the given `ErrorType`.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}
