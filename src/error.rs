use crate::host::Host;
use thiserror::Error;

/// Result type alias for the Terrastore client
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Terrastore client
#[derive(Error, Debug)]
pub enum Error {
    /// No host answered: every candidate the host manager offered failed at the transport level
    #[error("Unable to reach {host}: {source}")]
    Connectivity {
        host: Host,
        #[source]
        source: reqwest::Error,
    },

    /// The requested bucket or key does not exist
    #[error("Key not found ({code}): {message}")]
    KeyNotFound { code: i64, message: String },

    /// The predicate of a conditional operation was not satisfied by the stored value
    #[error("Unsatisfied condition ({code}): {message}")]
    UnsatisfiedCondition { code: i64, message: String },

    /// Any other failure response from a reachable server
    #[error("Server error ({status}): {message}")]
    Server {
        status: u16,
        code: i64,
        message: String,
    },

    /// The server answered but its response body could not be read to the end
    #[error("Incomplete response from {host}: {source}")]
    ResponseBody {
        host: Host,
        #[source]
        source: reqwest::Error,
    },

    /// Local failure to write a request body or read a response body
    #[error("Codec error: {0}")]
    Codec(String),

    /// Input rejected before any network call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The host manager has no host to offer
    #[error("No hosts available")]
    NoHostsAvailable,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// True when the store could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connectivity { .. })
    }

    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. })
    }

    pub fn is_unsatisfied_condition(&self) -> bool {
        matches!(self, Error::UnsatisfiedCondition { .. })
    }

    /// True when a reachable server answered and rejected the operation.
    ///
    /// Remote rejections are definitive and are never retried against another host.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::KeyNotFound { .. } | Error::UnsatisfiedCondition { .. } | Error::Server { .. }
        )
    }

    /// HTTP status reported by the server, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::KeyNotFound { .. } => Some(404),
            Error::UnsatisfiedCondition { .. } => Some(409),
            Error::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Codec(err.to_string())
    }
}
