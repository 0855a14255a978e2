//! Error types for the threat-sync system
//!
//! Feed-level variants (`UnknownParser`, `Fetch`, `UnexpectedStatus`,
//! `NoValidEntries`) are contained by the engine and only cause the owning
//! feed to be skipped. `RemoteReconcile`, `Authentication` and `NotFound`
//! come from the remote client; everything except `NotFound` during the
//! group lookup aborts the cycle.

use thiserror::Error;

/// Result type alias for threat-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the threat-sync system
#[derive(Error, Debug)]
pub enum Error {
    /// A feed references a parser identifier with no registration
    #[error("Unknown parser: {0}")]
    UnknownParser(String),

    /// Transport failure while fetching a feed
    #[error("Failed to fetch feed {feed}: {message}")]
    Fetch {
        /// Feed name
        feed: String,
        /// Error message
        message: String,
    },

    /// Feed source answered with a non-success status
    #[error("Unexpected status code from feed {feed}: {status}")]
    UnexpectedStatus {
        /// Feed name
        feed: String,
        /// HTTP status code
        status: u16,
    },

    /// Feed body parsed to zero entries
    #[error("No valid IPs found in feed {0}")]
    NoValidEntries(String),

    /// The address-group could not be read, created or updated
    #[error("Remote reconcile failed: {0}")]
    RemoteReconcile(String),

    /// Remote object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// The operation was aborted by a shutdown signal
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create an unknown parser error
    pub fn unknown_parser(name: impl Into<String>) -> Self {
        Self::UnknownParser(name.into())
    }

    /// Create a feed fetch error
    pub fn fetch(feed: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            feed: feed.into(),
            message: message.into(),
        }
    }

    /// Create an unexpected status error
    pub fn unexpected_status(feed: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            feed: feed.into(),
            status,
        }
    }

    /// Create a "no valid entries" error
    pub fn no_valid_entries(feed: impl Into<String>) -> Self {
        Self::NoValidEntries(feed.into())
    }

    /// Create a remote reconcile error
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteReconcile(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// True for errors that only affect a single feed
    ///
    /// The engine rewraps anything else a parser returns as `Fetch`.
    pub fn is_feed_level(&self) -> bool {
        matches!(
            self,
            Self::UnknownParser(_)
                | Self::Fetch { .. }
                | Self::UnexpectedStatus { .. }
                | Self::NoValidEntries(_)
        )
    }
}
