//! Error types for the IRC client engine.
//!
//! This module defines error types for message parsing failures,
//! nick-tracking corruption, configuration loading, and engine operations.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Top-level engine errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error during connecting, reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup or handshake failure.
    #[error("tls error: {0}")]
    Tls(String),

    /// An inbound line could not be parsed.
    #[error("invalid message: {0}")]
    Parse(#[from] MessageParseError),

    /// The nick-tracking store detected an inconsistency.
    #[error("nick tracking error: {0}")]
    Tracking(#[from] TrackingError),

    /// A status-message destination flag the server did not advertise.
    #[error("server does not support destination flag {0:?}")]
    UnsupportedDestinationFlag(char),

    /// `JOIN 0` parts every channel and is refused.
    #[error("refusing to join channel \"0\"")]
    JoinZeroRejected,

    /// A hostmask could not be compiled.
    #[error("invalid mask: {0}")]
    InvalidMask(String),

    /// The engine has been torn down.
    #[error("client is disconnected")]
    Disconnected,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// The line ended before a command token.
    #[error("missing command")]
    MissingCommand,

    /// Command token contained characters outside `[A-Za-z0-9]`.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Parsing error with context from the nom tokenizer.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}

/// Faults detected by the nick-tracking store.
///
/// The first fault latches the store into
/// [`TrackingHealth::Invalid`](crate::tracker::TrackingHealth::Invalid).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackingError {
    /// A nickname was inserted into the user cache twice.
    #[error("nickname {0} is already tracked")]
    DuplicateNick(String),

    /// A nickname was inserted into a channel's membership map twice.
    #[error("{nick} is already a member of {channel}")]
    DuplicateMembership {
        /// Channel name.
        channel: String,
        /// Nickname.
        nick: String,
    },

    /// The local user joined a channel that was already tracked.
    #[error("channel {0} is already tracked")]
    DuplicateChannel(String),

    /// A nickname assumed to be cached was not.
    #[error("nickname {0} is not tracked")]
    UnknownUser(String),

    /// A channel assumed to be tracked was not.
    #[error("channel {0} is not tracked")]
    UnknownChannel(String),

    /// A nickname assumed to be a member of a channel was not.
    #[error("{nick} is not a member of {channel}")]
    MissingMembership {
        /// Channel name.
        channel: String,
        /// Nickname.
        nick: String,
    },

    /// A membership entry refers to a different nickname than its key.
    #[error("membership for {key} in {channel} refers to {found}")]
    MembershipMismatch {
        /// Channel name.
        channel: String,
        /// Key under which the membership is stored.
        key: String,
        /// Nickname recorded on the membership.
        found: String,
    },

    /// A WHOX reply did not carry exactly eight parameters.
    #[error("malformed WHOX reply: expected 8 parameters, got {got}")]
    MalformedWhox {
        /// Actual parameter count.
        got: usize,
    },

    /// A WHOX reply carried an empty flags field.
    #[error("malformed WHOX reply: empty flags")]
    EmptyWhoxFlags,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document was malformed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field held an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackingError::MalformedWhox { got: 5 };
        assert_eq!(
            format!("{}", err),
            "malformed WHOX reply: expected 8 parameters, got 5"
        );

        let err = ClientError::UnsupportedDestinationFlag('%');
        assert_eq!(
            format!("{}", err),
            "server does not support destination flag '%'"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let client_err: ClientError = io_err.into();
        assert!(matches!(client_err, ClientError::Io(_)));

        let tracking: ClientError = TrackingError::UnknownUser("alice".into()).into();
        assert!(matches!(tracking, ClientError::Tracking(_)));
    }

    #[test]
    fn test_config_error_source_chaining() {
        let err = ConfigError::Read {
            path: PathBuf::from("/nonexistent.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert_eq!(source.unwrap().to_string(), "not found");
    }
}
