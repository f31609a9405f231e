//! # slirc-client
//!
//! An IRC client engine with IRCv3 capability negotiation, SASL login and
//! nickname/channel tracking.
//!
//! ## Features
//!
//! - IRC message parsing and serialization with IRCv3 tags
//! - `CAP LS 302` negotiation, including `cap-notify` additions and removals
//! - SASL `PLAIN` and `EXTERNAL` authentication
//! - A tracking cache of users, channels and channel status modes
//! - Host mask and extban matching against cached users
//! - Lag detection with optional forced disconnect and nickname reclaim
//! - Optional Tokio TCP/TLS transport
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_client::Message;
//!
//! let msg: Message = "@account=alice :alice!a@host PRIVMSG #rust :hi there"
//!     .parse()
//!     .expect("valid line");
//! assert_eq!(msg.tag("account"), Some("alice"));
//! assert_eq!(msg.arg(1), Some("hi there"));
//! assert_eq!(Message::privmsg("#rust", "hello").to_string(), "PRIVMSG #rust hello");
//! ```
//!
//! Connecting requires the `transport` feature (on by default); see
//! [`Client`] for a complete bot.

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod caps;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod isupport;
pub mod liveness;
pub mod mask;
pub mod message;
pub mod model;
pub mod prefix;
pub mod sasl;
pub mod state;
pub mod tracker;
pub mod transport;

pub use self::caps::{Capability, CapabilitySet};
pub use self::client::Client;
pub use self::config::ClientConfig;
pub use self::error::{ClientError, ConfigError, MessageParseError, Result, TrackingError};
pub use self::event::{Event, EventBus, EventKind, Source};
pub use self::isupport::ServerSupport;
pub use self::mask::{HostMask, MatchResult};
pub use self::message::Message;
pub use self::model::{Channel, ChannelMembership, DestinationFlag, SkeletonStatus, User};
pub use self::prefix::Prefix;
pub use self::tracker::{NickTracker, TrackingHealth};
#[cfg(feature = "transport")]
pub use self::transport::{LineReader, TcpTransport};
pub use self::transport::Transport;
