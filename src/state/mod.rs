//! Sans-IO connection registration.
//!
//! [`RegistrationMachine`] performs no I/O. It consumes parsed messages and
//! produces [`RegistrationAction`]s for the caller to carry out, which keeps
//! the whole CAP / SASL / NICK dance testable without a socket.
//!
//! # Example
//!
//! ```
//! use slirc_client::state::{RegistrationAction, RegistrationConfig, RegistrationMachine};
//! use slirc_client::Message;
//!
//! let config = RegistrationConfig::new("testbot", "bot", "Test Bot");
//! let mut machine = RegistrationMachine::new(config);
//!
//! // CAP LS 302
//! let actions = machine.start();
//! assert_eq!(actions.len(), 1);
//!
//! let ls = Message::parse(":server CAP * LS :multi-prefix").unwrap();
//! for action in machine.feed(&ls) {
//!     if let RegistrationAction::Send(msg) = action {
//!         assert_eq!(msg.to_string(), "CAP REQ multi-prefix");
//!     }
//! }
//! ```

mod registration;

pub use self::registration::{
    RegistrationAction, RegistrationConfig, RegistrationMachine, RegistrationState,
};
