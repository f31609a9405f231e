//! IRC message codec.
//!
//! A [`Message`] is one protocol line: optional IRCv3 tags, optional
//! prefix, a command verb or numeric, and an ordered parameter list.
//! Parsing goes through a nom tokenizer; serialization is the inverse
//! construction through [`std::fmt::Display`].

mod nom_parser;
mod serialize;
pub mod tags;
mod types;

pub use self::nom_parser::{DetailedParseError, ParsedMessage};
pub use self::types::Message;
