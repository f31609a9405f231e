use std::str::FromStr;

use super::nom_parser::ParsedMessage;
use super::tags::{parse_tags, Tags};
use crate::error::MessageParseError;

/// A single IRC protocol line.
///
/// `parse(serialize(m))` reproduces every field of `m` as long as only the
/// final parameter contains spaces, is empty, or starts with `:`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    /// IRCv3 tags.
    pub tags: Tags,
    /// Origin of the message, without the leading `:`.
    pub prefix: Option<String>,
    /// Command verb or three-digit numeric.
    pub command: String,
    /// Ordered parameters; the last one may contain spaces.
    pub params: Vec<String>,
}

impl Message {
    /// Create a message from a command and its parameters.
    #[must_use]
    pub fn new<C, I, S>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Tags::new(),
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a line, tolerating a trailing CR/LF.
    pub fn parse(line: &str) -> Result<Self, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let parsed = ParsedMessage::parse(line)?;
        Ok(Self {
            tags: parsed.tags.map(parse_tags).unwrap_or_default(),
            prefix: parsed.prefix.map(str::to_owned),
            command: parsed.command.to_owned(),
            params: parsed.params.into_iter().map(str::to_owned).collect(),
        })
    }

    /// Attach a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Attach a prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Parameter at `index`.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Value of tag `key`.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Whether the command is a three-digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }

    /// The numeric reply code, if the command is one.
    pub fn numeric(&self) -> Option<u16> {
        if self.is_numeric() {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// `PRIVMSG <target> :<text>`
    #[must_use]
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("PRIVMSG", [target.into(), text.into()])
    }

    /// `NOTICE <target> :<text>`
    #[must_use]
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("NOTICE", [target.into(), text.into()])
    }

    /// `JOIN <channel>`
    #[must_use]
    pub fn join(channel: impl Into<String>) -> Self {
        Self::new("JOIN", [channel.into()])
    }

    /// `PART <channel> [:<reason>]`
    #[must_use]
    pub fn part(channel: impl Into<String>, reason: Option<&str>) -> Self {
        let mut params = vec![channel.into()];
        params.extend(reason.map(str::to_owned));
        Self::new("PART", params)
    }

    /// `NICK <nickname>`
    #[must_use]
    pub fn nick(nickname: impl Into<String>) -> Self {
        Self::new("NICK", [nickname.into()])
    }

    /// `USER <username> * * :<realname>`
    #[must_use]
    pub fn user(username: impl Into<String>, realname: impl Into<String>) -> Self {
        Self::new("USER", [username.into(), "*".into(), "*".into(), realname.into()])
    }

    /// `PASS <password>`
    #[must_use]
    pub fn pass(password: impl Into<String>) -> Self {
        Self::new("PASS", [password.into()])
    }

    /// `PING <token>`
    #[must_use]
    pub fn ping(token: impl Into<String>) -> Self {
        Self::new("PING", [token.into()])
    }

    /// `PONG <token>`
    #[must_use]
    pub fn pong(token: impl Into<String>) -> Self {
        Self::new("PONG", [token.into()])
    }

    /// `QUIT :<reason>`
    #[must_use]
    pub fn quit(reason: impl Into<String>) -> Self {
        Self::new("QUIT", [reason.into()])
    }

    /// `CAP <subcommand> [args...]`
    #[must_use]
    pub fn cap<I, S>(subcommand: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params = vec![subcommand.to_owned()];
        params.extend(args.into_iter().map(Into::into));
        Self::new("CAP", params)
    }

    /// `AUTHENTICATE <data>`
    #[must_use]
    pub fn authenticate(data: impl Into<String>) -> Self {
        Self::new("AUTHENTICATE", [data.into()])
    }

    /// `MODE <target> [modes...]`
    #[must_use]
    pub fn mode<I, S>(target: impl Into<String>, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params = vec![target.into()];
        params.extend(modes.into_iter().map(Into::into));
        Self::new("MODE", params)
    }

    /// `WHO <mask> <fields>`
    #[must_use]
    pub fn who(mask: impl Into<String>, fields: impl Into<String>) -> Self {
        Self::new("WHO", [mask.into(), fields.into()])
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}
