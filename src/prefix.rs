//! IRC message prefix (source) parsing.
//!
//! A prefix is either a server name or a user's `nick[!user][@host]`.

use std::fmt;

/// Origin of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// Server name (e.g. `irc.example.com`).
    Server(String),
    /// User origin; username and hostname are absent for bare-nick prefixes.
    User {
        /// Nickname.
        nick: String,
        /// Username (ident), if supplied.
        user: Option<String>,
        /// Hostname, if supplied.
        host: Option<String>,
    },
}

impl Prefix {
    /// Parse a prefix string.
    ///
    /// This is lenient: a dot in a prefix with no `!` or `@` marks it as a
    /// server name, since nicknames cannot contain dots.
    pub fn parse(s: &str) -> Self {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Part {
            Name,
            User,
            Host,
        }

        let mut name = String::new();
        let mut user = None::<String>;
        let mut host = None::<String>;
        let mut part = Part::Name;

        for c in s.chars() {
            match c {
                '!' if part == Part::Name => {
                    part = Part::User;
                    user = Some(String::new());
                }
                '@' if part != Part::Host => {
                    part = Part::Host;
                    host = Some(String::new());
                }
                _ => match part {
                    Part::Name => name.push(c),
                    Part::User => user.get_or_insert_with(String::new).push(c),
                    Part::Host => host.get_or_insert_with(String::new).push(c),
                },
            }
        }

        if user.is_none() && host.is_none() && name.contains('.') {
            return Prefix::Server(name);
        }

        Prefix::User {
            nick: name,
            user: user.filter(|u| !u.is_empty()),
            host: host.filter(|h| !h.is_empty()),
        }
    }

    /// Nickname, if this is a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::User { nick, .. } if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Whether both username and hostname were supplied.
    pub fn is_full(&self) -> bool {
        matches!(self, Prefix::User { user: Some(_), host: Some(_), .. })
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::User { nick, user, host } => {
                f.write_str(nick)?;
                if let Some(user) = user {
                    write!(f, "!{}", user)?;
                }
                if let Some(host) = host {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::parse(s)
    }
}
