//! Hostmask and extban matching.
//!
//! A mask is either an extban (`$[~]type[:param]`, using the server's
//! advertised extban prefix) or a classic `nick!user@host` glob.
//! Matching is tri-state: when the user snapshot does not yet carry the
//! information a mask needs, the answer is [`MatchResult::Indeterminate`].
//!
//! ```
//! use slirc_client::mask::{HostMask, MatchResult};
//! use slirc_client::model::User;
//! use slirc_client::prefix::Prefix;
//!
//! let user = User::from_prefix(&Prefix::parse("a!b@c")).unwrap();
//! let mask = HostMask::parse("a!?@c", None).unwrap();
//! assert_eq!(mask.matches(&user), MatchResult::Match);
//! ```

use std::fmt;

use regex::Regex;

use crate::error::ClientError;
use crate::isupport::ExtbanSpec;
use crate::model::{SkeletonStatus, User};

/// Result of matching a mask against a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchResult {
    Match,
    NoMatch,
    /// Not enough is known about the user to decide.
    Indeterminate,
}

impl MatchResult {
    fn from_bool(matched: bool) -> Self {
        if matched {
            MatchResult::Match
        } else {
            MatchResult::NoMatch
        }
    }

    pub fn is_match(self) -> bool {
        self == MatchResult::Match
    }
}

/// A compiled mask.
#[derive(Clone, Debug)]
pub enum HostMask {
    Extban {
        prefix: char,
        inverted: bool,
        kind: char,
        param: Option<String>,
    },
    Standard {
        raw: String,
        nick: Regex,
        user: Regex,
        host: Regex,
    },
}

/// Compile one mask segment: `*` is any run, `?` any single character.
fn compile_glob(segment: &str) -> Result<Regex, ClientError> {
    let mut pattern = String::with_capacity(segment.len() + 8);
    pattern.push_str("(?is)^");
    let mut literal = [0u8; 4];
    for c in segment.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(c.encode_utf8(&mut literal))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| ClientError::InvalidMask(e.to_string()))
}

impl HostMask {
    /// Compile a mask.
    ///
    /// With `extban` absent only the standard form is recognized.
    pub fn parse(mask: &str, extban: Option<&ExtbanSpec>) -> Result<Self, ClientError> {
        if let Some(prefix) = extban.and_then(|spec| spec.prefix) {
            if let Some(rest) = mask.strip_prefix(prefix) {
                return Self::parse_extban(prefix, rest, mask);
            }
        }
        Self::parse_standard(mask)
    }

    fn parse_extban(prefix: char, rest: &str, mask: &str) -> Result<Self, ClientError> {
        let (inverted, rest) = match rest.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };
        let mut chars = rest.chars();
        let kind = chars
            .next()
            .filter(char::is_ascii_alphabetic)
            .ok_or_else(|| ClientError::InvalidMask(mask.to_string()))?;
        let tail = chars.as_str();

        let param = match tail.strip_prefix(':') {
            Some("") => return Err(ClientError::InvalidMask(mask.to_string())),
            Some(param) => Some(param.to_string()),
            None if tail.is_empty() => None,
            None => return Err(ClientError::InvalidMask(mask.to_string())),
        };

        Ok(HostMask::Extban { prefix, inverted, kind, param })
    }

    fn parse_standard(mask: &str) -> Result<Self, ClientError> {
        let invalid = || ClientError::InvalidMask(mask.to_string());
        let (nick_user, host) = mask.rsplit_once('@').ok_or_else(invalid)?;
        let (nick, user) = nick_user.rsplit_once('!').ok_or_else(invalid)?;
        if nick.is_empty() || user.is_empty() || host.is_empty() {
            return Err(invalid());
        }

        Ok(HostMask::Standard {
            raw: mask.to_string(),
            nick: compile_glob(nick)?,
            user: compile_glob(user)?,
            host: compile_glob(host)?,
        })
    }

    /// Match against a user snapshot.
    pub fn matches(&self, subject: &User) -> MatchResult {
        match self {
            HostMask::Extban { inverted, kind, param, .. } => match kind {
                // 'a' on charybdis-family servers, 'R' on InspIRCd
                'a' | 'R' => match_account(subject, *inverted, param.as_deref()),
                _ => MatchResult::Indeterminate,
            },
            HostMask::Standard { nick, user, host, .. } => {
                let (Some(username), Some(hostname)) = (subject.username(), subject.hostname())
                else {
                    return MatchResult::Indeterminate;
                };
                MatchResult::from_bool(
                    nick.is_match(subject.nickname())
                        && user.is_match(username)
                        && host.is_match(hostname),
                )
            }
        }
    }
}

fn match_account(subject: &User, inverted: bool, param: Option<&str>) -> MatchResult {
    if subject.skeleton() < SkeletonStatus::Account {
        return MatchResult::Indeterminate;
    }
    let matched = match param {
        None => subject.account().is_some(),
        Some(name) => subject.account() == Some(name),
    };
    MatchResult::from_bool(matched != inverted)
}

impl fmt::Display for HostMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostMask::Extban { prefix, inverted, kind, param } => {
                write!(f, "{}{}{}", prefix, if *inverted { "~" } else { "" }, kind)?;
                if let Some(param) = param {
                    write!(f, ":{}", param)?;
                }
                Ok(())
            }
            HostMask::Standard { raw, .. } => f.write_str(raw),
        }
    }
}
