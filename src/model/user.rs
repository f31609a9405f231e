use std::fmt;
use std::hash::{Hash, Hasher};

use crate::prefix::Prefix;

/// How much of a tracked user's identity is known.
///
/// Levels are ordered and a tracked user never moves to a lower one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SkeletonStatus {
    /// Only the nickname is known (NAMES).
    #[default]
    NickOnly,
    /// `nick!user@host` is known (message prefix).
    PrefixOnly,
    /// The account is known (extended-join, account-tag, ACCOUNT).
    Account,
    /// Everything is known (WHOX).
    Full,
}

/// A user as last reported by the server.
///
/// Two users compare equal when their rendered forms do, see
/// [`User`]'s `Display` impl.
#[derive(Clone, Debug)]
pub struct User {
    nickname: String,
    username: Option<String>,
    hostname: Option<String>,
    account: Option<String>,
    away: bool,
    skeleton: SkeletonStatus,
}

/// `*` and `0` are the wire forms of "no account".
fn normalize_account(account: Option<&str>) -> Option<String> {
    match account {
        None | Some("") | Some("*") | Some("0") => None,
        Some(name) => Some(name.to_owned()),
    }
}

impl User {
    /// A user known only by nickname.
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            username: None,
            hostname: None,
            account: None,
            away: false,
            skeleton: SkeletonStatus::NickOnly,
        }
    }

    /// Build a user from a message prefix.
    ///
    /// Returns `None` for server prefixes. The skeleton is `PrefixOnly` only
    /// when both username and hostname are present.
    pub fn from_prefix(prefix: &Prefix) -> Option<Self> {
        match prefix {
            Prefix::Server(_) => None,
            Prefix::User { nick, user, host } => {
                let mut u = User::new(nick.clone());
                u.username = user.clone();
                u.hostname = host.clone();
                if prefix.is_full() {
                    u.skeleton = SkeletonStatus::PrefixOnly;
                }
                Some(u)
            }
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Services account, `None` when logged out or unknown.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn is_away(&self) -> bool {
        self.away
    }

    pub fn skeleton(&self) -> SkeletonStatus {
        self.skeleton
    }

    /// Raise the skeleton status; lower levels are ignored.
    pub fn upgrade(&mut self, status: SkeletonStatus) {
        if status > self.skeleton {
            self.skeleton = status;
        }
    }

    /// Record the account and raise the skeleton to at least `Account`.
    pub fn set_account(&mut self, account: Option<&str>) {
        self.account = normalize_account(account);
        self.upgrade(SkeletonStatus::Account);
    }

    /// Record username and hostname and raise the skeleton to at least `PrefixOnly`.
    pub fn set_userhost(&mut self, username: impl Into<String>, hostname: impl Into<String>) {
        self.username = Some(username.into());
        self.hostname = Some(hostname.into());
        self.upgrade(SkeletonStatus::PrefixOnly);
    }

    pub fn set_away(&mut self, away: bool) {
        self.away = away;
    }

    pub(crate) fn rename(&mut self, nickname: impl Into<String>) {
        self.nickname = nickname.into();
    }

    /// Fold a freshly parsed prefix into this cached user.
    ///
    /// Username and hostname are only taken while this user is below
    /// `PrefixOnly`; later host changes arrive through CHGHOST.
    pub fn merge_prefix(&mut self, seen: &User) {
        if self.skeleton < SkeletonStatus::PrefixOnly
            && seen.skeleton >= SkeletonStatus::PrefixOnly
        {
            self.username = seen.username.clone();
            self.hostname = seen.hostname.clone();
        }
        self.upgrade(seen.skeleton);
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(account) = &self.account {
            write!(f, "{} [", account)?;
        }
        f.write_str(&self.nickname)?;
        if let Some(user) = &self.username {
            write!(f, "!{}", user)?;
        }
        if let Some(host) = &self.hostname {
            write!(f, "@{}", host)?;
        }
        if self.account.is_some() {
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}
