//! Nick-tracking store.
//!
//! Mirrors the server's view of who is in which channel. Every nickname
//! that is a member of a tracked channel is also in the user cache, and a
//! nickname leaves the cache once no tracked channel holds it (the local
//! user excepted).
//!
//! Any inconsistency latches [`TrackingHealth::Invalid`]. The store keeps
//! working afterwards but its answers are no longer trustworthy; nothing
//! resets the latch.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::TrackingError;
use crate::isupport::ServerSupport;
use crate::model::{Channel, ChannelMembership, SkeletonStatus, User};

/// Whether the store still mirrors the server faithfully.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TrackingHealth {
    #[default]
    Valid,
    /// Latched by the first detected fault.
    Invalid(TrackingError),
}

impl TrackingHealth {
    pub fn is_valid(&self) -> bool {
        matches!(self, TrackingHealth::Valid)
    }
}

/// A status-prefix change applied by a channel MODE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixChange {
    pub nick: String,
    pub mode: char,
    pub symbol: char,
    pub added: bool,
}

#[derive(Debug, Default)]
pub struct NickTracker {
    users: HashMap<String, User>,
    channels: HashMap<String, Channel>,
    own_nick: Option<String>,
    health: TrackingHealth,
}

impl NickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health(&self) -> &TrackingHealth {
        &self.health
    }

    pub fn user(&self, nick: &str) -> Option<&User> {
        self.users.get(nick)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn own_nick(&self) -> Option<&str> {
        self.own_nick.as_deref()
    }

    pub fn is_self(&self, nick: &str) -> bool {
        self.own_nick.as_deref() == Some(nick)
    }

    /// Record the local nickname and make sure it is cached.
    pub fn seed_self(&mut self, nick: &str) {
        self.own_nick = Some(nick.to_owned());
        self.users
            .entry(nick.to_owned())
            .or_insert_with(|| User::new(nick));
    }

    /// Latch the store invalid and hand the fault back for propagation.
    fn fail(&mut self, err: TrackingError) -> TrackingError {
        warn!(error = %err, "nick tracking is no longer consistent");
        if self.health.is_valid() {
            self.health = TrackingHealth::Invalid(err.clone());
        }
        err
    }

    /// Drop `nick` from the cache if no tracked channel holds it any more.
    fn forget_if_orphaned(&mut self, nick: &str) {
        if self.is_self(nick) || self.channels.values().any(|c| c.contains(nick)) {
            return;
        }
        if self.users.remove(nick).is_some() {
            debug!(nick = %nick, "user left all tracked channels");
        }
    }

    /// Resolve a message source against the cache.
    ///
    /// A cached user absorbs the prefix details and the account tag and a
    /// snapshot of it is returned. Unknown users, or any user once tracking
    /// is invalid, come back as the unmerged `seen` snapshot.
    pub fn resolve(&mut self, mut seen: User, account_tag: Option<&str>) -> User {
        if self.health.is_valid() {
            if let Some(cached) = self.users.get_mut(seen.nickname()) {
                cached.merge_prefix(&seen);
                if let Some(account) = account_tag {
                    cached.set_account(Some(account));
                }
                return cached.clone();
            }
        }
        if let Some(account) = account_tag {
            seen.set_account(Some(account));
        }
        seen
    }

    /// Handle a JOIN.
    ///
    /// `account` is the extended-join account field; it only fills in users
    /// whose account is not yet known.
    pub fn join(
        &mut self,
        channel: &str,
        seen: User,
        account: Option<&str>,
    ) -> Result<User, TrackingError> {
        let nick = seen.nickname().to_owned();
        let user = self.users.entry(nick.clone()).or_insert(seen);
        if let Some(account) = account {
            if user.skeleton() < SkeletonStatus::Account {
                user.set_account(Some(account));
            }
        }
        let snapshot = user.clone();

        if self.is_self(&nick) {
            if self.channels.contains_key(channel) {
                return Err(self.fail(TrackingError::DuplicateChannel(channel.to_owned())));
            }
            debug!(channel = %channel, "tracking channel");
            self.channels.insert(channel.to_owned(), Channel::new(channel));
            return Ok(snapshot);
        }

        let Some(chan) = self.channels.get_mut(channel) else {
            return Err(self.fail(TrackingError::UnknownChannel(channel.to_owned())));
        };
        if chan.contains(&nick) {
            return Err(self.fail(TrackingError::DuplicateMembership {
                channel: channel.to_owned(),
                nick,
            }));
        }
        chan.insert(ChannelMembership::new(nick));
        Ok(snapshot)
    }

    /// Handle a 353 NAMES reply body.
    ///
    /// Each token may carry several leading status prefixes (multi-prefix)
    /// and may be a full `nick!user@host` (userhost-in-names).
    pub fn names(&mut self, channel: &str, list: &str, support: &ServerSupport) {
        let Some(chan) = self.channels.get_mut(channel) else {
            debug!(channel = %channel, "ignoring NAMES for untracked channel");
            return;
        };

        for token in list.split_whitespace() {
            let mut rest = token;
            let mut modes = Vec::new();
            while let Some(symbol) = rest.chars().next() {
                let Some(mode) = support.mode_for_prefix(symbol) else { break };
                modes.push((mode, symbol));
                rest = &rest[symbol.len_utf8()..];
            }

            let seen = match User::from_prefix(&crate::prefix::Prefix::parse(rest)) {
                Some(seen) if !seen.nickname().is_empty() => seen,
                _ => continue,
            };
            let nick = seen.nickname().to_owned();

            match self.users.get_mut(&nick) {
                Some(cached) => cached.merge_prefix(&seen),
                None => {
                    self.users.insert(nick.clone(), seen);
                }
            }

            match chan.member_mut(&nick) {
                Some(member) => member.replace_modes(modes),
                None => {
                    let mut member = ChannelMembership::new(nick);
                    member.replace_modes(modes);
                    chan.insert(member);
                }
            }
        }
    }

    /// Handle a WHOX reply requested with `%uhnatfc,001`.
    ///
    /// Parameters are `[me, token, channel, user, host, nick, flags, account]`.
    pub fn whox(
        &mut self,
        params: &[String],
        support: &ServerSupport,
    ) -> Result<(), TrackingError> {
        let [_, _, channel, username, hostname, nick, flags, account] = params else {
            return Err(self.fail(TrackingError::MalformedWhox { got: params.len() }));
        };
        let mut flag_chars = flags.chars();
        let Some(away_flag) = flag_chars.next() else {
            return Err(self.fail(TrackingError::EmptyWhoxFlags));
        };
        let modes: Vec<(char, char)> = flag_chars
            .filter_map(|c| support.mode_for_prefix(c).map(|m| (m, c)))
            .collect();

        let Some(chan) = self.channels.get_mut(channel.as_str()) else {
            debug!(channel = %channel, "ignoring WHOX for untracked channel");
            return Ok(());
        };

        let user = self
            .users
            .entry(nick.clone())
            .or_insert_with(|| User::new(nick.as_str()));
        user.set_userhost(username.as_str(), hostname.as_str());
        user.set_account(Some(account.as_str()));
        user.set_away(away_flag == 'G');
        user.upgrade(SkeletonStatus::Full);

        match chan.member_mut(nick) {
            Some(member) => member.replace_modes(modes),
            None => {
                let mut member = ChannelMembership::new(nick.as_str());
                member.replace_modes(modes);
                chan.insert(member);
            }
        }
        Ok(())
    }

    /// Apply the status-prefix part of a channel mode change.
    ///
    /// Parameters are consumed positionally; non-prefix modes consume one
    /// according to their CHANMODES class.
    pub fn channel_modes(
        &mut self,
        channel: &str,
        modes: &str,
        args: &[String],
        support: &ServerSupport,
    ) -> Result<Vec<PrefixChange>, TrackingError> {
        let Some(chan) = self.channels.get_mut(channel) else {
            debug!(channel = %channel, "ignoring MODE for untracked channel");
            return Ok(Vec::new());
        };

        let mut changes = Vec::new();
        let mut fault = None;
        let mut adding = true;
        let mut args = args.iter();

        for c in modes.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                mode => {
                    let Some(symbol) = support.prefix_for_mode(mode) else {
                        if support.takes_param(mode, adding) {
                            args.next();
                        }
                        continue;
                    };
                    let Some(nick) = args.next() else {
                        debug!(channel = %channel, mode = %mode, "prefix mode without a target");
                        break;
                    };
                    let Some(member) = chan.member_mut(nick) else {
                        fault = Some(TrackingError::MissingMembership {
                            channel: channel.to_owned(),
                            nick: nick.clone(),
                        });
                        break;
                    };
                    if adding {
                        member.set_mode(mode, symbol);
                    } else {
                        member.remove_mode(mode);
                    }
                    changes.push(PrefixChange { nick: nick.clone(), mode, symbol, added: adding });
                }
            }
        }

        match fault {
            Some(err) => Err(self.fail(err)),
            None => Ok(changes),
        }
    }

    /// Handle a NICK change, returning the renamed user.
    ///
    /// Our own nickname follows the change even when the store rejects it.
    pub fn nick(&mut self, old: &str, new: &str) -> Result<User, TrackingError> {
        if self.is_self(old) {
            self.own_nick = Some(new.to_owned());
        }
        if old == new {
            return self
                .users
                .get(old)
                .cloned()
                .ok_or_else(|| TrackingError::UnknownUser(old.to_owned()));
        }
        if !self.users.contains_key(old) {
            return Err(self.fail(TrackingError::UnknownUser(old.to_owned())));
        }
        if self.users.contains_key(new) {
            return Err(self.fail(TrackingError::DuplicateNick(new.to_owned())));
        }

        let mut fault = None;
        for chan in self.channels.values() {
            if let Some(member) = chan.member(old) {
                if member.nickname() != old {
                    fault = Some(TrackingError::MembershipMismatch {
                        channel: chan.name().to_owned(),
                        key: old.to_owned(),
                        found: member.nickname().to_owned(),
                    });
                } else if chan.contains(new) {
                    fault = Some(TrackingError::DuplicateMembership {
                        channel: chan.name().to_owned(),
                        nick: new.to_owned(),
                    });
                }
            }
            if fault.is_some() {
                break;
            }
        }
        if let Some(err) = fault {
            return Err(self.fail(err));
        }

        let Some(mut user) = self.users.remove(old) else {
            return Err(self.fail(TrackingError::UnknownUser(old.to_owned())));
        };
        user.rename(new);
        let snapshot = user.clone();
        self.users.insert(new.to_owned(), user);

        for chan in self.channels.values_mut() {
            if let Some(mut member) = chan.remove(old) {
                member.rename(new);
                chan.insert(member);
            }
        }
        Ok(snapshot)
    }

    /// Handle a PART (or a KICK, which has the same effect on the store).
    ///
    /// When the local user leaves, the channel is dropped and every member
    /// no other channel holds is forgotten.
    pub fn part(&mut self, channel: &str, nick: &str) -> Result<User, TrackingError> {
        let snapshot = self.users.get(nick).cloned();

        if self.is_self(nick) {
            let Some(chan) = self.channels.remove(channel) else {
                return Err(self.fail(TrackingError::UnknownChannel(channel.to_owned())));
            };
            debug!(channel = %channel, "stopped tracking channel");
            for member in chan.member_names() {
                self.forget_if_orphaned(&member);
            }
            return Ok(snapshot.unwrap_or_else(|| User::new(nick)));
        }

        let Some(chan) = self.channels.get_mut(channel) else {
            return Err(self.fail(TrackingError::UnknownChannel(channel.to_owned())));
        };
        if chan.remove(nick).is_none() {
            return Err(self.fail(TrackingError::MissingMembership {
                channel: channel.to_owned(),
                nick: nick.to_owned(),
            }));
        }
        let Some(snapshot) = snapshot else {
            return Err(self.fail(TrackingError::UnknownUser(nick.to_owned())));
        };
        self.forget_if_orphaned(nick);
        Ok(snapshot)
    }

    /// Handle a QUIT, removing the user everywhere.
    ///
    /// Our own QUIT drops every channel and every cached user except
    /// ourselves.
    pub fn quit(&mut self, nick: &str) -> Option<User> {
        if self.is_self(nick) {
            debug!(channels = self.channels.len(), "stopped tracking all channels");
            self.channels.clear();
            self.users.retain(|key, _| key == nick);
            return self.users.get(nick).cloned();
        }
        for chan in self.channels.values_mut() {
            chan.remove(nick);
        }
        self.users.remove(nick)
    }

    /// Handle ACCOUNT (account-notify).
    pub fn account(&mut self, nick: &str, account: &str) {
        match self.users.get_mut(nick) {
            Some(user) => user.set_account(Some(account)),
            None => debug!(nick = %nick, "ignoring ACCOUNT for untracked user"),
        }
    }

    /// Handle CHGHOST.
    pub fn chghost(
        &mut self,
        nick: &str,
        username: &str,
        hostname: &str,
    ) -> Result<(), TrackingError> {
        match self.users.get_mut(nick) {
            Some(user) => {
                user.set_userhost(username, hostname);
                Ok(())
            }
            None => Err(self.fail(TrackingError::UnknownUser(nick.to_owned()))),
        }
    }

    /// Handle AWAY (away-notify).
    pub fn away(&mut self, nick: &str, away: bool) -> Result<(), TrackingError> {
        match self.users.get_mut(nick) {
            Some(user) => {
                user.set_away(away);
                Ok(())
            }
            None => Err(self.fail(TrackingError::UnknownUser(nick.to_owned()))),
        }
    }
}
