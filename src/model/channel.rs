use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A user's presence in one channel.
///
/// Holds the active status-prefix modes as `mode letter -> prefix symbol`.
/// Setting a held mode or clearing an absent one changes nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMembership {
    nickname: String,
    modes: BTreeMap<char, char>,
}

impl ChannelMembership {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            modes: BTreeMap::new(),
        }
    }

    /// Nickname of the member; matches its key in the channel.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Grant a status mode. Returns true if it was not already held.
    pub fn set_mode(&mut self, mode: char, symbol: char) -> bool {
        self.modes.insert(mode, symbol).is_none()
    }

    /// Revoke a status mode. Returns true if it was held.
    pub fn remove_mode(&mut self, mode: char) -> bool {
        self.modes.remove(&mode).is_some()
    }

    /// Replace every status mode at once.
    pub fn replace_modes(&mut self, modes: impl IntoIterator<Item = (char, char)>) {
        self.modes = modes.into_iter().collect();
    }

    pub fn has_mode(&self, mode: char) -> bool {
        self.modes.contains_key(&mode)
    }

    pub fn is_operator(&self) -> bool {
        self.has_mode('o')
    }

    pub fn is_voiced(&self) -> bool {
        self.has_mode('v')
    }

    /// Held prefix symbols, e.g. `@+`.
    pub fn prefixes(&self) -> String {
        self.modes.values().collect()
    }

    pub(crate) fn rename(&mut self, nickname: impl Into<String>) {
        self.nickname = nickname.into();
    }
}

/// A channel the local user is in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    name: String,
    members: HashMap<String, ChannelMembership>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, nick: &str) -> Option<&ChannelMembership> {
        self.members.get(nick)
    }

    pub fn contains(&self, nick: &str) -> bool {
        self.members.contains_key(nick)
    }

    pub fn members(&self) -> impl Iterator<Item = &ChannelMembership> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn member_mut(&mut self, nick: &str) -> Option<&mut ChannelMembership> {
        self.members.get_mut(nick)
    }

    pub(crate) fn insert(&mut self, membership: ChannelMembership) -> Option<ChannelMembership> {
        self.members.insert(membership.nickname.clone(), membership)
    }

    pub(crate) fn remove(&mut self, nick: &str) -> Option<ChannelMembership> {
        self.members.remove(nick)
    }

    pub(crate) fn member_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }
}

/// Status-message destination prefix (`@#channel`, `+#channel`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestinationFlag {
    /// Deliver to channel operators.
    ChannelOperators,
    /// Deliver to voiced users.
    VoicedUsers,
}

impl DestinationFlag {
    pub fn symbol(self) -> char {
        match self {
            Self::ChannelOperators => '@',
            Self::VoicedUsers => '+',
        }
    }
}

impl fmt::Display for DestinationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
