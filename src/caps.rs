//! IRCv3 capability negotiation support.
//!
//! The client only negotiates the capabilities it needs to keep identity
//! tracking correct. This module holds the capability names, the filter
//! applied to a server's `CAP LS` offer, and the set of enabled flags.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use std::collections::HashSet;

use crate::sasl::{parse_mechanisms, SaslMechanism};

/// Capabilities the client knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// SASL authentication
    Sasl,
    /// Notify of account login/logout
    AccountNotify,
    /// Extended JOIN with account and realname
    ExtendedJoin,
    /// Show all user prefix modes in NAMES and WHO
    MultiPrefix,
    /// Notify of hostname changes
    ChgHost,
    /// Notify of capability changes
    CapNotify,
    /// Add account tag to messages
    AccountTag,
    /// Notify of away status changes
    AwayNotify,
    /// Anything else the server offers
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Self::Sasl => "sasl",
            Self::AccountNotify => "account-notify",
            Self::ExtendedJoin => "extended-join",
            Self::MultiPrefix => "multi-prefix",
            Self::ChgHost => "chghost",
            Self::CapNotify => "cap-notify",
            Self::AccountTag => "account-tag",
            Self::AwayNotify => "away-notify",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s {
            "sasl" => Self::Sasl,
            "account-notify" => Self::AccountNotify,
            "extended-join" => Self::ExtendedJoin,
            "multi-prefix" => Self::MultiPrefix,
            "chghost" => Self::ChgHost,
            "cap-notify" => Self::CapNotify,
            "account-tag" => Self::AccountTag,
            "away-notify" => Self::AwayNotify,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// The capabilities this client can make use of.
///
/// `sasl` is only included when authentication to services is enabled.
pub fn client_capabilities(auth_to_services: bool) -> Vec<Capability> {
    let mut caps = vec![
        Capability::AccountNotify,
        Capability::ExtendedJoin,
        Capability::MultiPrefix,
        Capability::ChgHost,
        Capability::CapNotify,
        Capability::AccountTag,
        Capability::AwayNotify,
    ];
    if auth_to_services {
        caps.insert(0, Capability::Sasl);
    }
    caps
}

/// A capability as offered by `CAP LS` or `CAP NEW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedCap {
    /// Capability name.
    pub cap: Capability,
    /// Value after `=`, if any (e.g. the SASL mechanism list).
    pub value: Option<String>,
}

/// Parse a space-separated capability offer.
pub fn parse_offer(list: &str) -> Vec<OfferedCap> {
    list.split_whitespace()
        .map(|token| match token.split_once('=') {
            Some((name, value)) => OfferedCap {
                cap: Capability::from(name),
                value: Some(value.to_string()),
            },
            None => OfferedCap {
                cap: Capability::from(token),
                value: None,
            },
        })
        .collect()
}

/// Parse the capability list of an `ACK`, `NAK` or `DEL`.
///
/// Returns `(enabled, capability)` pairs; a leading `-` marks removal.
/// The CAP 3.1 `~` and `=` modifiers are stripped.
pub fn parse_changes(list: &str) -> Vec<(bool, Capability)> {
    list.split_whitespace()
        .map(|token| {
            let (enabled, name) = match token.strip_prefix('-') {
                Some(name) => (false, name),
                None => (true, token),
            };
            let name = name.trim_start_matches(['~', '=']);
            let name = name.split('=').next().unwrap_or(name);
            (enabled, Capability::from(name))
        })
        .collect()
}

/// Drop `account-notify` and `extended-join` unless both are present.
///
/// Either one alone leaves account tracking with gaps, so the pair is
/// requested together or not at all.
pub fn enforce_coupling(caps: &mut Vec<Capability>) {
    let notify = caps.contains(&Capability::AccountNotify);
    let join = caps.contains(&Capability::ExtendedJoin);
    if notify != join {
        caps.retain(|c| *c != Capability::AccountNotify && *c != Capability::ExtendedJoin);
    }
}

/// Whether an offered `sasl` capability is usable.
///
/// Without a mechanism list the server is assumed to accept PLAIN.
fn sasl_usable(value: Option<&str>, has_client_cert: bool) -> bool {
    match value {
        None | Some("") => true,
        Some(list) => {
            let mechs = parse_mechanisms(list);
            mechs.contains(&SaslMechanism::Plain)
                || (has_client_cert && mechs.contains(&SaslMechanism::External))
        }
    }
}

/// Select the capabilities to request from a server offer.
///
/// The result keeps the server's ordering and applies, in order: the
/// intersection with `supported`, the SASL mechanism rule, and the
/// account-notify/extended-join coupling rule.
pub fn select_requested(
    offered: &[OfferedCap],
    supported: &[Capability],
    has_client_cert: bool,
) -> Vec<Capability> {
    let mut selected: Vec<Capability> = Vec::new();
    for offer in offered {
        if !supported.contains(&offer.cap) || selected.contains(&offer.cap) {
            continue;
        }
        if offer.cap == Capability::Sasl && !sasl_usable(offer.value.as_deref(), has_client_cert) {
            continue;
        }
        selected.push(offer.cap.clone());
    }
    enforce_coupling(&mut selected);
    selected
}

/// The set of capabilities currently enabled on the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    enabled: HashSet<Capability>,
}

impl CapabilitySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `cap` is enabled.
    pub fn contains(&self, cap: &Capability) -> bool {
        self.enabled.contains(cap)
    }

    /// Apply a list of changes from [`parse_changes`].
    ///
    /// Returns true if any flag changed.
    pub fn apply(&mut self, changes: &[(bool, Capability)]) -> bool {
        let mut modified = false;
        for (enabled, cap) in changes {
            modified |= if *enabled {
                self.enabled.insert(cap.clone())
            } else {
                self.enabled.remove(cap)
            };
        }
        modified
    }

    /// Disable `cap`, returning true if it was enabled.
    pub fn remove(&mut self, cap: &Capability) -> bool {
        self.enabled.remove(cap)
    }

    /// The removal request needed to restore the coupling rule, if any.
    ///
    /// Returns `-extended-join` when only extended-join remains enabled and
    /// `-account-notify` when only account-notify remains.
    pub fn coupling_repair(&self) -> Option<&'static str> {
        match (
            self.contains(&Capability::AccountNotify),
            self.contains(&Capability::ExtendedJoin),
        ) {
            (true, false) => Some("-account-notify"),
            (false, true) => Some("-extended-join"),
            _ => None,
        }
    }

    /// Iterate enabled capabilities.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.enabled.iter()
    }

    /// Number of enabled capabilities.
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    /// Whether no capability is enabled.
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_round_trips_name() {
        for name in ["sasl", "account-notify", "extended-join", "away-notify", "identify-msg"] {
            assert_eq!(Capability::from(name).as_ref(), name);
        }
        assert_eq!(Capability::from("chghost"), Capability::ChgHost);
    }

    #[test]
    fn test_parse_offer_values() {
        let offer = parse_offer("sasl=PLAIN,EXTERNAL multi-prefix");
        assert_eq!(offer.len(), 2);
        assert_eq!(offer[0].cap, Capability::Sasl);
        assert_eq!(offer[0].value.as_deref(), Some("PLAIN,EXTERNAL"));
        assert_eq!(offer[1].value, None);
    }

    #[test]
    fn test_select_keeps_server_order() {
        let offer = parse_offer("account-notify extended-join identify-msg multi-prefix sasl");
        let selected = select_requested(&offer, &client_capabilities(false), false);
        assert_eq!(
            selected,
            vec![Capability::AccountNotify, Capability::ExtendedJoin, Capability::MultiPrefix]
        );
    }

    #[test]
    fn test_select_drops_lone_coupled_cap() {
        let offer = parse_offer("account-notify multi-prefix");
        let selected = select_requested(&offer, &client_capabilities(false), false);
        assert_eq!(selected, vec![Capability::MultiPrefix]);

        let offer = parse_offer("extended-join");
        assert!(select_requested(&offer, &client_capabilities(false), false).is_empty());
    }

    #[test]
    fn test_select_sasl_mechanism_rule() {
        let supported = client_capabilities(true);

        let offer = parse_offer("sasl=PLAIN,EXTERNAL");
        assert_eq!(select_requested(&offer, &supported, false), vec![Capability::Sasl]);

        let offer = parse_offer("sasl=EXTERNAL");
        assert!(select_requested(&offer, &supported, false).is_empty());
        assert_eq!(select_requested(&offer, &supported, true), vec![Capability::Sasl]);

        let offer = parse_offer("sasl=SCRAM-SHA-256");
        assert!(select_requested(&offer, &supported, true).is_empty());

        let offer = parse_offer("sasl");
        assert_eq!(select_requested(&offer, &supported, false), vec![Capability::Sasl]);
    }

    #[test]
    fn test_sasl_not_requested_without_services_auth() {
        let offer = parse_offer("sasl=PLAIN");
        assert!(select_requested(&offer, &client_capabilities(false), false).is_empty());
    }

    #[test]
    fn test_parse_changes_strips_modifiers() {
        let changes = parse_changes("multi-prefix -extended-join ~sasl ");
        assert_eq!(
            changes,
            vec![
                (true, Capability::MultiPrefix),
                (false, Capability::ExtendedJoin),
                (true, Capability::Sasl),
            ]
        );
    }

    #[test]
    fn test_capability_set_apply_and_repair() {
        let mut set = CapabilitySet::new();
        assert!(set.apply(&parse_changes("account-notify extended-join cap-notify")));
        assert_eq!(set.len(), 3);
        assert_eq!(set.coupling_repair(), None);

        assert!(set.apply(&parse_changes("-account-notify")));
        assert_eq!(set.coupling_repair(), Some("-extended-join"));

        assert!(!set.apply(&parse_changes("-account-notify")));
    }
}
