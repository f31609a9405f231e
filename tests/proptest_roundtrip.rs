//! Property-based tests for the line codec.
//!
//! Generated messages must survive serialize-then-parse unchanged, and the
//! parser must never panic on arbitrary input.

use proptest::prelude::*;
use slirc_client::message::tags::{escape_tag_value, unescape_tag_value};
use slirc_client::{Message, Prefix};

fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}]{0,15}")
        .expect("valid regex")
}

fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("~?[a-zA-Z][a-zA-Z0-9]{0,9}").expect("valid regex")
}

fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]+([./][a-z0-9]+)*").expect("valid regex")
}

fn channel_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[#&][a-zA-Z0-9_\\-]{1,49}").expect("valid regex")
}

/// Message text; CR, LF and NUL cannot appear on the wire.
fn message_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0]{0,400}").expect("valid regex")
}

fn tag_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("\\+?([a-z0-9.\\-]+/)?[a-zA-Z0-9\\-]{1,30}").expect("valid regex")
}

/// Tag values, including the characters that need escaping.
fn tag_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\0]{0,60}").expect("valid regex")
}

fn prefix_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z]+\\.[a-z]+\\.[a-z]+").expect("valid regex"),
        (nickname_strategy(), username_strategy(), hostname_strategy())
            .prop_map(|(nick, user, host)| format!("{}!{}@{}", nick, user, host)),
    ]
}

fn command_strategy() -> impl Strategy<Value = Message> {
    prop_oneof![
        (channel_strategy(), message_text_strategy())
            .prop_map(|(t, text)| Message::privmsg(t, text)),
        (channel_strategy(), message_text_strategy())
            .prop_map(|(t, text)| Message::notice(t, text)),
        nickname_strategy().prop_map(Message::nick),
        channel_strategy().prop_map(Message::join),
        (channel_strategy(), prop::option::of(message_text_strategy()))
            .prop_map(|(chan, reason)| Message::part(chan, reason.as_deref())),
        hostname_strategy().prop_map(Message::ping),
        message_text_strategy().prop_map(Message::quit),
        (channel_strategy(), nickname_strategy(), message_text_strategy())
            .prop_map(|(chan, nick, reason)| Message::new("KICK", [chan, nick, reason])),
        channel_strategy().prop_map(|chan| Message::who(chan, "%uhnatfc,001")),
    ]
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (
        prop::collection::btree_map(tag_key_strategy(), tag_value_strategy(), 0..5),
        prop::option::of(prefix_strategy()),
        command_strategy(),
    )
        .prop_map(|(tags, prefix, mut msg)| {
            msg.tags = tags;
            msg.prefix = prefix;
            msg
        })
}

proptest! {
    #[test]
    fn message_roundtrip(msg in message_strategy()) {
        let serialized = msg.to_string();
        let parsed = Message::parse(&serialized).expect("serialized message should parse");
        prop_assert_eq!(&msg, &parsed, "roundtrip failed for: {}", serialized);
    }

    #[test]
    fn tag_value_escape_roundtrip(value in tag_value_strategy()) {
        let mut escaped = String::new();
        escape_tag_value(&mut escaped, &value).unwrap();
        prop_assert!(!escaped.contains(' '));
        prop_assert!(!escaped.contains(';'));
        prop_assert_eq!(unescape_tag_value(&escaped), value);
    }

    #[test]
    fn prefix_nick_extraction(
        nick in nickname_strategy(),
        user in username_strategy(),
        host in hostname_strategy()
    ) {
        let prefix = Prefix::parse(&format!("{}!{}@{}", nick, user, host));
        prop_assert!(prefix.is_full());
        prop_assert_eq!(prefix.nick(), Some(nick.as_str()));
    }

    #[test]
    fn parse_never_panics(line in "[^\r\n]{0,600}") {
        let _ = Message::parse(&line);
    }
}
