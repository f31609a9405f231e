//! Golden lines for the message codec.

use slirc_client::{Message, MessageParseError};

#[test]
fn test_rfc1459_lines() {
    let cases: &[(&str, Option<&str>, &str, &[&str])] = &[
        ("PING :irc.example.net", None, "PING", &["irc.example.net"]),
        (
            ":stwalkerster!stwalkerst@wikimedia/stwalkerster PRIVMSG #wikipedia-en-help \
             :hello there",
            Some("stwalkerster!stwalkerst@wikimedia/stwalkerster"),
            "PRIVMSG",
            &["#wikipedia-en-help", "hello there"],
        ),
        (
            ":irc.example.net 005 stwtestbot PREFIX=(ov)@+ STATUSMSG=@+ \
             :are supported by this server",
            Some("irc.example.net"),
            "005",
            &["stwtestbot", "PREFIX=(ov)@+", "STATUSMSG=@+", "are supported by this server"],
        ),
        (
            ":irc.example.net CAP * LS * :multi-prefix sasl=PLAIN,EXTERNAL",
            Some("irc.example.net"),
            "CAP",
            &["*", "LS", "*", "multi-prefix sasl=PLAIN,EXTERNAL"],
        ),
        (":nick!u@h TOPIC #c :", Some("nick!u@h"), "TOPIC", &["#c", ""]),
        (":nick!u@h PRIVMSG #c :::)", Some("nick!u@h"), "PRIVMSG", &["#c", "::)"]),
        ("MODE #c +bo  *!*@spam   nick", None, "MODE", &["#c", "+bo", "*!*@spam", "nick"]),
        ("QUIT", None, "QUIT", &[]),
    ];

    for (line, prefix, command, params) in cases {
        let msg = Message::parse(line).unwrap_or_else(|e| panic!("{}: {}", line, e));
        assert_eq!(msg.prefix.as_deref(), *prefix, "{}", line);
        assert_eq!(msg.command, *command, "{}", line);
        assert_eq!(msg.params, *params, "{}", line);
    }
}

#[test]
fn test_crlf_is_tolerated() {
    let msg = Message::parse("NICK stwtestbot\r\n").unwrap();
    assert_eq!(msg.params, ["stwtestbot"]);
}

#[test]
fn test_tag_escaping_table() {
    let cases = [
        ("a\\:b", "a;b"),
        ("a\\sb", "a b"),
        ("a\\\\b", "a\\b"),
        ("a\\rb", "a\rb"),
        ("a\\nb", "a\nb"),
        ("a\\b", "ab"),
        ("trailing\\", "trailing"),
    ];
    for (wire, value) in cases {
        let msg = Message::parse(&format!("@k={} PING x", wire)).unwrap();
        assert_eq!(msg.tag("k"), Some(value), "{}", wire);
    }
}

#[test]
fn test_tags_serialize_sorted_and_escaped() {
    let msg = Message::privmsg("#c", "hi")
        .with_tag("time", "2023-01-01T12:00:00.000Z")
        .with_tag("+example/note", "a b;c")
        .with_prefix("nick!u@h");
    assert_eq!(
        msg.to_string(),
        "@+example/note=a\\sb\\:c;time=2023-01-01T12:00:00.000Z :nick!u@h PRIVMSG #c hi"
    );
}

#[test]
fn test_valueless_tag() {
    let msg = Message::parse("@draft/bot;account=stwalkerster :a!b@c PRIVMSG #c :x").unwrap();
    assert_eq!(msg.tag("draft/bot"), Some(""));
    assert_eq!(msg.tag("account"), Some("stwalkerster"));
}

#[test]
fn test_rejects_bad_lines() {
    assert!(matches!(Message::parse(""), Err(MessageParseError::EmptyMessage)));
    assert!(matches!(Message::parse("   "), Err(MessageParseError::EmptyMessage)));
    assert!(matches!(
        Message::parse("PRIV-MSG #c :x"),
        Err(MessageParseError::InvalidCommand(_))
    ));
    assert!(Message::parse(":prefix-only").is_err());
}
