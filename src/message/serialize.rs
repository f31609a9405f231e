use std::fmt::{Display, Formatter, Result as FmtResult, Write};

use super::tags::write_tags;
use super::types::Message;

/// Whether a final parameter needs the `:` marker to survive a reparse.
fn needs_trailing_marker(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if !self.tags.is_empty() {
            f.write_char('@')?;
            write_tags(f, &self.tags)?;
            f.write_char(' ')?;
        }

        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            f.write_char(' ')?;
            if i == last && needs_trailing_marker(param) {
                f.write_char(':')?;
            }
            f.write_str(param)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_plain() {
        assert_eq!(Message::nick("stwtestbot").to_string(), "NICK stwtestbot");
    }

    #[test]
    fn test_serialize_trailing_with_space() {
        let msg = Message::privmsg("#rust", "Hello, world!");
        assert_eq!(msg.to_string(), "PRIVMSG #rust :Hello, world!");
    }

    #[test]
    fn test_serialize_empty_and_colon_trailing() {
        assert_eq!(Message::new("TOPIC", ["#c", ""]).to_string(), "TOPIC #c :");
        assert_eq!(Message::privmsg("#c", ":)").to_string(), "PRIVMSG #c ::)");
    }

    #[test]
    fn test_serialize_tags_and_prefix() {
        let msg = Message::privmsg("#c", "hi")
            .with_tag("msgid", "abc")
            .with_prefix("nick!user@host");
        assert_eq!(msg.to_string(), "@msgid=abc :nick!user@host PRIVMSG #c hi");
    }

    #[test]
    fn test_reparse_preserves_fields() {
        let original = Message::new("KICK", ["#c", "victim", "bye now"])
            .with_tag("label", "a;b c")
            .with_prefix("op!o@h");
        let reparsed: Message = original.to_string().parse().unwrap();
        assert_eq!(reparsed, original);
    }
}
