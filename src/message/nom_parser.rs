//! Nom-based IRC line tokenizer.
//!
//! Tags, prefix and command are recognized with nom combinators; the
//! parameter list follows the IRC final-parameter rule and is split by hand.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::{context, ErrorKind, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_until(" ")),
    )(input)
}

fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_while1(|c| c != ' ')),
    )(input)
}

fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRC command",
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    )(input)
}

/// Split the text after the command into parameters.
///
/// The final parameter is the text after a standalone `:` token, or failing
/// that, after the first `" :"`. It is never split further.
fn split_params(rest: &str) -> Vec<&str> {
    let rest = rest.trim_start_matches(' ');
    if rest.is_empty() {
        return Vec::new();
    }
    if let Some(trailing) = rest.strip_prefix(':') {
        return vec![trailing];
    }

    let (middle, trailing) = match rest.find(" :") {
        Some(i) => (&rest[..i], Some(&rest[i + 2..])),
        None => (rest, None),
    };

    let mut params: Vec<&str> = middle.split(' ').filter(|p| !p.is_empty()).collect();
    params.extend(trailing);
    params
}

/// Tokenize a complete line.
///
/// ```text
/// [@tags] [:prefix] <command> [params...] [:trailing]
/// ```
pub fn parse_message(input: &str) -> ParseResult<&str, ParsedMessage<'_>> {
    let (input, tags) = context("parsing optional tags", opt(parse_tags))(input)?;
    let (input, _) = space0(input)?;

    let (input, prefix) = context("parsing optional prefix", opt(parse_prefix))(input)?;
    let (input, _) = space0(input)?;

    let (input, command) = context("parsing required command", parse_command)(input)?;

    Ok((
        "",
        ParsedMessage {
            tags,
            prefix,
            command,
            params: split_params(input),
            rest: input,
        },
    ))
}

/// A tokenized IRC line borrowing from its input.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name.
    pub command: &'a str,
    /// Command parameters, including the final one.
    pub params: Vec<&'a str>,
    rest: &'a str,
}

impl<'a> ParsedMessage<'a> {
    /// Tokenize a line with its trailing CR/LF already removed.
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        if input.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let parsed = parse_message(input).map_err(|err| match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                DetailedParseError::from_verbose(input, &e).into()
            }
            nom::Err::Incomplete(_) => MessageParseError::MissingCommand,
        })?;
        let msg = parsed.1;

        // The command token must end at a space or at the end of the line.
        if !msg.rest.is_empty() && !msg.rest.starts_with(' ') {
            let token = msg.rest.split(' ').next().unwrap_or_default();
            return Err(MessageParseError::InvalidCommand(format!("{}{}", msg.command, token)));
        }
        Ok(msg)
    }
}

/// Detailed parse error with position and context information.
#[derive(Debug, Clone)]
pub struct DetailedParseError {
    /// The original input string that failed to parse.
    pub input: String,
    /// Byte position where parsing failed.
    pub position: usize,
    /// Context about what was being parsed when the error occurred.
    pub context: Option<&'static str>,
    /// The nom error kind.
    pub kind: ErrorKind,
}

impl DetailedParseError {
    fn from_verbose(input: &str, e: &VerboseError<&str>) -> Self {
        let mut context_info = None;
        let mut position = input.len();
        let mut kind = ErrorKind::Tag;

        for (error_input, error_kind) in &e.errors {
            position = input.len() - error_input.len();
            match error_kind {
                VerboseErrorKind::Context(ctx) => context_info = Some(*ctx),
                VerboseErrorKind::Nom(ek) => kind = *ek,
                VerboseErrorKind::Char(_) => kind = ErrorKind::Char,
            }
        }

        Self {
            input: input.to_string(),
            position,
            context: context_info,
            kind,
        }
    }
}

impl From<DetailedParseError> for MessageParseError {
    fn from(err: DetailedParseError) -> Self {
        if err.position >= err.input.trim_end().len() {
            return MessageParseError::MissingCommand;
        }
        MessageParseError::ParseContext {
            position: err.position,
            context: err.context.unwrap_or("parsing message").to_string(),
        }
    }
}

impl std::fmt::Display for DetailedParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at position {}", self.position)?;
        if let Some(ctx) = self.context {
            write!(f, " while {}", ctx)?;
        }
        write!(f, ": {:?}", self.kind)?;

        if self.position < self.input.len() {
            let (before, after) = self.input.split_at(self.position);
            write!(f, "\n  Input: {}<<<HERE>>>{}", before, after)
        } else {
            write!(f, "\n  Input: {}<<<EOF>>>", self.input)
        }
    }
}

impl std::error::Error for DetailedParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_params_trailing_after_colon_token() {
        assert_eq!(split_params(" #chan :hello world"), vec!["#chan", "hello world"]);
    }

    #[test]
    fn test_split_params_only_trailing() {
        assert_eq!(split_params(" :irc.example.com"), vec!["irc.example.com"]);
    }

    #[test]
    fn test_split_params_collapses_spaces() {
        assert_eq!(split_params("  a   b  "), vec!["a", "b"]);
    }

    #[test]
    fn test_split_params_trailing_keeps_colons_and_spaces() {
        assert_eq!(split_params(" a :b :c  d"), vec!["a", "b :c  d"]);
    }

    #[test]
    fn test_split_params_empty_trailing() {
        assert_eq!(split_params(" LS :"), vec!["LS", ""]);
    }

    #[test]
    fn test_parse_components() {
        let msg = ParsedMessage::parse("@a=b :nick!u@h PRIVMSG #c :hi there").unwrap();
        assert_eq!(msg.tags, Some("a=b"));
        assert_eq!(msg.prefix, Some("nick!u@h"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#c", "hi there"]);
    }

    #[test]
    fn test_parse_rejects_prefix_without_command() {
        assert!(ParsedMessage::parse(":server.example.com").is_err());
        assert!(ParsedMessage::parse(":server.example.com   ").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_command_characters() {
        let err = ParsedMessage::parse("PRIV-MSG #c :x").unwrap_err();
        assert_eq!(err, MessageParseError::InvalidCommand("PRIV-MSG".into()));
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(ParsedMessage::parse("   ").unwrap_err(), MessageParseError::EmptyMessage);
    }

    #[test]
    fn test_detailed_error_display() {
        let err = parse_message("@only-tags").unwrap_err();
        let detailed = match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                DetailedParseError::from_verbose("@only-tags", &e)
            }
            nom::Err::Incomplete(_) => unreachable!(),
        };
        assert!(detailed.to_string().starts_with("Parse error at position"));
    }
}
