//! SASL authentication helpers.
//!
//! The engine supports two mechanisms:
//!
//! - **PLAIN**: username/password (RFC 4616)
//! - **EXTERNAL**: TLS client certificate
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//!
//! # Example
//!
//! ```
//! use slirc_client::sasl::{authenticate_lines, encode_plain};
//!
//! let encoded = encode_plain("myuser", "mypassword");
//! let lines = authenticate_lines(&encoded);
//! assert_eq!(lines.len(), 1);
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single `AUTHENTICATE` payload chunk.
pub const SASL_CHUNK_SIZE: usize = 400;

/// SASL mechanisms.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SaslMechanism {
    /// PLAIN mechanism (RFC 4616).
    Plain,
    /// EXTERNAL mechanism, authenticating with the TLS client certificate.
    External,
    /// A mechanism this client does not implement.
    Unknown(String),
}

impl SaslMechanism {
    /// Parse a mechanism name.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "PLAIN" => Self::Plain,
            "EXTERNAL" => Self::External,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain => "PLAIN",
            Self::External => "EXTERNAL",
            Self::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for SaslMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a comma-separated mechanism list (the `sasl=` capability value).
pub fn parse_mechanisms(list: &str) -> Vec<SaslMechanism> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SaslMechanism::parse)
        .collect()
}

/// Pick the mechanism to authenticate with.
///
/// EXTERNAL is used when a client certificate is configured and the server
/// allows it (or lists nothing); PLAIN otherwise.
pub fn choose_mechanism(offered: Option<&str>, has_client_cert: bool) -> SaslMechanism {
    let mechs = offered.map(parse_mechanisms).unwrap_or_default();
    if has_client_cert && (mechs.is_empty() || mechs.contains(&SaslMechanism::External)) {
        SaslMechanism::External
    } else {
        SaslMechanism::Plain
    }
}

/// Encode credentials for the PLAIN mechanism: base64 of `\0user\0password`.
pub fn encode_plain(username: &str, password: &str) -> String {
    let payload = format!("\0{}\0{}", username, password);
    BASE64.encode(payload.as_bytes())
}

/// The EXTERNAL response: an empty continuation.
pub fn encode_external() -> String {
    "+".to_owned()
}

/// Split an encoded response into `AUTHENTICATE` parameters.
///
/// Each chunk holds at most [`SASL_CHUNK_SIZE`] bytes. When the last chunk is
/// exactly that long a bare `+` follows so the server knows the payload has
/// ended. An empty payload is sent as a single `+`.
pub fn authenticate_lines(encoded: &str) -> Vec<String> {
    if encoded.is_empty() || encoded == "+" {
        return vec!["+".to_owned()];
    }

    // base64 output is ASCII, so byte chunks are valid strings.
    let mut lines: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect();

    if encoded.len() % SASL_CHUNK_SIZE == 0 {
        lines.push("+".to_owned());
    }
    lines
}

/// Decode a base64 SASL payload; `+` decodes to nothing.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if encoded == "+" {
        return Ok(Vec::new());
    }
    BASE64.decode(encoded)
}
