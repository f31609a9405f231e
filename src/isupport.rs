//! RPL_ISUPPORT (005) handling.
//!
//! Only the tokens the engine acts on are kept: `PREFIX`, `STATUSMSG`,
//! `EXTBAN`, `CHANMODES`, `CHANTYPES` and `NETWORK`.

const DEFAULT_PREFIX: &[(char, char)] = &[('o', '@'), ('v', '+')];
const DEFAULT_CHANTYPES: &str = "#&";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsupportEntry<'a> {
    pub key: &'a str,
    pub value: Option<&'a str>,
    pub negated: bool,
}

/// Split 005 parameters into entries.
///
/// The first parameter (our nickname) and a final human-readable text
/// parameter are skipped.
pub fn parse_entries<'a>(params: &'a [String]) -> Vec<IsupportEntry<'a>> {
    let mut tokens = params.get(1..).unwrap_or_default();
    if let Some(last) = tokens.last() {
        if last.contains(' ') {
            tokens = &tokens[..tokens.len() - 1];
        }
    }

    tokens
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (negated, p) = match p.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, p),
            };
            match p.split_once('=') {
                Some((key, value)) => IsupportEntry { key, value: Some(value), negated },
                None => IsupportEntry { key: p, value: None, negated },
            }
        })
        .collect()
}

/// Parse `PREFIX=(ov)@+` into `(mode, symbol)` pairs, highest rank first.
pub fn parse_prefix(s: &str) -> Option<Vec<(char, char)>> {
    let rest = s.strip_prefix('(')?;
    let (modes, symbols) = rest.split_once(')')?;
    if modes.chars().count() != symbols.chars().count() {
        return None;
    }
    Some(modes.chars().zip(symbols.chars()).collect())
}

/// How a non-prefix channel mode consumes parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeClass {
    /// List modes; always take a parameter.
    A,
    /// Always take a parameter.
    B,
    /// Take a parameter only when set.
    C,
    /// Never take a parameter.
    D,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModes {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl ChanModes {
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(4, ',');
        let (a, b, c, d) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        Some(ChanModes { a: a.into(), b: b.into(), c: c.into(), d: d.into() })
    }

    pub fn class_of(&self, mode: char) -> Option<ModeClass> {
        if self.a.contains(mode) {
            Some(ModeClass::A)
        } else if self.b.contains(mode) {
            Some(ModeClass::B)
        } else if self.c.contains(mode) {
            Some(ModeClass::C)
        } else if self.d.contains(mode) {
            Some(ModeClass::D)
        } else {
            None
        }
    }
}

impl Default for ChanModes {
    /// Classes assumed before the server advertises `CHANMODES`.
    fn default() -> Self {
        ChanModes { a: "beIq".into(), b: "k".into(), c: "flj".into(), d: String::new() }
    }
}

/// Extended ban syntax advertised via `EXTBAN=<prefix>,<types>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtbanSpec {
    /// Character that introduces an extban, if any.
    pub prefix: Option<char>,
    /// Supported extban type letters.
    pub types: String,
}

impl ExtbanSpec {
    pub fn parse(s: &str) -> Option<Self> {
        let (prefix, types) = s.split_once(',')?;
        Some(ExtbanSpec { prefix: prefix.chars().next(), types: types.to_string() })
    }
}

/// Server capabilities learned from 005 replies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSupport {
    prefixes: Vec<(char, char)>,
    status_msg: Vec<char>,
    extban: Option<ExtbanSpec>,
    chanmodes: Option<ChanModes>,
    chantypes: String,
    network: Option<String>,
}

impl Default for ServerSupport {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_PREFIX.to_vec(),
            status_msg: Vec::new(),
            extban: None,
            chanmodes: None,
            chantypes: DEFAULT_CHANTYPES.to_string(),
            network: None,
        }
    }
}

impl ServerSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one 005 reply into the current state.
    pub fn apply(&mut self, params: &[String]) {
        for entry in parse_entries(params) {
            let value = if entry.negated { None } else { entry.value };
            match entry.key.to_ascii_uppercase().as_str() {
                "PREFIX" => {
                    self.prefixes =
                        value.and_then(parse_prefix).unwrap_or_else(|| DEFAULT_PREFIX.to_vec())
                }
                "STATUSMSG" => {
                    self.status_msg = value.map(|v| v.chars().collect()).unwrap_or_default()
                }
                "EXTBAN" => self.extban = value.and_then(ExtbanSpec::parse),
                "CHANMODES" => self.chanmodes = value.and_then(ChanModes::parse),
                "CHANTYPES" => {
                    self.chantypes =
                        value.map(str::to_owned).unwrap_or_else(|| DEFAULT_CHANTYPES.into())
                }
                "NETWORK" => self.network = value.map(str::to_owned),
                _ => {}
            }
        }
    }

    pub fn prefixes(&self) -> &[(char, char)] {
        &self.prefixes
    }

    pub fn prefix_for_mode(&self, mode: char) -> Option<char> {
        self.prefixes.iter().find(|(m, _)| *m == mode).map(|(_, p)| *p)
    }

    pub fn mode_for_prefix(&self, symbol: char) -> Option<char> {
        self.prefixes.iter().find(|(_, p)| *p == symbol).map(|(m, _)| *m)
    }

    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.prefix_for_mode(mode).is_some()
    }

    pub fn supports_status_msg(&self, symbol: char) -> bool {
        self.status_msg.contains(&symbol)
    }

    pub fn extban(&self) -> Option<&ExtbanSpec> {
        self.extban.as_ref()
    }

    pub fn chanmodes(&self) -> Option<&ChanModes> {
        self.chanmodes.as_ref()
    }

    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    pub fn is_channel(&self, target: &str) -> bool {
        target.chars().next().map_or(false, |c| self.chantypes.contains(c))
    }

    /// Whether a non-prefix mode letter consumes a parameter.
    pub fn takes_param(&self, mode: char, adding: bool) -> bool {
        let class = match &self.chanmodes {
            Some(modes) => modes.class_of(mode),
            None => ChanModes::default().class_of(mode),
        };
        match class {
            Some(ModeClass::A) | Some(ModeClass::B) => true,
            Some(ModeClass::C) => adding,
            Some(ModeClass::D) | None => false,
        }
    }
}
