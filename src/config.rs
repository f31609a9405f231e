//! Client configuration.
//!
//! ```toml
//! hostname = "irc.libera.chat"
//! port = 6697
//! tls = true
//! nickname = "stwtestbot"
//! username = "stwtestbot"
//! realname = "real name"
//! auth_to_services = true
//! services_username = "stwtestbot"
//! services_password = "hunter2"
//! connect_modes = "+Q"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::caps::{client_capabilities, Capability};
use crate::error::ConfigError;

fn default_true() -> bool {
    true
}

fn default_client_name() -> String {
    "slirc-client".to_string()
}

fn default_port() -> u16 {
    6667
}

fn default_realname() -> String {
    "slirc-client".to_string()
}

fn default_ping_interval() -> u64 {
    15
}

fn default_ping_timeout() -> u64 {
    15
}

fn default_missed_ping_limit() -> u32 {
    3
}

fn default_flood_delay() -> u64 {
    500
}

/// Everything the engine and transport need to connect and register.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Label identifying this client instance in its `Debug` output.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub tls: bool,

    pub nickname: String,
    pub username: String,
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Sent as `PASS` before registration.
    #[serde(default)]
    pub server_password: Option<String>,

    /// Authenticate to services, by SASL when offered and `PASS` otherwise.
    #[serde(default)]
    pub auth_to_services: bool,
    #[serde(default)]
    pub services_username: Option<String>,
    #[serde(default)]
    pub services_password: Option<String>,
    /// PEM client certificate for SASL EXTERNAL.
    #[serde(default)]
    pub services_certificate: Option<PathBuf>,
    /// PEM private key; defaults to the certificate file.
    #[serde(default)]
    pub services_key: Option<PathBuf>,

    /// Quit and disconnect once `missed_ping_limit` pings go unanswered.
    #[serde(default = "default_true")]
    pub restart_on_heavy_lag: bool,
    /// Try to take back the configured nickname when registration had to alter it.
    #[serde(default = "default_true")]
    pub reclaim_nick: bool,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,
    #[serde(default = "default_missed_ping_limit")]
    pub missed_ping_limit: u32,

    /// User modes applied right after the welcome, e.g. `+Q`.
    #[serde(default)]
    pub connect_modes: Option<String>,
    /// Minimum gap between queued outbound lines.
    #[serde(default = "default_flood_delay")]
    pub flood_delay_ms: u64,
    /// Overrides the built-in capability list; an empty list disables CAP.
    #[serde(default)]
    pub supported_capabilities: Option<Vec<String>>,
}

impl ClientConfig {
    /// A configuration with every optional field at its default.
    pub fn new(
        hostname: impl Into<String>,
        nickname: impl Into<String>,
        username: impl Into<String>,
        realname: impl Into<String>,
    ) -> Self {
        Self {
            client_name: default_client_name(),
            hostname: hostname.into(),
            port: default_port(),
            tls: false,
            nickname: nickname.into(),
            username: username.into(),
            realname: realname.into(),
            server_password: None,
            auth_to_services: false,
            services_username: None,
            services_password: None,
            services_certificate: None,
            services_key: None,
            restart_on_heavy_lag: true,
            reclaim_nick: true,
            ping_interval_secs: default_ping_interval(),
            ping_timeout_secs: default_ping_timeout(),
            missed_ping_limit: default_missed_ping_limit(),
            connect_modes: None,
            flood_delay_ms: default_flood_delay(),
            supported_capabilities: None,
        }
    }

    /// Load and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nickname.is_empty() {
            return Err(ConfigError::Invalid("nickname is required".into()));
        }
        if self.nickname.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "nickname {:?} contains whitespace",
                self.nickname
            )));
        }
        if self.username.is_empty() || self.username.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!("username {:?} is not valid", self.username)));
        }
        if self.hostname.is_empty() {
            return Err(ConfigError::Invalid("hostname is required".into()));
        }
        if self.auth_to_services
            && self.services_password.is_none()
            && self.services_certificate.is_none()
        {
            return Err(ConfigError::Invalid(
                "auth_to_services needs services_password or services_certificate".into(),
            ));
        }
        Ok(())
    }

    /// Account name for SASL PLAIN; falls back to the nickname.
    pub fn services_account(&self) -> &str {
        self.services_username.as_deref().unwrap_or(&self.nickname)
    }

    pub fn has_client_certificate(&self) -> bool {
        self.services_certificate.is_some()
    }

    /// The capabilities the engine will ask for.
    pub fn capabilities(&self) -> Vec<Capability> {
        match &self.supported_capabilities {
            Some(names) => {
                let mut caps: Vec<Capability> =
                    names.iter().map(|n| Capability::from(n.as_str())).collect();
                if !self.auth_to_services {
                    caps.retain(|c| *c != Capability::Sasl);
                }
                caps
            }
            None => client_capabilities(self.auth_to_services),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        hostname = "irc.example.net"
        nickname = "bot"
        username = "bot"
    "#;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.port, 6667);
        assert!(!config.tls);
        assert!(config.restart_on_heavy_lag);
        assert!(config.reclaim_nick);
        assert_eq!(config.ping_interval_secs, 15);
        assert_eq!(config.missed_ping_limit, 3);
        assert_eq!(config.flood_delay_ms, 500);
        assert!(!config.capabilities().contains(&Capability::Sasl));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_toml_str(
            r#"
            hostname = "irc.example.net"
            port = 6697
            tls = true
            nickname = "bot"
            username = "bot"
            auth_to_services = true
            services_password = "pw"
            connect_modes = "+Q"
            supported_capabilities = ["sasl", "multi-prefix"]
        "#,
        )
        .unwrap();
        assert_eq!(config.port, 6697);
        assert_eq!(config.connect_modes.as_deref(), Some("+Q"));
        assert_eq!(config.services_account(), "bot");
        assert_eq!(config.capabilities(), vec![Capability::Sasl, Capability::MultiPrefix]);
    }

    #[test]
    fn test_validation() {
        let mut config = ClientConfig::new("irc.example.net", "bot", "bot", "Bot");
        assert!(config.validate().is_ok());

        config.nickname = "two words".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.nickname = "bot".into();
        config.auth_to_services = true;
        assert!(config.validate().is_err());
        config.services_password = Some("pw".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("hostname = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::load("/nonexistent/slirc-client.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
