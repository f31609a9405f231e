use tracing::{debug, error, info, warn};

use crate::caps::{
    enforce_coupling, parse_changes, parse_offer, select_requested, Capability, CapabilitySet,
    OfferedCap,
};
use crate::config::ClientConfig;
use crate::message::Message;
use crate::sasl::{
    authenticate_lines, choose_mechanism, encode_external, encode_plain, SaslMechanism,
};

/// Where the connection is in its registration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationState {
    /// Sent `CAP LS 302`, collecting the capability list.
    #[default]
    AwaitingCapList,
    /// Sent `CAP REQ`, waiting for ACK or NAK.
    RequestingCaps,
    /// SASL exchange in progress.
    Authenticating,
    /// Sent `CAP END`.
    CapDone,
    /// Sent `USER` and `NICK`, waiting for the welcome.
    Registered,
    /// The server refused the nickname and an altered one was sent.
    NickCollisionRetry,
    /// Received `001`.
    Welcomed,
    /// Registration failed and the connection is being closed.
    Aborted,
}

/// Identity and credentials needed to register.
#[derive(Clone, Debug)]
pub struct RegistrationConfig {
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub server_password: Option<String>,
    pub auth_to_services: bool,
    pub services_account: String,
    pub services_password: Option<String>,
    pub has_client_cert: bool,
    /// Capabilities the client can use; empty skips `CAP` altogether.
    pub supported: Vec<Capability>,
    /// User modes applied after the welcome.
    pub connect_modes: Option<String>,
}

impl RegistrationConfig {
    /// An unauthenticated configuration with the default capability list.
    pub fn new(
        nickname: impl Into<String>,
        username: impl Into<String>,
        realname: impl Into<String>,
    ) -> Self {
        let nickname = nickname.into();
        Self {
            services_account: nickname.clone(),
            nickname,
            username: username.into(),
            realname: realname.into(),
            server_password: None,
            auth_to_services: false,
            services_password: None,
            has_client_cert: false,
            supported: crate::caps::client_capabilities(false),
            connect_modes: None,
        }
    }
}

impl From<&ClientConfig> for RegistrationConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            nickname: config.nickname.clone(),
            username: config.username.clone(),
            realname: config.realname.clone(),
            server_password: config.server_password.clone(),
            auth_to_services: config.auth_to_services,
            services_account: config.services_account().to_owned(),
            services_password: config.services_password.clone(),
            has_client_cert: config.has_client_certificate(),
            supported: config.capabilities(),
            connect_modes: config.connect_modes.clone(),
        }
    }
}

/// Actions produced by the registration machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationAction {
    /// Send this message to the server.
    Send(Box<Message>),
    /// `001` arrived; the connection is operational under `nickname`.
    Welcomed {
        nickname: String,
        server_prefix: Option<String>,
    },
    /// Services reported a successful login (`900`).
    LoggedIn { account: Option<String> },
    /// Registration failed; the connection must be closed.
    Abort(String),
}

fn send(msg: Message) -> RegistrationAction {
    RegistrationAction::Send(Box::new(msg))
}

/// Drives CAP negotiation, SASL and `USER`/`NICK` registration.
///
/// Capability messages keep flowing through [`feed`](Self::feed) after the
/// welcome so `CAP NEW`/`CAP DEL` stay reflected in [`caps`](Self::caps).
#[derive(Clone, Debug)]
pub struct RegistrationMachine {
    config: RegistrationConfig,
    state: RegistrationState,
    /// Everything the server has advertised and not deleted.
    offered: Vec<OfferedCap>,
    /// Requested in the initial `CAP REQ` and not yet answered.
    pending: Vec<Capability>,
    enabled: CapabilitySet,
    mechanism: Option<SaslMechanism>,
    nickname: String,
    registration_sent: bool,
    logged_in: bool,
}

impl RegistrationMachine {
    #[must_use]
    pub fn new(config: RegistrationConfig) -> Self {
        let nickname = config.nickname.clone();
        Self {
            config,
            state: RegistrationState::AwaitingCapList,
            offered: Vec::new(),
            pending: Vec::new(),
            enabled: CapabilitySet::new(),
            mechanism: None,
            nickname,
            registration_sent: false,
            logged_in: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Capabilities currently enabled on the connection.
    #[must_use]
    pub fn caps(&self) -> &CapabilitySet {
        &self.enabled
    }

    /// The nickname most recently sent to the server.
    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    #[must_use]
    pub fn is_welcomed(&self) -> bool {
        self.state == RegistrationState::Welcomed
    }

    /// Whether services confirmed a login.
    #[must_use]
    pub fn logged_in(&self) -> bool {
        self.logged_in
    }

    /// Begin registration.
    #[must_use]
    pub fn start(&mut self) -> Vec<RegistrationAction> {
        if self.config.supported.is_empty() {
            debug!("no capabilities supported, registering without CAP");
            return self.register();
        }
        self.state = RegistrationState::AwaitingCapList;
        vec![send(Message::cap("LS", ["302"]))]
    }

    /// Feed one inbound message.
    #[must_use]
    pub fn feed(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        if self.state == RegistrationState::Aborted {
            return Vec::new();
        }

        match msg.command.to_ascii_uppercase().as_str() {
            "CAP" => self.handle_cap(msg),
            "AUTHENTICATE" if self.state == RegistrationState::Authenticating => {
                self.handle_authenticate(msg)
            }
            "001" => self.handle_welcome(msg),
            "433" | "437" if !self.is_welcomed() => self.handle_nick_collision(),
            "900" | "902" | "903" | "904" | "905" | "906" | "907" => self.handle_sasl_numeric(msg),
            command => {
                if !self.is_welcomed() {
                    debug!(command = %command, "ignoring during registration");
                }
                Vec::new()
            }
        }
    }

    fn handle_cap(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        let subcommand = msg.arg(1).unwrap_or("").to_ascii_uppercase();
        // `CAP * LS * :caps` marks a continuation line
        let continued = msg.params.len() > 3 && msg.arg(2) == Some("*");
        let list = msg.params.last().map(String::as_str).unwrap_or("");

        match subcommand.as_str() {
            "LS" => self.handle_cap_ls(list, continued),
            "ACK" => self.handle_cap_ack(list),
            "NAK" => {
                warn!(caps = %list, "capability request rejected");
                if self.state == RegistrationState::RequestingCaps {
                    self.pending.clear();
                    return self.end_negotiation();
                }
                Vec::new()
            }
            "NEW" => self.handle_cap_new(list),
            "DEL" => self.handle_cap_del(list),
            _ => Vec::new(),
        }
    }

    fn handle_cap_ls(&mut self, list: &str, continued: bool) -> Vec<RegistrationAction> {
        if self.state != RegistrationState::AwaitingCapList {
            return Vec::new();
        }
        self.offered.extend(parse_offer(list));
        if continued {
            return Vec::new();
        }

        let requested =
            select_requested(&self.offered, &self.config.supported, self.config.has_client_cert);
        if requested.is_empty() {
            debug!("server offers nothing we use");
            return self.end_negotiation();
        }

        let names: Vec<&str> = requested.iter().map(AsRef::as_ref).collect();
        debug!(caps = %names.join(" "), "requesting capabilities");
        let request = send(Message::cap("REQ", [names.join(" ")]));
        self.pending = requested;
        self.state = RegistrationState::RequestingCaps;
        vec![request]
    }

    fn handle_cap_ack(&mut self, list: &str) -> Vec<RegistrationAction> {
        let changes = parse_changes(list);
        self.enabled.apply(&changes);
        info!(caps = %list, "capabilities acknowledged");

        if self.state != RegistrationState::RequestingCaps {
            return Vec::new();
        }
        self.pending.retain(|cap| !changes.iter().any(|(_, acked)| acked == cap));
        if !self.pending.is_empty() {
            return Vec::new();
        }

        if self.enabled.contains(&Capability::Sasl) && self.config.auth_to_services {
            let offered = self
                .offered
                .iter()
                .find(|o| o.cap == Capability::Sasl)
                .and_then(|o| o.value.as_deref());
            let mechanism = choose_mechanism(offered, self.config.has_client_cert);
            info!(mechanism = %mechanism, "starting SASL");
            let start = send(Message::authenticate(mechanism.as_str()));
            self.mechanism = Some(mechanism);
            self.state = RegistrationState::Authenticating;
            return vec![start];
        }
        self.end_negotiation()
    }

    fn handle_cap_new(&mut self, list: &str) -> Vec<RegistrationAction> {
        let fresh = parse_offer(list);
        self.offered.extend(fresh.iter().cloned());

        let settled = matches!(
            self.state,
            RegistrationState::CapDone
                | RegistrationState::Registered
                | RegistrationState::NickCollisionRetry
                | RegistrationState::Welcomed
        );
        if !settled {
            return Vec::new();
        }

        let mut wanted: Vec<Capability> = Vec::new();
        for offer in &fresh {
            let cap = &offer.cap;
            if *cap != Capability::Sasl
                && self.config.supported.contains(cap)
                && !self.enabled.contains(cap)
                && !wanted.contains(cap)
            {
                wanted.push(cap.clone());
            }
        }

        // couple against what is already enabled, not only the new offer
        let mut combined: Vec<Capability> = self.enabled.iter().cloned().collect();
        combined.extend(wanted.iter().cloned());
        enforce_coupling(&mut combined);
        wanted.retain(|cap| combined.contains(cap));

        if wanted.is_empty() {
            return Vec::new();
        }
        let names: Vec<&str> = wanted.iter().map(AsRef::as_ref).collect();
        debug!(caps = %names.join(" "), "requesting newly offered capabilities");
        vec![send(Message::cap("REQ", [names.join(" ")]))]
    }

    fn handle_cap_del(&mut self, list: &str) -> Vec<RegistrationAction> {
        let removed: Vec<(bool, Capability)> = parse_changes(list)
            .into_iter()
            .map(|(_, cap)| (false, cap))
            .collect();
        self.offered.retain(|o| !removed.iter().any(|(_, cap)| *cap == o.cap));
        self.enabled.apply(&removed);
        info!(caps = %list, "capabilities withdrawn by server");

        match self.enabled.coupling_repair() {
            Some(repair) => {
                debug!(request = %repair, "dropping uncoupled capability");
                vec![send(Message::cap("REQ", [repair]))]
            }
            None => Vec::new(),
        }
    }

    fn handle_authenticate(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        if msg.arg(0) != Some("+") {
            debug!("ignoring non-continuation AUTHENTICATE");
            return Vec::new();
        }
        let payload = match self.mechanism {
            Some(SaslMechanism::External) => encode_external(),
            _ => encode_plain(
                &self.config.services_account,
                self.config.services_password.as_deref().unwrap_or(""),
            ),
        };
        authenticate_lines(&payload)
            .into_iter()
            .map(|chunk| send(Message::authenticate(chunk)))
            .collect()
    }

    fn handle_sasl_numeric(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        let reason = msg.params.last().cloned().unwrap_or_default();
        match msg.command.as_str() {
            "900" => {
                self.logged_in = true;
                let account = msg.arg(2).map(str::to_owned);
                info!(account = ?account, "logged in to services");
                vec![RegistrationAction::LoggedIn { account }]
            }
            "903" | "907" if self.state == RegistrationState::Authenticating => {
                info!("SASL authentication complete");
                self.end_negotiation()
            }
            "906" if self.state == RegistrationState::Authenticating => {
                warn!(reason = %reason, "SASL aborted, registering without authentication");
                self.end_negotiation()
            }
            "902" | "904" | "905" if self.state == RegistrationState::Authenticating => {
                error!(numeric = %msg.command, reason = %reason, "SASL authentication failed");
                self.state = RegistrationState::Aborted;
                vec![
                    send(Message::quit("SASL authentication failed")),
                    RegistrationAction::Abort(format!("SASL authentication failed: {}", reason)),
                ]
            }
            _ => Vec::new(),
        }
    }

    fn end_negotiation(&mut self) -> Vec<RegistrationAction> {
        self.state = RegistrationState::CapDone;
        let mut actions = vec![send(Message::cap("END", Vec::<String>::new()))];
        actions.extend(self.register());
        actions
    }

    /// `PASS`, `USER` and `NICK`.
    fn register(&mut self) -> Vec<RegistrationAction> {
        self.state = RegistrationState::Registered;
        if self.registration_sent {
            return Vec::new();
        }
        self.registration_sent = true;

        let mut actions = Vec::new();
        let password = match &self.config.server_password {
            Some(password) => Some(password.clone()),
            None if self.config.auth_to_services && !self.enabled.contains(&Capability::Sasl) => {
                self.config.services_password.clone()
            }
            None => None,
        };
        if let Some(password) = password {
            actions.push(send(Message::pass(password)));
        }
        actions.push(send(Message::user(
            self.config.username.clone(),
            self.config.realname.clone(),
        )));
        actions.push(send(Message::nick(self.nickname.clone())));
        actions
    }

    fn handle_nick_collision(&mut self) -> Vec<RegistrationAction> {
        if !self.registration_sent {
            return Vec::new();
        }
        self.nickname.push('_');
        warn!(nick = %self.nickname, "nickname in use, retrying");
        self.state = RegistrationState::NickCollisionRetry;
        vec![send(Message::nick(self.nickname.clone()))]
    }

    fn handle_welcome(&mut self, msg: &Message) -> Vec<RegistrationAction> {
        if self.is_welcomed() {
            return Vec::new();
        }
        if let Some(nick) = msg.arg(0) {
            self.nickname = nick.to_owned();
        }
        self.state = RegistrationState::Welcomed;
        info!(nick = %self.nickname, "registration complete");

        let mut actions = Vec::new();
        if let Some(modes) = self.config.connect_modes.as_deref().filter(|m| !m.is_empty()) {
            actions.push(send(Message::mode(self.nickname.clone(), [modes])));
        }
        actions.push(RegistrationAction::Welcomed {
            nickname: self.nickname.clone(),
            server_prefix: msg.prefix.clone(),
        });
        actions
    }
}
