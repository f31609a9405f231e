//! The protocol engine.
//!
//! [`Client`] receives decoded lines, drives the
//! [`RegistrationMachine`](crate::state::RegistrationMachine) until the
//! welcome, then routes every line to the handler that keeps the
//! [`NickTracker`] in step with the server. Events are published once the
//! engine lock has been released.
//!
//! ```no_run
//! use slirc_client::{Client, ClientConfig, EventKind, Event};
//!
//! # async fn demo() -> slirc_client::Result<()> {
//! let config = ClientConfig::load("bot.toml")?;
//! let (client, lines) = Client::connect(config).await?;
//!
//! client.subscribe(EventKind::Message, |event| {
//!     if let Event::Message { source, text, .. } = event {
//!         println!("<{}> {}", source, text);
//!     }
//! });
//!
//! let runner = client.clone();
//! tokio::spawn(async move { runner.run(lines).await });
//!
//! client.join_channel("##rust").await?;
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::caps::Capability;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result, TrackingError};
use crate::event::{Event, EventBus, EventKind, Source};
use crate::isupport::ServerSupport;
use crate::liveness::{LivenessHost, LivenessSettings, Supervisor};
use crate::mask::HostMask;
use crate::message::Message;
use crate::model::{Channel, DestinationFlag, User};
use crate::prefix::Prefix;
use crate::state::{RegistrationAction, RegistrationConfig, RegistrationMachine};
use crate::tracker::{NickTracker, TrackingHealth};
use crate::transport::Transport;

/// WHOX field selection; the token `001` marks replies as ours.
const WHOX_FIELDS: &str = "%uhnatfc,001";
const WHOX_TOKEN: &str = "001";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gate {
    Pending,
    Open,
    Closed,
}

/// Everything guarded by the engine lock.
#[derive(Debug)]
struct EngineState {
    machine: RegistrationMachine,
    tracker: NickTracker,
    support: ServerSupport,
    intended_nick: String,
    server_prefix: Option<String>,
}

/// Lines to send and events to publish once the lock is released.
#[derive(Debug, Default)]
struct Outcome {
    sends: Vec<Message>,
    events: Vec<Event>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<EngineState>,
    events: EventBus,
    gate: watch::Sender<Gate>,
    supervisor: Supervisor,
    torn_down: AtomicBool,
    /// Flips to `true` once on teardown.
    stopped: watch::Sender<bool>,
}

/// Handle to the engine; clones share it.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_name", &self.inner.config.client_name)
            .field("nickname", &self.nickname())
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl Client {
    /// Build an engine over an already connected transport.
    ///
    /// Nothing is sent until [`start`](Self::start).
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let state = EngineState {
            machine: RegistrationMachine::new(RegistrationConfig::from(&config)),
            tracker: NickTracker::new(),
            support: ServerSupport::new(),
            intended_nick: config.nickname.clone(),
            server_prefix: None,
        };
        let supervisor = Supervisor::new(LivenessSettings::from(&config));
        let (gate, _) = watch::channel(Gate::Pending);
        let (stopped, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                state: Mutex::new(state),
                events: EventBus::new(),
                gate,
                supervisor,
                torn_down: AtomicBool::new(false),
                stopped,
            }),
        }
    }

    /// Validate `config`, open a [`TcpTransport`](crate::transport::TcpTransport)
    /// and begin registration.
    ///
    /// Feed the returned line stream to [`run`](Self::run).
    #[cfg(feature = "transport")]
    pub async fn connect(config: ClientConfig) -> Result<(Self, crate::transport::LineReader)> {
        config.validate()?;
        let (transport, lines) = crate::transport::TcpTransport::connect(&config).await?;
        let client = Self::new(config, transport);
        client.start();
        Ok((client, lines))
    }

    /// Send the opening registration lines.
    pub fn start(&self) {
        let actions = self.inner.state.lock().machine.start();
        self.apply_registration(actions);
    }

    /// Drive the engine from a stream of inbound lines until it ends or the
    /// engine is torn down, then tear down.
    ///
    /// Lines that fail to parse or to apply are logged and skipped.
    pub async fn run<S, E>(&self, mut lines: S)
    where
        S: Stream<Item = std::result::Result<String, E>> + Unpin,
        E: Display,
    {
        let mut stopped = self.inner.stopped.subscribe();
        loop {
            let next = tokio::select! {
                biased;
                _ = stopped.wait_for(|s| *s) => break,
                next = lines.next() => next,
            };
            match next {
                Some(Ok(line)) => {
                    if let Err(e) = self.handle_line(&line) {
                        warn!(error = %e, line = %line, "failed to handle line");
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "read failed");
                    break;
                }
                None => break,
            }
        }
        self.disconnect();
    }

    /// Parse and handle one inbound line.
    pub fn handle_line(&self, line: &str) -> Result<()> {
        let msg = Message::parse(line)?;
        self.handle_message(&msg)
    }

    /// Handle one inbound message.
    pub fn handle_message(&self, msg: &Message) -> Result<()> {
        debug!(line = %msg, "recv");
        match msg.command.to_ascii_uppercase().as_str() {
            "PING" => {
                self.inner.transport.priority_send(&Message::new("PONG", msg.params.clone()));
                return Ok(());
            }
            "PONG" => {
                self.inner.supervisor.pong_received(&msg.params);
                return Ok(());
            }
            "ERROR" => {
                warn!(reason = %msg.arg(0).unwrap_or(""), "server closed the connection");
                self.disconnect();
                return Ok(());
            }
            _ => {}
        }

        let (actions, was_welcomed) = {
            let mut state = self.inner.state.lock();
            let was_welcomed = state.machine.is_welcomed();
            (state.machine.feed(msg), was_welcomed)
        };
        self.apply_registration(actions);

        if !was_welcomed || msg.command.eq_ignore_ascii_case("CAP") {
            return Ok(());
        }
        self.dispatch(msg)
    }

    fn apply_registration(&self, actions: Vec<RegistrationAction>) {
        for action in actions {
            match action {
                RegistrationAction::Send(msg) => self.inner.transport.send(&msg),
                RegistrationAction::Welcomed { nickname, server_prefix } => {
                    {
                        let mut state = self.inner.state.lock();
                        state.tracker.seed_self(&nickname);
                        state.server_prefix = server_prefix;
                    }
                    self.inner.gate.send_if_modified(|gate| {
                        let pending = *gate == Gate::Pending;
                        if pending {
                            *gate = Gate::Open;
                        }
                        pending
                    });
                    self.spawn_supervisor();
                }
                RegistrationAction::LoggedIn { account } => {
                    debug!(account = ?account, "services login recorded");
                }
                RegistrationAction::Abort(reason) => {
                    error!(reason = %reason, "registration aborted");
                    self.disconnect();
                }
            }
        }
    }

    fn spawn_supervisor(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(async move { inner.supervisor.supervise(&*inner).await });
            }
            Err(_) => warn!("no tokio runtime, liveness supervisor not started"),
        }
    }

    fn dispatch(&self, msg: &Message) -> Result<()> {
        let mut outcome = Outcome::default();
        let result = self.inner.state.lock().handle(msg, &mut outcome);
        for line in &outcome.sends {
            self.inner.transport.send(line);
        }
        for event in &outcome.events {
            self.inner.events.publish(event);
        }
        result.map_err(ClientError::from)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.inner.torn_down.load(Ordering::SeqCst) || !self.inner.transport.is_connected() {
            return Err(ClientError::Disconnected);
        }
        Ok(())
    }

    /// Wait until the welcome has been received.
    ///
    /// Returns [`ClientError::Disconnected`] if the engine is torn down first.
    pub async fn wait_until_registered(&self) -> Result<()> {
        let mut gate = self.inner.gate.subscribe();
        let state = *gate
            .wait_for(|g| *g != Gate::Pending)
            .await
            .map_err(|_| ClientError::Disconnected)?;
        match state {
            Gate::Open => Ok(()),
            _ => Err(ClientError::Disconnected),
        }
    }

    pub fn is_registered(&self) -> bool {
        *self.inner.gate.borrow() == Gate::Open
    }

    /// Join a channel once registered. `"0"` (part everything) is refused.
    pub async fn join_channel(&self, channel: &str) -> Result<()> {
        if channel == "0" {
            return Err(ClientError::JoinZeroRejected);
        }
        self.wait_until_registered().await?;
        self.ensure_connected()?;
        self.inner.transport.send(&Message::join(channel));
        Ok(())
    }

    pub async fn part_channel(&self, channel: &str, reason: Option<&str>) -> Result<()> {
        self.wait_until_registered().await?;
        self.ensure_connected()?;
        self.inner.transport.send(&Message::part(channel, reason));
        Ok(())
    }

    /// Send a PRIVMSG once registered, optionally to a status subset of a
    /// channel (`@#channel`).
    pub async fn send_message(
        &self,
        target: &str,
        text: &str,
        flag: Option<DestinationFlag>,
    ) -> Result<()> {
        let target = self.destination(target, flag).await?;
        self.inner.transport.send(&Message::privmsg(target, text));
        Ok(())
    }

    pub async fn send_notice(
        &self,
        target: &str,
        text: &str,
        flag: Option<DestinationFlag>,
    ) -> Result<()> {
        let target = self.destination(target, flag).await?;
        self.inner.transport.send(&Message::notice(target, text));
        Ok(())
    }

    async fn destination(&self, target: &str, flag: Option<DestinationFlag>) -> Result<String> {
        self.wait_until_registered().await?;
        self.ensure_connected()?;
        let Some(flag) = flag else {
            return Ok(target.to_owned());
        };
        let symbol = flag.symbol();
        if !self.inner.state.lock().support.supports_status_msg(symbol) {
            return Err(ClientError::UnsupportedDestinationFlag(symbol));
        }
        Ok(format!("{}{}", symbol, target))
    }

    /// Set a MODE once registered.
    pub async fn mode(&self, target: &str, modes: &[&str]) -> Result<()> {
        self.wait_until_registered().await?;
        self.ensure_connected()?;
        self.inner.transport.send(&Message::mode(target, modes.iter().copied()));
        Ok(())
    }

    /// Request a nickname change and remember it as the one to reclaim.
    ///
    /// The current nickname only changes when the server echoes the NICK.
    pub fn set_nickname(&self, nickname: &str) -> Result<()> {
        self.ensure_connected()?;
        self.inner.state.lock().intended_nick = nickname.to_owned();
        self.inner.transport.send(&Message::nick(nickname));
        Ok(())
    }

    /// Send a raw message without waiting for registration.
    pub fn send(&self, msg: &Message) -> Result<()> {
        self.ensure_connected()?;
        self.inner.transport.send(msg);
        Ok(())
    }

    /// Send QUIT ahead of queued traffic and tear down.
    pub fn quit(&self, reason: &str) {
        if self.ensure_connected().is_ok() {
            self.inner.transport.priority_send(&Message::quit(reason));
        }
        self.disconnect();
    }

    /// Tear the engine down. `Event::Disconnected` is published exactly once.
    pub fn disconnect(&self) {
        self.inner.teardown();
    }

    /// Compile a mask against the server's extban syntax, waiting for
    /// registration so that syntax is known.
    pub async fn compile_mask(&self, mask: &str) -> Result<HostMask> {
        self.wait_until_registered().await?;
        let state = self.inner.state.lock();
        HostMask::parse(mask, state.support.extban())
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(kind, handler);
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Current nickname: confirmed once welcomed, the last attempt before.
    pub fn nickname(&self) -> String {
        let state = self.inner.state.lock();
        match state.tracker.own_nick() {
            Some(nick) => nick.to_owned(),
            None => state.machine.nickname().to_owned(),
        }
    }

    /// The nickname the application asked for.
    pub fn intended_nickname(&self) -> String {
        self.inner.state.lock().intended_nick.clone()
    }

    pub fn user(&self, nick: &str) -> Option<User> {
        self.inner.state.lock().tracker.user(nick).cloned()
    }

    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.inner.state.lock().tracker.channel(name).cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.inner.state.lock().tracker.users().cloned().collect()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.inner.state.lock().tracker.channels().cloned().collect()
    }

    pub fn health(&self) -> TrackingHealth {
        self.inner.state.lock().tracker.health().clone()
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.inner.state.lock().machine.caps().iter().cloned().collect()
    }

    pub fn has_capability(&self, cap: &Capability) -> bool {
        self.inner.state.lock().machine.caps().contains(cap)
    }

    /// Whether services confirmed a login during registration.
    pub fn is_logged_in(&self) -> bool {
        self.inner.state.lock().machine.logged_in()
    }

    /// Round-trip time of the last answered liveness ping.
    pub fn lag(&self) -> Option<Duration> {
        self.inner.supervisor.last_lag()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl Inner {
    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("disconnecting");
        self.supervisor.shutdown();
        self.transport.disconnect();
        self.gate.send_if_modified(|gate| {
            let pending = *gate == Gate::Pending;
            if pending {
                *gate = Gate::Closed;
            }
            pending
        });
        self.stopped.send_replace(true);
        self.events.publish(&Event::Disconnected);
    }
}

impl LivenessHost for Inner {
    fn send_priority(&self, msg: Message) {
        self.transport.priority_send(&msg);
    }

    fn send(&self, msg: Message) {
        self.transport.send(&msg);
    }

    fn is_connected(&self) -> bool {
        !self.torn_down.load(Ordering::SeqCst) && self.transport.is_connected()
    }

    fn reclaim_target(&self) -> Option<(String, bool)> {
        let state = self.state.lock();
        let current = state.tracker.own_nick()?;
        if current == state.intended_nick {
            return None;
        }
        Some((state.intended_nick.clone(), state.machine.logged_in()))
    }

    fn force_disconnect(&self) {
        self.teardown();
    }
}

impl EngineState {
    fn resolve_source(&mut self, msg: &Message) -> Option<Source> {
        let prefix = msg.prefix.as_deref()?;
        if msg.is_numeric() || self.server_prefix.as_deref() == Some(prefix) {
            return Some(Source::Server(prefix.to_owned()));
        }
        match User::from_prefix(&Prefix::parse(prefix)) {
            Some(seen) if !seen.nickname().is_empty() => {
                let tag = if self.machine.caps().contains(&Capability::AccountTag) {
                    msg.tag("account")
                } else {
                    None
                };
                Some(Source::User(self.tracker.resolve(seen, tag)))
            }
            _ => Some(Source::Server(prefix.to_owned())),
        }
    }

    fn snapshot(&self, nick: &str) -> User {
        self.tracker.user(nick).cloned().unwrap_or_else(|| User::new(nick))
    }

    fn handle(
        &mut self,
        msg: &Message,
        out: &mut Outcome,
    ) -> std::result::Result<(), TrackingError> {
        let source = self.resolve_source(msg);
        let actor = source.as_ref().and_then(Source::user).cloned();
        let command = msg.command.to_ascii_uppercase();

        match (command.as_str(), actor) {
            ("JOIN", Some(user)) => {
                let Some(channel) = msg.arg(0) else { return Ok(()) };
                let account = if self.machine.caps().contains(&Capability::ExtendedJoin) {
                    msg.params.get(1).filter(|_| msg.params.len() >= 3).map(String::as_str)
                } else {
                    None
                };
                let is_self = self.tracker.is_self(user.nickname());
                let user = self.tracker.join(channel, user, account)?;
                if is_self {
                    out.sends.push(Message::who(channel, WHOX_FIELDS));
                    out.sends.push(Message::mode(channel, Vec::<String>::new()));
                }
                out.events.push(Event::Join { user, channel: channel.to_owned() });
            }
            ("PART", Some(user)) => {
                let Some(channel) = msg.arg(0) else { return Ok(()) };
                let user = self.tracker.part(channel, user.nickname())?;
                out.events.push(Event::Part {
                    user,
                    channel: channel.to_owned(),
                    reason: msg.arg(1).map(str::to_owned),
                });
            }
            ("KICK", _) => {
                let (Some(channel), Some(victim)) = (msg.arg(0), msg.arg(1)) else { return Ok(()) };
                let by = source.clone().unwrap_or_else(|| Source::Server(String::new()));
                let reason = msg.arg(2).map(str::to_owned);
                let is_self = self.tracker.is_self(victim);
                let user = self.tracker.part(channel, victim)?;
                out.events.push(if is_self {
                    Event::Kicked { by, channel: channel.to_owned(), reason }
                } else {
                    Event::Kick { by, channel: channel.to_owned(), user, reason }
                });
            }
            ("QUIT", Some(user)) => {
                let user = self.tracker.quit(user.nickname()).unwrap_or(user);
                out.events.push(Event::Quit { user, reason: msg.arg(0).map(str::to_owned) });
            }
            ("NICK", Some(user)) => {
                let Some(new) = msg.arg(0) else { return Ok(()) };
                let old = user.nickname().to_owned();
                let (user, result) = match self.tracker.nick(&old, new) {
                    Ok(renamed) => (renamed, Ok(())),
                    Err(err) => {
                        let mut renamed = user;
                        renamed.rename(new);
                        (renamed, Err(err))
                    }
                };
                if self.tracker.is_self(new) {
                    info!(old = %old, new = %new, "nickname changed");
                }
                out.events.push(Event::NickChange { old, user });
                return result;
            }
            ("ACCOUNT", Some(user)) => {
                if let Some(account) = msg.arg(0) {
                    self.tracker.account(user.nickname(), account);
                }
            }
            ("CHGHOST", Some(user)) => {
                if let (Some(username), Some(hostname)) = (msg.arg(0), msg.arg(1)) {
                    self.tracker.chghost(user.nickname(), username, hostname)?;
                }
            }
            ("AWAY", Some(user)) => {
                self.tracker.away(user.nickname(), !msg.params.is_empty())?;
            }
            ("MODE", _) => {
                let Some(target) = msg.arg(0) else { return Ok(()) };
                out.events.push(Event::Mode {
                    source: source.clone().unwrap_or_else(|| Source::Server(String::new())),
                    target: target.to_owned(),
                    modes: msg.params[1..].to_vec(),
                });
                if self.support.is_channel(target) {
                    let modes = msg.arg(1).unwrap_or("");
                    let args = msg.params.get(2..).unwrap_or(&[]);
                    let changes = self.tracker.channel_modes(target, modes, args, &self.support)?;
                    for change in changes {
                        out.events.push(Event::ChannelUserMode {
                            channel: target.to_owned(),
                            user: self.snapshot(&change.nick),
                            mode: change.mode,
                            added: change.added,
                        });
                    }
                }
            }
            ("PRIVMSG" | "NOTICE", _) => {
                let (Some(target), Some(text)) = (msg.arg(0), msg.arg(1)) else { return Ok(()) };
                out.events.push(Event::Message {
                    source: source.unwrap_or_else(|| {
                        Source::Server(self.server_prefix.clone().unwrap_or_default())
                    }),
                    target: target.to_owned(),
                    text: text.to_owned(),
                    notice: command == "NOTICE",
                    tags: msg.tags.clone(),
                });
            }
            ("INVITE", Some(user)) => {
                if let Some(channel) = msg.arg(1) {
                    out.events.push(Event::Invite {
                        source: Source::User(user),
                        channel: channel.to_owned(),
                    });
                }
            }
            ("005", _) => self.support.apply(&msg.params),
            ("353", _) => {
                if let (Some(channel), Some(names)) = (msg.arg(2), msg.params.last()) {
                    self.tracker.names(channel, names, &self.support);
                }
            }
            ("354", _) => {
                if msg.arg(1) == Some(WHOX_TOKEN) {
                    self.tracker.whox(&msg.params, &self.support)?;
                } else {
                    debug!("ignoring WHOX reply without our token");
                }
            }
            ("315", _) => {
                out.events.push(Event::EndOfWho { mask: msg.arg(1).unwrap_or("").to_owned() });
            }
            ("324", _) => {
                if let (Some(channel), Some(modes)) = (msg.arg(1), msg.arg(2)) {
                    let args = msg.params.get(3..).unwrap_or(&[]);
                    self.tracker.channel_modes(channel, modes, args, &self.support)?;
                }
            }
            ("433" | "437", _) => {
                warn!(nick = %msg.arg(1).unwrap_or(""), "nickname change refused");
            }
            ("366", _) => {}
            (command, _) => debug!(command = %command, "unhandled"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct NullTransport {
        lines: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl Transport for NullTransport {
        fn send(&self, msg: &Message) {
            self.lines.lock().push(msg.to_string());
        }
        fn priority_send(&self, msg: &Message) {
            self.lines.lock().push(msg.to_string());
        }
        fn is_connected(&self) -> bool {
            !self.closed.load(Ordering::SeqCst)
        }
        fn disconnect(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn client() -> (Client, Arc<NullTransport>) {
        let mut config = ClientConfig::new("irc.example.net", "bot", "bot", "Bot");
        config.supported_capabilities = Some(Vec::new());
        let transport = Arc::new(NullTransport::default());
        (Client::new(config, transport.clone()), transport)
    }

    #[test]
    fn test_ping_is_answered_before_registration() {
        let (client, transport) = client();
        client.handle_line("PING :irc.example.net").unwrap();
        assert_eq!(transport.lines.lock().as_slice(), ["PONG irc.example.net"]);
    }

    #[test]
    fn test_disconnect_fires_once() {
        let (client, _) = client();
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = Arc::clone(&count);
        client.subscribe(EventKind::Disconnected, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        client.disconnect();
        client.handle_line("ERROR :Closing Link").unwrap();
        client.disconnect();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gate_closes_on_teardown() {
        let (client, _) = client();
        client.start();
        client.disconnect();
        assert!(matches!(client.wait_until_registered().await, Err(ClientError::Disconnected)));
        assert!(matches!(client.join_channel("#c").await, Err(ClientError::Disconnected)));
    }

    #[tokio::test]
    async fn test_run_returns_after_disconnect() {
        let (client, _) = client();
        let runner = client.clone();
        let handle = tokio::spawn(async move {
            runner
                .run(futures_util::stream::pending::<std::result::Result<String, std::io::Error>>())
                .await
        });
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        client.disconnect();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("run loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_returns_after_server_error() {
        let (client, transport) = client();
        let lines = futures_util::stream::iter(vec![Ok::<_, std::io::Error>(
            "ERROR :Closing Link".to_owned(),
        )])
        .chain(futures_util::stream::pending());
        tokio::time::timeout(Duration::from_secs(2), client.run(lines))
            .await
            .expect("run loop did not stop");
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_join_zero_is_rejected_without_waiting() {
        let (client, _) = client();
        assert!(matches!(client.join_channel("0").await, Err(ClientError::JoinZeroRejected)));
    }

    #[test]
    fn test_bad_line_is_reported() {
        let (client, _) = client();
        assert!(matches!(client.handle_line(""), Err(ClientError::Parse(_))));
    }
}
