//! Connection liveness supervisor.
//!
//! Every `interval` the supervisor sends a priority `PING` with a fresh
//! token and waits up to `timeout` for the matching `PONG`. Consecutive
//! misses are counted; at `missed_limit` (and with restart enabled) it sends
//! `QUIT` and tears the connection down. Each cycle it also tries to take
//! back the intended nickname if registration had to alter it.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::message::Message;

/// Supervisor tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LivenessSettings {
    pub interval: Duration,
    pub timeout: Duration,
    pub missed_limit: u32,
    pub restart_on_heavy_lag: bool,
    pub reclaim_nick: bool,
}

impl From<&ClientConfig> for LivenessSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.ping_interval_secs),
            timeout: Duration::from_secs(config.ping_timeout_secs),
            missed_limit: config.missed_ping_limit.max(1),
            restart_on_heavy_lag: config.restart_on_heavy_lag,
            reclaim_nick: config.reclaim_nick,
        }
    }
}

/// What the supervisor needs from the engine.
pub trait LivenessHost: Send + Sync {
    /// Queue-jumping send.
    fn send_priority(&self, msg: Message);
    fn send(&self, msg: Message);
    fn is_connected(&self) -> bool;
    /// The intended nickname when it differs from the current one, and
    /// whether services report us logged in.
    fn reclaim_target(&self) -> Option<(String, bool)>;
    fn force_disconnect(&self);
}

#[derive(Debug, Default)]
struct Cycle {
    outstanding: Option<String>,
    sent_at: Option<Instant>,
    missed: u32,
    last_lag: Option<Duration>,
}

/// Shared supervisor state; the dispatcher reports PONGs into it.
#[derive(Debug)]
pub struct Supervisor {
    settings: LivenessSettings,
    cycle: Mutex<Cycle>,
    pong: Notify,
    shutdown: Notify,
}

impl Supervisor {
    pub fn new(settings: LivenessSettings) -> Self {
        Self {
            settings,
            cycle: Mutex::new(Cycle::default()),
            pong: Notify::new(),
            shutdown: Notify::new(),
        }
    }

    pub fn settings(&self) -> &LivenessSettings {
        &self.settings
    }

    /// Consecutive unanswered pings.
    pub fn missed(&self) -> u32 {
        self.cycle.lock().missed
    }

    /// Round-trip time of the last answered ping.
    pub fn last_lag(&self) -> Option<Duration> {
        self.cycle.lock().last_lag
    }

    fn begin(&self, token: String) {
        let mut cycle = self.cycle.lock();
        cycle.outstanding = Some(token);
        cycle.sent_at = Some(Instant::now());
    }

    fn timed_out(&self) -> u32 {
        let mut cycle = self.cycle.lock();
        cycle.outstanding = None;
        cycle.missed += 1;
        cycle.missed
    }

    /// Report a `PONG`. Returns true if it answered the outstanding ping.
    pub fn pong_received(&self, params: &[String]) -> bool {
        let mut cycle = self.cycle.lock();
        let Some(token) = cycle.outstanding.as_deref() else {
            return false;
        };
        if !params.iter().any(|p| p == token) {
            return false;
        }
        cycle.outstanding = None;
        cycle.missed = 0;
        cycle.last_lag = cycle.sent_at.map(|sent| sent.elapsed());
        debug!(lag = ?cycle.last_lag, "ping answered");
        drop(cycle);
        self.pong.notify_one();
        true
    }

    /// Stop the supervision loop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run until shut down, disconnected, or lag forces a disconnect.
    pub async fn supervise<H: LivenessHost + ?Sized>(&self, host: &H) {
        let settings = self.settings;
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = tokio::time::sleep(settings.interval) => {}
            }
            if !host.is_connected() {
                break;
            }

            let token = format!("lag-check-{}", chrono::Utc::now().timestamp_millis());
            self.begin(token.clone());
            host.send_priority(Message::ping(token));

            let answered = tokio::select! {
                _ = self.shutdown.notified() => break,
                waited = tokio::time::timeout(settings.timeout, self.pong.notified()) => {
                    waited.is_ok()
                }
            };

            if !answered {
                let missed = self.timed_out();
                warn!(missed, limit = settings.missed_limit, "ping timed out");
                if missed >= settings.missed_limit && settings.restart_on_heavy_lag {
                    error!("heavy lag, forcing disconnect");
                    host.send_priority(Message::quit("Unexpected heavy lag, restarting..."));
                    host.force_disconnect();
                    break;
                }
            }

            if settings.reclaim_nick {
                if let Some((nick, logged_in)) = host.reclaim_target() {
                    debug!(nick = %nick, logged_in, "reclaiming nickname");
                    if logged_in {
                        host.send(Message::privmsg("NickServ", format!("REGAIN {}", nick)));
                    } else {
                        host.send(Message::nick(nick));
                    }
                }
            }
        }
        debug!("liveness supervisor stopped");
    }
}
