//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slirc_client::{Client, ClientConfig, Event, EventKind, Message, Transport};

/// Transport that records every line instead of writing it anywhere.
#[derive(Default)]
pub struct RecordingTransport {
    lines: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl RecordingTransport {
    /// Lines sent since the last call.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl Transport for RecordingTransport {
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

pub fn make_config() -> ClientConfig {
    let mut config = ClientConfig::new("irc.example.net", "stwtestbot", "username", "real name");
    config.connect_modes = Some("+Q".into());
    config
}

pub fn make_client(config: ClientConfig) -> (Client, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let client = Client::new(config, transport.clone());
    (client, transport)
}

/// Feed each line, failing the test on any error.
pub fn feed(client: &Client, lines: &[&str]) {
    for line in lines {
        if let Err(e) = client.handle_line(line) {
            panic!("{} failed: {}", line, e);
        }
    }
}

/// Registers with `account-notify extended-join multi-prefix` and returns
/// the client with its outbound log cleared.
pub fn registered_client() -> (Client, Arc<RecordingTransport>) {
    let (client, transport) = make_client(make_config());
    client.start();
    feed(
        &client,
        &[
            ":irc.example.net CAP * LS :account-notify extended-join multi-prefix",
            ":irc.example.net CAP * ACK :account-notify extended-join multi-prefix",
            ":irc.example.net 001 stwtestbot :Welcome to the network",
        ],
    );
    transport.take();
    (client, transport)
}

/// Collects every published event.
pub fn record_events(client: &Client) -> Arc<Mutex<Vec<Event>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    client.events().subscribe_all(move |event| sink.lock().push(event.clone()));
    events
}

pub fn kinds(events: &Mutex<Vec<Event>>) -> Vec<EventKind> {
    events.lock().iter().map(Event::kind).collect()
}
