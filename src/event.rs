//! Events published to application code.
//!
//! Handlers are registered per [`EventKind`] (or for everything) and run
//! synchronously on the dispatching task, after the tracking store has been
//! updated and its lock released. A handler may therefore call back into the
//! [`Client`](crate::Client) freely.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::message::tags::Tags;
use crate::model::User;

/// Origin of an inbound line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// The server itself, or any prefix without a user part.
    Server(String),
    /// A user, resolved against the tracking cache.
    User(User),
}

impl Source {
    pub fn user(&self) -> Option<&User> {
        match self {
            Source::User(user) => Some(user),
            Source::Server(_) => None,
        }
    }

    /// Nickname or server name.
    pub fn name(&self) -> &str {
        match self {
            Source::User(user) => user.nickname(),
            Source::Server(name) => name,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Server(name) => f.write_str(name),
            Source::User(user) => user.fmt(f),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    /// PRIVMSG or NOTICE.
    Message {
        source: Source,
        target: String,
        text: String,
        notice: bool,
        tags: Tags,
    },
    Join {
        user: User,
        channel: String,
    },
    /// Someone, possibly the local user, left a channel.
    Part {
        user: User,
        channel: String,
        reason: Option<String>,
    },
    Quit {
        user: User,
        reason: Option<String>,
    },
    /// Another user was kicked.
    Kick {
        by: Source,
        channel: String,
        user: User,
        reason: Option<String>,
    },
    /// The local user was kicked.
    Kicked {
        by: Source,
        channel: String,
        reason: Option<String>,
    },
    NickChange {
        old: String,
        user: User,
    },
    /// A status-prefix mode changed on a channel member.
    ChannelUserMode {
        channel: String,
        user: User,
        mode: char,
        added: bool,
    },
    /// Any MODE line, channel or user.
    Mode {
        source: Source,
        target: String,
        modes: Vec<String>,
    },
    Invite {
        source: Source,
        channel: String,
    },
    /// `315`, after a WHO listing.
    EndOfWho {
        mask: String,
    },
    /// Raised exactly once when the engine is torn down.
    Disconnected,
}

/// Discriminant of [`Event`], used for subscriptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    Join,
    Part,
    Quit,
    Kick,
    Kicked,
    NickChange,
    ChannelUserMode,
    Mode,
    Invite,
    EndOfWho,
    Disconnected,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Message { .. } => EventKind::Message,
            Event::Join { .. } => EventKind::Join,
            Event::Part { .. } => EventKind::Part,
            Event::Quit { .. } => EventKind::Quit,
            Event::Kick { .. } => EventKind::Kick,
            Event::Kicked { .. } => EventKind::Kicked,
            Event::NickChange { .. } => EventKind::NickChange,
            Event::ChannelUserMode { .. } => EventKind::ChannelUserMode,
            Event::Mode { .. } => EventKind::Mode,
            Event::Invite { .. } => EventKind::Invite,
            Event::EndOfWho { .. } => EventKind::EndOfWho,
            Event::Disconnected => EventKind::Disconnected,
        }
    }
}

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Observer registry.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<(Option<EventKind>, Handler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.write().push((Some(kind), Arc::new(handler)));
    }

    /// Call `handler` for every event.
    pub fn subscribe_all<F>(&self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.write().push((None, Arc::new(handler)));
    }

    /// Deliver `event` to matching handlers in registration order.
    pub fn publish(&self, event: &Event) {
        let kind = event.kind();
        let matching: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .filter(|(filter, _)| filter.map_or(true, |k| k == kind))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in matching {
            handler(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscribe_filters_by_kind() {
        let bus = EventBus::new();
        let joins = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let j = Arc::clone(&joins);
        bus.subscribe(EventKind::Join, move |_| {
            j.fetch_add(1, Ordering::SeqCst);
        });
        let a = Arc::clone(&all);
        bus.subscribe_all(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&Event::Join { user: User::new("a"), channel: "#c".into() });
        bus.publish(&Event::Disconnected);

        assert_eq!(joins.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handler_may_subscribe_during_publish() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.subscribe(EventKind::Disconnected, move |_| {
            inner.subscribe_all(|_| {});
        });
        bus.publish(&Event::Disconnected);
        assert_eq!(format!("{:?}", bus), "EventBus { handlers: 2 }");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(Source::Server("irc.example.net".into()).to_string(), "irc.example.net");
        assert_eq!(Source::User(User::new("nick")).name(), "nick");
    }
}
