use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment transitions that may trigger a refetch of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevalidateEvent {
    /// The host regained focus.
    Focus,
    /// The network came back.
    Reconnect,
    /// A refresh tick fired while the host was hidden.
    Hidden,
    /// A refresh tick fired while the host was offline.
    Offline,
}

impl fmt::Display for RevalidateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevalidateEvent::Focus => write!(f, "focus"),
            RevalidateEvent::Reconnect => write!(f, "reconnect"),
            RevalidateEvent::Hidden => write!(f, "hidden"),
            RevalidateEvent::Offline => write!(f, "offline"),
        }
    }
}

/// Per-subscription revalidation switches.
///
/// The defaults refetch on focus and reconnect but not while hidden or
/// offline. Keyed state bindings use [`SubscribeOptions::disabled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
    pub refresh_when_hidden: bool,
    pub refresh_when_offline: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            refresh_when_hidden: false,
            refresh_when_offline: false,
        }
    }
}

impl SubscribeOptions {
    /// Options that never refetch on environment events.
    pub fn disabled() -> Self {
        Self {
            revalidate_on_focus: false,
            revalidate_on_reconnect: false,
            refresh_when_hidden: false,
            refresh_when_offline: false,
        }
    }

    pub fn revalidate_on_focus(mut self, enable: bool) -> Self {
        self.revalidate_on_focus = enable;
        self
    }

    pub fn revalidate_on_reconnect(mut self, enable: bool) -> Self {
        self.revalidate_on_reconnect = enable;
        self
    }

    pub fn refresh_when_hidden(mut self, enable: bool) -> Self {
        self.refresh_when_hidden = enable;
        self
    }

    pub fn refresh_when_offline(mut self, enable: bool) -> Self {
        self.refresh_when_offline = enable;
        self
    }

    /// Whether `event` should refetch a subscription with these options.
    pub fn enables(&self, event: RevalidateEvent) -> bool {
        match event {
            RevalidateEvent::Focus => self.revalidate_on_focus,
            RevalidateEvent::Reconnect => self.revalidate_on_reconnect,
            RevalidateEvent::Hidden => self.refresh_when_hidden,
            RevalidateEvent::Offline => self.refresh_when_offline,
        }
    }
}
