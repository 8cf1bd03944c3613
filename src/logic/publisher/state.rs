//! Connection state shared between the transport and the publisher.
//!
//! Only the transport's connect / disconnect notifications write it; `publish`
//! and the drain loop read it.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Cloneable handle the transport uses to report link changes
#[derive(Debug, Clone, Default)]
pub struct ConnectionMonitor {
    state: Arc<Mutex<ConnectionState>>,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn notify_connecting(&self) {
        self.transition(ConnectionState::Connecting);
    }

    pub fn notify_connected(&self) {
        self.transition(ConnectionState::Connected);
    }

    pub fn notify_disconnected(&self) {
        self.transition(ConnectionState::Disconnected);
    }

    fn transition(&self, next: ConnectionState) {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, next)
        };

        if previous != next {
            match next {
                ConnectionState::Connected => log::info!("Link connected"),
                ConnectionState::Disconnected if previous == ConnectionState::Connected => {
                    log::warn!("Link lost")
                }
                _ => log::debug!("Link {} -> {}", previous, next),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_visible_through_clones() {
        let monitor = ConnectionMonitor::new();
        let transport_side = monitor.clone();

        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        transport_side.notify_connecting();
        assert_eq!(monitor.state(), ConnectionState::Connecting);
        transport_side.notify_connected();
        assert!(monitor.is_connected());
        transport_side.notify_disconnected();
        assert!(!monitor.is_connected());
    }
}
