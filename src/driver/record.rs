//! Connection record state machine
//!
//! `Pending -> Connecting -> Joined -> {Left, Errored}`, plus
//! `Connecting -> Errored` for a failed open. Terminal states are final:
//! a reconnect would be a new record.

use serde::Serialize;

/// Lifecycle state of one session attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Pending,
    Connecting,
    Joined,
    Left,
    Errored,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Left | Self::Errored)
    }
}

/// One logical session attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    index: usize,
    state: ConnectionState,
}

impl ConnectionRecord {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            state: ConnectionState::Pending,
        }
    }

    #[must_use]
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    #[inline]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    // Each transition returns whether it happened. Callers tie counter
    // updates and events to a `true` result so they fire at most once.

    pub fn start_connecting(&mut self) -> bool {
        self.transition(ConnectionState::Pending, ConnectionState::Connecting)
    }

    pub fn mark_joined(&mut self) -> bool {
        self.transition(ConnectionState::Connecting, ConnectionState::Joined)
    }

    pub fn mark_left(&mut self) -> bool {
        self.transition(ConnectionState::Joined, ConnectionState::Left)
    }

    /// Open failure or runtime error
    pub fn mark_errored(&mut self) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Joined => {
                self.state = ConnectionState::Errored;
                true
            }
            _ => false,
        }
    }

    fn transition(&mut self, from: ConnectionState, to: ConnectionState) -> bool {
        if self.state == from {
            self.state = to;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut record = ConnectionRecord::new(4);
        assert_eq!(record.state(), ConnectionState::Pending);
        assert!(record.start_connecting());
        assert!(record.mark_joined());
        assert!(record.mark_left());
        assert_eq!(record.state(), ConnectionState::Left);
        assert!(record.state().is_terminal());
    }

    #[test]
    fn test_open_failure() {
        let mut record = ConnectionRecord::new(0);
        record.start_connecting();
        assert!(record.mark_errored());
        assert!(!record.mark_joined());
        assert!(!record.mark_left());
        assert_eq!(record.state(), ConnectionState::Errored);
    }

    #[test]
    fn test_no_resurrection() {
        let mut record = ConnectionRecord::new(1);
        record.start_connecting();
        record.mark_joined();
        assert!(record.mark_left());
        assert!(!record.mark_errored());
        assert!(!record.mark_left());
        assert!(!record.start_connecting());
        assert_eq!(record.state(), ConnectionState::Left);
    }

    #[test]
    fn test_error_then_leave() {
        let mut record = ConnectionRecord::new(1);
        record.start_connecting();
        record.mark_joined();
        assert!(record.mark_errored());
        assert!(!record.mark_left());
        assert_eq!(record.state(), ConnectionState::Errored);
    }

    #[test]
    fn test_cannot_join_without_connecting() {
        let mut record = ConnectionRecord::new(2);
        assert!(!record.mark_joined());
        assert!(!record.mark_errored());
        assert_eq!(record.state(), ConnectionState::Pending);
    }
}
