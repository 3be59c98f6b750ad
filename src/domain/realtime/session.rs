use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle of a persistent client connection.
///
/// `Connecting -> Open -> Closing -> Closed`. A refused handshake goes
/// straight from `Connecting` to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl SessionState {
    /// Room membership may only change while open.
    pub fn accepts_membership(&self) -> bool {
        matches!(self, SessionState::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

impl StateMachine for SessionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionState::*;
        match self {
            Connecting => vec![Open, Closed],
            Open => vec![Closing],
            Closing => vec![Closed],
            Closed => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_handshake_skips_open() {
        assert_eq!(
            SessionState::Connecting.transition_to(SessionState::Closed),
            Ok(SessionState::Closed)
        );
    }

    #[test]
    fn open_session_closes_through_closing() {
        assert!(SessionState::Open.transition_to(SessionState::Closed).is_err());
        let closing = SessionState::Open.transition_to(SessionState::Closing).unwrap();
        assert_eq!(closing.transition_to(SessionState::Closed), Ok(SessionState::Closed));
    }

    #[test]
    fn only_open_accepts_membership() {
        assert!(SessionState::Open.accepts_membership());
        assert!(!SessionState::Connecting.accepts_membership());
        assert!(!SessionState::Closing.accepts_membership());
        assert!(SessionState::Closed.is_terminal());
    }
}
