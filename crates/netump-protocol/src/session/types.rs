//! Session roles, states, and the actions the machine asks the endpoint to
//! perform.

use std::net::SocketAddr;

use netump_core::command::Command;

/// Which side of the invitation handshake this endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Actively invites the declared remote target.
    Initiator,
    /// Waits for a remote initiator's invitation.
    Listener,
}

/// Internal session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Invite,
    WaitInvite,
    Opened,
}

/// The coarse status exposed to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionStatus {
    Closed = 0,
    Invite = 1,
    WaitInvite = 2,
    Opened = 3,
}

impl SessionStatus {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Invite,
            2 => Self::WaitInvite,
            3 => Self::Opened,
            _ => Self::Closed,
        }
    }
}

impl From<SessionState> for SessionStatus {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Closed => Self::Closed,
            SessionState::Invite => Self::Invite,
            SessionState::WaitInvite => Self::WaitInvite,
            SessionState::Opened => Self::Opened,
        }
    }
}

/// What an initiator does after its partner ends the session (BYE or
/// liveness timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReinvitePolicy {
    /// Immediately start inviting the partner again.
    #[default]
    AutoReinvite,
    /// Stay closed until the application restarts the initiator.
    StayClosed,
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Transmit a command to a peer.
    Send { to: SocketAddr, command: Command },
    /// A session has opened. `peer_name` carries the remote endpoint name
    /// when we are the invited side.
    Opened {
        partner: SocketAddr,
        peer_name: Option<String>,
    },
    /// The session has terminated (any cause).
    Closed,
    /// Wipe both FEC windows and restart the outbound sequence counter.
    ResetFec,
    /// Raise the one-shot connection-lost flag (liveness timeout).
    ConnectionLost,
    /// Raise the one-shot peer-closed flag (partner sent BYE).
    PeerClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_protocol_mapping() {
        assert_eq!(SessionStatus::from(SessionState::Closed).as_u8(), 0);
        assert_eq!(SessionStatus::from(SessionState::Invite).as_u8(), 1);
        assert_eq!(SessionStatus::from(SessionState::WaitInvite).as_u8(), 2);
        assert_eq!(SessionStatus::from(SessionState::Opened).as_u8(), 3);
    }

    #[test]
    fn status_from_u8_roundtrip() {
        for status in [
            SessionStatus::Closed,
            SessionStatus::Invite,
            SessionStatus::WaitInvite,
            SessionStatus::Opened,
        ] {
            assert_eq!(SessionStatus::from_u8(status.as_u8()), status);
        }
        assert_eq!(SessionStatus::from_u8(0xFF), SessionStatus::Closed);
    }
}
