//! The session state machine proper.

use std::net::SocketAddr;

use netump_core::command::{ByeReason, Command};
use netump_core::identity::EndpointIdentity;

use super::constants::{
    FIRST_EVENT_DELAY_TICKS, INVITE_RETRY_TICKS, LIVENESS_TIMEOUT_TICKS, PING_IDLE_TICKS,
};
use super::types::{ReinvitePolicy, SessionAction, SessionRole, SessionState, SessionStatus};
use crate::timer::RetryTimer;

/// Everything needed to start a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub role: SessionRole,
    /// The declared remote. Required for an initiator; a listener learns its
    /// partner from the incoming invitation.
    pub target: Option<SocketAddr>,
    pub identity: EndpointIdentity,
    pub reinvite: ReinvitePolicy,
}

/// Session descriptor and state machine.
///
/// Deliberately decoupled from I/O: `on_tick` and `on_command` push
/// [`SessionAction`]s that the caller performs against the real socket,
/// transmit pipeline, and application callbacks.
pub struct Session {
    role: SessionRole,
    target: Option<SocketAddr>,
    partner: Option<SocketAddr>,
    identity: EndpointIdentity,
    reinvite: ReinvitePolicy,
    state: SessionState,
    timer: RetryTimer,
    /// Ticks left until the partner is considered lost.
    liveness: u32,
    invite_count: u32,
    ping_delay: u32,
    ping_id: u32,
}

impl Session {
    /// Create the session in its post-`Start` state: INVITE for an
    /// initiator (with the first invitation due on the next tick),
    /// WAIT_INVITE for a listener.
    pub fn start(config: SessionConfig) -> Self {
        let (state, partner) = match config.role {
            SessionRole::Initiator => (SessionState::Invite, config.target),
            SessionRole::Listener => (SessionState::WaitInvite, None),
        };
        let mut timer = RetryTimer::new();
        timer.arm(FIRST_EVENT_DELAY_TICKS);
        tracing::info!(role = ?config.role, target = ?config.target, "session started");
        Self {
            role: config.role,
            target: config.target,
            partner,
            identity: config.identity,
            reinvite: config.reinvite,
            state,
            timer,
            liveness: LIVENESS_TIMEOUT_TICKS,
            invite_count: 0,
            ping_delay: 0,
            ping_id: 0,
        }
    }

    // ------------------------------------------------------------------ //
    // Accessors
    // ------------------------------------------------------------------ //

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.into()
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn partner(&self) -> Option<SocketAddr> {
        self.partner
    }

    /// Number of invitations sent since start.
    pub fn invite_count(&self) -> u32 {
        self.invite_count
    }

    /// Whether a UMP-DATA command from `from` belongs to this session.
    pub fn accepts_ump_from(&self, from: SocketAddr) -> bool {
        self.state == SessionState::Opened && self.partner == Some(from)
    }

    /// Record inbound session traffic as liveness evidence.
    pub fn note_traffic(&mut self) {
        self.liveness = LIVENESS_TIMEOUT_TICKS;
    }

    // ------------------------------------------------------------------ //
    // Tick
    // ------------------------------------------------------------------ //

    /// Advance one millisecond: retry timer, liveness watchdog, invitation
    /// retries, and the idle PING probe.
    pub fn on_tick(&mut self, actions: &mut Vec<SessionAction>) {
        self.timer.tick();

        match self.state {
            SessionState::Opened => {
                if self.liveness > 0 {
                    self.liveness -= 1;
                }
                if self.liveness == 0 {
                    self.on_partner_lost(actions);
                    return;
                }

                self.ping_delay += 1;
                if self.ping_delay > PING_IDLE_TICKS {
                    self.ping_delay = 0;
                    self.ping_id = self.ping_id.wrapping_add(1);
                    if let Some(partner) = self.partner {
                        tracing::debug!(id = self.ping_id, "session: sending idle PING");
                        actions.push(SessionAction::Send {
                            to: partner,
                            command: Command::Ping { id: self.ping_id },
                        });
                    }
                }
            }
            SessionState::Invite => {
                if self.timer.is_elapsed() {
                    // Previous attempt has timed out; invite again.
                    if let Some(target) = self.partner.or(self.target) {
                        actions.push(SessionAction::Send {
                            to: target,
                            command: self.invitation(),
                        });
                    }
                    self.timer.arm(INVITE_RETRY_TICKS);
                    self.invite_count += 1;
                    tracing::debug!(count = self.invite_count, "session: invitation sent");
                }
            }
            SessionState::WaitInvite | SessionState::Closed => {}
        }
    }

    fn on_partner_lost(&mut self, actions: &mut Vec<SessionAction>) {
        tracing::warn!(partner = ?self.partner, "session: partner lost (liveness timeout)");
        actions.push(SessionAction::ConnectionLost);
        if let Some(partner) = self.partner {
            actions.push(SessionAction::Send {
                to: partner,
                command: Command::Bye {
                    reason: ByeReason::Timeout,
                },
            });
        }
        actions.push(SessionAction::Closed);
        self.leave_opened(actions);
    }

    /// Common exit path once an opened (or inviting) session ends: go back
    /// to inviting or waiting per role and policy.
    fn leave_opened(&mut self, actions: &mut Vec<SessionAction>) {
        match self.role {
            SessionRole::Initiator => match self.reinvite {
                ReinvitePolicy::AutoReinvite => self.restart_invitation(actions),
                ReinvitePolicy::StayClosed => self.state = SessionState::Closed,
            },
            SessionRole::Listener => {
                self.state = SessionState::WaitInvite;
                self.partner = None;
            }
        }
    }

    fn restart_invitation(&mut self, actions: &mut Vec<SessionAction>) {
        // Keep the partner address: it is the peer we will invite again.
        self.state = SessionState::Invite;
        self.liveness = LIVENESS_TIMEOUT_TICKS;
        self.timer.arm(INVITE_RETRY_TICKS);
        actions.push(SessionAction::ResetFec);
    }

    // ------------------------------------------------------------------ //
    // Received commands
    // ------------------------------------------------------------------ //

    /// Apply a received session command. UMP-DATA never reaches this — the
    /// receive dispatcher delivers it straight to the application.
    pub fn on_command(
        &mut self,
        from: SocketAddr,
        command: &Command,
        actions: &mut Vec<SessionAction>,
    ) {
        match command {
            Command::Invitation { endpoint_name, .. } => {
                self.on_invitation(from, endpoint_name, actions);
            }
            Command::InvitationAccepted { .. } => self.on_invitation_accepted(from, actions),
            Command::Ping { id } => {
                actions.push(SessionAction::Send {
                    to: from,
                    command: Command::PingReply { id: *id },
                });
                // A PING from the partner is liveness evidence too.
                if self.state == SessionState::Opened && self.partner == Some(from) {
                    self.note_traffic();
                }
            }
            Command::PingReply { .. } => {
                if self.state == SessionState::Opened {
                    self.note_traffic();
                }
            }
            Command::Bye { reason } => self.on_bye(from, *reason, actions),
            Command::ByeReply
            | Command::SessionReset
            | Command::SessionResetReply
            | Command::Unknown { .. } => {
                tracing::trace!(kind = command.kind(), %from, "session: command ignored");
            }
            Command::UmpData { .. } => {
                tracing::trace!("session: UMP-DATA routed outside the state machine");
            }
        }
    }

    fn on_invitation(
        &mut self,
        from: SocketAddr,
        peer_name: &str,
        actions: &mut Vec<SessionAction>,
    ) {
        match self.role {
            SessionRole::Listener => {
                if self.state != SessionState::WaitInvite {
                    return;
                }
                self.note_traffic();
                self.state = SessionState::Opened;
                self.partner = Some(from);
                self.ping_delay = 0;
                tracing::info!(partner = %from, peer = peer_name, "session: invitation accepted");
                actions.push(SessionAction::Send {
                    to: from,
                    command: Command::InvitationAccepted {
                        endpoint_name: self.identity.name().to_owned(),
                        product_instance_id: self.identity.product_instance_id().to_owned(),
                    },
                });
                actions.push(SessionAction::ResetFec);
                actions.push(SessionAction::Opened {
                    partner: from,
                    peer_name: Some(peer_name.to_owned()),
                });
            }
            SessionRole::Initiator => {
                // An initiator does not accept being invited.
                actions.push(SessionAction::Send {
                    to: from,
                    command: Command::Bye {
                        reason: ByeReason::TooManySessions,
                    },
                });
            }
        }
    }

    fn on_invitation_accepted(&mut self, from: SocketAddr, actions: &mut Vec<SessionAction>) {
        if self.state != SessionState::Invite {
            return;
        }
        if self.target != Some(from) {
            // Only the declared target may open the session.
            tracing::warn!(%from, target = ?self.target, "session: INVITATION_ACCEPTED from unexpected sender ignored");
            return;
        }
        self.partner = Some(from);
        self.state = SessionState::Opened;
        self.note_traffic();
        self.ping_delay = 0;
        tracing::info!(partner = %from, "session: opened (initiator)");
        actions.push(SessionAction::ResetFec);
        actions.push(SessionAction::Opened {
            partner: from,
            peer_name: None,
        });
    }

    fn on_bye(&mut self, from: SocketAddr, reason: ByeReason, actions: &mut Vec<SessionAction>) {
        actions.push(SessionAction::Send {
            to: from,
            command: Command::ByeReply,
        });
        if self.partner != Some(from) {
            // Stranger BYE: just acknowledge.
            return;
        }
        tracing::info!(partner = %from, %reason, "session: partner sent BYE");
        let was_opened = self.state == SessionState::Opened;
        self.leave_opened(actions);
        if was_opened {
            actions.push(SessionAction::PeerClosed);
            actions.push(SessionAction::Closed);
        }
    }

    // ------------------------------------------------------------------ //
    // Application requests
    // ------------------------------------------------------------------ //

    /// Terminate an opened session with BYE(user-terminated). Idempotent.
    pub fn close(&mut self, actions: &mut Vec<SessionAction>) {
        if self.state != SessionState::Opened {
            self.state = SessionState::Closed;
            return;
        }
        self.state = SessionState::Closed;
        if let Some(partner) = self.partner {
            actions.push(SessionAction::Send {
                to: partner,
                command: Command::Bye {
                    reason: ByeReason::UserTerminated,
                },
            });
        }
        actions.push(SessionAction::Closed);
        tracing::info!("session: closed by user");
    }

    /// Start inviting again after the session was closed. Listeners ignore
    /// this.
    pub fn restart_initiator(&mut self, actions: &mut Vec<SessionAction>) {
        if self.role != SessionRole::Initiator {
            return;
        }
        self.restart_invitation(actions);
        tracing::info!("session: initiator restarted");
    }

    fn invitation(&self) -> Command {
        Command::Invitation {
            capabilities: 0,
            endpoint_name: self.identity.name().to_owned(),
            product_instance_id: self.identity.product_instance_id().to_owned(),
        }
    }
}
