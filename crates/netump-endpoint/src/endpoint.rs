//! The NetUMP endpoint: public API and the per-tick drive loop.
//!
//! One endpoint owns one UDP socket, one session, and the transmit pipeline.
//! The host calls [`NetUmpEndpoint::tick`] every millisecond from its timer
//! thread; each tick drains the socket, advances the session state machine,
//! performs the actions it requests, and runs the transmit assembler.
//! [`NetUmpEndpoint::send_ump`] (or a detached [`UmpSender`]) may be called
//! from one producer thread; every other mutation belongs to the tick thread.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use netump_core::command::Command;
use netump_core::command::wire::DatagramParser;
use netump_core::constants::SIGNATURE_BYTES;
use netump_core::error::IdentityError;
use netump_core::identity::EndpointIdentity;
use netump_core::ump::{UmpMessages, ump_word_count};
use netump_protocol::assembler::{ErrorCorrectionMode, TxAssembler};
use netump_protocol::fec::RxDedup;
use netump_protocol::fifo::UmpFifo;
use netump_protocol::session::{
    ReinvitePolicy, Session, SessionAction, SessionConfig, SessionRole, SessionState,
    SessionStatus,
};

use crate::error::EndpointError;
use crate::events::EndpointHandler;
use crate::socket::{DatagramChannel, RECV_BUFFER, UdpChannel};

/// State shared with the producer-side API: the transmit FIFO plus the
/// published status and one-shot flags.
struct Shared {
    fifo: UmpFifo,
    status: AtomicU8,
    connection_lost: AtomicBool,
    peer_closed: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            fifo: UmpFifo::new(),
            status: AtomicU8::new(SessionStatus::Closed.as_u8()),
            connection_lost: AtomicBool::new(false),
            peer_closed: AtomicBool::new(false),
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    fn try_send(&self, ump: &[u32]) -> bool {
        // Refuse when nothing can be sent, so the FIFO does not fill while
        // no session is open.
        if self.status() != SessionStatus::Opened {
            return false;
        }
        let Some(&first) = ump.first() else {
            return false;
        };
        let len = ump_word_count(first);
        if ump.len() < len {
            return false;
        }
        self.fifo.push(&ump[..len])
    }
}

/// Cloneless producer handle for enqueueing UMPs from a thread other than
/// the tick thread.
///
/// The FIFO is single-producer: hand at most one `UmpSender` out at a time
/// and do not mix it with concurrent [`NetUmpEndpoint::send_ump`] calls.
pub struct UmpSender {
    shared: Arc<Shared>,
}

impl UmpSender {
    /// Enqueue one UMP message. Returns `false` if no session is opened or
    /// the FIFO is full.
    pub fn send(&self, ump: &[u32]) -> bool {
        self.shared.try_send(ump)
    }
}

/// Parameters for [`NetUmpEndpoint::start`].
#[derive(Debug, Clone)]
pub struct StartConfig {
    pub role: SessionRole,
    /// Remote target. Required for an initiator, unused by a listener.
    pub remote: Option<SocketAddr>,
    pub local_port: u16,
    pub reinvite: ReinvitePolicy,
}

impl StartConfig {
    pub fn initiator(remote: SocketAddr, local_port: u16) -> Self {
        Self {
            role: SessionRole::Initiator,
            remote: Some(remote),
            local_port,
            reinvite: ReinvitePolicy::default(),
        }
    }

    pub fn listener(local_port: u16) -> Self {
        Self {
            role: SessionRole::Listener,
            remote: None,
            local_port,
            reinvite: ReinvitePolicy::default(),
        }
    }

    pub fn reinvite(mut self, policy: ReinvitePolicy) -> Self {
        self.reinvite = policy;
        self
    }
}

/// A session-oriented UDP endpoint exchanging UMP payloads with one peer.
pub struct NetUmpEndpoint<H, C = UdpChannel> {
    identity: EndpointIdentity,
    handler: H,
    channel: Option<C>,
    session: Option<Session>,
    assembler: TxAssembler,
    dedup: RxDedup,
    shared: Arc<Shared>,
    actions: Vec<SessionAction>,
    scratch: Vec<u8>,
    recv_buf: Vec<u8>,
}

impl<H: EndpointHandler, C: DatagramChannel> NetUmpEndpoint<H, C> {
    /// Create an endpoint with the default identity and FEC enabled.
    pub fn new(handler: H) -> Self {
        Self {
            identity: EndpointIdentity::default(),
            handler,
            channel: None,
            session: None,
            assembler: TxAssembler::new(ErrorCorrectionMode::Fec),
            dedup: RxDedup::new(),
            shared: Arc::new(Shared::new()),
            actions: Vec::new(),
            scratch: Vec::new(),
            recv_buf: vec![0; RECV_BUFFER],
        }
    }

    // ------------------------------------------------------------------ //
    // Configuration (tick thread; takes effect at the next start)
    // ------------------------------------------------------------------ //

    /// Set the endpoint name sent inside invitations. Applies from the next
    /// [`start`](Self::start).
    pub fn set_endpoint_name(&mut self, name: &str) -> Result<(), IdentityError> {
        self.identity.set_name(name)
    }

    /// Set the product instance ID sent inside invitations. Applies from the
    /// next [`start`](Self::start).
    pub fn set_product_instance_id(&mut self, piid: &str) -> Result<(), IdentityError> {
        self.identity.set_product_instance_id(piid)
    }

    pub fn identity(&self) -> &EndpointIdentity {
        &self.identity
    }

    /// Select the transmit error correction mode.
    pub fn select_error_correction_mode(&mut self, mode: ErrorCorrectionMode) {
        self.assembler.set_mode(mode);
    }

    /// Replace the event handler.
    pub fn set_handler(&mut self, handler: H) {
        self.handler = handler;
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    // ------------------------------------------------------------------ //
    // Lifecycle
    // ------------------------------------------------------------------ //

    /// Start a session over an already-constructed channel. Any previous
    /// session is discarded.
    pub fn start_with_channel(
        &mut self,
        channel: C,
        config: StartConfig,
    ) -> Result<(), EndpointError> {
        if config.role == SessionRole::Initiator && config.remote.is_none() {
            return Err(EndpointError::MissingTarget);
        }
        self.channel = Some(channel);
        let session = Session::start(SessionConfig {
            role: config.role,
            target: config.remote,
            identity: self.identity.clone(),
            reinvite: config.reinvite,
        });
        self.shared
            .status
            .store(session.status().as_u8(), Ordering::Release);
        self.session = Some(session);
        self.assembler.reset();
        self.dedup.reset();
        self.shared.connection_lost.store(false, Ordering::Release);
        self.shared.peer_closed.store(false, Ordering::Release);
        Ok(())
    }

    /// Terminate the session (BYE user-terminated if one is opened) and
    /// release the socket. Idempotent.
    pub fn close_session(&mut self) {
        {
            let Self {
                channel,
                session,
                handler,
                assembler,
                dedup,
                shared,
                actions,
                scratch,
                ..
            } = self;
            if let Some(session) = session.as_mut() {
                session.close(actions);
                for action in actions.drain(..) {
                    perform_action(
                        channel.as_ref(),
                        handler,
                        assembler,
                        dedup,
                        shared,
                        scratch,
                        action,
                    );
                }
            }
            shared
                .status
                .store(SessionStatus::Closed.as_u8(), Ordering::Release);
        }
        if self.channel.is_some() {
            // Give the BYE time to leave before the socket drops.
            std::thread::sleep(Duration::from_millis(50));
            self.channel = None;
        }
        self.session = None;
    }

    /// Start inviting again after the remote partner ended the session and
    /// the reinvite policy was [`ReinvitePolicy::StayClosed`]. Listeners and
    /// fully closed endpoints ignore this; after [`close_session`](Self::close_session)
    /// use [`start`](Self::start) instead.
    pub fn restart_initiator(&mut self) {
        let Self {
            channel,
            session,
            handler,
            assembler,
            dedup,
            shared,
            actions,
            scratch,
            ..
        } = self;
        let Some(session) = session.as_mut() else {
            return;
        };
        session.restart_initiator(actions);
        for action in actions.drain(..) {
            perform_action(
                channel.as_ref(),
                handler,
                assembler,
                dedup,
                shared,
                scratch,
                action,
            );
        }
        shared
            .status
            .store(session.status().as_u8(), Ordering::Release);
    }

    // ------------------------------------------------------------------ //
    // The millisecond tick
    // ------------------------------------------------------------------ //

    /// Drive the endpoint: call once per millisecond from the timer thread.
    pub fn tick(&mut self) {
        let Self {
            channel,
            session,
            handler,
            assembler,
            dedup,
            shared,
            actions,
            scratch,
            recv_buf,
            ..
        } = self;
        let (Some(channel), Some(session)) = (channel.as_ref(), session.as_mut()) else {
            return;
        };

        // Drain the socket of pending datagrams.
        loop {
            match channel.poll_recv_from(recv_buf) {
                Ok(Some((len, from))) => {
                    dispatch_datagram(session, dedup, handler, actions, from, &recv_buf[..len]);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "socket receive failed");
                    break;
                }
            }
        }

        // Timers, liveness watchdog, invitation retries, idle PING.
        session.on_tick(actions);

        for action in actions.drain(..) {
            perform_action(
                Some(channel),
                handler,
                assembler,
                dedup,
                shared,
                scratch,
                action,
            );
        }

        // Run the assembler in every non-closed state so the FIFO cannot
        // burst when a session opens; only an opened session puts the
        // datagram on the wire.
        if session.state() != SessionState::Closed
            && assembler.assemble(&shared.fifo, scratch)
            && session.state() == SessionState::Opened
        {
            if let Some(partner) = session.partner() {
                if let Err(e) = channel.send_to(scratch, partner) {
                    tracing::warn!(partner = %partner, error = %e, "UMP-DATA send failed");
                }
            }
        }

        shared
            .status
            .store(session.status().as_u8(), Ordering::Release);
    }

    // ------------------------------------------------------------------ //
    // Data plane and status (any thread)
    // ------------------------------------------------------------------ //

    /// Enqueue one UMP message for transmission. Returns `false` if no
    /// session is opened or the FIFO is full.
    ///
    /// Single producer: do not call concurrently from several threads.
    pub fn send_ump(&self, ump: &[u32]) -> bool {
        self.shared.try_send(ump)
    }

    /// A detached producer handle for the transmit FIFO.
    pub fn sender(&self) -> UmpSender {
        UmpSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The coarse session status.
    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    /// Returns `true` exactly once after the partner stopped answering and
    /// the session timed out.
    pub fn read_and_reset_connection_lost(&self) -> bool {
        self.shared.connection_lost.swap(false, Ordering::AcqRel)
    }

    /// Returns `true` exactly once after the partner closed the session
    /// with BYE.
    pub fn read_and_reset_peer_closed(&self) -> bool {
        self.shared.peer_closed.swap(false, Ordering::AcqRel)
    }

    /// Local address of the bound socket, when started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.channel.as_ref().and_then(|c| c.local_addr().ok())
    }
}

impl<H: EndpointHandler> NetUmpEndpoint<H, UdpChannel> {
    /// Bind the UDP socket and start the session.
    pub fn start(&mut self, config: StartConfig) -> Result<(), EndpointError> {
        let channel = UdpChannel::bind(config.local_port)?;
        self.start_with_channel(channel, config)
    }
}

/// Route one received datagram: UMP-DATA goes through the dedup window and
/// straight to the application, session commands go to the state machine,
/// malformed data is dropped silently.
fn dispatch_datagram<H: EndpointHandler>(
    session: &mut Session,
    dedup: &mut RxDedup,
    handler: &mut H,
    actions: &mut Vec<SessionAction>,
    from: SocketAddr,
    bytes: &[u8],
) {
    let parser = match DatagramParser::new(bytes) {
        Ok(parser) => parser,
        Err(e) => {
            tracing::trace!(%from, error = %e, "dropping datagram");
            return;
        }
    };
    for result in parser {
        match result {
            Ok(Command::UmpData { sequence, words }) => {
                if !session.accepts_ump_from(from) {
                    tracing::trace!(%from, "UMP-DATA outside session dropped");
                    continue;
                }
                session.note_traffic();
                if !dedup.insert(sequence) {
                    // An FEC repeat of a command already delivered.
                    tracing::trace!(sequence, "duplicate UMP-DATA dropped");
                    continue;
                }
                for ump in UmpMessages::new(&words) {
                    handler.on_ump(ump);
                }
            }
            Ok(command) => session.on_command(from, &command, actions),
            Err(e) => {
                tracing::trace!(%from, error = %e, "malformed command dropped");
            }
        }
    }
}

/// Perform one side effect requested by the state machine.
fn perform_action<H: EndpointHandler, C: DatagramChannel>(
    channel: Option<&C>,
    handler: &mut H,
    assembler: &mut TxAssembler,
    dedup: &mut RxDedup,
    shared: &Shared,
    scratch: &mut Vec<u8>,
    action: SessionAction,
) {
    match action {
        SessionAction::Send { to, command } => {
            scratch.clear();
            scratch.extend_from_slice(&SIGNATURE_BYTES);
            command.encode_onto(scratch);
            match channel {
                Some(channel) => {
                    if let Err(e) = channel.send_to(scratch, to) {
                        tracing::warn!(%to, kind = command.kind(), error = %e, "command send failed");
                    }
                }
                None => tracing::warn!(kind = command.kind(), "no socket to send command"),
            }
        }
        SessionAction::Opened { partner, peer_name } => {
            tracing::info!(%partner, "session opened");
            if let Some(name) = peer_name {
                handler.on_connected(&name);
            }
        }
        SessionAction::Closed => handler.on_disconnected(),
        SessionAction::ResetFec => {
            assembler.reset();
            dedup.reset();
        }
        SessionAction::ConnectionLost => shared.connection_lost.store(true, Ordering::Release),
        SessionAction::PeerClosed => shared.peer_closed.store(true, Ordering::Release),
    }
}
