//! NetUMP session endpoint.
//!
//! Ties the pieces together: a [`DatagramChannel`] over UDP, the session
//! state machine and transmit pipeline from `netump-protocol`, and the
//! application's [`EndpointHandler`] callbacks. The host drives everything by
//! calling [`NetUmpEndpoint::tick`] once per millisecond from a high-priority
//! timer thread; `send_ump` may be called from one other thread.

pub mod endpoint;
pub mod error;
pub mod events;
pub mod logging;
pub mod socket;
pub mod testing;

pub use endpoint::{NetUmpEndpoint, StartConfig, UmpSender};
pub use error::EndpointError;
pub use events::EndpointHandler;
pub use socket::{DatagramChannel, UdpChannel};

pub use netump_core::identity::EndpointIdentity;
pub use netump_protocol::assembler::ErrorCorrectionMode;
pub use netump_protocol::session::{ReinvitePolicy, SessionRole, SessionStatus};
