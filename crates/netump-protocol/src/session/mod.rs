//! Session state machine.
//!
//! A session endpoint is either an initiator (actively invites the declared
//! remote) or a listener (waits to be invited). The machine consumes received
//! commands and millisecond ticks and produces [`SessionAction`]s — it never
//! touches a socket itself; the endpoint layer performs the actions.
//!
//! ```text
//! INITIATOR                                 LISTENER
//!     |-- INVITATION (name, product id) ------->|   WAIT_INVITE
//!     |        (retried every 1 s)              |
//!     |<-- INVITATION_ACCEPTED (name, id) ------|   → OPENED
//!     |                                         |
//!     |<============ UMP-DATA both ways =======>|
//!     |-- PING (after 10 s idle) -------------->|
//!     |<-- PING_REPLY --------------------------|
//!     |                                         |
//!     |-- BYE / BYE_REPLY on teardown --------->|
//! ```

pub mod constants;
mod state;
mod types;

pub use state::{Session, SessionConfig};
pub use types::{ReinvitePolicy, SessionAction, SessionRole, SessionState, SessionStatus};
