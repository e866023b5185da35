//! Protocol state for the NetUMP transport.
//!
//! This crate implements the stateful pieces between the wire codec and the
//! socket: the single-producer/single-consumer transmit FIFO, the forward
//! error correction windows, the millisecond retry timer, the session state
//! machine, and the transmit assembler. Everything here is decoupled from
//! I/O: the state machines consume events and produce actions that the
//! endpoint layer performs.

pub mod assembler;
pub mod fec;
pub mod fifo;
pub mod session;
pub mod timer;

pub use assembler::{ErrorCorrectionMode, TxAssembler};
pub use fec::{FecWindow, RxDedup};
pub use fifo::UmpFifo;
pub use session::{
    ReinvitePolicy, Session, SessionAction, SessionConfig, SessionRole, SessionState,
    SessionStatus,
};
pub use timer::RetryTimer;
