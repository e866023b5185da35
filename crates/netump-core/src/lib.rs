//! Core types, constants, and wire formats for the NetUMP transport.
//!
//! This crate defines the protocol command codes and reason codes, the
//! Universal MIDI Packet size model, the byte-level codec for NetUMP command
//! packets, endpoint identity strings, and the MIDI 1.0 ↔ UMP transcoder.

pub mod command;
pub mod constants;
pub mod error;
pub mod identity;
pub mod midi1;
pub mod ump;

pub use command::wire::{DatagramBuilder, DatagramParser};
pub use command::{ByeReason, Command};
pub use constants::CommandCode;
pub use error::{CommandError, IdentityError};
pub use identity::EndpointIdentity;
pub use ump::{UmpMessage, UmpMessages, ump_word_count};
