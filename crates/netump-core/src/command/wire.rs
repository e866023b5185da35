//! Byte-level encode/decode for NetUMP command packets.
//!
//! Every multi-byte scalar is network byte order. A datagram starts with the
//! 4-byte `MIDI` signature; each command that follows starts at a 4-byte
//! boundary with the header `code(1) || payload_words(1) || csd(2)` and its
//! payload length advances the parse cursor, so unknown commands can be
//! skipped without understanding them.

use crate::command::{ByeReason, Command};
use crate::constants::{
    COMMAND_HEADER_SIZE, CommandCode, MAX_UMP_DATA_WORDS, SIGNATURE, SIGNATURE_BYTES,
    SIGNATURE_SIZE,
};
use crate::error::CommandError;
use crate::identity::{padded_words, push_padded};

fn push_header(buf: &mut Vec<u8>, code: u8, payload_words: u8, csd: [u8; 2]) {
    buf.push(code);
    buf.push(payload_words);
    buf.extend_from_slice(&csd);
}

impl Command {
    /// Append the command's wire bytes (header + payload, no signature).
    pub fn encode_onto(&self, buf: &mut Vec<u8>) {
        match self {
            Command::Invitation {
                capabilities,
                endpoint_name,
                product_instance_id,
            } => {
                let name_words = padded_words(endpoint_name.len());
                let total = name_words + padded_words(product_instance_id.len());
                push_header(
                    buf,
                    CommandCode::Invitation.to_u8(),
                    total as u8,
                    [name_words as u8, *capabilities],
                );
                push_padded(buf, endpoint_name);
                push_padded(buf, product_instance_id);
            }
            Command::InvitationAccepted {
                endpoint_name,
                product_instance_id,
            } => {
                let name_words = padded_words(endpoint_name.len());
                let total = name_words + padded_words(product_instance_id.len());
                push_header(
                    buf,
                    CommandCode::InvitationAccepted.to_u8(),
                    total as u8,
                    [name_words as u8, 0],
                );
                push_padded(buf, endpoint_name);
                push_padded(buf, product_instance_id);
            }
            Command::Ping { id } => {
                push_header(buf, CommandCode::Ping.to_u8(), 1, [0, 0]);
                buf.extend_from_slice(&id.to_be_bytes());
            }
            Command::PingReply { id } => {
                push_header(buf, CommandCode::PingReply.to_u8(), 1, [0, 0]);
                buf.extend_from_slice(&id.to_be_bytes());
            }
            Command::Bye { reason } => {
                push_header(buf, CommandCode::Bye.to_u8(), 0, [reason.to_u8(), 0]);
            }
            Command::ByeReply => {
                push_header(buf, CommandCode::ByeReply.to_u8(), 0, [0, 0]);
            }
            Command::SessionReset => {
                push_header(buf, CommandCode::SessionReset.to_u8(), 0, [0, 0]);
            }
            Command::SessionResetReply => {
                push_header(buf, CommandCode::SessionResetReply.to_u8(), 0, [0, 0]);
            }
            Command::UmpData { sequence, words } => {
                debug_assert!(words.len() <= MAX_UMP_DATA_WORDS);
                push_header(
                    buf,
                    CommandCode::UmpData.to_u8(),
                    words.len() as u8,
                    sequence.to_be_bytes(),
                );
                for word in words {
                    buf.extend_from_slice(&word.to_be_bytes());
                }
            }
            Command::Unknown { code } => {
                push_header(buf, *code, 0, [0, 0]);
            }
        }
    }
}

/// Builds a datagram: the signature followed by stacked commands.
#[derive(Debug, Clone)]
pub struct DatagramBuilder {
    buf: Vec<u8>,
}

impl DatagramBuilder {
    pub fn new() -> Self {
        Self {
            buf: SIGNATURE_BYTES.to_vec(),
        }
    }

    pub fn push(mut self, command: &Command) -> Self {
        command.encode_onto(&mut self.buf);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// A datagram carrying exactly one command.
    pub fn single(command: &Command) -> Vec<u8> {
        Self::new().push(command).into_bytes()
    }
}

impl Default for DatagramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses the stacked commands out of one received datagram.
///
/// Construction verifies the signature; iteration yields commands until the
/// buffer is exhausted or a truncated command is hit, after which iteration
/// stops.
#[derive(Debug)]
pub struct DatagramParser<'a> {
    buf: &'a [u8],
    cursor: usize,
    halted: bool,
}

impl<'a> DatagramParser<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self, CommandError> {
        if buf.len() < SIGNATURE_SIZE {
            return Err(CommandError::DatagramTooShort {
                min: SIGNATURE_SIZE,
                actual: buf.len(),
            });
        }
        let signature = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if signature != SIGNATURE {
            return Err(CommandError::BadSignature(signature));
        }
        Ok(Self {
            buf,
            cursor: SIGNATURE_SIZE,
            halted: false,
        })
    }

    fn parse_next(&mut self) -> Result<Command, CommandError> {
        let remaining = &self.buf[self.cursor..];
        if remaining.len() < COMMAND_HEADER_SIZE {
            return Err(CommandError::TruncatedPayload {
                need: COMMAND_HEADER_SIZE,
                got: remaining.len(),
            });
        }

        let code = remaining[0];
        let payload_words = remaining[1] as usize;
        let csd = [remaining[2], remaining[3]];
        let need = COMMAND_HEADER_SIZE + payload_words * 4;
        if remaining.len() < need {
            return Err(CommandError::TruncatedPayload {
                need,
                got: remaining.len(),
            });
        }
        let payload = &remaining[COMMAND_HEADER_SIZE..need];
        self.cursor += need;

        let command = match CommandCode::from_u8(code) {
            Some(CommandCode::Invitation) => {
                let (endpoint_name, product_instance_id) =
                    parse_identity_payload(payload, csd[0] as usize, payload_words)?;
                Command::Invitation {
                    capabilities: csd[1],
                    endpoint_name,
                    product_instance_id,
                }
            }
            Some(CommandCode::InvitationAccepted) => {
                let (endpoint_name, product_instance_id) =
                    parse_identity_payload(payload, csd[0] as usize, payload_words)?;
                Command::InvitationAccepted {
                    endpoint_name,
                    product_instance_id,
                }
            }
            Some(CommandCode::Ping) => Command::Ping {
                id: parse_ping_id(payload)?,
            },
            Some(CommandCode::PingReply) => Command::PingReply {
                id: parse_ping_id(payload)?,
            },
            Some(CommandCode::Bye) => Command::Bye {
                reason: ByeReason::from_u8(csd[0]),
            },
            Some(CommandCode::ByeReply) => Command::ByeReply,
            Some(CommandCode::SessionReset) => Command::SessionReset,
            Some(CommandCode::SessionResetReply) => Command::SessionResetReply,
            Some(CommandCode::UmpData) => {
                let words = payload
                    .chunks_exact(4)
                    .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect();
                Command::UmpData {
                    sequence: u16::from_be_bytes(csd),
                    words,
                }
            }
            // Retransmit family, NAK, authentication variants, and anything
            // unassigned: skipped via the payload length.
            _ => Command::Unknown { code },
        };
        Ok(command)
    }
}

impl Iterator for DatagramParser<'_> {
    type Item = Result<Command, CommandError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted || self.cursor >= self.buf.len() {
            return None;
        }
        match self.parse_next() {
            Ok(command) => Some(Ok(command)),
            Err(e) => {
                self.halted = true;
                Some(Err(e))
            }
        }
    }
}

/// Split an invitation payload into (endpoint name, product instance ID).
///
/// The first `name_words` words hold the NUL-padded name, the rest the
/// product instance ID.
fn parse_identity_payload(
    payload: &[u8],
    name_words: usize,
    payload_words: usize,
) -> Result<(String, String), CommandError> {
    if name_words > payload_words {
        return Err(CommandError::NameExceedsPayload {
            name_words,
            payload_words,
        });
    }
    let name_len = name_words * 4;
    let name = read_padded_str(&payload[..name_len], "endpoint name")?;
    let piid = read_padded_str(&payload[name_len..], "product instance ID")?;
    Ok((name, piid))
}

fn read_padded_str(bytes: &[u8], field: &'static str) -> Result<String, CommandError> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..end])
        .map(str::to_owned)
        .map_err(|_| CommandError::InvalidText { field })
}

fn parse_ping_id(payload: &[u8]) -> Result<u32, CommandError> {
    if payload.len() < 4 {
        return Err(CommandError::TruncatedPayload {
            need: 4,
            got: payload.len(),
        });
    }
    Ok(u32::from_be_bytes([
        payload[0], payload[1], payload[2], payload[3],
    ]))
}
