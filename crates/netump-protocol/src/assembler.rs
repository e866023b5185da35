//! Transmit assembler.
//!
//! Once per tick the assembler drains the outgoing FIFO into a single
//! UMP-DATA command of at most 64 payload words, stamps it with the next
//! sequence number, records it in the FEC window, and builds the outgoing
//! datagram: the signature followed by the FEC ring in age order with the
//! brand-new command last. A UMP that would overflow the command stays in
//! the FIFO for the next tick.

use netump_core::constants::{MAX_UMP_DATA_WORDS, SIGNATURE_BYTES};
use netump_core::ump::ump_word_count;

use crate::fec::{FecWindow, MAX_COMMAND_WORDS};
use crate::fifo::{UMP_FIFO_WORDS, UmpFifo};

/// Error correction modes selectable on transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCorrectionMode {
    /// Each datagram carries only the newest command.
    None,
    /// Each datagram carries the previous commands as a recovery tail.
    Fec,
}

pub struct TxAssembler {
    sequence: u16,
    mode: ErrorCorrectionMode,
    fec: FecWindow,
    command: [u32; MAX_COMMAND_WORDS],
}

impl TxAssembler {
    pub fn new(mode: ErrorCorrectionMode) -> Self {
        Self {
            sequence: 0,
            mode,
            fec: FecWindow::new(),
            command: [0; MAX_COMMAND_WORDS],
        }
    }

    /// Wipe the FEC window and restart the sequence counter. Done whenever a
    /// session (re)opens.
    pub fn reset(&mut self) {
        self.sequence = 0;
        self.fec.reset();
    }

    pub fn set_mode(&mut self, mode: ErrorCorrectionMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> ErrorCorrectionMode {
        self.mode
    }

    /// The sequence number the next command will carry.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    /// Drain the FIFO into one command and build the outgoing datagram into
    /// `out`. Returns `false` with `out` untouched when the FIFO holds
    /// nothing to transmit.
    pub fn assemble(&mut self, fifo: &UmpFifo, out: &mut Vec<u8>) -> bool {
        let end = fifo.snapshot_write();
        let mut read = fifo.read_index();
        if read == end {
            return false;
        }

        // Copy whole UMPs until the next one would overflow the command.
        let mut payload = 0usize;
        while read != end {
            let len = ump_word_count(fifo.word(read));
            if payload + len > MAX_UMP_DATA_WORDS {
                break;
            }
            for _ in 0..len {
                self.command[1 + payload] = fifo.word(read);
                payload += 1;
                read = (read + 1) % UMP_FIFO_WORDS;
            }
        }
        fifo.advance_read(read);

        let sequence = self.sequence;
        self.command[0] = 0xFF00_0000 | ((payload as u32) << 16) | sequence as u32;
        let command_len = payload + 1;
        self.sequence = self.sequence.wrapping_add(1);

        out.clear();
        out.extend_from_slice(&SIGNATURE_BYTES);
        match self.mode {
            ErrorCorrectionMode::Fec => {
                self.fec.store(&self.command[..command_len]);
                for command in self.fec.iter_oldest_first() {
                    for &word in command {
                        out.extend_from_slice(&word.to_be_bytes());
                    }
                }
            }
            ErrorCorrectionMode::None => {
                for &word in &self.command[..command_len] {
                    out.extend_from_slice(&word.to_be_bytes());
                }
            }
        }

        tracing::trace!(
            sequence,
            payload_words = payload,
            datagram_len = out.len(),
            "assembled UMP-DATA command"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netump_core::command::Command;
    use netump_core::command::wire::DatagramParser;

    fn ump_data_commands(datagram: &[u8]) -> Vec<(u16, Vec<u32>)> {
        DatagramParser::new(datagram)
            .unwrap()
            .map(|command| match command.unwrap() {
                Command::UmpData { sequence, words } => (sequence, words),
                other => panic!("unexpected command {other:?}"),
            })
            .collect()
    }

    #[test]
    fn empty_fifo_yields_nothing() {
        let fifo = UmpFifo::new();
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::Fec);
        let mut out = vec![0xAA];
        assert!(!assembler.assemble(&fifo, &mut out));
        assert_eq!(out, vec![0xAA], "out must be untouched");
        assert_eq!(assembler.next_sequence(), 0);
    }

    #[test]
    fn single_message_without_fec() {
        let fifo = UmpFifo::new();
        fifo.push(&[0x2090_4060]);
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::None);
        let mut out = Vec::new();
        assert!(assembler.assemble(&fifo, &mut out));
        // signature + header word + one payload word
        assert_eq!(out.len(), 12);
        let commands = ump_data_commands(&out);
        assert_eq!(commands, vec![(0, vec![0x2090_4060])]);
        assert!(fifo.is_empty());
    }

    #[test]
    fn sequence_increments_per_command() {
        let fifo = UmpFifo::new();
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::None);
        let mut out = Vec::new();
        for expected in 0u16..4 {
            fifo.push(&[0x2090_0000 | expected as u32]);
            assert!(assembler.assemble(&fifo, &mut out));
            let commands = ump_data_commands(&out);
            assert_eq!(commands[0].0, expected);
        }
        assert_eq!(assembler.next_sequence(), 4);
    }

    #[test]
    fn sequence_wraps_at_16_bits() {
        let fifo = UmpFifo::new();
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::None);
        assembler.sequence = 0xFFFF;
        let mut out = Vec::new();
        fifo.push(&[0x2090_0001]);
        assert!(assembler.assemble(&fifo, &mut out));
        assert_eq!(ump_data_commands(&out)[0].0, 0xFFFF);
        fifo.push(&[0x2090_0002]);
        assert!(assembler.assemble(&fifo, &mut out));
        assert_eq!(ump_data_commands(&out)[0].0, 0);
    }

    #[test]
    fn fec_tail_carries_previous_commands_oldest_first() {
        let fifo = UmpFifo::new();
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::Fec);
        let mut out = Vec::new();
        for word in [0x2090_0001u32, 0x2090_0002, 0x2090_0003] {
            fifo.push(&[word]);
            assert!(assembler.assemble(&fifo, &mut out));
        }
        let commands = ump_data_commands(&out);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], (0, vec![0x2090_0001]));
        assert_eq!(commands[1], (1, vec![0x2090_0002]));
        assert_eq!(commands[2], (2, vec![0x2090_0003]));
    }

    #[test]
    fn fec_tail_is_capped_at_window_size() {
        let fifo = UmpFifo::new();
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::Fec);
        let mut out = Vec::new();
        for i in 0u32..9 {
            fifo.push(&[0x2090_0000 | i]);
            assert!(assembler.assemble(&fifo, &mut out));
        }
        let commands = ump_data_commands(&out);
        assert_eq!(commands.len(), 5);
        let sequences: Vec<u16> = commands.iter().map(|(sequence, _)| *sequence).collect();
        assert_eq!(sequences, vec![4, 5, 6, 7, 8]);
    }

    #[test]
    fn multiple_umps_coalesce_into_one_command() {
        let fifo = UmpFifo::new();
        fifo.push(&[0x2090_0001]);
        fifo.push(&[0x4011_0000, 0xAABB_CCDD]);
        fifo.push(&[0x2080_0002]);
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::None);
        let mut out = Vec::new();
        assert!(assembler.assemble(&fifo, &mut out));
        let commands = ump_data_commands(&out);
        assert_eq!(
            commands,
            vec![(0, vec![0x2090_0001, 0x4011_0000, 0xAABB_CCDD, 0x2080_0002])]
        );
    }

    #[test]
    fn overflowing_ump_defers_to_next_tick() {
        let fifo = UmpFifo::new();
        // 63 single-word UMPs, then a two-word UMP that cannot fit.
        for i in 0u32..63 {
            fifo.push(&[0x2090_0000 | i]);
        }
        fifo.push(&[0x4011_0000, 0xAABB_CCDD]);

        let mut assembler = TxAssembler::new(ErrorCorrectionMode::None);
        let mut out = Vec::new();
        assert!(assembler.assemble(&fifo, &mut out));
        let first = ump_data_commands(&out);
        assert_eq!(first[0].1.len(), 63);

        assert!(assembler.assemble(&fifo, &mut out));
        let second = ump_data_commands(&out);
        assert_eq!(second[0].1, vec![0x4011_0000, 0xAABB_CCDD]);
        assert!(fifo.is_empty());
    }

    #[test]
    fn full_command_takes_exactly_64_words() {
        let fifo = UmpFifo::new();
        for i in 0u32..64 {
            fifo.push(&[0x2090_0000 | i]);
        }
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::None);
        let mut out = Vec::new();
        assert!(assembler.assemble(&fifo, &mut out));
        assert_eq!(ump_data_commands(&out)[0].1.len(), 64);
        assert!(fifo.is_empty());
    }

    #[test]
    fn reset_restarts_sequence_and_clears_tail() {
        let fifo = UmpFifo::new();
        let mut assembler = TxAssembler::new(ErrorCorrectionMode::Fec);
        let mut out = Vec::new();
        for i in 0u32..3 {
            fifo.push(&[0x2090_0000 | i]);
            assembler.assemble(&fifo, &mut out);
        }
        assembler.reset();
        fifo.push(&[0x2090_0009]);
        assert!(assembler.assemble(&fifo, &mut out));
        let commands = ump_data_commands(&out);
        assert_eq!(commands.len(), 1, "no stale FEC tail after reset");
        assert_eq!(commands[0].0, 0, "sequence restarts at zero");
    }
}
