//! Forward error correction windows.
//!
//! On transmit, [`FecWindow`] keeps the last five UMP-DATA commands actually
//! sent so every datagram can carry them as a recovery tail. On receive,
//! [`RxDedup`] keeps the last five accepted sequence numbers so those repeats
//! can be recognized and dropped.

use netump_core::constants::MAX_UMP_DATA_WORDS;

/// Number of command slots in either window.
pub const FEC_WINDOW: usize = 5;

/// Maximum command length in words: 64 UMP payload words plus the header.
pub const MAX_COMMAND_WORDS: usize = MAX_UMP_DATA_WORDS + 1;

/// Sentinel filling the receive ring before any command has been accepted.
const NO_SEQUENCE: u16 = 0xFFFF;

#[derive(Clone, Copy)]
struct FecSlot {
    filled: bool,
    len: usize,
    words: [u32; MAX_COMMAND_WORDS],
}

impl FecSlot {
    const EMPTY: Self = Self {
        filled: false,
        len: 0,
        words: [0; MAX_COMMAND_WORDS],
    };
}

/// Round-robin ring of the most recent transmitted commands, oldest first
/// when iterated.
pub struct FecWindow {
    slots: [FecSlot; FEC_WINDOW],
    next: usize,
}

impl FecWindow {
    pub fn new() -> Self {
        Self {
            slots: [FecSlot::EMPTY; FEC_WINDOW],
            next: 0,
        }
    }

    /// Wipe all slots. Done whenever a session (re)opens.
    pub fn reset(&mut self) {
        self.slots = [FecSlot::EMPTY; FEC_WINDOW];
        self.next = 0;
    }

    /// Record a freshly built command (header word included) as the newest
    /// entry, evicting the oldest.
    pub fn store(&mut self, command: &[u32]) {
        debug_assert!(command.len() <= MAX_COMMAND_WORDS);
        let slot = &mut self.slots[self.next];
        slot.words[..command.len()].copy_from_slice(command);
        slot.len = command.len();
        slot.filled = true;
        self.next = (self.next + 1) % FEC_WINDOW;
    }

    /// The filled commands in age order, oldest first, newest last.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &[u32]> + '_ {
        (0..FEC_WINDOW).filter_map(move |offset| {
            let slot = &self.slots[(self.next + offset) % FEC_WINDOW];
            slot.filled.then(|| &slot.words[..slot.len])
        })
    }

    /// Number of filled slots.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.filled).count()
    }
}

impl Default for FecWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Ring of the most recently accepted receive sequence numbers.
///
/// A UMP-DATA command whose sequence number is already present is an FEC
/// repeat of something already delivered and must be dropped whole.
pub struct RxDedup {
    seen: [u16; FEC_WINDOW],
}

impl RxDedup {
    pub fn new() -> Self {
        Self {
            seen: [NO_SEQUENCE; FEC_WINDOW],
        }
    }

    pub fn reset(&mut self) {
        self.seen = [NO_SEQUENCE; FEC_WINDOW];
    }

    /// Record `sequence` as accepted. Returns `false` if it was already in
    /// the window (a duplicate), `true` if it is new; a new entry evicts the
    /// oldest.
    pub fn insert(&mut self, sequence: u16) -> bool {
        if self.seen.contains(&sequence) {
            return false;
        }
        self.seen.copy_within(1.., 0);
        self.seen[FEC_WINDOW - 1] = sequence;
        true
    }
}

impl Default for RxDedup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(tag: u32, len: usize) -> Vec<u32> {
        (0..len as u32).map(|i| tag << 16 | i).collect()
    }

    #[test]
    fn window_starts_empty() {
        let window = FecWindow::new();
        assert_eq!(window.filled(), 0);
        assert_eq!(window.iter_oldest_first().count(), 0);
    }

    #[test]
    fn stores_in_age_order_newest_last() {
        let mut window = FecWindow::new();
        for tag in 1..=3u32 {
            window.store(&command(tag, 4));
        }
        let tails: Vec<Vec<u32>> = window.iter_oldest_first().map(<[u32]>::to_vec).collect();
        assert_eq!(tails.len(), 3);
        assert_eq!(tails[0], command(1, 4));
        assert_eq!(tails[1], command(2, 4));
        assert_eq!(tails[2], command(3, 4));
    }

    #[test]
    fn holds_exactly_the_last_five() {
        let mut window = FecWindow::new();
        for tag in 1..=8u32 {
            window.store(&command(tag, 2));
        }
        let tails: Vec<Vec<u32>> = window.iter_oldest_first().map(<[u32]>::to_vec).collect();
        assert_eq!(tails.len(), FEC_WINDOW);
        for (i, tail) in tails.iter().enumerate() {
            assert_eq!(*tail, command(4 + i as u32, 2));
        }
    }

    #[test]
    fn reset_wipes_all_slots() {
        let mut window = FecWindow::new();
        for tag in 1..=5u32 {
            window.store(&command(tag, 3));
        }
        window.reset();
        assert_eq!(window.filled(), 0);
        assert_eq!(window.iter_oldest_first().count(), 0);
    }

    #[test]
    fn store_accepts_maximum_command() {
        let mut window = FecWindow::new();
        window.store(&command(1, MAX_COMMAND_WORDS));
        assert_eq!(
            window.iter_oldest_first().next().unwrap().len(),
            MAX_COMMAND_WORDS
        );
    }

    #[test]
    fn dedup_accepts_new_sequences() {
        let mut dedup = RxDedup::new();
        for sequence in 0..10u16 {
            assert!(dedup.insert(sequence), "sequence {sequence}");
        }
    }

    #[test]
    fn dedup_drops_recent_duplicates() {
        let mut dedup = RxDedup::new();
        assert!(dedup.insert(7));
        assert!(!dedup.insert(7));
        assert!(dedup.insert(8));
        assert!(!dedup.insert(7)); // still within the window
    }

    #[test]
    fn dedup_forgets_after_five_newer_sequences() {
        let mut dedup = RxDedup::new();
        assert!(dedup.insert(1));
        for sequence in 2..=6u16 {
            assert!(dedup.insert(sequence));
        }
        // 1 has been evicted by five newer entries.
        assert!(dedup.insert(1));
    }

    #[test]
    fn dedup_reset_restores_sentinel() {
        let mut dedup = RxDedup::new();
        assert!(dedup.insert(3));
        dedup.reset();
        assert!(dedup.insert(3));
        // The sentinel itself reads as already seen right after reset.
        let mut fresh = RxDedup::new();
        assert!(!fresh.insert(NO_SEQUENCE));
    }

    #[test]
    fn dedup_handles_wrapped_sequences() {
        let mut dedup = RxDedup::new();
        for sequence in [0xFFFD, 0xFFFE, 0x0000, 0x0001] {
            assert!(dedup.insert(sequence));
        }
        assert!(!dedup.insert(0xFFFE));
        assert!(!dedup.insert(0x0001));
    }
}
