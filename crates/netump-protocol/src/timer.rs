//! Millisecond retry timer.
//!
//! Counts ticks down toward an event. All protocol delays use the tick count
//! as the unit of time, so wall-clock accuracy is not required of the host.

/// A one-shot countdown driven by the session tick.
#[derive(Debug, Clone, Copy)]
pub struct RetryTimer {
    running: bool,
    event: bool,
    remaining: u32,
}

impl RetryTimer {
    /// A timer that is neither running nor signalled.
    pub fn new() -> Self {
        Self {
            running: false,
            event: false,
            remaining: 0,
        }
    }

    /// Start counting down; the event fires `ticks` ticks from now. Any
    /// previously signalled event is cleared.
    pub fn arm(&mut self, ticks: u32) {
        self.running = false;
        self.event = false;
        self.remaining = ticks;
        self.running = true;
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            self.running = false;
            self.event = true;
        }
    }

    /// Whether the countdown has completed and not been re-armed since.
    pub fn is_elapsed(&self) -> bool {
        !self.running && self.event
    }
}

impl Default for RetryTimer {
    fn default() -> Self {
        Self::new()
    }
}
