//! Session protocol timing constants, in units of the millisecond tick.

/// Ticks without inbound traffic before an opened session is considered
/// lost (~30 s).
pub const LIVENESS_TIMEOUT_TICKS: u32 = 30_000;

/// Ticks between invitation attempts while inviting.
pub const INVITE_RETRY_TICKS: u32 = 1_000;

/// Idle ticks in an opened session before a PING probe is sent (~10 s).
pub const PING_IDLE_TICKS: u32 = 10_000;

/// Delay before the first timer event after start, so the first invitation
/// goes out on the very next tick.
pub const FIRST_EVENT_DELAY_TICKS: u32 = 1;
