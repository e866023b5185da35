//! Application event callbacks.

/// Receiver for endpoint events.
///
/// All methods are invoked from the tick thread and must not block; heavy
/// processing belongs on another thread. The receiver outlives the endpoint
/// by construction, since the endpoint owns it.
pub trait EndpointHandler {
    /// One received UMP message: 1 to 4 words per its MT field.
    fn on_ump(&mut self, ump: &[u32]);

    /// A session opened because we accepted an incoming invitation;
    /// `endpoint_name` is the remote's advertised name.
    fn on_connected(&mut self, endpoint_name: &str) {
        let _ = endpoint_name;
    }

    /// The session terminated, whichever side ended it.
    fn on_disconnected(&mut self) {}
}

/// Handler that discards every event. Useful for transmit-only endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl EndpointHandler for NullHandler {
    fn on_ump(&mut self, _ump: &[u32]) {}
}
