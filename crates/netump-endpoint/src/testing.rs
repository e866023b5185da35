//! In-memory test doubles for driving an endpoint without real sockets.
//!
//! [`TestChannel`] implements [`DatagramChannel`] with explicit inject /
//! take-sent queues, so scenario tests fully control delivery: datagrams can
//! be shuttled between two endpoints, dropped, or duplicated at will.
//! [`RecordingHandler`] captures every callback for later assertions.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::events::EndpointHandler;
use crate::socket::DatagramChannel;

/// A datagram channel whose wire is a pair of in-memory queues.
///
/// Clones share the queues: keep one clone in the test and give the other to
/// the endpoint.
#[derive(Debug, Clone)]
pub struct TestChannel {
    addr: SocketAddr,
    inbox: Arc<Mutex<VecDeque<(Vec<u8>, SocketAddr)>>>,
    outbox: Arc<Mutex<Vec<(Vec<u8>, SocketAddr)>>>,
}

impl TestChannel {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queue a datagram for the endpoint to receive on its next tick.
    pub fn inject(&self, from: SocketAddr, bytes: &[u8]) {
        self.inbox
            .lock()
            .unwrap()
            .push_back((bytes.to_vec(), from));
    }

    /// Drain everything the endpoint has sent since the last call, in order,
    /// as `(bytes, destination)` pairs.
    pub fn take_sent(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        std::mem::take(&mut self.outbox.lock().unwrap())
    }
}

impl DatagramChannel for TestChannel {
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.outbox.lock().unwrap().push((buf.to_vec(), target));
        Ok(buf.len())
    }

    fn poll_recv_from(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        let Some((bytes, from)) = self.inbox.lock().unwrap().pop_front() else {
            return Ok(None);
        };
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok(Some((len, from)))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.addr)
    }
}

/// Handler that records every callback.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub umps: Vec<Vec<u32>>,
    pub connected: Vec<String>,
    pub disconnects: usize,
}

impl EndpointHandler for RecordingHandler {
    fn on_ump(&mut self, ump: &[u32]) {
        self.umps.push(ump.to_vec());
    }

    fn on_connected(&mut self, endpoint_name: &str) {
        self.connected.push(endpoint_name.to_owned());
    }

    fn on_disconnected(&mut self) {
        self.disconnects += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_queues_in_both_directions() {
        let addr: SocketAddr = "10.0.0.1:5004".parse().unwrap();
        let peer: SocketAddr = "10.0.0.2:5004".parse().unwrap();
        let channel = TestChannel::new(addr);
        let endpoint_side = channel.clone();

        channel.inject(peer, &[1, 2, 3]);
        let mut buf = [0u8; 16];
        let (len, from) = endpoint_side.poll_recv_from(&mut buf).unwrap().unwrap();
        assert_eq!((&buf[..len], from), (&[1u8, 2, 3][..], peer));
        assert!(endpoint_side.poll_recv_from(&mut buf).unwrap().is_none());

        endpoint_side.send_to(&[9, 8], peer).unwrap();
        assert_eq!(channel.take_sent(), vec![(vec![9, 8], peer)]);
        assert!(channel.take_sent().is_empty());
    }
}
