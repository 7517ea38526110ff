use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Records every TCP connection a test server accepts.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct ConnectionTracker {
    connections: Arc<Mutex<Vec<(SocketAddr, Instant)>>>,
}

#[allow(dead_code)]
impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection from a given peer.
    pub fn record_connection(&self, peer: SocketAddr) {
        self.connections
            .lock()
            .unwrap()
            .push((peer, Instant::now()));
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// Distinct client ports seen, i.e. distinct sockets.
    pub fn unique_peers(&self) -> usize {
        let conns = self.connections.lock().unwrap();
        let mut peers: Vec<_> = conns.iter().map(|(peer, _)| *peer).collect();
        peers.sort();
        peers.dedup();
        peers.len()
    }

    pub fn clear(&self) {
        self.connections.lock().unwrap().clear();
    }
}
