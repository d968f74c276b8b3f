//! # ludorum-transport
//!
//! The WebSocket edge: a listener that upgrades incoming connections
//! (capturing the request path, which carries the game code) and a
//! split send/receive pair the connection handler pumps.
//!
//! Two reserved plain-HTTP paths are answered directly off the raw
//! socket before any upgrade, so the collocated health surface needs no
//! HTTP framework: `GET /health` → `OK`, `GET /ping` → `pong`.

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{WsListener, WsReceiver, WsSender};

use std::fmt;

/// Opaque identifier for one accepted connection, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "ann");
        assert_eq!(map[&ConnectionId::new(1)], "ann");
    }
}
