//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use facility_protocol::MAX_DATAGRAM_SIZE;

/// Default UDP port.
pub const DEFAULT_PORT: u16 = 2222;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the UDP socket binds to.
    pub bind_addr: SocketAddr,

    /// Upper bound on a single update delivery to one observer.
    pub notify_timeout: Duration,

    /// How long a reply stays in the reply cache.
    pub reply_ttl: Duration,

    /// Maximum number of cached replies.
    pub reply_capacity: usize,

    /// Receive buffer size; larger datagrams are truncated by the OS.
    pub recv_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            notify_timeout: Duration::from_secs(2),
            reply_ttl: Duration::from_secs(10 * 60),
            reply_capacity: 4096,
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration bound to the given address.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Builder: change the port, keeping the bind address.
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Builder: set the per-observer delivery timeout.
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Builder: set how long replies are cached.
    pub fn with_reply_ttl(mut self, ttl: Duration) -> Self {
        self.reply_ttl = ttl;
        self
    }

    /// Builder: set the reply cache capacity.
    pub fn with_reply_capacity(mut self, capacity: usize) -> Self {
        self.reply_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 2222);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.notify_timeout, Duration::from_secs(2));
        assert_eq!(config.reply_ttl, Duration::from_secs(600));
        assert_eq!(config.reply_capacity, 4096);
        assert_eq!(config.recv_buffer_size, MAX_DATAGRAM_SIZE);
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_port(9000)
            .with_notify_timeout(Duration::from_millis(250))
            .with_reply_ttl(Duration::from_secs(30))
            .with_reply_capacity(16);

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.notify_timeout, Duration::from_millis(250));
        assert_eq!(config.reply_ttl, Duration::from_secs(30));
        assert_eq!(config.reply_capacity, 16);
    }
}
