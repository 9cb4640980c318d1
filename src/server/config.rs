//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::registry::RegistryConfig;

/// Default relay port
pub const DEFAULT_PORT: u16 = 8080;

/// Body returned to plain HTTP requests
pub const DEFAULT_HEALTH_TEXT: &str = "Sensor Data WebSocket Server\n";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent relay connections (0 = unlimited)
    pub max_connections: usize,

    /// Body of the plain-HTTP health response
    pub health_text: String,

    /// Largest inbound WebSocket message the transport accepts, in bytes
    ///
    /// A larger message is a protocol error and closes the connection.
    pub max_message_size: usize,

    /// Largest frame parsed as a reading, in bytes
    ///
    /// Larger frames are dropped as malformed and the connection stays open.
    pub max_reading_size: usize,

    /// Interval between stats log lines (zero disables)
    pub stats_interval: Duration,

    /// Registry settings
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_connections: 0, // Unlimited
            health_text: DEFAULT_HEALTH_TEXT.to_string(),
            max_message_size: 16 * 1024 * 1024, // 16MB
            max_reading_size: 64 * 1024,        // 64KB
            stats_interval: Duration::ZERO,
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the port, keeping the bind IP
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the health response body
    pub fn health_text(mut self, text: impl Into<String>) -> Self {
        self.health_text = text.into();
        self
    }

    /// Set the largest accepted inbound message
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the largest frame parsed as a reading
    pub fn max_reading_size(mut self, size: usize) -> Self {
        self.max_reading_size = size;
        self
    }

    /// Set the stats log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.max_connections, 0);
        assert_eq!(config.health_text, "Sensor Data WebSocket Server\n");
        assert_eq!(config.stats_interval, Duration::ZERO);
        assert!(config.max_reading_size < config.max_message_size);
        assert!(config.registry.echo_to_sender);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_port() {
        let config = ServerConfig::default().port(9090);

        assert_eq!(config.bind_addr.port(), 9090);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .health_text("ok\n")
            .max_message_size(4096)
            .max_reading_size(1024)
            .stats_interval(Duration::from_secs(30))
            .registry(RegistryConfig::default().echo_to_sender(false));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.health_text, "ok\n");
        assert_eq!(config.max_message_size, 4096);
        assert_eq!(config.max_reading_size, 1024);
        assert_eq!(config.stats_interval, Duration::from_secs(30));
        assert!(!config.registry.echo_to_sender);
    }
}
