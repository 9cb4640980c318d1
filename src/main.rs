//! Sensor relay server
//!
//! Run with: sensor-relay [--host HOST] [--port PORT]
//!
//! Publishers and viewers both connect to `ws://HOST:PORT/`. Every reading a
//! publisher sends (`{"x":..,"y":..,"z":..}`) is relayed to all connected
//! clients. A plain `curl http://HOST:PORT/` returns the health text.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use sensor_relay::server::config::DEFAULT_PORT;
use sensor_relay::{RegistryConfig, RelayServer, ServerConfig};
use tracing_subscriber::EnvFilter;

/// WebSocket relay for orientation readings
#[derive(Parser, Debug)]
#[command(name = "sensor-relay", version, about)]
struct Cli {
    /// IP address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_connections: usize,

    /// Outbound queue capacity per connection
    #[arg(long, default_value_t = 256)]
    outbound_capacity: usize,

    /// Consecutive dropped frames before a slow client is disconnected (0 = never)
    #[arg(long, default_value_t = 64)]
    max_dropped_frames: u64,

    /// Largest frame in bytes accepted as a reading; larger frames are dropped
    #[arg(long, default_value_t = 64 * 1024)]
    max_reading_size: usize,

    /// Do not echo readings back to the client that sent them
    #[arg(long)]
    no_echo: bool,

    /// Seconds between stats log lines (0 = off)
    #[arg(long, default_value_t = 0)]
    stats_interval: u64,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        let registry = RegistryConfig::default()
            .outbound_capacity(self.outbound_capacity)
            .max_dropped_frames(self.max_dropped_frames)
            .echo_to_sender(!self.no_echo);

        ServerConfig::with_addr(SocketAddr::new(self.host, self.port))
            .max_connections(self.max_connections)
            .max_reading_size(self.max_reading_size)
            .stats_interval(Duration::from_secs(self.stats_interval))
            .registry(registry)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level)?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.server_config();
    if !config.registry.echo_to_sender {
        tracing::warn!("Sender echo disabled; clients will not receive their own readings");
    }

    let server = RelayServer::bind(config).await?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["sensor-relay"]).unwrap();
        let config = cli.server_config();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 0);
        assert!(config.registry.echo_to_sender);
        assert_eq!(config.stats_interval, Duration::ZERO);
        assert_eq!(config.max_reading_size, ServerConfig::default().max_reading_size);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "sensor-relay",
            "--host",
            "127.0.0.1",
            "-p",
            "9000",
            "--max-connections",
            "10",
            "--outbound-capacity",
            "32",
            "--max-reading-size",
            "2048",
            "--no-echo",
            "--stats-interval",
            "15",
        ])
        .unwrap();
        let config = cli.server_config();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.registry.outbound_capacity, 32);
        assert_eq!(config.max_reading_size, 2048);
        assert!(!config.registry.echo_to_sender);
        assert_eq!(config.stats_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_rejects_bad_host() {
        assert!(Cli::try_parse_from(["sensor-relay", "--host", "not-an-ip"]).is_err());
    }
}
