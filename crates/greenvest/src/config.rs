//! Command-line configuration for the `greenvest` binary.

use std::time::Duration;

use clap::Parser;
use greenvest_room::RoomConfig;

/// Greenvest room coordinator.
#[derive(Debug, Clone, Parser)]
#[command(name = "greenvest", version, about)]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Evict rooms idle for this many seconds (0 keeps them forever)
    #[arg(long, default_value_t = 7200)]
    pub room_ttl_secs: u64,
}

impl ServerConfig {
    /// `host:port`, ready for [`crate::GreenvestServerBuilder::bind`].
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            idle_ttl: (self.room_ttl_secs > 0).then(|| Duration::from_secs(self.room_ttl_secs)),
            ..RoomConfig::default()
        }
    }
}
