//! Runtime configuration for the test server.
//!
//! There is no config file and no environment lookup: everything comes from
//! the command line, with the defaults below.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port used when none is given on the command line.
pub const DEFAULT_PORT: u16 = 8080;

/// Ports started by the multi-port launcher.
pub const MULTI_PORTS: [u16; 4] = [8080, 8000, 3000, 5000];

/// Bind on every IPv4 interface so LAN addresses reach the fixture too.
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Seconds a client may take to send request headers.
pub const DEFAULT_HEADER_TIMEOUT_SECS: u64 = 30;

/// Which response shape the responder serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Variant {
    /// Describes the Local Network Access policy and its expected outcomes
    #[default]
    Policy,
    /// Echoes request metadata (path, method, User-Agent)
    Simple,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Policy => "policy",
            Variant::Simple => "simple",
        }
    }
}

/// Settings shared by every listener the process starts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub variant: Variant,
    pub header_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            variant: Variant::default(),
            header_timeout: Duration::from_secs(DEFAULT_HEADER_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Socket address for `port` on the configured host.
    pub fn addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.host, port)
    }
}
