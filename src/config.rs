use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::batch::ProberConfig;

/// Per-probe timeout applied when a caller omits one.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Listening port of the HTTP layer unless overridden (`--port` or `PORT`).
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Everything the HTTP server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Directory of static UI files; `None` serves the API only.
    pub ui_dir: Option<PathBuf>,
    pub default_timeout: Duration,
    pub prober: ProberConfig,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_HTTP_PORT,
            ui_dir: Some(PathBuf::from("public")),
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            prober: ProberConfig::default(),
        }
    }
}
