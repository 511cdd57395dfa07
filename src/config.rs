use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "https://bid-it-backend.onrender.com";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Engine configuration, read once at startup and passed into the
/// wiring explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote marketplace backend
    pub backend_url: String,
    /// Local address the ui server binds to
    pub listen_addr: SocketAddr,
    /// How often the receiver polls watched items
    pub poll_interval: Duration,
    /// Bearer token for authenticated backend calls, if logged in
    pub token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let backend_url =
            std::env::var("BIDIT_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_owned());

        let listen_addr = std::env::var("BIDIT_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_owned())
            .parse()
            .context("invalid BIDIT_LISTEN_ADDR")?;

        let poll_interval = match std::env::var("BIDIT_POLL_INTERVAL_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().context("invalid BIDIT_POLL_INTERVAL_SECS")?),
            Err(_) => DEFAULT_POLL_INTERVAL,
        };

        let token = std::env::var("BIDIT_TOKEN").ok();

        Ok(Self {
            backend_url,
            listen_addr,
            poll_interval,
            token,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            listen_addr: DEFAULT_LISTEN_ADDR.parse().expect("static addr"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            token: None,
        }
    }
}
