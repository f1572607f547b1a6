//! Command-line configuration.
//!
//! Flags mirror the original's `main.cpp` (`--host`, `--port`,
//! `lim_conn`'s replacement — the session roster has no hard cap here,
//! see `SPEC_FULL.md` — and `--threads`), adapted to `clap`'s derive API
//! the way the rest of this workspace's services do.

use clap::{Parser, ValueEnum};
use thiserror::Error;

/// The original's `DEFAULT_PORT`.
pub const DEFAULT_PORT: u16 = 9173;
pub const DEFAULT_THREADS: u32 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "hl-server",
    version,
    about = "Line-delimited JSON tokenization server"
)]
pub struct Cli {
    /// Raise the log filter to debug.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Endpoint family to listen on.
    #[arg(long, value_enum, default_value_t = Protocol::Tcp)]
    pub protocol: Protocol,

    /// Host to bind (tcp protocol only).
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind (tcp protocol only).
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Filesystem path for the local stream socket (unix protocol only).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Worker threads driving the event loop.
    #[arg(long, default_value_t = DEFAULT_THREADS)]
    pub threads: u32,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Protocol {
    Tcp,
    Unix,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("0 is not a valid worker thread count")]
    ZeroThreads,
    #[error("--endpoint is required when --protocol=unix is selected")]
    MissingUnixEndpoint,
}

/// The resolved listening address, independent of how it was spelled on
/// the command line.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix { path: String },
}

impl Cli {
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        match self.protocol {
            Protocol::Tcp => Ok(Endpoint::Tcp {
                host: self.host.clone(),
                port: self.port,
            }),
            Protocol::Unix => self
                .endpoint
                .clone()
                .map(|path| Endpoint::Unix { path })
                .ok_or(ConfigError::MissingUnixEndpoint),
        }
    }

    /// The original treats `threads == 0` as a fatal startup error rather
    /// than silently falling back to some default.
    pub fn validate_threads(&self) -> Result<u32, ConfigError> {
        if self.threads == 0 {
            Err(ConfigError::ZeroThreads)
        } else {
            Ok(self.threads)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threads_is_rejected() {
        let cli = Cli::parse_from(["hl-server", "--threads", "0"]);
        assert!(matches!(cli.validate_threads(), Err(ConfigError::ZeroThreads)));
    }

    #[test]
    fn default_endpoint_is_tcp_on_the_default_port() {
        let cli = Cli::parse_from(["hl-server"]);
        match cli.endpoint().unwrap() {
            Endpoint::Tcp { port, .. } => assert_eq!(port, DEFAULT_PORT),
            Endpoint::Unix { .. } => panic!("expected tcp"),
        }
    }

    #[test]
    fn unix_protocol_without_endpoint_is_rejected() {
        let cli = Cli::parse_from(["hl-server", "--protocol", "unix"]);
        assert!(matches!(cli.endpoint(), Err(ConfigError::MissingUnixEndpoint)));
    }

    #[test]
    fn unix_protocol_with_endpoint_resolves() {
        let cli = Cli::parse_from(["hl-server", "--protocol", "unix", "--endpoint", "/tmp/hl.sock"]);
        match cli.endpoint().unwrap() {
            Endpoint::Unix { path } => assert_eq!(path, "/tmp/hl.sock"),
            Endpoint::Tcp { .. } => panic!("expected unix"),
        }
    }
}
