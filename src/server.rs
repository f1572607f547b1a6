//! The accept loop: binds an endpoint, accepts connections, spawns a
//! session per connection, and tears everything down on SIGINT/SIGTERM.
//!
//! Grounded on `services/server/src/main.rs::shutdown_signal` for the
//! signal race, and on the original's `ServerImplStream` for the
//! bind-time contract (address reuse before bind for TCP, stale-file
//! cleanup before bind for the local stream socket).

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hl_tokenizers::Registry;

use crate::error::SessionError;
use crate::session;

/// One listening transport. TCP and the Unix local stream socket are the
/// only two endpoint kinds the original server supports; both produce a
/// byte stream the session loop treats identically.
pub trait Acceptor {
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn accept(&self) -> std::io::Result<(Self::Conn, String)>;
}

pub struct TcpAcceptor(pub TcpListener);

impl Acceptor for TcpAcceptor {
    type Conn = tokio::net::TcpStream;

    async fn accept(&self) -> std::io::Result<(Self::Conn, String)> {
        let (stream, addr) = self.0.accept().await?;
        Ok((stream, addr.to_string()))
    }
}

#[cfg(unix)]
pub struct UnixAcceptor(pub tokio::net::UnixListener);

#[cfg(unix)]
impl Acceptor for UnixAcceptor {
    type Conn = tokio::net::UnixStream;

    async fn accept(&self) -> std::io::Result<(Self::Conn, String)> {
        let (stream, addr) = self.0.accept().await?;
        let peer = addr
            .as_pathname()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unnamed".to_owned());
        Ok((stream, peer))
    }
}

/// Bind a TCP listener with address reuse set before bind, matching the
/// original's bind-time option ordering.
pub async fn bind_tcp(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let addr: std::net::SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid host/port: {e}")))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

/// Bind the Unix local stream socket at `path`, removing a stale socket
/// file left behind by a previous unclean shutdown.
#[cfg(unix)]
pub fn bind_unix(path: &str) -> std::io::Result<tokio::net::UnixListener> {
    let path = std::path::Path::new(path);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    tokio::net::UnixListener::bind(path)
}

/// Accept connections on `acceptor` until a shutdown signal arrives,
/// then wait for every spawned session to finish before returning.
pub async fn run<A>(acceptor: A, registry: Arc<Registry>) -> std::io::Result<()>
where
    A: Acceptor + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut roster: Vec<JoinHandle<Result<(), SessionError>>> = Vec::new();

    let shutdown_signal = wait_for_shutdown_signal();
    tokio::pin!(shutdown_signal);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_signal => {
                break;
            }
            accepted = acceptor.accept() => {
                match accepted {
                    Ok((conn, peer)) => {
                        roster.retain(|h| !h.is_finished());
                        info!(peer, sessions = roster.len() + 1, "accepted connection");
                        let registry = Arc::clone(&registry);
                        let session_shutdown = shutdown_rx.clone();
                        roster.push(tokio::spawn(session::run_session(
                            conn,
                            registry,
                            peer,
                            session_shutdown,
                        )));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept error");
                    }
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    for handle in roster {
        match handle.await {
            Ok(Err(e)) => warn!(error = %e, "session ended with a fatal error"),
            Ok(Ok(())) | Err(_) => {}
        }
    }
    debug!("all sessions closed");
    Ok(())
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
