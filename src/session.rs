//! Per-connection state machine: Reading -> Handling -> Writing, looping
//! until the peer disconnects, a read/write fails, or the server signals
//! shutdown.
//!
//! Grounded on the original's `ss::Session<Protocol>` coroutine and on
//! this codebase's own `services/receiver/src/local_proxy.rs`: a
//! `tokio::task` replaces the stackless coroutine, and a
//! `tokio::sync::watch::Receiver<bool>` replaces its cancellation slot.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, error, warn};

use hl_tokenizers::Registry;

use crate::error::{HandleOutcome, SessionError};
use crate::handler::handle;

/// Matches the original server's reserved per-session buffer size.
const BUFFER_RESERVE: usize = 1024 * 1024;
const READ_CHUNK: usize = 64 * 1024;

/// Drive one connection to completion. Never panics on ordinary network
/// conditions; a peer that misbehaves just gets its session closed.
///
/// Returns `Ok(())` on an ordinary close (peer EOF or shutdown signal);
/// `Err(SessionError)` on a fatal condition (I/O error, or the handler
/// producing an empty response — a programming error, per the protocol
/// engine's invariants).
pub async fn run_session<S>(
    mut socket: S,
    registry: Arc<Registry>,
    peer: String,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut request_buffer = Vec::with_capacity(BUFFER_RESERVE);
    let mut response_buffer = Vec::with_capacity(BUFFER_RESERVE);
    let mut read_chunk = vec![0u8; READ_CHUNK];

    let result = 'session: loop {
        let n = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!(peer, "session cancelled by shutdown");
                    break 'session Ok(());
                }
                continue 'session;
            }
            result = socket.read(&mut read_chunk) => {
                match result {
                    Ok(0) => {
                        debug!(peer, "client closed connection");
                        break 'session Ok(());
                    }
                    Ok(n) => n,
                    Err(e) => {
                        warn!(peer, error = %e, "read error");
                        break 'session Err(SessionError::Io(e));
                    }
                }
            }
        };
        request_buffer.extend_from_slice(&read_chunk[..n]);

        match handle(&registry, &request_buffer, &mut response_buffer) {
            HandleOutcome::PartialData { ignore_length } => {
                if ignore_length > 0 {
                    let drop_to = ignore_length.min(request_buffer.len());
                    request_buffer.drain(..drop_to);
                }
                continue 'session;
            }
            HandleOutcome::Complete => {
                request_buffer.clear();
            }
        }

        if response_buffer.is_empty() {
            error!(peer, "handler produced an empty response, closing session");
            break 'session Err(SessionError::EmptyResponse);
        }

        let write_result = tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!(peer, "session cancelled by shutdown before write completed");
                    break 'session Ok(());
                }
                Ok(())
            }
            result = socket.write_all(&response_buffer) => result,
        };
        if let Err(e) = write_result {
            warn!(peer, error = %e, "write error");
            break 'session Err(SessionError::Io(e));
        }
        response_buffer.clear();
    };

    debug!(peer, "session closed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn happy_path_round_trip() {
        let (mut client, server) = duplex(BUFFER_RESERVE);
        let registry = Arc::new(Registry::with_bundled_tokenizers());
        let (_tx, rx) = watch::channel(false);

        let task = tokio::spawn(run_session(server, registry, "test".to_owned(), rx));

        client
            .write_all(br#"[1,{"version":"v1.1","id":"a","buf_type":"polyndrom","buf_name":"n","buf_body":"abba","additional_info":""}]"#)
            .await
            .unwrap();
        client.write_all(b"\n").await.unwrap();

        let mut buf = vec![0u8; 4096];
        let n = client.read(&mut buf).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..n - 1]).unwrap();
        assert_eq!(value[0], 1);
        assert_eq!(value[1]["return_code"], 0);

        drop(client);
        let _ = task.await;
    }

    #[tokio::test]
    async fn partial_write_is_joined_across_two_reads() {
        let (mut client, server) = duplex(BUFFER_RESERVE);
        let registry = Arc::new(Registry::with_bundled_tokenizers());
        let (_tx, rx) = watch::channel(false);

        let task = tokio::spawn(run_session(server, registry, "test".to_owned(), rx));

        client
            .write_all(br#"[1,{"version":"v1.1","id":"a","buf_type":"polyndrom","#)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client
            .write_all(br#""buf_name":"n","buf_body":"","additional_info":""}]"#)
            .await
            .unwrap();
        client.write_all(b"\n").await.unwrap();

        let mut buf = vec![0u8; 4096];
        let n = client.read(&mut buf).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..n - 1]).unwrap();
        assert_eq!(value[1]["return_code"], 0);

        drop(client);
        let _ = task.await;
    }

    #[tokio::test]
    async fn shutdown_signal_closes_idle_session() {
        let (client, server) = duplex(BUFFER_RESERVE);
        let registry = Arc::new(Registry::with_bundled_tokenizers());
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(run_session(server, registry, "test".to_owned(), rx));
        tx.send(true).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("session should close promptly on shutdown")
            .unwrap()
            .unwrap();
        drop(client);
    }
}
