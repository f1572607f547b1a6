//! Process entry point: parse the CLI, start logging, bind the
//! configured endpoint, and run the server until a shutdown signal
//! arrives.
//!
//! The original installed a `SIGSEGV` handler that printed a
//! `boost::stacktrace` before aborting. That isn't ported — see
//! `SPEC_FULL.md` — in its place a panic hook logs via `tracing::error!`
//! before the default panic handler runs, so a panic in a session task
//! still leaves a trace in the server's own log stream rather than only
//! on stderr.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hl_server::config::{Cli, Endpoint};
use hl_server::server;
use hl_tokenizers::Registry;

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(%info, "panic");
        default_hook(info);
    }));
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    install_panic_hook();

    let threads = match cli.validate_threads() {
        Ok(n) => n,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let endpoint = match cli.endpoint() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads as usize)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: failed to start the async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(endpoint, threads))
}

async fn run(endpoint: Endpoint, threads: u32) -> ExitCode {
    let registry = Arc::new(Registry::with_bundled_tokenizers());
    tracing::info!(?endpoint, threads, "hl-server starting");

    let result = match endpoint {
        Endpoint::Tcp { host, port } => match server::bind_tcp(&host, port).await {
            Ok(listener) => server::run(server::TcpAcceptor(listener), registry).await,
            Err(e) => Err(e),
        },
        #[cfg(unix)]
        Endpoint::Unix { path } => match server::bind_unix(&path) {
            Ok(listener) => server::run(server::UnixAcceptor(listener), registry).await,
            Err(e) => Err(e),
        },
        #[cfg(not(unix))]
        Endpoint::Unix { .. } => Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "the unix protocol is not supported on this platform",
        )),
    };

    match result {
        Ok(()) => {
            tracing::info!("hl-server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal server error");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}
