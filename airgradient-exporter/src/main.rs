//! Prometheus exporter for the AirGradient local server API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use airgradient_exporter::{Args, Fetcher, HttpServer, Projector, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration (file, then flag/env overrides)
    let config = args.load_config().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting airgradient-exporter"
    );

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }

    let endpoint = config.endpoint()?;
    let fetcher = match Fetcher::new(endpoint) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            error!(error = %e, "Failed to create airgradient fetcher");
            return Err(e.into());
        }
    };

    let projector = Projector::new(config.airgradient.label_policy);
    for descriptor in projector.describe() {
        debug!(
            name = %descriptor.name,
            kind = descriptor.kind.as_str(),
            labels = ?descriptor.labels,
            "Registered metric"
        );
    }

    // Bind before spawning so a busy port aborts startup
    let listen_addr: SocketAddr = config
        .http
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.http.listen))?;
    let listener = match TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %listen_addr, error = %e, "Failed to start exporter server");
            return Err(anyhow::anyhow!("Failed to bind to {}: {}", listen_addr, e));
        }
    };

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(fetcher, projector, config.http.path.clone());
    let mut http_task = tokio::spawn(http_server.serve(listener, shutdown_rx));

    // Wait for a shutdown signal, or for the server to stop on its own
    tokio::select! {
        result = &mut http_task => {
            return unexpected_stop(result.context("HTTP server task failed")?);
        }
        signal = shutdown_signal() => {
            signal?;
        }
    }

    // Signal shutdown
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(5), http_task).await {
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task failed"),
        Err(_) => warn!("HTTP server did not stop within 5s"),
        Ok(Ok(Ok(()))) => {}
    }

    info!("Exporter stopped");
    Ok(())
}

/// Turn a server that returned before any shutdown signal into an error.
fn unexpected_stop(result: anyhow::Result<()>) -> anyhow::Result<()> {
    match result {
        Ok(()) => {
            error!("HTTP server stopped without a shutdown signal");
            Err(anyhow!("HTTP server stopped unexpectedly"))
        }
        Err(e) => {
            error!(error = %e, "HTTP server error");
            Err(e)
        }
    }
}

/// Resolve once Ctrl+C or SIGTERM is received.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C, shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")?;
        info!("Received Ctrl+C, shutting down...");
    }

    Ok(())
}
