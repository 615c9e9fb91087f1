//! `keyserve` — binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured JSON logging.
//! 3. Wire the identity layer (trust store + preference store).
//! 4. Gate on accessibility of the preferred alias and log its summary.
//! 5. Start the TLS server via the lifecycle controller.
//! 6. Wait for a stop signal (Ctrl-C or SIGTERM), then stop the server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use keyserve::config::Config;
use keyserve::identity::{DirTrustStore, FilePreferenceStore, IdentityStore};
use keyserve::server::lifecycle::{ServerLifecycleController, ServerSettings};
use keyserve::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "keyserve starting"
    );

    // -----------------------------------------------------------------------
    // 3. Identity layer
    // -----------------------------------------------------------------------
    let identity_store = IdentityStore::new(
        Arc::new(DirTrustStore::new(&cfg.truststore_dir)),
        Arc::new(FilePreferenceStore::new(&cfg.preference_file)),
    );

    // -----------------------------------------------------------------------
    // 4. Accessibility gate
    // -----------------------------------------------------------------------
    // A host-supplied selection stands in for the platform's identity picker.
    if let Some(alias) = cfg.select_alias.as_deref() {
        identity_store
            .set_preferred_alias(alias)
            .context("failed to persist selected alias")?;
        info!(alias, "alias preference updated");
    }

    let alias = identity_store.preferred_alias();
    if !identity_store.is_accessible(&alias).await {
        anyhow::bail!(
            "identity '{alias}' is not accessible; enroll it in the trust store before starting"
        );
    }
    match identity_store.describe(&alias).await {
        Ok(summary) => info!(%summary, "trust-store identity ready"),
        Err(e) => warn!(error = %e, "identity became unavailable after the accessibility check"),
    }

    // -----------------------------------------------------------------------
    // 5. Server
    // -----------------------------------------------------------------------
    let controller = ServerLifecycleController::new(ServerSettings {
        asset_dir: cfg.asset_dir.clone().into(),
        port: cfg.listen_port,
    });
    let addr = controller
        .start()
        .await
        .context("failed to start TLS server")?;
    info!(%addr, "TLS server started");

    // -----------------------------------------------------------------------
    // 6. Stop signal
    // -----------------------------------------------------------------------
    wait_for_stop_signal().await;
    controller.stop().await;
    info!("keyserve shut down");
    Ok(())
}

/// Wait until the supervisor (SIGTERM) or the user (Ctrl-C) asks the server
/// to stop. Both paths funnel into the same idempotent stop.
async fn wait_for_stop_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl-C; stopping server");
        }
        _ = terminate => {
            info!("received SIGTERM; stopping server");
        }
    }
}
