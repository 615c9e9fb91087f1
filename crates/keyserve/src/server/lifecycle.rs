//! [`ServerLifecycleController`]: the start/stop boundary owning the accept loop.
//!
//! The controller is the single source of truth for the run state and the
//! only component that creates or destroys an [`AcceptLoop`]. Start and stop
//! are idempotent and safe to invoke concurrently from the supervisor and a
//! user-originated stop signal.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::accept::{AcceptLoop, BindError, ResponsePage, EMBEDDED_IMAGE_FILENAME};
use super::tls::{TlsBuildError, TlsServerContext, KEYSTORE_FILENAME, KEYSTORE_PASSPHRASE};

/// Run state of the server. Exactly one accept loop is owned when `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No accept loop exists.
    Stopped,
    /// A start attempt is in flight.
    Starting,
    /// The accept loop is bound and its worker launched.
    Running,
}

/// A start attempt failed. The controller is back in [`RunState::Stopped`];
/// failures are not retried automatically.
#[derive(Debug, Error)]
pub enum StartError {
    /// The bundled key-store asset could not be read.
    #[error("failed to read key store {path}: {source}")]
    KeyStoreRead {
        /// Path of the key-store asset.
        path: PathBuf,
        source: io::Error,
    },

    /// The TLS context could not be built from the key store.
    #[error(transparent)]
    Build(#[from] TlsBuildError),

    /// The listening socket could not be bound.
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Inputs the controller needs to assemble a server.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Directory holding `keychain.p12` and the embedded image.
    pub asset_dir: PathBuf,
    /// Port to listen on; 0 lets the OS choose.
    pub port: u16,
}

/// Handles of a launched accept loop.
struct Worker {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

struct Inner {
    state: RunState,
    worker: Option<Worker>,
}

/// Owner of at most one running [`AcceptLoop`].
pub struct ServerLifecycleController {
    settings: ServerSettings,
    inner: Mutex<Inner>,
}

impl ServerLifecycleController {
    /// Create a controller in the `Stopped` state.
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            settings,
            inner: Mutex::new(Inner {
                state: RunState::Stopped,
                worker: None,
            }),
        }
    }

    /// Start the server.
    ///
    /// A no-op when already running (the existing bound address is returned
    /// and no second listener is created). On success the listening socket is
    /// bound and the worker launched. On failure the controller returns to
    /// `Stopped` with no partial state; the state is never `Starting` once
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StartError`] when the key store cannot be read, the TLS
    /// context cannot be built, or the port cannot be bound.
    pub async fn start(&self) -> Result<SocketAddr, StartError> {
        let mut inner = self.inner.lock().await;
        if let Some(worker) = inner.worker.as_ref() {
            info!(addr = %worker.local_addr, "server already running; start ignored");
            return Ok(worker.local_addr);
        }

        inner.state = RunState::Starting;
        match self.launch().await {
            Ok(worker) => {
                let addr = worker.local_addr;
                inner.worker = Some(worker);
                inner.state = RunState::Running;
                info!(%addr, "server running");
                Ok(addr)
            }
            Err(e) => {
                inner.state = RunState::Stopped;
                error!(error = %e, "server start failed");
                Err(e)
            }
        }
    }

    /// Stop the server.
    ///
    /// A no-op when already stopped. Signals the accept loop, then joins the
    /// worker — tolerating a loop that already exited on its own. In-flight
    /// connection writes are best-effort.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let Some(worker) = inner.worker.take() else {
            debug!("server already stopped; stop ignored");
            return;
        };

        // A failed send means the loop is already gone, which is fine.
        let _ = worker.shutdown_tx.send(()).await;
        if let Err(e) = worker.handle.await {
            warn!(error = %e, "accept loop worker did not join cleanly");
        }
        inner.state = RunState::Stopped;
        info!("server stopped");
    }

    /// The current run state.
    pub async fn state(&self) -> RunState {
        self.inner.lock().await.state
    }

    /// The bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lock().await.worker.as_ref().map(|w| w.local_addr)
    }

    /// Read the key store, build the TLS context, bind, and launch the loop.
    async fn launch(&self) -> Result<Worker, StartError> {
        let keystore_path = self.settings.asset_dir.join(KEYSTORE_FILENAME);
        let keystore =
            tokio::fs::read(&keystore_path)
                .await
                .map_err(|source| StartError::KeyStoreRead {
                    path: keystore_path,
                    source,
                })?;

        let context = TlsServerContext::build(&keystore, KEYSTORE_PASSPHRASE)?;
        let page = ResponsePage::load(&self.settings.asset_dir.join(EMBEDDED_IMAGE_FILENAME));
        let accept_loop = AcceptLoop::bind(context.acceptor(), self.settings.port, page).await?;
        let local_addr = accept_loop.local_addr();

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(accept_loop.run(shutdown_rx));
        Ok(Worker {
            shutdown_tx,
            handle,
            local_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn assets_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("assets")
    }

    fn controller_on_free_port() -> ServerLifecycleController {
        ServerLifecycleController::new(ServerSettings {
            asset_dir: assets_dir(),
            port: 0,
        })
    }

    async fn tls_connect(addr: SocketAddr) -> anyhow::Result<tokio_native_tls::TlsStream<TcpStream>> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;
        let connector = tokio_native_tls::TlsConnector::from(connector);
        let tcp = TcpStream::connect(addr).await?;
        Ok(connector.connect("localhost", tcp).await?)
    }

    async fn fetch(addr: SocketAddr) -> anyhow::Result<String> {
        let mut tls = tls_connect(addr).await?;
        tls.write_all(b"GET / HTTP/1.0\r\nHost: localhost\r\n\r\n")
            .await?;
        let mut body = String::new();
        tls.read_to_string(&mut body).await?;
        Ok(body)
    }

    #[tokio::test]
    async fn round_trip_serves_fixed_page() {
        let controller = controller_on_free_port();
        let addr = controller.start().await.unwrap();

        let body = fetch(addr).await.unwrap();
        assert!(body.starts_with("HTTP/1.0 200 OK"));
        assert!(body.contains("<img src='data:image/png;base64,"));

        controller.stop().await;
    }

    #[tokio::test]
    async fn serves_repeated_sequential_requests() {
        let controller = controller_on_free_port();
        let addr = controller.start().await.unwrap();

        for _ in 0..100 {
            let body = fetch(addr).await.unwrap();
            assert!(body.starts_with("HTTP/1.0 200 OK"));
        }

        controller.stop().await;
    }

    #[tokio::test]
    async fn start_when_running_is_a_no_op() {
        let controller = controller_on_free_port();
        let first = controller.start().await.unwrap();
        let second = controller.start().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(controller.state().await, RunState::Running);

        controller.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let controller = controller_on_free_port();
        controller.start().await.unwrap();

        controller.stop().await;
        assert_eq!(controller.state().await, RunState::Stopped);
        controller.stop().await;
        assert_eq!(controller.state().await, RunState::Stopped);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let controller = controller_on_free_port();
        controller.stop().await;
        assert_eq!(controller.state().await, RunState::Stopped);
    }

    #[tokio::test]
    async fn stopped_server_refuses_connections() {
        let controller = controller_on_free_port();
        let addr = controller.start().await.unwrap();
        controller.stop().await;

        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn start_failure_over_corrupt_keystore_leaves_stopped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(KEYSTORE_FILENAME), b"garbage").unwrap();
        let controller = ServerLifecycleController::new(ServerSettings {
            asset_dir: dir.path().to_path_buf(),
            port: 0,
        });

        let result = controller.start().await;
        assert!(matches!(result, Err(StartError::Build(_))));
        assert_eq!(controller.state().await, RunState::Stopped);
        assert_eq!(controller.local_addr().await, None);
    }

    #[tokio::test]
    async fn start_failure_over_missing_keystore_leaves_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let controller = ServerLifecycleController::new(ServerSettings {
            asset_dir: dir.path().to_path_buf(),
            port: 0,
        });

        let result = controller.start().await;
        assert!(matches!(result, Err(StartError::KeyStoreRead { .. })));
        assert_eq!(controller.state().await, RunState::Stopped);
    }

    #[tokio::test]
    async fn bind_failure_leaves_stopped() {
        let held = tokio::net::TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
        let port = held.local_addr().unwrap().port();
        let controller = ServerLifecycleController::new(ServerSettings {
            asset_dir: assets_dir(),
            port,
        });

        let result = controller.start().await;
        assert!(matches!(result, Err(StartError::Bind(_))));
        assert_eq!(controller.state().await, RunState::Stopped);
    }

    #[tokio::test]
    async fn stop_terminates_loop_with_stalled_client() {
        let controller = controller_on_free_port();
        let addr = controller.start().await.unwrap();

        // Handshake, then send a partial request with no terminating blank
        // line and keep the connection open.
        let mut stalled = tls_connect(addr).await.unwrap();
        stalled.write_all(b"GET / HTTP/1.0\r\n").await.unwrap();

        // Stop must still terminate the loop despite the in-flight read.
        tokio::time::timeout(Duration::from_secs(5), controller.stop())
            .await
            .expect("stop timed out with a stalled client");
        assert_eq!(controller.state().await, RunState::Stopped);

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
