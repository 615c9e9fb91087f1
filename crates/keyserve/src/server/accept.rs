//! The TLS accept loop and the fixed page it serves.
//!
//! For each connection the loop completes the TLS handshake, reads request
//! lines until the blank line ending the client's headers, writes one fixed
//! HTTP/1.0 response, and closes. Connections are served strictly one at a
//! time; per-connection failures are logged and the loop continues. Only the
//! shutdown signal ends the loop.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context as _;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// File name of the bundled image embedded in the served page.
pub const EMBEDDED_IMAGE_FILENAME: &str = "embedded.png";

/// Value of the `Server:` identification header.
const SERVER_IDENT: &str = "keyserve TLS demo server";

/// The listener could not be bound. Surfaced to the lifecycle controller;
/// never retried here.
#[derive(Debug, Error)]
#[error("failed to bind port {port}: {source}")]
pub struct BindError {
    /// The requested port.
    pub port: u16,
    source: std::io::Error,
}

/// The pre-rendered response served to every connection.
///
/// The embedded image is read once at construction. A read failure downgrades
/// to an empty payload — the page is still served, just without the image.
pub struct ResponsePage {
    response: Vec<u8>,
}

impl ResponsePage {
    /// Load the embedded image from `image_path` and pre-render the response.
    pub fn load(image_path: &Path) -> Self {
        let payload = match std::fs::read(image_path) {
            Ok(bytes) => STANDARD.encode(bytes),
            Err(e) => {
                warn!(
                    path = %image_path.display(),
                    error = %e,
                    "failed to read embedded image; serving page without it"
                );
                String::new()
            }
        };
        Self {
            response: Self::render(&payload),
        }
    }

    fn render(base64_image: &str) -> Vec<u8> {
        let mut out = String::new();
        out.push_str("HTTP/1.0 200 OK\r\n");
        out.push_str("Content-Type: text/html\r\n");
        out.push_str(&format!("Server: {SERVER_IDENT}\r\n"));
        // Blank line ends the headers.
        out.push_str("\r\n");
        out.push_str("<h1>Welcome to keyserve!</h1>\r\n");
        out.push_str(&format!(
            "<img src='data:image/png;base64,{base64_image}'/>\r\n"
        ));
        out.into_bytes()
    }

    /// The full response bytes, headers and body.
    pub fn bytes(&self) -> &[u8] {
        &self.response
    }
}

/// A bound TLS accept loop, ready to run on a worker task.
pub struct AcceptLoop {
    listener: TcpListener,
    acceptor: tokio_native_tls::TlsAcceptor,
    page: ResponsePage,
    local_addr: SocketAddr,
}

impl AcceptLoop {
    /// Bind the listening socket eagerly.
    ///
    /// Port 0 asks the OS for a free port; [`AcceptLoop::local_addr`] reports
    /// the actual address.
    ///
    /// # Errors
    ///
    /// Returns [`BindError`] when the port cannot be bound (e.g. already in
    /// use). The caller decides what to do; there is no retry here.
    pub async fn bind(
        acceptor: tokio_native_tls::TlsAcceptor,
        port: u16,
        page: ResponsePage,
    ) -> Result<Self, BindError> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| BindError { port, source })?;
        let local_addr = listener.local_addr().map_err(|source| BindError { port, source })?;
        Ok(Self {
            listener,
            acceptor,
            page,
            local_addr,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve connections until `shutdown_rx` fires.
    ///
    /// Connections are handled strictly one at a time. The shutdown signal
    /// wins the race against both a blocked accept and a stalled in-flight
    /// connection; in-flight writes are best-effort on shutdown. Returning
    /// drops the listener, closing the socket.
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(addr = %self.local_addr, "waiting for connections");
        loop {
            let accepted = tokio::select! {
                _ = shutdown_rx.recv() => break,
                accepted = self.listener.accept() => accepted,
            };
            let (stream, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };
            debug!(%peer_addr, "connection accepted");
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                res = serve_connection(&self.acceptor, stream, self.page.bytes()) => {
                    if let Err(e) = res {
                        // One bad client never stops the server for others.
                        warn!(%peer_addr, error = %e, "connection abandoned");
                    }
                }
            }
        }
        info!(addr = %self.local_addr, "accept loop stopped");
    }
}

/// Serve a single connection: handshake, drain headers, write the fixed page.
async fn serve_connection(
    acceptor: &tokio_native_tls::TlsAcceptor,
    stream: TcpStream,
    response: &[u8],
) -> anyhow::Result<()> {
    let mut tls = acceptor
        .accept(stream)
        .await
        .context("TLS handshake failed")?;

    // Read until the blank line that ends the client's request headers.
    let mut reader = BufReader::new(&mut tls);
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .await
            .context("failed to read request headers")?;
        if n == 0 {
            anyhow::bail!("client closed the stream before the end of headers");
        }
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            break;
        }
    }

    tls.write_all(response)
        .await
        .context("failed to write response")?;
    tls.flush().await.context("failed to flush response")?;
    tls.shutdown().await.context("failed to close connection")?;
    Ok(())
}
