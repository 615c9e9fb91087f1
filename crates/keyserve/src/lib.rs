//! keyserve: a demo TLS server whose control surface is bound to a
//! trust-store identity.
//!
//! The server's own TLS identity comes from a bundled PKCS#12 key store; the
//! user-selected trust-store identity gates whether the server may start at
//! all. A lifecycle controller owns the accept loop and exposes idempotent
//! start/stop for the host process and its stop signals.

pub mod config;
pub mod identity;
pub mod server;
pub mod telemetry;
