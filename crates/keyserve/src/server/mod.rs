//! TLS server: key-store context, accept loop, and lifecycle control.
//!
//! # Responsibilities
//! - Build the TLS acceptor from the bundled PKCS#12 key store.
//! - Serve the fixed demo page over TLS, one connection at a time.
//! - Own start/stop of the accept loop behind a single run state.

pub mod accept;
pub mod lifecycle;
pub mod tls;
