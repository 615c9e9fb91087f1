//! TLS server context built from the bundled PKCS#12 key store.
//!
//! The listener's own identity comes from a pass-phrase-protected PKCS#12
//! container shipped as an asset, not from the user-selected trust-store
//! identity. Construction is pure: no sockets are opened here.

use thiserror::Error;
use tokio_native_tls::TlsAcceptor;

/// File name of the bundled PKCS#12 key store.
pub const KEYSTORE_FILENAME: &str = "keychain.p12";

/// Pass-phrase of the bundled PKCS#12 key store.
pub const KEYSTORE_PASSPHRASE: &str = "changeit";

/// Errors building a TLS context from key-store material.
///
/// All-or-nothing: on any variant no acceptor exists and the server must not
/// attempt to bind a listener.
#[derive(Debug, Error)]
pub enum TlsBuildError {
    /// The PKCS#12 blob could not be parsed — corrupt data, wrong
    /// pass-phrase, or an unsupported algorithm inside the container.
    #[error("failed to load PKCS#12 key store: {0}")]
    KeyStore(#[source] native_tls::Error),

    /// The parsed identity was rejected during acceptor initialisation.
    #[error("failed to initialise TLS acceptor: {0}")]
    Acceptor(#[source] native_tls::Error),
}

/// A ready-to-bind TLS acceptor factory presenting the key store's identity.
///
/// No client authentication is configured — the server presents its
/// certificate only.
pub struct TlsServerContext {
    acceptor: TlsAcceptor,
}

impl TlsServerContext {
    /// Build a context from a PKCS#12 blob and its pass-phrase.
    ///
    /// # Errors
    ///
    /// Returns [`TlsBuildError`] when the blob is malformed, the pass-phrase
    /// is wrong, or the acceptor cannot be initialised.
    pub fn build(keystore: &[u8], passphrase: &str) -> Result<Self, TlsBuildError> {
        let identity = native_tls::Identity::from_pkcs12(keystore, passphrase)
            .map_err(TlsBuildError::KeyStore)?;
        let acceptor = native_tls::TlsAcceptor::new(identity).map_err(TlsBuildError::Acceptor)?;
        Ok(Self {
            acceptor: TlsAcceptor::from(acceptor),
        })
    }

    /// A cloneable handle to the acceptor.
    pub fn acceptor(&self) -> TlsAcceptor {
        self.acceptor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn keystore_fixture() -> Vec<u8> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("assets")
            .join(KEYSTORE_FILENAME);
        std::fs::read(path).unwrap()
    }

    #[test]
    fn builds_from_bundled_keystore() {
        let result = TlsServerContext::build(&keystore_fixture(), KEYSTORE_PASSPHRASE);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_wrong_passphrase() {
        let result = TlsServerContext::build(&keystore_fixture(), "not-the-passphrase");
        assert!(matches!(result, Err(TlsBuildError::KeyStore(_))));
    }

    #[test]
    fn rejects_garbage_keystore() {
        let result = TlsServerContext::build(b"not a pkcs12 blob", KEYSTORE_PASSPHRASE);
        assert!(matches!(result, Err(TlsBuildError::KeyStore(_))));
    }

    #[test]
    fn rejects_empty_keystore() {
        let result = TlsServerContext::build(b"", KEYSTORE_PASSPHRASE);
        assert!(result.is_err());
    }
}
