//! Identity domain types and the collaborator interfaces that supply them.
//!
//! An [`Identity`] is a private key plus its certificate chain, addressable
//! by a user-meaningful alias. Key custody is held by an external trust-store
//! service: this crate only ever sees an opaque [`PrivateKeyHandle`], never
//! key bytes.

use crate::error::{PreferenceError, TrustStoreError};

/// A single DER-encoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(pub Vec<u8>);

impl Certificate {
    /// Byte length of the DER encoding.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the DER encoding is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Opaque reference to a private key held by the external trust store.
///
/// Carries only the key algorithm name for display purposes. The key material
/// itself never crosses the trust-store boundary.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKeyHandle {
    algorithm: String,
}

impl PrivateKeyHandle {
    /// Create a handle naming the key's algorithm (e.g. `"RSA"`, `"EC"`).
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
        }
    }

    /// The key algorithm name.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

impl std::fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print anything beyond the algorithm name — the handle must
        // not become a channel for key material.
        write!(f, "PrivateKeyHandle({})", self.algorithm)
    }
}

/// A resolved trust-store identity: alias, opaque private key, and the full
/// certificate chain (leaf first).
///
/// An alias either resolves fully or not at all — there is no way to build an
/// `Identity` with a key but no chain, or a chain but no key. Partial entries
/// in the underlying store must surface as [`TrustStoreError::NotFound`].
#[derive(Debug, Clone)]
pub struct Identity {
    alias: String,
    private_key: PrivateKeyHandle,
    certificate_chain: Vec<Certificate>,
}

impl Identity {
    /// Assemble an identity from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`TrustStoreError::NotFound`] if the certificate chain is
    /// empty, keeping the both-present-or-neither invariant at the type's
    /// only construction point.
    pub fn new(
        alias: impl Into<String>,
        private_key: PrivateKeyHandle,
        certificate_chain: Vec<Certificate>,
    ) -> Result<Self, TrustStoreError> {
        let alias = alias.into();
        if certificate_chain.is_empty() {
            return Err(TrustStoreError::NotFound(alias));
        }
        Ok(Self {
            alias,
            private_key,
            certificate_chain,
        })
    }

    /// The alias this identity was resolved under.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The opaque private-key handle.
    pub fn private_key(&self) -> &PrivateKeyHandle {
        &self.private_key
    }

    /// The certificate chain, leaf first.
    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.certificate_chain
    }
}

/// The platform trust-store capability, as consumed by this system.
///
/// Implementations adapt a host credential service (enrollment, custody, and
/// chain retrieval all live there). Calls may block on inter-process
/// communication, so async callers must dispatch them off the runtime's core
/// threads.
pub trait TrustStore: Send + Sync {
    /// Resolve `alias` to a full identity.
    ///
    /// # Errors
    ///
    /// [`TrustStoreError::NotFound`] when the alias is absent, denied, or
    /// only partially present; [`TrustStoreError::Inaccessible`] when the
    /// store itself cannot be queried.
    fn resolve(&self, alias: &str) -> Result<Identity, TrustStoreError>;
}

/// Process-wide persisted preference state: named string keys, last-write-wins.
pub trait PreferenceStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    /// Store `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_requires_certificate_chain() {
        let result = Identity::new("alias", PrivateKeyHandle::new("RSA"), Vec::new());
        assert!(matches!(result, Err(TrustStoreError::NotFound(_))));
    }

    #[test]
    fn identity_exposes_parts() {
        let identity = Identity::new(
            "alias",
            PrivateKeyHandle::new("RSA"),
            vec![Certificate(vec![0x30, 0x82])],
        )
        .unwrap();
        assert_eq!(identity.alias(), "alias");
        assert_eq!(identity.private_key().algorithm(), "RSA");
        assert_eq!(identity.certificate_chain().len(), 1);
    }

    #[test]
    fn key_handle_debug_shows_algorithm_only() {
        let handle = PrivateKeyHandle::new("EC");
        assert_eq!(format!("{handle:?}"), "PrivateKeyHandle(EC)");
    }
}
