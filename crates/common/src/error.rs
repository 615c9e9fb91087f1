//! Error types for the trust-store and preference collaborators.

use thiserror::Error;

/// Errors produced when resolving an identity from the platform trust store.
///
/// [`TrustStoreError::NotFound`] and [`TrustStoreError::Inaccessible`] are
/// deliberately distinct: the first means the store answered and the alias is
/// absent (or access was denied), the second means the store itself could not
/// be queried. Callers treat both as "the identity is not usable", but the
/// distinction matters for logging and diagnosis.
#[derive(Debug, Error)]
pub enum TrustStoreError {
    /// The alias does not resolve to a full identity in the trust store.
    #[error("alias not found in trust store: {0}")]
    NotFound(String),

    /// The trust store itself could not be queried (IPC failure, interrupted
    /// call, unreadable backing storage).
    #[error("trust store inaccessible: {0}")]
    Inaccessible(String),
}

/// Errors produced by the preference store.
#[derive(Debug, Error)]
pub enum PreferenceError {
    /// The backing storage could not be read or written.
    #[error("preference storage error: {0}")]
    Storage(String),
}
