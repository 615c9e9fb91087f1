//! [`IdentityStore`]: alias resolution, accessibility gating, and the
//! persisted alias preference.

use std::sync::Arc;

use common::{Identity, PreferenceError, PreferenceStore, TrustStore, TrustStoreError};
use tracing::{debug, warn};

/// Alias used when the user has never selected an identity.
pub const DEFAULT_ALIAS: &str = "My Key Chain";

/// Preference key under which the selected alias is persisted.
const PREF_KEY_ALIAS: &str = "alias";

/// Loggable summary of a resolved identity. Contains no key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySummary {
    /// The alias the identity was resolved under.
    pub alias: String,
    /// Number of certificates in the chain, leaf included.
    pub chain_len: usize,
    /// Algorithm name of the externally-held private key.
    pub key_algorithm: String,
}

impl std::fmt::Display for IdentitySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "alias '{}': {} certificate(s), {} private key",
            self.alias, self.chain_len, self.key_algorithm
        )
    }
}

/// Facade over the trust-store and preference collaborators.
///
/// Key material is never cached: every resolution re-queries the external
/// store, so a revoked or removed identity is noticed on the next check.
pub struct IdentityStore {
    trust: Arc<dyn TrustStore>,
    prefs: Arc<dyn PreferenceStore>,
}

impl IdentityStore {
    /// Create a store over the injected collaborators.
    pub fn new(trust: Arc<dyn TrustStore>, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { trust, prefs }
    }

    /// Resolve `alias` to a full identity.
    ///
    /// The trust-store query may block on inter-process communication, so it
    /// runs on the blocking pool rather than the caller's task.
    ///
    /// # Errors
    ///
    /// [`TrustStoreError::NotFound`] when the alias does not fully resolve;
    /// [`TrustStoreError::Inaccessible`] when the store cannot be queried or
    /// the query is interrupted.
    pub async fn resolve(&self, alias: &str) -> Result<Identity, TrustStoreError> {
        let trust = Arc::clone(&self.trust);
        let alias = alias.to_owned();
        tokio::task::spawn_blocking(move || trust.resolve(&alias))
            .await
            .map_err(|e| TrustStoreError::Inaccessible(format!("trust store query interrupted: {e}")))?
    }

    /// Returns `true` iff `alias` resolves to both a certificate chain and a
    /// private key. Gate this before offering to start the server.
    pub async fn is_accessible(&self, alias: &str) -> bool {
        match self.resolve(alias).await {
            Ok(_) => true,
            Err(e) => {
                debug!(alias, error = %e, "identity not accessible");
                false
            }
        }
    }

    /// Summarise the identity behind `alias` for startup logging.
    ///
    /// # Errors
    ///
    /// Propagates the underlying resolution error.
    pub async fn describe(&self, alias: &str) -> Result<IdentitySummary, TrustStoreError> {
        let identity = self.resolve(alias).await?;
        Ok(IdentitySummary {
            alias: identity.alias().to_owned(),
            chain_len: identity.certificate_chain().len(),
            key_algorithm: identity.private_key().algorithm().to_owned(),
        })
    }

    /// The persisted alias preference, or [`DEFAULT_ALIAS`] when unset.
    ///
    /// An unreadable preference store falls back to the default rather than
    /// failing — the worst outcome is an accessibility check against the
    /// wrong alias, which reports "not accessible".
    pub fn preferred_alias(&self) -> String {
        match self.prefs.get(PREF_KEY_ALIAS) {
            Ok(Some(alias)) => alias,
            Ok(None) => DEFAULT_ALIAS.to_owned(),
            Err(e) => {
                warn!(error = %e, "failed to read alias preference; using default");
                DEFAULT_ALIAS.to_owned()
            }
        }
    }

    /// Persist `alias` as the selected identity. Overwrites any previous
    /// selection; there is no deletion path.
    ///
    /// # Errors
    ///
    /// Returns the preference store's error when the write fails.
    pub fn set_preferred_alias(&self, alias: &str) -> Result<(), PreferenceError> {
        self.prefs.set(PREF_KEY_ALIAS, alias)
    }
}
