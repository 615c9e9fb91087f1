//! Directory-backed trust-store adapter.
//!
//! Stand-in for a host platform's credential service: one sub-directory per
//! enrolled alias, holding `cert.pem` (the certificate chain) and `key.pem`.
//! The private key file is only probed for its PEM label — key bytes never
//! leave the store, matching the custody boundary of a real platform
//! credential service.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use common::{Certificate, Identity, PrivateKeyHandle, TrustStore, TrustStoreError};

const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";

/// [`TrustStore`] reading enrolled identities from a directory tree.
pub struct DirTrustStore {
    root: PathBuf,
}

impl DirTrustStore {
    /// Create a store rooted at `root`. The directory does not need to exist
    /// yet; an absent root simply resolves every alias as not found.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_chain(&self, path: &Path) -> Result<Vec<Certificate>, TrustStoreError> {
        let file = fs::File::open(path)
            .map_err(|e| TrustStoreError::Inaccessible(format!("cannot open {CERT_FILE}: {e}")))?;
        let certs: Result<Vec<_>, _> = rustls_pemfile::certs(&mut BufReader::new(file)).collect();
        let certs = certs
            .map_err(|e| TrustStoreError::Inaccessible(format!("cannot parse {CERT_FILE}: {e}")))?;
        Ok(certs
            .into_iter()
            .map(|der| Certificate(der.as_ref().to_vec()))
            .collect())
    }

    fn probe_key(&self, path: &Path, alias: &str) -> Result<PrivateKeyHandle, TrustStoreError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| TrustStoreError::Inaccessible(format!("cannot read {KEY_FILE}: {e}")))?;

        // Classify by PEM label only; the encoded key material is deliberately
        // not decoded here.
        let algorithm = contents.lines().find_map(|line| {
            let label = line.strip_prefix("-----BEGIN ")?.strip_suffix("-----")?;
            match label {
                "RSA PRIVATE KEY" => Some("RSA"),
                "EC PRIVATE KEY" => Some("EC"),
                "PRIVATE KEY" | "ENCRYPTED PRIVATE KEY" => Some("PKCS#8"),
                _ => None,
            }
        });

        match algorithm {
            Some(a) => Ok(PrivateKeyHandle::new(a)),
            None => Err(TrustStoreError::NotFound(alias.to_owned())),
        }
    }
}

impl TrustStore for DirTrustStore {
    fn resolve(&self, alias: &str) -> Result<Identity, TrustStoreError> {
        let entry = self.root.join(alias);
        let cert_path = entry.join(CERT_FILE);
        let key_path = entry.join(KEY_FILE);

        // An alias either resolves fully or not at all: a missing entry or a
        // partial one (either half absent) is NotFound, never a partial
        // Identity.
        if !cert_path.is_file() || !key_path.is_file() {
            return Err(TrustStoreError::NotFound(alias.to_owned()));
        }

        let chain = self.read_chain(&cert_path)?;
        if chain.is_empty() {
            return Err(TrustStoreError::NotFound(alias.to_owned()));
        }
        let key = self.probe_key(&key_path, alias)?;

        Identity::new(alias, key, chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TEST_ALIAS: &str = "My Key Chain";

    fn fixture(name: &str) -> String {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("truststore")
            .join(TEST_ALIAS)
            .join(name);
        fs::read_to_string(path).unwrap()
    }

    fn enroll(root: &Path, alias: &str, cert: Option<&str>, key: Option<&str>) {
        let entry = root.join(alias);
        fs::create_dir_all(&entry).unwrap();
        if let Some(c) = cert {
            fs::write(entry.join(CERT_FILE), c).unwrap();
        }
        if let Some(k) = key {
            fs::write(entry.join(KEY_FILE), k).unwrap();
        }
    }

    #[test]
    fn resolves_fully_enrolled_alias() {
        let dir = tempdir().unwrap();
        enroll(
            dir.path(),
            "server",
            Some(&fixture("cert.pem")),
            Some(&fixture("key.pem")),
        );
        let store = DirTrustStore::new(dir.path());
        let identity = store.resolve("server").unwrap();
        assert_eq!(identity.alias(), "server");
        assert!(!identity.certificate_chain().is_empty());
        assert_eq!(identity.private_key().algorithm(), "PKCS#8");
    }

    #[test]
    fn unknown_alias_is_not_found() {
        let dir = tempdir().unwrap();
        let store = DirTrustStore::new(dir.path());
        assert!(matches!(
            store.resolve("nobody"),
            Err(TrustStoreError::NotFound(_))
        ));
    }

    #[test]
    fn missing_key_half_is_not_found() {
        let dir = tempdir().unwrap();
        enroll(dir.path(), "server", Some(&fixture("cert.pem")), None);
        let store = DirTrustStore::new(dir.path());
        assert!(matches!(
            store.resolve("server"),
            Err(TrustStoreError::NotFound(_))
        ));
    }

    #[test]
    fn missing_cert_half_is_not_found() {
        let dir = tempdir().unwrap();
        enroll(dir.path(), "server", None, Some(&fixture("key.pem")));
        let store = DirTrustStore::new(dir.path());
        assert!(matches!(
            store.resolve("server"),
            Err(TrustStoreError::NotFound(_))
        ));
    }

    #[test]
    fn key_without_pem_label_is_not_found() {
        let dir = tempdir().unwrap();
        enroll(
            dir.path(),
            "server",
            Some(&fixture("cert.pem")),
            Some("not a pem file"),
        );
        let store = DirTrustStore::new(dir.path());
        assert!(matches!(
            store.resolve("server"),
            Err(TrustStoreError::NotFound(_))
        ));
    }

    #[test]
    fn absent_root_resolves_nothing() {
        let store = DirTrustStore::new("/nonexistent/trust/root");
        assert!(matches!(
            store.resolve(TEST_ALIAS),
            Err(TrustStoreError::NotFound(_))
        ));
    }
}
