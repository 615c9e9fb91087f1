//! Identity layer: trust-store access, accessibility gating, and the
//! persisted alias preference.
//!
//! # Responsibilities
//! - Resolve aliases through the injected [`common::TrustStore`] capability,
//!   off the runtime's core threads.
//! - Gate server startup on full identity resolution.
//! - Persist the selected alias (one value, overwrite-only).

pub mod dir_store;
pub mod prefs;
pub mod store;

pub use dir_store::DirTrustStore;
pub use prefs::FilePreferenceStore;
pub use store::{IdentityStore, DEFAULT_ALIAS};
