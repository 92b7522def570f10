//! The capability interface the switch protocol runs against.

use std::path::Path;

use anyhow::{bail, Result};

use caflip_core::is_safe_storage_key;

use crate::paths::ProviderKind;

/// Identity currently logged into the underlying tool, as the provider
/// reports it. `account_id` is opaque and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentIdentity {
    pub email: String,
    pub account_id: String,
}

/// Storage capabilities of one identity provider.
///
/// The config triad defaults to no-ops: providers without separate config
/// state (Codex) simply inherit them, so the switch protocol never
/// null-checks for config support.
pub trait AccountBackend {
    fn kind(&self) -> ProviderKind;

    /// The real current login, or `None` when logged out. This — not the
    /// roster — is the source of truth for "who is active".
    fn current_identity(&self) -> Option<CurrentIdentity>;

    fn current_email(&self) -> Option<String> {
        self.current_identity().map(|identity| identity.email)
    }

    fn read_active_auth(&self) -> Result<Option<String>>;
    fn write_active_auth(&self, raw: &str) -> Result<()>;
    fn clear_active_auth(&self) -> Result<()>;

    fn read_account_auth(&self, id: u64, email: &str, dir: &Path) -> Result<Option<String>>;
    fn write_account_auth(&self, id: u64, email: &str, raw: &str, dir: &Path) -> Result<()>;
    fn delete_account_auth(&self, id: u64, email: &str, dir: &Path) -> Result<()>;

    /// Whether a switch must refuse to proceed when the config backup is
    /// missing. False for providers whose config triad is the no-op default.
    fn requires_config_backup(&self) -> bool {
        false
    }

    fn read_account_config(&self, _id: u64, _email: &str, _dir: &Path) -> Result<Option<String>> {
        Ok(None)
    }

    fn write_account_config(&self, _id: u64, _email: &str, _raw: &str, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn delete_account_config(&self, _id: u64, _email: &str, _dir: &Path) -> Result<()> {
        Ok(())
    }

    /// The live provider-config document, for backup during a switch.
    fn read_live_config(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Merges the identity fields of a saved config into the live config,
    /// preserving unrelated keys already present.
    fn commit_identity_config(&self, _saved_config: &str) -> Result<()> {
        Ok(())
    }

    /// Drops the identity fields from the live config on logout.
    fn clear_identity_config(&self) -> Result<()> {
        Ok(())
    }
}

/// Guard for values interpolated into backup filenames or keychain service
/// names; backends call this before touching per-account storage.
pub fn ensure_storage_key(email: &str) -> Result<()> {
    if !is_safe_storage_key(email) {
        bail!("email '{email}' is not safe for storage");
    }
    Ok(())
}

/// Removes a backup artifact, treating "already gone" as success.
pub(crate) fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}

/// Reads a backup artifact; absence is an expected empty result, not an error.
pub(crate) fn read_file_if_exists(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}
