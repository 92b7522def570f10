//! Claude Code backend.
//!
//! Active credentials live in the macOS Keychain (via the `security` CLI) on
//! macOS and in `~/.claude/.credentials.json` elsewhere. The provider config
//! is a JSON document holding an `oauthAccount` identity object alongside
//! unrelated user settings, which a switch must preserve.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use caflip_core::{write_json_atomic, write_text_atomic_with_mode};

use crate::backend::{
    ensure_storage_key, read_file_if_exists, remove_file_if_exists, AccountBackend, CurrentIdentity,
};
use crate::paths::ProviderKind;

const KEYCHAIN_ACTIVE_SERVICE: &str = "Claude Code-credentials";
const IDENTITY_KEY: &str = "oauthAccount";

pub struct ClaudeBackend {
    home: PathBuf,
}

impl ClaudeBackend {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    fn credentials_path(&self) -> PathBuf {
        self.home.join(".claude").join(".credentials.json")
    }

    /// `~/.claude/.claude.json` when it holds the identity object, otherwise
    /// the legacy `~/.claude.json`.
    pub fn config_path(&self) -> PathBuf {
        let primary = self.home.join(".claude").join(".claude.json");
        if let Ok(raw) = std::fs::read_to_string(&primary) {
            if let Ok(value) = serde_json::from_str::<Value>(&raw) {
                if value.get(IDENTITY_KEY).is_some() {
                    return primary;
                }
            }
        }
        self.home.join(".claude.json")
    }

    fn uses_keychain() -> bool {
        cfg!(target_os = "macos")
    }

    fn backup_service_name(id: u64, email: &str) -> String {
        format!("Claude Code-Account-{id}-{email}")
    }

    fn backup_auth_path(id: u64, email: &str, dir: &Path) -> PathBuf {
        dir.join(format!(".claude-credentials-{id}-{email}.json"))
    }

    fn backup_config_path(id: u64, email: &str, dir: &Path) -> PathBuf {
        dir.join(format!(".claude-config-{id}-{email}.json"))
    }

    fn keychain_read(service: &str) -> Result<Option<String>> {
        let output = Command::new("security")
            .args(["find-generic-password", "-s", service, "-w"])
            .output()
            .context("failed to run `security find-generic-password`")?;
        if !output.status.success() {
            return Ok(None);
        }
        let secret = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!secret.is_empty()).then_some(secret))
    }

    fn keychain_write(service: &str, secret: &str) -> Result<()> {
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        let status = Command::new("security")
            .args(["add-generic-password", "-U", "-s", service, "-a", &user, "-w", secret])
            .status()
            .context("failed to run `security add-generic-password`")?;
        if !status.success() {
            bail!("keychain write failed for service '{service}'");
        }
        Ok(())
    }

    fn keychain_delete(service: &str) -> Result<()> {
        // Missing items exit non-zero; that is the expected "already gone" case.
        let _ = Command::new("security")
            .args(["delete-generic-password", "-s", service])
            .output()
            .context("failed to run `security delete-generic-password`")?;
        Ok(())
    }

    fn load_live_config_object(&self) -> Result<Map<String, Value>> {
        let path = self.config_path();
        let Some(raw) = read_file_if_exists(&path)? else {
            return Ok(Map::new());
        };
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => bail!("{} is not a JSON object", path.display()),
        }
    }
}

impl AccountBackend for ClaudeBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn current_identity(&self) -> Option<CurrentIdentity> {
        let raw = std::fs::read_to_string(self.config_path()).ok()?;
        let value: Value = serde_json::from_str(&raw).ok()?;
        let identity = value.get(IDENTITY_KEY)?;
        let email = identity.get("emailAddress")?.as_str()?.to_string();
        let account_id = identity
            .get("accountUuid")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(CurrentIdentity { email, account_id })
    }

    fn read_active_auth(&self) -> Result<Option<String>> {
        if Self::uses_keychain() {
            return Self::keychain_read(KEYCHAIN_ACTIVE_SERVICE);
        }
        read_file_if_exists(&self.credentials_path())
    }

    fn write_active_auth(&self, raw: &str) -> Result<()> {
        tracing::debug!(keychain = Self::uses_keychain(), "writing active credentials");
        if Self::uses_keychain() {
            return Self::keychain_write(KEYCHAIN_ACTIVE_SERVICE, raw);
        }
        write_text_atomic_with_mode(&self.credentials_path(), raw, Some(0o600))
    }

    fn clear_active_auth(&self) -> Result<()> {
        if Self::uses_keychain() {
            return Self::keychain_delete(KEYCHAIN_ACTIVE_SERVICE);
        }
        remove_file_if_exists(&self.credentials_path())
    }

    fn read_account_auth(&self, id: u64, email: &str, dir: &Path) -> Result<Option<String>> {
        ensure_storage_key(email)?;
        if Self::uses_keychain() {
            return Self::keychain_read(&Self::backup_service_name(id, email));
        }
        read_file_if_exists(&Self::backup_auth_path(id, email, dir))
    }

    fn write_account_auth(&self, id: u64, email: &str, raw: &str, dir: &Path) -> Result<()> {
        ensure_storage_key(email)?;
        if Self::uses_keychain() {
            return Self::keychain_write(&Self::backup_service_name(id, email), raw);
        }
        write_text_atomic_with_mode(&Self::backup_auth_path(id, email, dir), raw, Some(0o600))
    }

    fn delete_account_auth(&self, id: u64, email: &str, dir: &Path) -> Result<()> {
        ensure_storage_key(email)?;
        if Self::uses_keychain() {
            return Self::keychain_delete(&Self::backup_service_name(id, email));
        }
        remove_file_if_exists(&Self::backup_auth_path(id, email, dir))
    }

    fn requires_config_backup(&self) -> bool {
        true
    }

    fn read_account_config(&self, id: u64, email: &str, dir: &Path) -> Result<Option<String>> {
        ensure_storage_key(email)?;
        read_file_if_exists(&Self::backup_config_path(id, email, dir))
    }

    fn write_account_config(&self, id: u64, email: &str, raw: &str, dir: &Path) -> Result<()> {
        ensure_storage_key(email)?;
        write_text_atomic_with_mode(&Self::backup_config_path(id, email, dir), raw, Some(0o600))
    }

    fn delete_account_config(&self, id: u64, email: &str, dir: &Path) -> Result<()> {
        ensure_storage_key(email)?;
        remove_file_if_exists(&Self::backup_config_path(id, email, dir))
    }

    fn read_live_config(&self) -> Result<Option<String>> {
        read_file_if_exists(&self.config_path())
    }

    fn commit_identity_config(&self, saved_config: &str) -> Result<()> {
        let saved: Value =
            serde_json::from_str(saved_config).context("backup config is not valid JSON")?;
        let identity = saved
            .get(IDENTITY_KEY)
            .cloned()
            .context("backup config has no identity object")?;

        let mut live = self.load_live_config_object()?;
        live.insert(IDENTITY_KEY.to_string(), identity);
        write_json_atomic(&self.config_path(), &Value::Object(live))
    }

    fn clear_identity_config(&self) -> Result<()> {
        let mut live = self.load_live_config_object()?;
        if live.remove(IDENTITY_KEY).is_some() {
            write_json_atomic(&self.config_path(), &Value::Object(live))?;
        }
        Ok(())
    }
}
