//! Codex backend.
//!
//! The active store is a single auth document at `~/.codex/auth.json`; the
//! logged-in identity comes from the JWT `id_token` payload inside it. Codex
//! keeps no separate config state, so the config triad stays the trait's
//! no-op default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;

use caflip_core::write_text_atomic_with_mode;

use crate::backend::{
    ensure_storage_key, read_file_if_exists, remove_file_if_exists, AccountBackend, CurrentIdentity,
};
use crate::paths::ProviderKind;

const OPENAI_AUTH_CLAIM: &str = "https://api.openai.com/auth";

pub struct CodexBackend {
    home: PathBuf,
}

impl CodexBackend {
    pub fn new(home: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
        }
    }

    fn auth_path(&self) -> PathBuf {
        self.home.join(".codex").join("auth.json")
    }

    fn backup_auth_path(id: u64, email: &str, dir: &Path) -> PathBuf {
        dir.join(format!(".codex-auth-{id}-{email}.json"))
    }
}

/// Decodes the claims segment of a JWT without verifying the signature; the
/// token is only mined for display identity, never trusted for auth.
fn decode_jwt_payload(token: &str) -> Option<Value> {
    let segment = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&decoded).ok()
}

impl AccountBackend for CodexBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Codex
    }

    fn current_identity(&self) -> Option<CurrentIdentity> {
        let raw = std::fs::read_to_string(self.auth_path()).ok()?;
        let auth: Value = serde_json::from_str(&raw).ok()?;
        let tokens = auth.get("tokens")?;
        let payload = decode_jwt_payload(tokens.get("id_token")?.as_str()?)?;
        let email = payload.get("email")?.as_str()?.to_string();
        let account_id = payload
            .get(OPENAI_AUTH_CLAIM)
            .and_then(|claim| claim.get("chatgpt_account_id"))
            .and_then(Value::as_str)
            .or_else(|| tokens.get("account_id").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        Some(CurrentIdentity { email, account_id })
    }

    fn read_active_auth(&self) -> Result<Option<String>> {
        read_file_if_exists(&self.auth_path())
    }

    fn write_active_auth(&self, raw: &str) -> Result<()> {
        tracing::debug!(path = %self.auth_path().display(), "writing active auth document");
        let codex_dir = self.home.join(".codex");
        std::fs::create_dir_all(&codex_dir)
            .with_context(|| format!("failed to create {}", codex_dir.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&codex_dir, std::fs::Permissions::from_mode(0o700))
                .with_context(|| format!("failed to restrict {}", codex_dir.display()))?;
        }
        write_text_atomic_with_mode(&self.auth_path(), raw, Some(0o600))
    }

    fn clear_active_auth(&self) -> Result<()> {
        remove_file_if_exists(&self.auth_path())
    }

    fn read_account_auth(&self, id: u64, email: &str, dir: &Path) -> Result<Option<String>> {
        ensure_storage_key(email)?;
        read_file_if_exists(&Self::backup_auth_path(id, email, dir))
    }

    fn write_account_auth(&self, id: u64, email: &str, raw: &str, dir: &Path) -> Result<()> {
        ensure_storage_key(email)?;
        write_text_atomic_with_mode(&Self::backup_auth_path(id, email, dir), raw, Some(0o600))
    }

    fn delete_account_auth(&self, id: u64, email: &str, dir: &Path) -> Result<()> {
        ensure_storage_key(email)?;
        remove_file_if_exists(&Self::backup_auth_path(id, email, dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_jwt(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.signature")
    }

    fn write_auth(tempdir: &tempfile::TempDir, auth: &Value) {
        let codex_dir = tempdir.path().join(".codex");
        std::fs::create_dir_all(&codex_dir).expect("mkdir");
        std::fs::write(codex_dir.join("auth.json"), auth.to_string()).expect("write auth");
    }

    #[test]
    fn identity_comes_from_the_id_token_claims() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let token = encode_jwt(&serde_json::json!({
            "email": "c@x.com",
            "https://api.openai.com/auth": { "chatgpt_account_id": "acct-1" }
        }));
        write_auth(
            &tempdir,
            &serde_json::json!({ "tokens": { "id_token": token } }),
        );

        let identity = CodexBackend::new(tempdir.path())
            .current_identity()
            .expect("identity");
        assert_eq!(identity.email, "c@x.com");
        assert_eq!(identity.account_id, "acct-1");
    }

    #[test]
    fn account_id_falls_back_to_tokens_field() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let token = encode_jwt(&serde_json::json!({ "email": "c@x.com" }));
        write_auth(
            &tempdir,
            &serde_json::json!({ "tokens": { "id_token": token, "account_id": "acct-2" } }),
        );

        let identity = CodexBackend::new(tempdir.path())
            .current_identity()
            .expect("identity");
        assert_eq!(identity.account_id, "acct-2");
    }

    #[test]
    fn identity_is_none_for_missing_or_malformed_auth() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let backend = CodexBackend::new(tempdir.path());
        assert!(backend.current_identity().is_none());

        write_auth(&tempdir, &serde_json::json!({ "tokens": {} }));
        assert!(backend.current_identity().is_none());

        write_auth(
            &tempdir,
            &serde_json::json!({ "tokens": { "id_token": "not-a-jwt" } }),
        );
        assert!(backend.current_identity().is_none());

        let token = encode_jwt(&serde_json::json!({ "sub": "no-email-claim" }));
        write_auth(
            &tempdir,
            &serde_json::json!({ "tokens": { "id_token": token } }),
        );
        assert!(backend.current_identity().is_none());
    }

    #[test]
    fn active_auth_round_trips() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let backend = CodexBackend::new(tempdir.path());
        assert_eq!(backend.read_active_auth().expect("read"), None);
        backend.write_active_auth("{\"tokens\":{}}").expect("write");
        assert_eq!(
            backend.read_active_auth().expect("read").as_deref(),
            Some("{\"tokens\":{}}")
        );
        backend.clear_active_auth().expect("clear");
        assert_eq!(backend.read_active_auth().expect("read"), None);
    }

    #[test]
    fn config_triad_is_a_noop() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let dir = tempdir.path().join("configs");
        let backend = CodexBackend::new(tempdir.path());
        assert!(!backend.requires_config_backup());
        backend
            .write_account_config(1, "c@x.com", "ignored", &dir)
            .expect("noop write");
        assert_eq!(
            backend.read_account_config(1, "c@x.com", &dir).expect("read"),
            None
        );
        assert!(!dir.exists(), "no-op config triad must not create files");
    }

    #[test]
    fn decode_jwt_payload_tolerates_padded_segments() {
        let payload = serde_json::json!({ "email": "pad@x.com" });
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        let padded = format!("h.{}==.s", body);
        let decoded = decode_jwt_payload(&padded).expect("decode");
        assert_eq!(decoded["email"], "pad@x.com");
    }
}
