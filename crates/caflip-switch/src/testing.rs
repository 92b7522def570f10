//! In-memory backend fake for protocol tests.
//!
//! Auth payloads are plain strings of the form `auth:<email>`; writing one to
//! the active store logs that email in, mirroring how a real provider's
//! identity follows its credential document.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use caflip_provider::{AccountBackend, CurrentIdentity, ProviderKind};

#[derive(Default)]
pub struct MemoryBackend {
    pub require_config: bool,
    identity: RefCell<Option<String>>,
    active_auth: RefCell<Option<String>>,
    live_config: RefCell<Option<String>>,
    account_auth: RefCell<BTreeMap<(u64, String), String>>,
    account_config: RefCell<BTreeMap<(u64, String), String>>,
    committed_configs: RefCell<Vec<String>>,
    backup_writes: RefCell<usize>,
}

impl MemoryBackend {
    pub fn logged_in(email: &str) -> Self {
        let backend = Self::default();
        backend
            .write_active_auth(&format!("auth:{email}"))
            .expect("seed active auth");
        backend
    }

    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn with_live_config(self, config: &str) -> Self {
        *self.live_config.borrow_mut() = Some(config.to_string());
        self
    }

    pub fn seed_backup(&self, id: u64, email: &str) {
        self.account_auth
            .borrow_mut()
            .insert((id, email.to_string()), format!("auth:{email}"));
    }

    pub fn seed_config_backup(&self, id: u64, email: &str, config: &str) {
        self.account_config
            .borrow_mut()
            .insert((id, email.to_string()), config.to_string());
    }

    pub fn active_auth(&self) -> Option<String> {
        self.active_auth.borrow().clone()
    }

    pub fn backup_auth(&self, id: u64, email: &str) -> Option<String> {
        self.account_auth
            .borrow()
            .get(&(id, email.to_string()))
            .cloned()
    }

    pub fn backup_writes(&self) -> usize {
        *self.backup_writes.borrow()
    }

    pub fn committed_configs(&self) -> Vec<String> {
        self.committed_configs.borrow().clone()
    }

    fn email_of(raw: &str) -> Option<String> {
        raw.strip_prefix("auth:").map(str::to_string)
    }
}

impl AccountBackend for MemoryBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Codex
    }

    fn current_identity(&self) -> Option<CurrentIdentity> {
        self.identity.borrow().as_ref().map(|email| CurrentIdentity {
            email: email.clone(),
            account_id: format!("id-{email}"),
        })
    }

    fn read_active_auth(&self) -> Result<Option<String>> {
        Ok(self.active_auth.borrow().clone())
    }

    fn write_active_auth(&self, raw: &str) -> Result<()> {
        *self.active_auth.borrow_mut() = Some(raw.to_string());
        *self.identity.borrow_mut() = Self::email_of(raw);
        Ok(())
    }

    fn clear_active_auth(&self) -> Result<()> {
        *self.active_auth.borrow_mut() = None;
        *self.identity.borrow_mut() = None;
        Ok(())
    }

    fn read_account_auth(&self, id: u64, email: &str, _dir: &Path) -> Result<Option<String>> {
        Ok(self
            .account_auth
            .borrow()
            .get(&(id, email.to_string()))
            .cloned())
    }

    fn write_account_auth(&self, id: u64, email: &str, raw: &str, _dir: &Path) -> Result<()> {
        *self.backup_writes.borrow_mut() += 1;
        self.account_auth
            .borrow_mut()
            .insert((id, email.to_string()), raw.to_string());
        Ok(())
    }

    fn delete_account_auth(&self, id: u64, email: &str, _dir: &Path) -> Result<()> {
        self.account_auth.borrow_mut().remove(&(id, email.to_string()));
        Ok(())
    }

    fn requires_config_backup(&self) -> bool {
        self.require_config
    }

    fn read_account_config(&self, id: u64, email: &str, _dir: &Path) -> Result<Option<String>> {
        Ok(self
            .account_config
            .borrow()
            .get(&(id, email.to_string()))
            .cloned())
    }

    fn write_account_config(&self, id: u64, email: &str, raw: &str, _dir: &Path) -> Result<()> {
        self.account_config
            .borrow_mut()
            .insert((id, email.to_string()), raw.to_string());
        Ok(())
    }

    fn delete_account_config(&self, id: u64, email: &str, _dir: &Path) -> Result<()> {
        self.account_config
            .borrow_mut()
            .remove(&(id, email.to_string()));
        Ok(())
    }

    fn read_live_config(&self) -> Result<Option<String>> {
        Ok(self.live_config.borrow().clone())
    }

    fn commit_identity_config(&self, saved_config: &str) -> Result<()> {
        self.committed_configs
            .borrow_mut()
            .push(saved_config.to_string());
        Ok(())
    }

    fn clear_identity_config(&self) -> Result<()> {
        *self.live_config.borrow_mut() = None;
        Ok(())
    }
}
