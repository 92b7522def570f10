use anyhow::{Context, Result};

use caflip_provider::{AccountBackend, ProviderPaths};
use caflip_roster::{
    display_label, ensure_safe_email, resolve_email, store, PostRemovalAction, Roster, RosterError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The target was already logged in; only the roster pointer was synced.
    AlreadyActive(u64),
    Switched(u64),
}

/// Switches the active identity to `target`.
///
/// Steps, in order: back up the current login (if managed), load the
/// target's backups (refusing on `MissingBackup`), commit the target as
/// active, then persist the roster pointer. A crash between the first two
/// steps loses nothing; a crash before the final persist leaves a stale
/// pointer that reconciliation heals on the next invocation.
pub fn perform_switch(
    roster: &mut Roster,
    target: u64,
    backend: &dyn AccountBackend,
    paths: &ProviderPaths,
) -> Result<SwitchOutcome> {
    let target_email = roster
        .accounts
        .get(&target)
        .map(|account| account.email.clone())
        .ok_or_else(|| RosterError::AccountNotFound {
            token: target.to_string(),
        })?;
    let current_email = backend.current_email();

    // Fast path: the real current login already matches the target.
    if current_email.as_deref() == Some(target_email.as_str()) {
        if roster.active_account_number != Some(target) {
            roster.active_account_number = Some(target);
            store::persist(&paths.roster_path, roster)?;
        }
        return Ok(SwitchOutcome::AlreadyActive(target));
    }

    // All preconditions before any side effect: both emails must be usable
    // as storage keys, or the backup filenames could be attacker-shaped.
    ensure_safe_email(&target_email)?;
    if let Some(email) = current_email.as_deref() {
        ensure_safe_email(email)?;
    }

    // Step 1: copy the current login out before touching anything.
    if let Some(email) = current_email.as_deref() {
        if let Some(current_id) = resolve_email(roster, email) {
            if let Some(raw) = backend
                .read_active_auth()
                .context("failed to read active credentials for backup")?
            {
                backend.write_account_auth(current_id, email, &raw, &paths.credentials_dir)?;
            }
            if let Some(raw) = backend.read_live_config()? {
                backend.write_account_config(current_id, email, &raw, &paths.configs_dir)?;
            }
            tracing::debug!(id = current_id, email, "backed up current account");
        }
    }

    // Step 2: load the target's backups; refuse rather than half-restore.
    let target_auth = backend.read_account_auth(target, &target_email, &paths.credentials_dir)?;
    let target_config = backend.read_account_config(target, &target_email, &paths.configs_dir)?;
    let Some(target_auth) = target_auth else {
        return Err(missing_backup(roster, target).into());
    };
    if backend.requires_config_backup() && target_config.is_none() {
        return Err(missing_backup(roster, target).into());
    }

    // Step 3: commit the target as active.
    backend.write_active_auth(&target_auth)?;
    if let Some(config) = target_config.as_deref() {
        backend.commit_identity_config(config)?;
    }

    // Step 4: only now record the switch in the roster.
    roster.active_account_number = Some(target);
    store::persist(&paths.roster_path, roster)?;
    tracing::debug!(id = target, email = %target_email, "switched active account");
    Ok(SwitchOutcome::Switched(target))
}

/// Clears the active credential store and the identity portion of the live
/// provider config.
pub fn logout(backend: &dyn AccountBackend) -> Result<()> {
    backend.clear_active_auth()?;
    backend.clear_identity_config()?;
    tracing::debug!(provider = %backend.kind(), "cleared active login");
    Ok(())
}

/// Carries out the action reported by a removal and persists the roster.
///
/// Returns the switch outcome when the policy demanded a switch.
pub fn execute_post_removal(
    roster: &mut Roster,
    action: PostRemovalAction,
    backend: &dyn AccountBackend,
    paths: &ProviderPaths,
) -> Result<Option<SwitchOutcome>> {
    match action {
        PostRemovalAction::SwitchTo(successor) => {
            let outcome = perform_switch(roster, successor, backend, paths)?;
            Ok(Some(outcome))
        }
        PostRemovalAction::Logout => {
            logout(backend)?;
            store::persist(&paths.roster_path, roster)?;
            Ok(None)
        }
        PostRemovalAction::None => {
            store::persist(&paths.roster_path, roster)?;
            Ok(None)
        }
    }
}

fn missing_backup(roster: &Roster, id: u64) -> RosterError {
    RosterError::MissingBackup {
        label: display_label(roster, id),
    }
}
