//! Roster document persistence: load, initialize, atomic persist.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use caflip_core::write_json_atomic;

use crate::error::RosterError;
use crate::model::Roster;

/// Loads the roster at `path`; an absent file yields the empty roster without
/// creating anything (read-only commands must not write as a side effect).
///
/// A document that parses but violates the roster invariants fails with
/// `CorruptRoster`: the store refuses to operate on state it cannot prove
/// consistent rather than repairing it silently.
pub fn load(path: &Path) -> Result<Roster> {
    if !path.exists() {
        return Ok(Roster::empty());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    let roster: Roster = serde_json::from_str(&raw)
        .map_err(RosterError::from)
        .with_context(|| format!("failed to parse roster {}", path.display()))?;
    roster
        .validate()
        .with_context(|| format!("refusing to operate on roster {}", path.display()))?;
    tracing::debug!(
        roster = %path.display(),
        accounts = roster.accounts.len(),
        active = ?roster.active_account_number,
        "loaded roster"
    );
    Ok(roster)
}

/// Validates, bumps `lastUpdated`, and writes the document atomically
/// (temp file + rename) so a crash mid-write never truncates it.
pub fn persist(path: &Path, roster: &mut Roster) -> Result<()> {
    roster.validate()?;
    roster.last_updated = Utc::now();
    write_json_atomic(path, roster)
        .with_context(|| format!("failed to persist roster {}", path.display()))?;
    tracing::debug!(
        roster = %path.display(),
        accounts = roster.accounts.len(),
        active = ?roster.active_account_number,
        "persisted roster"
    );
    Ok(())
}

/// Creates the empty roster document if none exists; idempotent.
pub fn initialize(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    persist(path, &mut Roster::empty())
}
