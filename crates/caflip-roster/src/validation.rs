//! Alias and email validation rules.

use caflip_core::is_safe_storage_key;

use crate::error::RosterError;

/// Command words an alias may not shadow.
pub const RESERVED_COMMANDS: &[&str] = &[
    "list", "add", "remove", "next", "status", "alias", "all", "claude", "codex", "help",
];

const MAX_ALIAS_LEN: usize = 64;

/// Validates alias syntax. Uniqueness is checked separately by the caller
/// because it needs the roster.
pub fn validate_alias(alias: &str) -> Result<(), RosterError> {
    let fail = |reason: &'static str| RosterError::InvalidAlias {
        alias: alias.to_string(),
        reason,
    };

    if alias.is_empty() {
        return Err(fail("alias must not be empty"));
    }
    if alias.len() > MAX_ALIAS_LEN {
        return Err(fail("alias must be 64 characters or fewer"));
    }
    if alias.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(fail("alias must not be purely numeric"));
    }
    if RESERVED_COMMANDS.contains(&alias) {
        return Err(fail("alias conflicts with a reserved command word"));
    }
    if !alias
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
    {
        return Err(fail(
            "alias may only contain letters, digits, '-', '_', and '.'",
        ));
    }
    Ok(())
}

/// Rejects emails that cannot be used as backup storage keys.
pub fn ensure_safe_email(email: &str) -> Result<(), RosterError> {
    if is_safe_storage_key(email) {
        Ok(())
    } else {
        Err(RosterError::UnsafeIdentifier {
            value: email.to_string(),
        })
    }
}
