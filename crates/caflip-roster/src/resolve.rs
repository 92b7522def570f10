//! Maps user-supplied tokens (alias, email) to roster entries.

use crate::error::RosterError;
use crate::model::Roster;

/// Resolution order: exact alias match, then exact email match.
pub fn resolve(roster: &Roster, token: &str) -> Option<u64> {
    find_account_by_alias(roster, token).or_else(|| resolve_email(roster, token))
}

/// Resolves a token typed by the user for `remove`/`alias` flows.
///
/// Purely numeric tokens are rejected rather than resolved: ids are internal
/// bookkeeping, and a phone-number-like email local part must never be
/// mistaken for one.
pub fn resolve_user_identifier(roster: &Roster, token: &str) -> Result<u64, RosterError> {
    if !token.is_empty() && token.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(RosterError::NumericIdentifier {
            token: token.to_string(),
        });
    }
    resolve(roster, token).ok_or_else(|| RosterError::AccountNotFound {
        token: token.to_string(),
    })
}

pub fn resolve_email(roster: &Roster, email: &str) -> Option<u64> {
    roster
        .accounts
        .iter()
        .find(|(_, account)| account.email == email)
        .map(|(id, _)| *id)
}

pub fn find_account_by_alias(roster: &Roster, alias: &str) -> Option<u64> {
    roster
        .accounts
        .iter()
        .find(|(_, account)| account.alias.as_deref() == Some(alias))
        .map(|(id, _)| *id)
}

/// User-facing label: the 1-based position in the rotation sequence, not the
/// raw id — ids are never reused, so they grow visible gaps after removals.
pub fn display_label(roster: &Roster, id: u64) -> String {
    match roster.sequence.iter().position(|entry| *entry == id) {
        Some(index) => format!("account {}", index + 1),
        None => format!("account #{id}"),
    }
}
