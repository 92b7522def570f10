//! Pure lifecycle operations over roster state.
//!
//! Each operation validates every precondition before mutating anything, so
//! a returned error always means the roster is exactly as it was.

use chrono::Utc;

use crate::error::RosterError;
use crate::model::{Account, Roster};
use crate::resolve::find_account_by_alias;
use crate::validation::{ensure_safe_email, validate_alias};

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub uuid: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The account was inserted under this id and made active.
    Added(u64),
    /// The email was already managed; nothing changed.
    AlreadyManaged(u64),
}

/// What the caller must do after a removal so the active pointer never
/// dangles: switch to a remaining account, log out entirely, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostRemovalAction {
    SwitchTo(u64),
    Logout,
    None,
}

/// Adds the currently logged-in identity to the roster and marks it active.
///
/// A duplicate email is a reported no-op, not an error; an alias conflict is
/// rejected before any mutation.
pub fn add(roster: &mut Roster, new: NewAccount) -> Result<AddOutcome, RosterError> {
    ensure_safe_email(&new.email)?;

    if let Some(existing) = crate::resolve::resolve_email(roster, &new.email) {
        return Ok(AddOutcome::AlreadyManaged(existing));
    }

    if let Some(alias) = new.alias.as_deref() {
        validate_alias(alias)?;
        if find_account_by_alias(roster, alias).is_some() {
            return Err(RosterError::AliasConflict {
                alias: alias.to_string(),
            });
        }
    }

    let id = roster.next_id();
    debug_assert!(!roster.accounts.contains_key(&id));
    roster.accounts.insert(
        id,
        Account {
            email: new.email,
            uuid: new.uuid,
            added: Utc::now(),
            alias: new.alias,
        },
    );
    roster.sequence.push(id);
    roster.active_account_number = Some(id);
    roster.next_account_number = id + 1;
    Ok(AddOutcome::Added(id))
}

/// Removes `id` and reports the post-removal action.
///
/// Policy: removing the active account switches to the next account in the
/// original rotation order (wrapping to the start); removing the last account
/// logs out; removing an inactive account requires nothing.
pub fn remove(roster: &mut Roster, id: u64) -> Result<PostRemovalAction, RosterError> {
    if !roster.accounts.contains_key(&id) {
        return Err(RosterError::AccountNotFound {
            token: id.to_string(),
        });
    }

    let was_active = roster.active_account_number == Some(id);
    let removed_index = roster
        .sequence
        .iter()
        .position(|entry| *entry == id)
        .unwrap_or(0);
    let original_order = roster.sequence.clone();

    // Ids are never reused: pin the high-water mark from the pre-removal
    // state, before the entry disappears. Documents written without the mark
    // load with it unset, so deriving it from the removed id alone could drop
    // it below a surviving higher id.
    roster.next_account_number = roster.next_id();
    roster.sequence.retain(|entry| *entry != id);
    roster.accounts.remove(&id);

    if !was_active {
        return Ok(PostRemovalAction::None);
    }

    roster.active_account_number = None;
    if roster.sequence.is_empty() {
        return Ok(PostRemovalAction::Logout);
    }

    // First remaining account after the removed position, wrapping to start.
    let successor = original_order
        .iter()
        .cycle()
        .skip(removed_index + 1)
        .take(original_order.len())
        .find(|candidate| roster.accounts.contains_key(candidate))
        .copied();
    match successor {
        Some(id) => Ok(PostRemovalAction::SwitchTo(id)),
        None => Ok(PostRemovalAction::Logout),
    }
}

/// Assigns `alias` to `id` after syntax and uniqueness checks.
pub fn set_alias(roster: &mut Roster, id: u64, alias: &str) -> Result<(), RosterError> {
    validate_alias(alias)?;
    if let Some(holder) = find_account_by_alias(roster, alias) {
        if holder != id {
            return Err(RosterError::AliasConflict {
                alias: alias.to_string(),
            });
        }
    }
    let account = roster
        .accounts
        .get_mut(&id)
        .ok_or_else(|| RosterError::AccountNotFound {
            token: id.to_string(),
        })?;
    account.alias = Some(alias.to_string());
    Ok(())
}

/// Id of the account after the active one in rotation order.
pub fn next_in_sequence(roster: &Roster) -> Result<u64, RosterError> {
    if roster.sequence.len() < 2 {
        return Err(RosterError::InsufficientAccounts {
            count: roster.sequence.len(),
        });
    }

    let current_index = roster
        .active_account_number
        .and_then(|active| roster.sequence.iter().position(|entry| *entry == active));
    let next_index = match current_index {
        Some(index) => (index + 1) % roster.sequence.len(),
        // Nothing managed is active: start from the top of the rotation.
        None => 0,
    };
    Ok(roster.sequence[next_index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str, alias: Option<&str>) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            uuid: format!("uuid-{email}"),
            alias: alias.map(str::to_string),
        }
    }

    fn roster_of(emails: &[&str]) -> Roster {
        let mut roster = Roster::empty();
        for email in emails {
            add(&mut roster, new_account(email, None)).expect("add");
        }
        roster
    }

    #[test]
    fn add_assigns_monotonic_ids_and_activates() {
        let mut roster = Roster::empty();
        assert_eq!(
            add(&mut roster, new_account("a@x.com", None)).unwrap(),
            AddOutcome::Added(1)
        );
        assert_eq!(
            add(&mut roster, new_account("b@x.com", Some("work"))).unwrap(),
            AddOutcome::Added(2)
        );
        assert_eq!(roster.sequence, vec![1, 2]);
        assert_eq!(roster.active_account_number, Some(2));
        roster.validate().expect("invariants hold");
    }

    #[test]
    fn add_duplicate_email_is_a_reported_noop() {
        let mut roster = roster_of(&["a@x.com", "b@x.com"]);
        let before = roster.accounts.len();
        assert_eq!(
            add(&mut roster, new_account("a@x.com", None)).unwrap(),
            AddOutcome::AlreadyManaged(1)
        );
        assert_eq!(roster.accounts.len(), before);
    }

    #[test]
    fn add_rejects_alias_conflict_without_mutation() {
        let mut roster = Roster::empty();
        add(&mut roster, new_account("a@x.com", Some("work"))).unwrap();
        let error = add(&mut roster, new_account("b@x.com", Some("work"))).expect_err("conflict");
        assert!(matches!(error, RosterError::AliasConflict { .. }));
        assert_eq!(roster.accounts.len(), 1);
        assert!(!roster.email_exists("b@x.com"));
    }

    #[test]
    fn add_rejects_unsafe_email() {
        let mut roster = Roster::empty();
        let error = add(&mut roster, new_account("a/b@x.com", None)).expect_err("unsafe");
        assert!(matches!(error, RosterError::UnsafeIdentifier { .. }));
        assert!(roster.accounts.is_empty());
    }

    #[test]
    fn id_monotonicity_survives_removal() {
        let mut roster = roster_of(&["a@x.com", "b@x.com", "c@x.com"]);
        remove(&mut roster, 3).expect("remove highest id");
        let outcome = add(&mut roster, new_account("d@x.com", None)).unwrap();
        assert_eq!(outcome, AddOutcome::Added(4), "id 3 must never be reassigned");
        roster.validate().expect("invariants hold");
    }

    #[test]
    fn remove_keeps_monotonicity_on_documents_without_the_watermark_field() {
        // Documents written by older versions carry no nextAccountNumber.
        let mut roster: Roster = serde_json::from_str(
            r#"{
                "activeAccountNumber": 1,
                "lastUpdated": "2026-01-01T00:00:00Z",
                "sequence": [1, 2, 3],
                "accounts": {
                    "1": { "email": "a@x.com", "uuid": "", "added": "2026-01-01T00:00:00Z" },
                    "2": { "email": "b@x.com", "uuid": "", "added": "2026-01-01T00:00:00Z" },
                    "3": { "email": "c@x.com", "uuid": "", "added": "2026-01-01T00:00:00Z" }
                }
            }"#,
        )
        .expect("parse legacy document");
        assert_eq!(roster.next_account_number, 0);

        // Removing a middle account must not drop the mark below id 3.
        assert_eq!(remove(&mut roster, 2).unwrap(), PostRemovalAction::None);
        roster.validate().expect("invariants hold after removal");

        assert_eq!(
            add(&mut roster, new_account("d@x.com", None)).unwrap(),
            AddOutcome::Added(4),
            "ids 2 and 3 must never be reassigned"
        );
        roster.validate().expect("invariants hold after re-add");
    }

    #[test]
    fn remove_missing_account_fails() {
        let mut roster = roster_of(&["a@x.com"]);
        let error = remove(&mut roster, 9).expect_err("absent id");
        assert!(matches!(error, RosterError::AccountNotFound { .. }));
    }

    #[test]
    fn remove_inactive_account_requires_no_action() {
        let mut roster = roster_of(&["a@x.com", "b@x.com"]);
        // b (id 2) is active after the adds; removing a (id 1) changes nothing.
        assert_eq!(remove(&mut roster, 1).unwrap(), PostRemovalAction::None);
        assert_eq!(roster.active_account_number, Some(2));
        roster.validate().expect("invariants hold");
    }

    #[test]
    fn remove_active_switches_to_next_in_order_wrapping() {
        let mut roster = roster_of(&["a@x.com", "b@x.com", "c@x.com"]);
        roster.active_account_number = Some(2);
        assert_eq!(remove(&mut roster, 2).unwrap(), PostRemovalAction::SwitchTo(3));

        let mut roster = roster_of(&["a@x.com", "b@x.com", "c@x.com"]);
        // Active is the last in sequence: the successor wraps to the start.
        assert_eq!(remove(&mut roster, 3).unwrap(), PostRemovalAction::SwitchTo(1));
    }

    #[test]
    fn remove_last_account_logs_out() {
        let mut roster = roster_of(&["a@x.com"]);
        assert_eq!(remove(&mut roster, 1).unwrap(), PostRemovalAction::Logout);
        assert_eq!(roster.active_account_number, None);
        assert!(roster.sequence.is_empty());
    }

    #[test]
    fn set_alias_validates_before_mutating() {
        let mut roster = roster_of(&["a@x.com", "b@x.com"]);
        set_alias(&mut roster, 1, "work").expect("assign");
        let error = set_alias(&mut roster, 2, "work").expect_err("conflict");
        assert!(matches!(error, RosterError::AliasConflict { .. }));
        assert_eq!(roster.accounts[&2].alias, None);

        let error = set_alias(&mut roster, 2, "123").expect_err("numeric alias");
        assert!(matches!(error, RosterError::InvalidAlias { .. }));
    }

    #[test]
    fn set_alias_is_idempotent_for_the_same_account() {
        let mut roster = roster_of(&["a@x.com"]);
        set_alias(&mut roster, 1, "work").expect("assign");
        set_alias(&mut roster, 1, "work").expect("re-assign same alias");
    }

    #[test]
    fn next_in_sequence_rotates_and_wraps() {
        let mut roster = roster_of(&["a@x.com", "b@x.com", "c@x.com"]);
        roster.active_account_number = Some(1);
        assert_eq!(next_in_sequence(&roster).unwrap(), 2);
        roster.active_account_number = Some(3);
        assert_eq!(next_in_sequence(&roster).unwrap(), 1);
        roster.active_account_number = None;
        assert_eq!(next_in_sequence(&roster).unwrap(), 1);
    }

    #[test]
    fn next_in_sequence_needs_two_accounts() {
        let roster = roster_of(&["a@x.com"]);
        let error = next_in_sequence(&roster).expect_err("single account");
        assert!(matches!(error, RosterError::InsufficientAccounts { count: 1 }));
    }

    #[test]
    fn invariants_hold_across_mixed_operation_sequences() {
        let mut roster = Roster::empty();
        for round in 0..5u32 {
            add(&mut roster, new_account(&format!("u{round}@x.com"), None)).unwrap();
            roster.validate().expect("after add");
        }
        for id in [2u64, 4, 1] {
            remove(&mut roster, id).unwrap();
            roster.validate().expect("after remove");
        }
        add(&mut roster, new_account("late@x.com", Some("late"))).unwrap();
        roster.validate().expect("after re-add");
        assert!(roster.accounts.keys().all(|id| *id <= 6));
        assert_eq!(roster.next_id(), 7);
    }
}
