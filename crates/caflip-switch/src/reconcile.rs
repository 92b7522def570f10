use anyhow::Result;

use caflip_provider::{AccountBackend, ProviderPaths};
use caflip_roster::{resolve_email, store, Roster};

/// Re-derives `activeAccountNumber` from the provider's real current login
/// and persists the correction when it drifted.
///
/// This is what makes external logins (the user re-authenticating outside
/// caflip) and crashes between credential commit and roster persist safe:
/// every path that reports or acts on "who is active" goes through here
/// first, so the roster converges to the truth instead of asserting it.
pub fn reconcile_active_account(
    roster: &mut Roster,
    backend: &dyn AccountBackend,
    paths: &ProviderPaths,
) -> Result<()> {
    let resolved = backend
        .current_email()
        .and_then(|email| resolve_email(roster, &email));
    if roster.active_account_number != resolved {
        tracing::debug!(
            stored = ?roster.active_account_number,
            resolved = ?resolved,
            "reconciling active account pointer"
        );
        roster.active_account_number = resolved;
        store::persist(&paths.roster_path, roster)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use caflip_provider::ProviderKind;
    use caflip_roster::Account;

    use super::*;
    use crate::testing::MemoryBackend;

    fn roster_of(entries: &[(u64, &str)]) -> Roster {
        let mut roster = Roster::empty();
        for (id, email) in entries {
            roster.sequence.push(*id);
            roster.accounts.insert(
                *id,
                Account {
                    email: email.to_string(),
                    uuid: String::new(),
                    added: Utc::now(),
                    alias: None,
                },
            );
        }
        roster
    }

    fn paths(tempdir: &tempfile::TempDir) -> ProviderPaths {
        let paths = ProviderPaths::new(tempdir.path(), ProviderKind::Codex);
        paths.ensure_directories().expect("dirs");
        paths
    }

    #[test]
    fn external_login_change_updates_the_pointer() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let paths = paths(&tempdir);
        let mut roster = roster_of(&[(1, "a@x.com"), (2, "b@x.com")]);
        roster.active_account_number = Some(1);
        // The user re-authenticated as b@x.com outside of caflip.
        let backend = MemoryBackend::logged_in("b@x.com");

        reconcile_active_account(&mut roster, &backend, &paths).expect("reconcile");
        assert_eq!(roster.active_account_number, Some(2));
        let persisted = store::load(&paths.roster_path).expect("load");
        assert_eq!(persisted.active_account_number, Some(2));
    }

    #[test]
    fn unmanaged_login_clears_the_pointer() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let paths = paths(&tempdir);
        let mut roster = roster_of(&[(1, "a@x.com")]);
        roster.active_account_number = Some(1);
        let backend = MemoryBackend::logged_in("stranger@x.com");

        reconcile_active_account(&mut roster, &backend, &paths).expect("reconcile");
        assert_eq!(roster.active_account_number, None);
    }

    #[test]
    fn matching_pointer_does_not_rewrite_the_document() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let paths = paths(&tempdir);
        let mut roster = roster_of(&[(1, "a@x.com")]);
        roster.active_account_number = Some(1);
        let backend = MemoryBackend::logged_in("a@x.com");

        reconcile_active_account(&mut roster, &backend, &paths).expect("reconcile");
        assert!(
            !paths.roster_path.exists(),
            "a converged pointer must not trigger a write"
        );
    }

    #[test]
    fn reconciliation_is_convergent_across_repeats() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let paths = paths(&tempdir);
        let mut roster = roster_of(&[(1, "a@x.com"), (2, "b@x.com")]);
        roster.active_account_number = Some(1);
        let backend = MemoryBackend::logged_out();

        reconcile_active_account(&mut roster, &backend, &paths).expect("first");
        let after_first = roster.clone();
        reconcile_active_account(&mut roster, &backend, &paths).expect("second");
        assert_eq!(roster.active_account_number, after_first.active_account_number);
        assert_eq!(roster.active_account_number, None);
    }
}
