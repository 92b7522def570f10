//! On-disk roster schema and invariant checks.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RosterError;

/// One managed identity. The account id is the map key in [`Roster`], not a
/// field here; `uuid` is an opaque provider-issued identifier and may be
/// empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub uuid: String,
    pub added: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// The persisted aggregate for one identity provider.
///
/// `sequence` defines rotation order (insertion order, never sorted).
/// `active_account_number` is a cache of "who is logged in" — reconciliation
/// re-derives it from the provider, so a non-null value absent from
/// `accounts` is drift to heal, not corruption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub active_account_number: Option<u64>,
    pub last_updated: DateTime<Utc>,
    pub sequence: Vec<u64>,
    pub accounts: BTreeMap<u64, Account>,
    /// High-water mark for id assignment. Ids are never reused after removal,
    /// even when the removed id was the highest: a stale backup keyed by an
    /// old id must not silently alias onto a new account. Absent (zero) in
    /// documents written before this field existed.
    #[serde(default, skip_serializing_if = "next_is_unset")]
    pub next_account_number: u64,
}

fn next_is_unset(value: &u64) -> bool {
    *value == 0
}

impl Roster {
    pub fn empty() -> Self {
        Self {
            active_account_number: None,
            last_updated: Utc::now(),
            sequence: Vec::new(),
            accounts: BTreeMap::new(),
            next_account_number: 0,
        }
    }

    /// The next id to assign: strictly greater than every id ever used.
    pub fn next_id(&self) -> u64 {
        let highest = self.accounts.keys().max().copied().unwrap_or(0);
        self.next_account_number.max(highest + 1)
    }

    pub fn email_exists(&self, email: &str) -> bool {
        self.accounts.values().any(|account| account.email == email)
    }

    /// Checks the document's structural invariants (sequence/accounts
    /// correspondence, unique emails and aliases, id monotonicity); called on
    /// load and before every persist.
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut seen = BTreeSet::new();
        for id in &self.sequence {
            if !seen.insert(*id) {
                return Err(corrupt(format!("duplicate id {id} in sequence")));
            }
            if !self.accounts.contains_key(id) {
                return Err(corrupt(format!(
                    "sequence references missing account entry for id {id}"
                )));
            }
        }
        for id in self.accounts.keys() {
            if *id == 0 {
                return Err(corrupt("account id 0 is not a valid id".to_string()));
            }
            if !seen.contains(id) {
                return Err(corrupt(format!("account {id} is absent from sequence")));
            }
        }

        let mut emails = BTreeSet::new();
        let mut aliases = BTreeSet::new();
        for (id, account) in &self.accounts {
            if !emails.insert(account.email.as_str()) {
                return Err(corrupt(format!(
                    "email {} appears on more than one account",
                    account.email
                )));
            }
            if let Some(alias) = account.alias.as_deref() {
                if alias.is_empty() {
                    return Err(corrupt(format!("account {id} has an empty alias")));
                }
                if !aliases.insert(alias) {
                    return Err(corrupt(format!(
                        "alias \"{alias}\" appears on more than one account"
                    )));
                }
            }
        }

        if self.next_account_number != 0 {
            if let Some(highest) = self.accounts.keys().max() {
                if self.next_account_number <= *highest {
                    return Err(corrupt(format!(
                        "nextAccountNumber {} is not greater than highest id {}",
                        self.next_account_number, highest
                    )));
                }
            }
        }

        Ok(())
    }
}

fn corrupt(reason: String) -> RosterError {
    RosterError::CorruptRoster { reason }
}
