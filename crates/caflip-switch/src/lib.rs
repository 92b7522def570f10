//! The account switch protocol and active-account reconciliation.
//!
//! Ordering is the whole point: the current login is copied out before
//! anything about the target is written, so an interruption at any step
//! leaves the user either still logged in as before or fully switched, never
//! half-restored. The roster is a cache of derived state; reconciliation
//! re-derives it from the provider whenever a read path depends on it.

mod protocol;
mod reconcile;

pub use protocol::{execute_post_removal, logout, perform_switch, SwitchOutcome};
pub use reconcile::reconcile_active_account;

#[cfg(test)]
pub(crate) mod testing;
