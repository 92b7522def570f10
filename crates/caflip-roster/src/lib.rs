//! Roster data model, persistence, and lifecycle operations.
//!
//! A roster is the persisted set of managed accounts for one identity
//! provider: rotation order, per-account metadata, and the pointer to the
//! account currently believed to be logged in. This crate owns the document
//! schema, its invariants, and the pure operations over it; credential
//! movement lives in `caflip-switch`.

pub mod error;
pub mod lifecycle;
pub mod model;
pub mod resolve;
pub mod store;
pub mod validation;

pub use error::RosterError;
pub use lifecycle::{add, next_in_sequence, remove, set_alias, AddOutcome, NewAccount, PostRemovalAction};
pub use model::{Account, Roster};
pub use resolve::{display_label, find_account_by_alias, resolve, resolve_email, resolve_user_identifier};
pub use store::{initialize, load, persist};
pub use validation::{ensure_safe_email, validate_alias, RESERVED_COMMANDS};
