use thiserror::Error;

/// Error taxonomy for roster and switch operations.
///
/// `CorruptRoster` is fatal and never auto-repaired; `LockTimeout` lives in
/// `caflip_core::LockError` because the lock primitive sits below this crate.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("corrupt roster data: {reason}")]
    CorruptRoster { reason: String },
    #[error("identifier '{value}' is not safe for storage")]
    UnsafeIdentifier { value: String },
    #[error("missing backup data for {label}")]
    MissingBackup { label: String },
    #[error("alias \"{alias}\" is already in use")]
    AliasConflict { alias: String },
    #[error("invalid alias \"{alias}\": {reason}")]
    InvalidAlias { alias: String, reason: &'static str },
    #[error("account {email} is already managed")]
    DuplicateAccount { email: String },
    #[error("account not found: {token}")]
    AccountNotFound { token: String },
    #[error("target must be an email or alias, not a number: {token}")]
    NumericIdentifier { token: String },
    #[error("need at least 2 accounts to rotate (have {count})")]
    InsufficientAccounts { count: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
