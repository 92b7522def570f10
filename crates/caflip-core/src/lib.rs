//! Foundational low-level utilities shared across caflip crates.
//!
//! Provides atomic file-write helpers, the cross-process lock primitive, and
//! storage-key safety checks used by roster persistence and backup stores.

pub mod atomic_io;
pub mod identifiers;
pub mod lock;
pub mod time_utils;

pub use atomic_io::{write_json_atomic, write_text_atomic, write_text_atomic_with_mode};
pub use identifiers::is_safe_storage_key;
pub use lock::{acquire_lock, LockError, LockGuard, LockOptions};
pub use time_utils::current_unix_timestamp;
