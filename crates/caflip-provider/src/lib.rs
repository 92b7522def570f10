//! Identity-provider backends and provider-scoped path configuration.
//!
//! Each provider (Claude Code, Codex) owns an OS-level active-credential
//! store and a directory of per-account backups. The `AccountBackend` trait
//! is the capability interface the switch protocol runs against; everything
//! provider-specific stays behind it.

pub mod backend;
pub mod claude;
pub mod codex;
pub mod paths;

pub use backend::{AccountBackend, CurrentIdentity};
pub use claude::ClaudeBackend;
pub use codex::CodexBackend;
pub use paths::{ProviderKind, ProviderPaths};

use std::path::Path;

/// Constructs the backend for `kind` rooted at `home`.
pub fn backend_for(kind: ProviderKind, home: &Path) -> Box<dyn AccountBackend> {
    match kind {
        ProviderKind::Claude => Box::new(ClaudeBackend::new(home)),
        ProviderKind::Codex => Box::new(CodexBackend::new(home)),
    }
}
