//! Provider-scoped filesystem layout.
//!
//! All paths are derived from an injected home directory and carried in an
//! explicit struct; no component reads process-global mutable path state.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

const BACKUP_ROOT_DIR: &str = ".caflip-backup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Claude,
    Codex,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Claude, ProviderKind::Codex];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Codex => "codex",
        }
    }

    /// Human-facing product name.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "Claude Code",
            ProviderKind::Codex => "Codex",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "claude" => Ok(ProviderKind::Claude),
            "codex" => Ok(ProviderKind::Codex),
            other => anyhow::bail!("unknown provider '{other}' (expected claude|codex)"),
        }
    }
}

/// Filesystem locations owned by caflip for one provider.
#[derive(Debug, Clone)]
pub struct ProviderPaths {
    pub backup_dir: PathBuf,
    pub roster_path: PathBuf,
    pub lock_path: PathBuf,
    pub configs_dir: PathBuf,
    pub credentials_dir: PathBuf,
}

impl ProviderPaths {
    pub fn new(home: &Path, kind: ProviderKind) -> Self {
        let backup_dir = home.join(BACKUP_ROOT_DIR).join(kind.as_str());
        Self {
            roster_path: backup_dir.join("sequence.json"),
            lock_path: backup_dir.join(".lock"),
            configs_dir: backup_dir.join("configs"),
            credentials_dir: backup_dir.join("credentials"),
            backup_dir,
        }
    }

    /// Path of the cross-provider CLI metadata file.
    pub fn meta_path(home: &Path) -> PathBuf {
        home.join(BACKUP_ROOT_DIR).join(".meta.json")
    }

    /// Creates the backup directories with owner-only permissions.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.backup_dir, &self.configs_dir, &self.credentials_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
                    .with_context(|| format!("failed to restrict {}", dir.display()))?;
            }
        }
        Ok(())
    }
}
