//! Cross-provider CLI metadata.
//!
//! A single JSON document above the per-provider directories remembering the
//! provider the user last addressed; it only shapes guidance text, so a
//! missing or malformed file falls back to the default instead of erroring.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use caflip_core::write_json_atomic;
use caflip_provider::{ProviderKind, ProviderPaths};

const DEFAULT_PROVIDER: ProviderKind = ProviderKind::Claude;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaDocument {
    last_provider: String,
}

pub fn read_last_provider(home: &Path) -> ProviderKind {
    let path = ProviderPaths::meta_path(home);
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return DEFAULT_PROVIDER;
    };
    serde_json::from_str::<MetaDocument>(&raw)
        .ok()
        .and_then(|doc| doc.last_provider.parse().ok())
        .unwrap_or(DEFAULT_PROVIDER)
}

pub fn write_last_provider(home: &Path, kind: ProviderKind) -> Result<()> {
    let path = ProviderPaths::meta_path(home);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                .with_context(|| format!("failed to restrict {}", parent.display()))?;
        }
    }
    write_json_atomic(
        &path,
        &MetaDocument {
            last_provider: kind.to_string(),
        },
    )
}
