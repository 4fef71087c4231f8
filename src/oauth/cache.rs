//! On-disk token storage used by the `bilink` binary. The library itself never
//! persists tokens; this is the CLI acting as the caller.

use std::path::{Path, PathBuf};

use crate::error::BilinkError;
use crate::oauth::token::TokenSet;

/// Overrides the `~/.bilink` state directory.
pub const HOME_ENV: &str = "BILINK_HOME";

pub fn state_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bilink")
}

/// Token files below one state directory, one `<tenant>/tokens.json` each.
#[derive(Debug, Clone)]
pub struct TokenStore {
    root: PathBuf,
}

impl TokenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store under [`state_dir`].
    pub fn from_env() -> Self {
        Self::new(state_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, tenant: &str) -> PathBuf {
        self.root.join(tenant).join("tokens.json")
    }

    pub fn load(&self, tenant: &str) -> Option<TokenSet> {
        let path = self.path(tenant);
        let data = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable token cache: {e}");
                None
            }
        }
    }

    pub fn save(&self, tenant: &str, tokens: &TokenSet) -> Result<(), BilinkError> {
        let path = self.path(tenant);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(tokens).map_err(|e| {
            BilinkError::ProtocolError(format!("Failed to serialize token set: {e}"))
        })?;
        std::fs::write(&path, data)?;
        restrict_permissions(&path)?;
        tracing::debug!(path = %path.display(), "token set saved");
        Ok(())
    }

    /// Remove the cached token set. Returns whether a file was deleted.
    pub fn clear(&self, tenant: &str) -> Result<bool, BilinkError> {
        match std::fs::remove_file(self.path(tenant)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn cache_path(tenant: &str) -> PathBuf {
    TokenStore::from_env().path(tenant)
}

pub fn load_cached_token(tenant: &str) -> Option<TokenSet> {
    TokenStore::from_env().load(tenant)
}

pub fn save_token(tenant: &str, tokens: &TokenSet) -> Result<(), BilinkError> {
    TokenStore::from_env().save(tenant, tokens)
}

pub fn clear_token(tenant: &str) -> Result<bool, BilinkError> {
    TokenStore::from_env().clear(tenant)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
