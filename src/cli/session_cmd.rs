use crate::error::BilinkError;
use crate::oauth::{cache_path, clear_token, load_cached_token, save_token, TokenSet};

use super::TenantContext;

/// Sign in with the configured credentials and store the new token set.
pub async fn run_login(ctx: &TenantContext) -> Result<TokenSet, BilinkError> {
    let (oauth, _) = crate::connect(&ctx.config.client_config()?, ctx.config.timeout())?;
    let tokens = oauth.bootstrap(&ctx.config.credentials()).await?;
    save_token(&ctx.name, &tokens)?;
    Ok(tokens)
}

/// Refresh the stored token set. Never falls back to a credential login.
pub async fn run_refresh(ctx: &TenantContext) -> Result<TokenSet, BilinkError> {
    let current = load_cached_token(&ctx.name).ok_or_else(|| BilinkError::ConfigError {
        path: cache_path(&ctx.name),
        detail: format!("No stored session for '{}'. Run: bilink login", ctx.name),
    })?;
    let (oauth, _) = crate::connect(&ctx.config.client_config()?, ctx.config.timeout())?;
    let tokens = oauth.refresh(&current.refresh_token).await?;
    save_token(&ctx.name, &tokens)?;
    Ok(tokens)
}

pub fn run_logout(ctx: &TenantContext) -> Result<bool, BilinkError> {
    clear_token(&ctx.name)
}
