pub mod config_cmd;
pub mod output;
pub mod query;
pub mod session_cmd;

use crate::config::{load_config, TenantConfig};
use crate::error::BilinkError;

/// The tenant a command operates on.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub name: String,
    pub config: TenantConfig,
}

impl TenantContext {
    pub fn load(cli_config: Option<&str>, tenant: Option<&str>) -> Result<Self, BilinkError> {
        let config = load_config(cli_config)?;
        let (name, tenant_config) = config.select_tenant(tenant)?;
        Ok(Self {
            name: name.to_string(),
            config: tenant_config.clone(),
        })
    }
}
