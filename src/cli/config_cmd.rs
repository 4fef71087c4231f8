use std::collections::BTreeMap;

use crate::config::{load_config, TenantConfig};
use crate::error::BilinkError;

/// Merged tenant configuration with passwords masked, ordered by name.
pub fn redacted_tenants(cli_config: Option<&str>) -> Result<BTreeMap<String, TenantConfig>, BilinkError> {
    let config = load_config(cli_config)?;
    Ok(config
        .tenants
        .iter()
        .map(|(name, tenant)| (name.clone(), tenant.redacted()))
        .collect())
}

pub fn run_config_show(cli_config: Option<&str>) -> Result<(), BilinkError> {
    let tenants = redacted_tenants(cli_config)?;
    if tenants.is_empty() {
        println!("No tenants configured");
        return Ok(());
    }
    let json = serde_json::to_string_pretty(&serde_json::json!({ "tenants": tenants }))
        .map_err(|e| BilinkError::ProtocolError(format!("Failed to render config: {e}")))?;
    println!("{json}");
    Ok(())
}
