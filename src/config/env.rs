use crate::error::BilinkError;

use super::types::TenantConfig;

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - replaced with env var value, or fallback if unset or empty
/// - `$env:VAR` - same as `${VAR}`
pub fn expand_env_vars(input: &str) -> Result<String, BilinkError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(inner) = tail.strip_prefix('{') {
            let close = inner
                .find('}')
                .ok_or_else(|| env_error(format!("Unclosed variable reference: ${{{inner}")))?;
            let expr = &inner[..close];
            match expr.split_once(":-") {
                Some((name, fallback)) => match std::env::var(name) {
                    Ok(val) if !val.is_empty() => result.push_str(&val),
                    _ => result.push_str(fallback),
                },
                None => result.push_str(&required_var(expr)?),
            }
            rest = &inner[close + 1..];
        } else if let Some(after) = tail.strip_prefix("env:") {
            let len = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if len == 0 {
                return Err(env_error("Empty variable name in $env: reference".to_string()));
            }
            result.push_str(&required_var(&after[..len])?);
            rest = &after[len..];
        } else {
            // Not a recognized pattern, output the '$' literally
            result.push('$');
            rest = tail;
        }
    }
    result.push_str(rest);

    Ok(result)
}

fn required_var(name: &str) -> Result<String, BilinkError> {
    std::env::var(name)
        .map_err(|_| env_error(format!("Environment variable '{name}' is not set")))
}

/// Expand environment variables in every string field of a tenant.
pub fn expand_tenant_config(config: &mut TenantConfig) -> Result<(), BilinkError> {
    for field in [
        &mut config.auth_server,
        &mut config.app_server,
        &mut config.client_id,
        &mut config.org_code,
    ] {
        *field = expand_env_vars(field)?;
    }
    for field in [&mut config.username, &mut config.password] {
        if let Some(value) = field {
            *value = expand_env_vars(value)?;
        }
    }
    Ok(())
}

fn env_error(detail: String) -> BilinkError {
    BilinkError::ConfigError {
        path: std::path::PathBuf::from("<env>"),
        detail,
    }
}
