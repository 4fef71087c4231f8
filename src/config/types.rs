use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BilinkError;
use crate::transport::DEFAULT_TIMEOUT;

/// Connection settings for one tenant. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub auth_server: String,
    pub app_server: String,
    pub client_id: String,
    pub org_code: String,
}

impl ClientConfig {
    /// Validate and normalize. All fields must be non-empty; both servers
    /// must be `http(s)` URLs. Trailing slashes are stripped here, once.
    pub fn new(
        auth_server: impl Into<String>,
        app_server: impl Into<String>,
        client_id: impl Into<String>,
        org_code: impl Into<String>,
    ) -> Result<Self, BilinkError> {
        let auth_server = normalize_url("authServer", auth_server.into())?;
        let app_server = normalize_url("appServer", app_server.into())?;
        let client_id = required("clientId", client_id.into())?;
        let org_code = required("orgCode", org_code.into())?;
        Ok(Self {
            auth_server,
            app_server,
            client_id,
            org_code,
        })
    }
}

fn required(field: &str, value: String) -> Result<String, BilinkError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(client_config_error(format!("'{field}' must not be empty")));
    }
    Ok(value)
}

fn normalize_url(field: &str, value: String) -> Result<String, BilinkError> {
    let value = required(field, value)?.trim_end_matches('/').to_string();
    let url = url::Url::parse(&value)
        .map_err(|e| client_config_error(format!("'{field}' is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(value),
        scheme => Err(client_config_error(format!(
            "'{field}' uses unsupported scheme '{scheme}'"
        ))),
    }
}

fn client_config_error(detail: String) -> BilinkError {
    BilinkError::ConfigError {
        path: PathBuf::from("<client>"),
        detail,
    }
}

/// Username/password pair used only by the sign-in step.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BilinkConfig {
    #[serde(default)]
    pub tenants: HashMap<String, TenantConfig>,
}

/// One tenant entry in `bilink.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    #[serde(default)]
    pub auth_server: String,
    #[serde(default)]
    pub app_server: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub org_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl TenantConfig {
    pub fn client_config(&self) -> Result<ClientConfig, BilinkError> {
        ClientConfig::new(
            self.auth_server.clone(),
            self.app_server.clone(),
            self.client_id.clone(),
            self.org_code.clone(),
        )
    }

    /// Possibly incomplete; sign-in rejects missing fields itself.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.username.clone().unwrap_or_default(),
            self.password.clone().unwrap_or_default(),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Copy suitable for display: the password is masked.
    pub fn redacted(&self) -> TenantConfig {
        TenantConfig {
            password: self.password.as_ref().map(|_| "********".to_string()),
            ..self.clone()
        }
    }
}

impl BilinkConfig {
    /// Pick the tenant named `name`, or the only configured tenant.
    pub fn select_tenant(&self, name: Option<&str>) -> Result<(&str, &TenantConfig), BilinkError> {
        let selection_error = |detail: String| BilinkError::ConfigError {
            path: PathBuf::from("<config>"),
            detail,
        };

        match name {
            Some(name) => self
                .tenants
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| {
                    selection_error(format!(
                        "Tenant '{name}' not found. Available: {}",
                        self.tenant_names().join(", ")
                    ))
                }),
            None => {
                let mut tenants = self.tenants.iter();
                match (tenants.next(), tenants.next()) {
                    (Some((k, v)), None) => Ok((k.as_str(), v)),
                    (None, _) => Err(selection_error("No tenants configured".to_string())),
                    _ => Err(selection_error(format!(
                        "Several tenants configured, pick one with --tenant: {}",
                        self.tenant_names().join(", ")
                    ))),
                }
            }
        }
    }

    pub fn tenant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tenants.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
