use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::BilinkError;

use super::env::expand_tenant_config;
use super::types::{BilinkConfig, TenantConfig};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BILINK_CONFIG";

/// Strip JSONC comments (`//` line comments and `/* */` block comments).
///
/// Newlines inside comments are kept so parse errors report the right line.
pub fn strip_jsonc_comments(input: &str) -> String {
    enum State {
        Code,
        Str { escaped: bool },
        Line,
        Block { star: bool },
    }

    let mut out = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        state = match state {
            State::Code => match (ch, chars.peek()) {
                ('"', _) => {
                    out.push(ch);
                    State::Str { escaped: false }
                }
                ('/', Some(&'/')) => {
                    chars.next();
                    State::Line
                }
                ('/', Some(&'*')) => {
                    chars.next();
                    State::Block { star: false }
                }
                _ => {
                    out.push(ch);
                    State::Code
                }
            },
            State::Str { escaped } => {
                out.push(ch);
                match ch {
                    _ if escaped => State::Str { escaped: false },
                    '\\' => State::Str { escaped: true },
                    '"' => State::Code,
                    _ => State::Str { escaped: false },
                }
            }
            State::Line => {
                if ch == '\n' {
                    out.push('\n');
                    State::Code
                } else {
                    State::Line
                }
            }
            State::Block { star } => {
                if ch == '\n' {
                    out.push('\n');
                }
                match ch {
                    '/' if star => State::Code,
                    '*' => State::Block { star: true },
                    _ => State::Block { star: false },
                }
            }
        };
    }

    out
}

/// Discover config files in precedence order (highest first).
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `BILINK_CONFIG` env var
/// 3. `./config/bilink.json` (project-level)
/// 4. `~/.bilink/bilink.json` or `~/.bilink/bilink.jsonc` (home-level)
pub fn discover_config_files(cli_config: Option<&str>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Some(path) = cli_config {
        candidates.push(PathBuf::from(path));
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        candidates.push(PathBuf::from(env_path));
    }
    candidates.push(PathBuf::from("./config/bilink.json"));
    if let Some(home) = dirs::home_dir() {
        let home_json = home.join(".bilink").join("bilink.json");
        if home_json.exists() {
            candidates.push(home_json);
        } else {
            candidates.push(home.join(".bilink").join("bilink.jsonc"));
        }
    }

    let mut files = Vec::new();
    for path in candidates {
        if path.exists() && !files.contains(&path) {
            files.push(path);
        }
    }
    files
}

/// Load a single config file, stripping JSONC comments before parsing.
fn load_config_file(path: &Path) -> Result<BilinkConfig, BilinkError> {
    let content = std::fs::read_to_string(path).map_err(|e| BilinkError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {e}"),
    })?;

    let stripped = strip_jsonc_comments(&content);
    serde_json::from_str::<BilinkConfig>(&stripped).map_err(|e| BilinkError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Invalid JSON: {e}"),
    })
}

/// Tenants already present in `target` are NOT overridden (earlier sources win).
fn merge_tenants(target: &mut HashMap<String, TenantConfig>, source: HashMap<String, TenantConfig>) {
    for (name, config) in source {
        target.entry(name).or_insert(config);
    }
}

/// Load, merge, and expand all configuration.
///
/// A `--config` path that does not exist is an error rather than silently
/// falling through to lower-precedence files.
pub fn load_config(cli_config: Option<&str>) -> Result<BilinkConfig, BilinkError> {
    if let Some(path) = cli_config {
        if !Path::new(path).exists() {
            return Err(BilinkError::ConfigError {
                path: PathBuf::from(path),
                detail: "File does not exist".to_string(),
            });
        }
    }

    let mut tenants: HashMap<String, TenantConfig> = HashMap::new();
    for path in discover_config_files(cli_config) {
        tracing::debug!(path = %path.display(), "loading config file");
        let cfg = load_config_file(&path)?;
        merge_tenants(&mut tenants, cfg.tenants);
    }

    for (name, config) in &mut tenants {
        expand_tenant_config(config).map_err(|e| match e {
            BilinkError::ConfigError { detail, .. } => BilinkError::ConfigError {
                path: PathBuf::from(format!("<tenant {name}>")),
                detail,
            },
            other => other,
        })?;
    }

    Ok(BilinkConfig { tenants })
}
