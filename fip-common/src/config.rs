//! Configuration loading and resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The three upstream URLs have no compiled default; a service without them
//! cannot do anything useful, so resolution fails with a `Config` error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const FIP_API_ENV: &str = "FIP_API";
pub const WIKI_API_ENV: &str = "WIKI_API";
pub const DBPEDIA_SPARQL_ENV: &str = "DBPEDIA_SPARQL";
pub const ENVIRONMENT_ENV: &str = "FIP_CONTEXT_ENV";
pub const PORT_ENV: &str = "FIP_CONTEXT_PORT";
pub const DATABASE_ENV: &str = "FIP_CONTEXT_DB";
pub const FAN_OUT_LIMIT_ENV: &str = "FIP_CONTEXT_FAN_OUT_LIMIT";

pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_PORT: u16 = 8080;

const APP_DIR: &str = "fip-context";

/// Settings read from the optional TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub fip_api: Option<String>,
    pub wiki_api: Option<String>,
    pub dbpedia_sparql: Option<String>,
    pub env: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub fan_out_limit: Option<usize>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub fip_api: Option<String>,
    pub wiki_api: Option<String>,
    pub dbpedia_sparql: Option<String>,
    pub environment: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub fan_out_limit: Option<usize>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the FIP live API
    pub fip_api_url: String,
    /// Wikipedia `api.php` endpoint
    pub wiki_api_url: String,
    /// DBpedia SPARQL endpoint
    pub dbpedia_sparql_url: String,
    /// Deployment environment ("development", "production", ...)
    pub environment: String,
    /// Set when no environment was configured and the default was used
    pub environment_defaulted: bool,
    pub port: u16,
    pub database_path: PathBuf,
    /// Maximum in-flight requests per fan-out stage (None = unbounded)
    pub fan_out_limit: Option<usize>,
    pub log_level: String,
}

impl ServiceConfig {
    /// Resolve configuration from CLI overrides, environment and TOML
    pub fn resolve(overrides: &ConfigOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let fip_api_url = resolve_required(
            overrides.fip_api.as_deref(),
            FIP_API_ENV,
            toml_config.fip_api.as_deref(),
        )?;
        let wiki_api_url = resolve_required(
            overrides.wiki_api.as_deref(),
            WIKI_API_ENV,
            toml_config.wiki_api.as_deref(),
        )?;
        let dbpedia_sparql_url = resolve_required(
            overrides.dbpedia_sparql.as_deref(),
            DBPEDIA_SPARQL_ENV,
            toml_config.dbpedia_sparql.as_deref(),
        )?;

        let environment = resolve_optional(
            overrides.environment.clone(),
            ENVIRONMENT_ENV,
            toml_config.env.clone(),
        )?
        .filter(|env| !env.trim().is_empty());
        let environment_defaulted = environment.is_none();
        let environment = environment.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let port = resolve_optional(overrides.port, PORT_ENV, toml_config.port)?
            .unwrap_or(DEFAULT_PORT);

        let database_path = resolve_optional(
            overrides.database_path.clone(),
            DATABASE_ENV,
            toml_config.database_path.clone(),
        )?
        .unwrap_or_else(default_database_path);

        let fan_out_limit = resolve_optional(
            overrides.fan_out_limit,
            FAN_OUT_LIMIT_ENV,
            toml_config.fan_out_limit,
        )?;
        if fan_out_limit == Some(0) {
            return Err(Error::Config(format!(
                "{} must be at least 1",
                FAN_OUT_LIMIT_ENV
            )));
        }

        Ok(Self {
            fip_api_url,
            wiki_api_url,
            dbpedia_sparql_url,
            environment,
            environment_defaulted,
            port,
            database_path,
            fan_out_limit,
            log_level: toml_config.logging.level.clone(),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == DEFAULT_ENVIRONMENT
    }

    /// Default tracing filter used when `RUST_LOG` is not set
    pub fn default_log_filter(&self) -> String {
        if self.is_development() {
            "fip_context=debug,fip_common=debug,tower_http=debug".to_string()
        } else {
            format!(
                "fip_context={level},fip_common={level},tower_http=info",
                level = self.log_level
            )
        }
    }
}

/// Resolve a setting that must be present and non-empty
fn resolve_required(cli_arg: Option<&str>, env_var_name: &str, toml_value: Option<&str>) -> Result<String> {
    // Priority 1: Command-line argument
    if let Some(value) = cli_arg {
        return non_empty(value, env_var_name);
    }

    // Priority 2: Environment variable
    if let Ok(value) = std::env::var(env_var_name) {
        return non_empty(&value, env_var_name);
    }

    // Priority 3: TOML config file
    if let Some(value) = toml_value {
        return non_empty(value, env_var_name);
    }

    Err(Error::Config(format!("{} is not set", env_var_name)))
}

fn non_empty(value: &str, name: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::Config(format!("{} is empty", name)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Resolve an optional setting, parsing the environment variable when used
fn resolve_optional<T>(cli_arg: Option<T>, env_var_name: &str, toml_value: Option<T>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if cli_arg.is_some() {
        return Ok(cli_arg);
    }

    if let Ok(raw) = std::env::var(env_var_name) {
        let parsed = raw.trim().parse::<T>().map_err(|e| {
            Error::Config(format!("{} has an invalid value '{}': {}", env_var_name, raw, e))
        })?;
        return Ok(Some(parsed));
    }

    Ok(toml_value)
}

/// Load the TOML config file
///
/// An explicitly requested file must exist. The default location
/// (`<config dir>/fip-context/config.toml`) is optional.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join("fip-context.db"))
        .unwrap_or_else(|| PathBuf::from("./fip-context.db"))
}
