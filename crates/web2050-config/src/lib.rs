//! Configuration management for web2050.
//!
//! Parses `web2050.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `generator.base_url`
//! - `generator.model`
//! - `generator.api_key`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use expand::Field;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override database file path.
    pub database_path: Option<PathBuf>,
    /// Override generator model.
    pub model: Option<String>,
    /// Override generator base URL.
    pub base_url: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "web2050.toml";

/// Default designated output marker.
pub const DEFAULT_OUTPUT_TAG: &str = "_out";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration (path is a relative string from TOML).
    database: DatabaseConfigRaw,
    /// Content generator configuration.
    pub generator: GeneratorConfig,

    /// Resolved database configuration (set after loading).
    #[serde(skip)]
    pub database_resolved: DatabaseConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

/// Raw database configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DatabaseConfigRaw {
    path: Option<String>,
    max_connections: Option<u32>,
}

/// Resolved database configuration with an absolute path.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// Connection pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".web2050/pages.db"),
            max_connections: 20,
        }
    }
}

impl DatabaseConfig {
    /// `sqlx` connection URL for the database file, creating it if missing.
    #[must_use]
    pub fn url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path.display())
    }
}

/// Content generator configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer token (empty sends no `Authorization` header).
    pub api_key: String,
    /// Designated output marker name.
    pub output_tag: String,
    /// Completion token limit.
    pub max_tokens: Option<u32>,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds, including the streamed body.
    pub request_timeout_secs: u64,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            api_key: "${OPENAI_API_KEY:-}".to_owned(),
            output_tag: DEFAULT_OUTPUT_TAG.to_owned(),
            max_tokens: Some(16384),
            connect_timeout_secs: 10,
            request_timeout_secs: 600,
            system_prompt: None,
        }
    }
}

impl GeneratorConfig {
    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// A `${VAR}` reference without default names an unset variable.
    #[error("Environment variable ${{{var}}} is not set (used by {field})")]
    EnvVar {
        /// Dotted config field, e.g. `generator.api_key`.
        field: &'static str,
        /// Name of the unset variable.
        var: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `web2050.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            let mut config = Self::default_with_cwd();
            config.expand_env_vars()?;
            config
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(path) = &settings.database_path {
            self.database_resolved.path.clone_from(path);
        }
        if let Some(model) = &settings.model {
            self.generator.model.clone_from(model);
        }
        if let Some(base_url) = &settings.base_url {
            self.generator.base_url.clone_from(base_url);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let database = DatabaseConfig::default();
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfigRaw::default(),
            generator: GeneratorConfig::default(),
            database_resolved: DatabaseConfig {
                path: base.join(&database.path),
                ..database
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_database()?;
        self.validate_generator()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_database(&self) -> Result<(), ConfigError> {
        if self.database_resolved.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_generator(&self) -> Result<(), ConfigError> {
        let generator = &self.generator;
        require_non_empty(&generator.base_url, "generator.base_url")?;
        require_http_url(&generator.base_url, "generator.base_url")?;
        require_non_empty(&generator.model, "generator.model")?;
        require_non_empty(&generator.output_tag, "generator.output_tag")?;

        if generator
            .output_tag
            .chars()
            .any(|c| matches!(c, '<' | '>' | '/') || c.is_whitespace())
        {
            return Err(ConfigError::Validation(
                "generator.output_tag must be a bare tag name".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand `${VAR}` references in the string fields that accept them.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let generator = &mut self.generator;
        expand::expand_fields(
            [
                Field::new("server.host", &mut self.server.host),
                Field::new("generator.base_url", &mut generator.base_url),
                Field::new("generator.model", &mut generator.model),
                Field::new("generator.api_key", &mut generator.api_key),
            ],
            |name| std::env::var(name),
        )
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let defaults = DatabaseConfig::default();
        self.database_resolved = DatabaseConfig {
            path: self
                .database
                .path
                .as_deref()
                .map_or_else(|| config_dir.join(&defaults.path), |p| config_dir.join(p)),
            max_connections: self
                .database
                .max_connections
                .unwrap_or(defaults.max_connections),
        };
    }
}
