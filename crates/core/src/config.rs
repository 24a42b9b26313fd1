use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "mainline.toml";

/// Environment variables per key, in lookup order.
pub const ENV_BIND_ADDRESS: &[&str] = &["MAINLINE_SERVER_BIND_ADDRESS"];
pub const ENV_PORT: &[&str] = &["MAINLINE_SERVER_PORT"];
pub const ENV_GRACEFUL_SHUTDOWN_SECS: &[&str] = &["MAINLINE_SERVER_GRACEFUL_SHUTDOWN_SECS"];
pub const ENV_MAX_BODY_BYTES: &[&str] = &["MAINLINE_SERVER_MAX_BODY_BYTES"];
pub const ENV_LOG_LEVEL: &[&str] = &["MAINLINE_LOGGING_LEVEL", "MAINLINE_LOG_LEVEL"];
pub const ENV_LOG_FORMAT: &[&str] = &["MAINLINE_LOGGING_FORMAT", "MAINLINE_LOG_FORMAT"];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern compiles"));

/// Process configuration. Keys absent from the config file keep their defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Upper bound on draining in-flight requests after a shutdown signal.
    pub graceful_shutdown_secs: u64,
    /// Request bodies above this size are answered with 413.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            graceful_shutdown_secs: 15,
            max_body_bytes: 256 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// Values set programmatically; they win over every other source.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl AppConfig {
    /// Layers defaults, the config file, `MAINLINE_*` variables and
    /// `options.overrides`, later sources winning, then validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => read_file(&path)?,
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(bind_address) = env_override(ENV_BIND_ADDRESS)? {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = env_override(ENV_PORT)? {
            self.server.port = port;
        }
        if let Some(secs) = env_override(ENV_GRACEFUL_SHUTDOWN_SECS)? {
            self.server.graceful_shutdown_secs = secs;
        }
        if let Some(limit) = env_override(ENV_MAX_BODY_BYTES)? {
            self.server.max_body_bytes = limit;
        }
        if let Some(level) = env_override(ENV_LOG_LEVEL)? {
            self.logging.level = level;
        }
        if let Some(format) = env_override(ENV_LOG_FORMAT)? {
            self.logging.format = format;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides { bind_address, port, log_level, log_format } = overrides;
        if let Some(bind_address) = bind_address {
            self.server.bind_address = bind_address;
        }
        self.server.port = port.unwrap_or(self.server.port);
        if let Some(level) = log_level {
            self.logging.level = level;
        }
        self.logging.format = log_format.unwrap_or(self.logging.format);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.bind_address must not be empty".to_string(),
            ));
        }

        let positive = [
            ("server.port", self.server.port == 0),
            ("server.graceful_shutdown_secs", self.server.graceful_shutdown_secs == 0),
            ("server.max_body_bytes", self.server.max_body_bytes == 0),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join("|")
            )));
        }

        Ok(())
    }
}

/// Config file lookup: an explicit path when it exists, otherwise
/// `mainline.toml` then `config/mainline.toml` in the working directory.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), Path::new("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces each `${VAR}` with the variable's value. Every referenced variable
/// must be set, and a trailing `${` without its `}` is rejected.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut copied_up_to = 0;

    for placeholder in PLACEHOLDER.captures_iter(input) {
        let (Some(whole), Some(name)) = (placeholder.get(0), placeholder.get(1)) else {
            continue;
        };
        let value = env::var(name.as_str())
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: name.as_str().to_string() })?;
        output.push_str(&input[copied_up_to..whole.start()]);
        output.push_str(&value);
        copied_up_to = whole.end();
    }

    let rest = &input[copied_up_to..];
    if rest.contains("${") {
        return Err(ConfigError::UnterminatedInterpolation);
    }
    output.push_str(rest);
    Ok(output)
}

/// Parses the first non-blank variable among `keys`. Later keys are aliases.
fn env_override<T: FromStr>(keys: &[&str]) -> Result<Option<T>, ConfigError> {
    let set = keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    });
    let Some((key, value)) = set else {
        return Ok(None);
    };

    let parsed = value.trim().parse();
    parsed.map(Some).map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value })
}
