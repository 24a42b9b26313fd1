use std::env;
use std::fs;
use std::path::Path;

use mainline_core::config::{
    resolve_config_path, AppConfig, LoadOptions, ENV_BIND_ADDRESS, ENV_GRACEFUL_SHUTDOWN_SECS,
    ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_MAX_BODY_BYTES, ENV_PORT,
};
use toml::Value;

use crate::commands::CommandResult;

struct ConfigField<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult {
                exit_code: 1,
                output: format!("config validation failed: {error}"),
            };
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let port = config.server.port.to_string();
    let graceful_shutdown_secs = config.server.graceful_shutdown_secs.to_string();
    let max_body_bytes = config.server.max_body_bytes.to_string();
    let log_format = format!("{:?}", config.logging.format).to_ascii_lowercase();

    let fields = [
        ConfigField {
            key_path: "server.bind_address",
            env_keys: ENV_BIND_ADDRESS,
            value: &config.server.bind_address,
        },
        ConfigField { key_path: "server.port", env_keys: ENV_PORT, value: &port },
        ConfigField {
            key_path: "server.graceful_shutdown_secs",
            env_keys: ENV_GRACEFUL_SHUTDOWN_SECS,
            value: &graceful_shutdown_secs,
        },
        ConfigField {
            key_path: "server.max_body_bytes",
            env_keys: ENV_MAX_BODY_BYTES,
            value: &max_body_bytes,
        },
        ConfigField {
            key_path: "logging.level",
            env_keys: ENV_LOG_LEVEL,
            value: &config.logging.level,
        },
        ConfigField {
            key_path: "logging.format",
            env_keys: ENV_LOG_FORMAT,
            value: &log_format,
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let set_env_key = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = set_env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
