use std::env;
use std::fs;
use std::path::Path;

use bloodlink_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let sources = Sources {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path.as_deref(),
    };

    let fields: [(&str, String, &[&str]); 7] = [
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["BLOODLINK_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["BLOODLINK_SERVER_PORT", "PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["BLOODLINK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "cors.frontend_url",
            config.cors.frontend_url.clone(),
            &["BLOODLINK_CORS_FRONTEND_URL", "FRONTEND_URL"],
        ),
        ("inventory.seed", format!("{:?}", config.inventory.seed), &["BLOODLINK_INVENTORY_SEED"]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["BLOODLINK_LOGGING_LEVEL", "BLOODLINK_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["BLOODLINK_LOGGING_FORMAT", "BLOODLINK_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|(key, value, env_keys)| {
        render_line(key, value, sources.field_source(key, env_keys))
    }));

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

struct Sources<'a> {
    doc: Option<Value>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        let from_env = env_keys
            .iter()
            .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
        if let Some(env_key) = from_env {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
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
