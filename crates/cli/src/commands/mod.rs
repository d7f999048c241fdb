pub mod config;
pub mod doctor;
pub mod seed;
pub mod smoke;

use serde::Serialize;

/// Exit code plus the text printed to stdout.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: Option<&'a str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload =
            CommandOutcome { command, status: "ok", error_class: None, message: message.into() };
        Self { exit_code: 0, output: to_json(&payload, command) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            message: message.into(),
        };
        Self { exit_code, output: to_json(&payload, command) }
    }
}

/// Single-line JSON, or a hand-built error object if serialization fails.
pub(crate) fn to_json<T: Serialize>(payload: &T, command: &str) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| serialization_failure(command, &error))
}

pub(crate) fn serialization_failure(command: &str, error: &serde_json::Error) -> String {
    format!(
        "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
        escape_json(command),
        escape_json(&error.to_string())
    )
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::{escape_json, CommandResult};

    #[test]
    fn failure_envelope_carries_error_class_and_exit_code() {
        let result = CommandResult::failure("seed", "config_validation", "bad \"seed\"", 2);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 2);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert_eq!(payload["message"], "bad \"seed\"");
    }

    #[test]
    fn success_envelope_has_null_error_class() {
        let result = CommandResult::success("seed", "done");
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert!(payload["error_class"].is_null());
    }

    #[test]
    fn escaping_keeps_fallback_json_parseable() {
        let fallback = format!("{{\"message\":\"{}\"}}", escape_json(r#"a "quoted" \ path"#));
        let payload: Value = serde_json::from_str(&fallback).expect("json");
        assert_eq!(payload["message"], r#"a "quoted" \ path"#);
    }
}
