//! CLI result rendering and exit code mapping.

use serde::Serialize;
use stairstep::error::Hint;
use stairstep::{report, DeployReport, Error, ErrorCode};

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl CliError {
    pub fn from_error(err: &Error) -> Self {
        Self {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: if err.hints.is_empty() {
                None
            } else {
                Some(err.hints.clone())
            },
            retryable: err.retryable,
        }
    }
}

pub fn print_success(result: &DeployReport) {
    log_status!(
        "stairstep",
        "{} is at {}{}",
        result.environment,
        result.commit,
        result
            .tag
            .as_ref()
            .map(|tag| format!(" ({})", tag))
            .unwrap_or_default()
    );
    report::info("SUCCESS!");
}

/// Error banner; with `debug`, the full error including the failed
/// command's argument vector as JSON.
pub fn print_failure(err: &Error, debug: bool) {
    report::error(&err.message);
    for hint in &err.hints {
        eprintln!("Hint: {}", hint.message);
    }

    if debug {
        match serde_json::to_string_pretty(&CliError::from_error(err)) {
            Ok(payload) => eprintln!("{}", payload),
            Err(e) => eprintln!("{:?} (could not serialize: {})", err, e),
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    code.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stairstep::executor::CommandLine;

    #[test]
    fn debug_payload_carries_argument_vector() {
        let err = Error::command_failed(&CommandLine::new(["heroku", "maintenance:on", "--remote", "staging"]));
        let value = serde_json::to_value(CliError::from_error(&err)).unwrap();

        assert_eq!(value["code"], "command.failed");
        assert_eq!(value["details"]["command"][1], "maintenance:on");
        assert!(value.get("hints").is_none());
    }

    #[test]
    fn exit_codes_follow_error_codes() {
        assert_eq!(exit_code_for_error(ErrorCode::DeployInterrupted), 130);
        assert_eq!(exit_code_for_error(ErrorCode::GitDirtyWorkingTree), 2);
    }
}
