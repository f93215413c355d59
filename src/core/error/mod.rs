use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::executor::CommandLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidYaml,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    PlatformAppUnreachable,
    PlatformPipelineNotFound,
    PlatformInvalidResponse,

    GitDirtyWorkingTree,

    PromoteUnknownSource,

    DeployVerificationFailed,
    DeployInterrupted,

    CommandFailed,
    CommandSpawnFailed,

    InternalIoError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::PlatformAppUnreachable => "platform.app_unreachable",
            ErrorCode::PlatformPipelineNotFound => "platform.pipeline_not_found",
            ErrorCode::PlatformInvalidResponse => "platform.invalid_response",

            ErrorCode::GitDirtyWorkingTree => "git.dirty_working_tree",

            ErrorCode::PromoteUnknownSource => "promote.unknown_source",

            ErrorCode::DeployVerificationFailed => "deploy.verification_failed",
            ErrorCode::DeployInterrupted => "deploy.interrupted",

            ErrorCode::CommandFailed => "command.failed",
            ErrorCode::CommandSpawnFailed => "command.spawn_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    /// Process exit status reported by the CLI for this code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::ConfigInvalidYaml
            | ErrorCode::ConfigInvalidValue
            | ErrorCode::ValidationInvalidArgument
            | ErrorCode::PromoteUnknownSource
            | ErrorCode::GitDirtyWorkingTree
            | ErrorCode::DeployVerificationFailed => 2,

            ErrorCode::PlatformAppUnreachable | ErrorCode::PlatformPipelineNotFound => 4,

            ErrorCode::CommandFailed
            | ErrorCode::CommandSpawnFailed
            | ErrorCode::PlatformInvalidResponse => 20,

            ErrorCode::DeployInterrupted => 130,

            ErrorCode::InternalIoError | ErrorCode::InternalUnexpected => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

impl CommandFailedDetails {
    fn from_command(command: &CommandLine) -> Self {
        Self {
            command: command.words.clone(),
            env: command
                .env
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidYamlDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDetails {
    pub environment: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDetails {
    pub step: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirtyWorkingTreeDetails {
    pub changed: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn command_failed(command: &CommandLine) -> Self {
        Self::new(
            ErrorCode::CommandFailed,
            format!("Command failed: `{}`", command.display()),
            to_details(CommandFailedDetails::from_command(command)),
        )
    }

    pub fn command_spawn_failed(command: &CommandLine, err: &std::io::Error) -> Self {
        let mut details = to_details(CommandFailedDetails::from_command(command));
        if let Value::Object(map) = &mut details {
            map.insert("error".to_string(), Value::String(err.to_string()));
        }
        Self::new(
            ErrorCode::CommandSpawnFailed,
            format!("Could not start `{}`: {}", command.display(), err),
            details,
        )
    }

    pub fn interrupted(command: &CommandLine) -> Self {
        Self::new(
            ErrorCode::DeployInterrupted,
            format!("Interrupted while running `{}`", command.display()),
            to_details(CommandFailedDetails::from_command(command)),
        )
        .with_hint("Check the platform for partially applied changes before retrying")
    }

    /// Interrupt outside any command, such as during a prompt.
    pub fn interrupted_while(step: impl Into<String>) -> Self {
        let step = step.into();
        Self::new(
            ErrorCode::DeployInterrupted,
            format!("Interrupted while {}", step),
            to_details(StepDetails { step }),
        )
    }

    pub fn app_unreachable(environment: impl Into<String>) -> Self {
        let environment = environment.into();
        Self::new(
            ErrorCode::PlatformAppUnreachable,
            format!(
                "Cannot access Heroku application at remote '{}'",
                environment
            ),
            to_details(EnvironmentDetails {
                environment: environment.clone(),
            }),
        )
        .with_hint(format!(
            "Check that the git remote '{}' exists and you have access to its app",
            environment
        ))
    }

    pub fn pipeline_not_found(pipeline: impl Into<String>) -> Self {
        let pipeline = pipeline.into();
        Self::new(
            ErrorCode::PlatformPipelineNotFound,
            format!("Unknown Heroku pipeline '{}'", pipeline),
            serde_json::json!({ "pipeline": pipeline }),
        )
        .with_hint("Set `pipeline` in config/stairstep.yml if it differs from the repository name")
    }

    pub fn invalid_response(context: impl Into<String>, problem: impl Into<String>) -> Self {
        let context = context.into();
        Self::new(
            ErrorCode::PlatformInvalidResponse,
            format!("Unexpected response from `{}`", context),
            serde_json::json!({ "context": context, "problem": problem.into() }),
        )
    }

    pub fn dirty_working_tree(changed: Vec<String>) -> Self {
        Self::new(
            ErrorCode::GitDirtyWorkingTree,
            format!(
                "Working directory has uncommitted changes:\n{}",
                changed.join("\n")
            ),
            to_details(DirtyWorkingTreeDetails { changed }),
        )
        .with_hint("Commit or stash your changes before deploying")
    }

    pub fn unknown_source_environment(target: impl Into<String>) -> Self {
        let target = target.into();
        Self::new(
            ErrorCode::PromoteUnknownSource,
            "Unknown remote to promote from",
            to_details(EnvironmentDetails {
                environment: target.clone(),
            }),
        )
        .with_hint(format!(
            "Pass --from <environment> to choose what to promote to '{}'",
            target
        ))
    }

    pub fn verification_failed(environment: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::DeployVerificationFailed,
            "Verification failed",
            to_details(EnvironmentDetails {
                environment: environment.into(),
            }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
            }),
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in configuration",
            to_details(ConfigInvalidYamlDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// The failed command's argument vector, when this error came from the command port.
    pub fn command_words(&self) -> Option<Vec<String>> {
        match self.code {
            ErrorCode::CommandFailed
            | ErrorCode::CommandSpawnFailed
            | ErrorCode::DeployInterrupted => self
                .details
                .get("command")
                .and_then(|v| serde_json::from_value(v.clone()).ok()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_carries_argument_vector() {
        let command = CommandLine::new(["git", "push", "staging", "refs/stairstep/staging:main"]);
        let err = Error::command_failed(&command);

        assert_eq!(err.code, ErrorCode::CommandFailed);
        assert_eq!(
            err.command_words().unwrap(),
            vec!["git", "push", "staging", "refs/stairstep/staging:main"]
        );
        assert!(err.message.contains("git push staging"));
    }

    #[test]
    fn command_failed_lists_environment_overrides() {
        let command = CommandLine::new(["bundle", "exec", "rake", "webpacker:compile"])
            .with_env("RAILS_ENV", "production");
        let err = Error::command_failed(&command);

        assert_eq!(err.details["env"][0], "RAILS_ENV=production");
    }

    #[test]
    fn interrupted_prompt_exits_like_an_interrupted_command() {
        let err = Error::interrupted_while("waiting for confirmation");
        assert_eq!(err.code, ErrorCode::DeployInterrupted);
        assert_eq!(err.code.exit_code(), 130);
        assert_eq!(err.details["step"], "waiting for confirmation");
    }

    #[test]
    fn non_command_errors_have_no_argument_vector() {
        let err = Error::app_unreachable("staging");
        assert!(err.command_words().is_none());
        assert_eq!(err.code.exit_code(), 4);
    }

    #[test]
    fn exit_codes_separate_configuration_from_runtime_failures() {
        assert_eq!(Error::unknown_source_environment("qa").code.exit_code(), 2);
        assert_eq!(
            Error::command_failed(&CommandLine::new(["heroku", "ps"]))
                .code
                .exit_code(),
            20
        );
        assert_eq!(ErrorCode::DeployInterrupted.exit_code(), 130);
    }
}
