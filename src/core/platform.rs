//! Platform adapter over the `heroku` CLI.
//!
//! Application-scoped commands target `--remote <env>` (the git remote named
//! after the environment) unless `config/stairstep.yml` maps the environment
//! to an explicit app, in which case they target `--app <name>`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{CommandLine, ExecOptions, Executor};
use crate::hooks::{self, HookPhase};
use crate::interrupt;
use crate::report;

/// Process types never counted as workers.
pub const NON_WORKER_TYPES: [&str; 3] = ["web", "scheduler", "run"];

/// Process count per worker type.
pub type WorkerCounts = BTreeMap<String, u32>;

#[derive(Debug, Deserialize)]
struct Dyno {
    #[serde(rename = "type")]
    dyno_type: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    slug: Option<SlugRef>,
}

#[derive(Debug, Deserialize)]
struct SlugRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Slug {
    commit: Option<String>,
}

/// Count running processes per worker type from `heroku ps --json` output.
pub fn count_workers(ps_json: &str) -> Result<WorkerCounts> {
    let dynos: Vec<Dyno> = serde_json::from_str(ps_json)
        .map_err(|e| Error::invalid_response("heroku ps --json", e.to_string()))?;

    let mut counts = WorkerCounts::new();
    for dyno in dynos {
        if NON_WORKER_TYPES.contains(&dyno.dyno_type.as_str()) {
            continue;
        }
        *counts.entry(dyno.dyno_type).or_insert(0) += 1;
    }
    Ok(counts)
}

fn scale_arguments(counts: &WorkerCounts, zero: bool) -> Vec<String> {
    counts
        .iter()
        .map(|(dyno_type, count)| format!("{}={}", dyno_type, if zero { 0 } else { *count }))
        .collect()
}

pub struct Heroku<'a> {
    executor: &'a dyn Executor,
    config: &'a Config,
    worker_counts: RefCell<HashMap<String, WorkerCounts>>,
}

impl<'a> Heroku<'a> {
    pub fn new(executor: &'a dyn Executor, config: &'a Config) -> Self {
        Self {
            executor,
            config,
            worker_counts: RefCell::new(HashMap::new()),
        }
    }

    fn app_command(&self, environment: &str, words: &[&str]) -> CommandLine {
        let command = CommandLine::new(["heroku"]).args(words.iter().copied());
        match self.config.app_override(environment) {
            Some(app) => command.args(["--app", app]),
            None => command.args(["--remote", environment]),
        }
    }

    fn run(&self, environment: &str, words: &[&str]) -> Result<()> {
        self.executor
            .execute_or_fail(&self.app_command(environment, words), &ExecOptions::new())
    }

    fn read(&self, environment: &str, words: &[&str]) -> Result<String> {
        self.executor
            .capture_text(&self.app_command(environment, words), &ExecOptions::new())
    }

    /// Platform application for an environment.
    pub fn app_name(&self, pipeline: &str, environment: &str) -> String {
        self.config
            .app_override(environment)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", pipeline, environment))
    }

    /// Git remote to push releases to.
    pub fn git_remote(&self, environment: &str) -> String {
        match self.config.app_override(environment) {
            Some(app) => format!("https://git.heroku.com/{}.git", app),
            None => environment.to_string(),
        }
    }

    pub fn verify_pipeline(&self, pipeline: &str) -> Result<()> {
        let command = CommandLine::new(["heroku", "pipelines:info", pipeline]);
        if self.executor.execute(&command, &ExecOptions::new().silent())? {
            Ok(())
        } else {
            Err(Error::pipeline_not_found(pipeline))
        }
    }

    pub fn verify_app(&self, environment: &str) -> Result<()> {
        let command = self.app_command(environment, &["apps:info"]);
        if self.executor.execute(&command, &ExecOptions::new().silent())? {
            Ok(())
        } else {
            Err(Error::app_unreachable(environment))
        }
    }

    /// Capture a database backup. When the capture fails, an in-flight
    /// backup is cancelled before the original failure is returned.
    pub fn capture_backup(&self, environment: &str) -> Result<()> {
        let captured = self.run(environment, &["pg:backups", "capture"]);
        if let Err(err) = captured {
            let cancelled = interrupt::while_releasing(|| self.cancel_backup(environment));
            if let Err(cancel_err) = cancelled {
                report::warning(&format!("Could not cancel backup: {}", cancel_err));
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn cancel_backup(&self, environment: &str) -> Result<()> {
        self.run(environment, &["pg:backups", "cancel"])
    }

    /// Identifier of the build currently released on an environment.
    pub fn current_release(&self, environment: &str) -> Result<String> {
        let json = self.read(environment, &["releases:info", "--json"])?;
        let release: ReleaseInfo = serde_json::from_str(&json)
            .map_err(|e| Error::invalid_response("heroku releases:info --json", e.to_string()))?;

        release.slug.map(|slug| slug.id).ok_or_else(|| {
            Error::invalid_response(
                "heroku releases:info --json",
                format!("'{}' has no built release to promote", environment),
            )
        })
    }

    /// Commit a released build was made from.
    pub fn release_commit(&self, app: &str, release_id: &str) -> Result<String> {
        let path = format!("/apps/{}/slugs/{}", app, release_id);
        let command = CommandLine::new(["heroku", "api", "GET", path.as_str()]);
        let json = self.executor.capture_text(&command, &ExecOptions::new())?;
        let slug: Slug = serde_json::from_str(&json)
            .map_err(|e| Error::invalid_response("heroku api GET", e.to_string()))?;

        slug.commit.filter(|c| !c.is_empty()).ok_or_else(|| {
            Error::invalid_response("heroku api GET", format!("{} has no commit", path))
        })
    }

    /// Worker process counts, captured once per environment per run.
    pub fn worker_counts(&self, environment: &str) -> Result<WorkerCounts> {
        if let Some(counts) = self.worker_counts.borrow().get(environment) {
            return Ok(counts.clone());
        }

        let counts = count_workers(&self.read(environment, &["ps", "--json"])?)?;
        self.worker_counts
            .borrow_mut()
            .insert(environment.to_string(), counts.clone());
        Ok(counts)
    }

    pub fn scale_to_zero(&self, environment: &str, counts: &WorkerCounts) -> Result<()> {
        self.scale(environment, scale_arguments(counts, true))
    }

    pub fn restore_scale(&self, environment: &str, counts: &WorkerCounts) -> Result<()> {
        self.scale(environment, scale_arguments(counts, false))
    }

    fn scale(&self, environment: &str, arguments: Vec<String>) -> Result<()> {
        if arguments.is_empty() {
            log_status!("platform", "No worker processes to scale on {}", environment);
            return Ok(());
        }

        let mut words = vec!["ps:scale"];
        words.extend(arguments.iter().map(String::as_str));
        self.run(environment, &words)
    }

    pub fn maintenance_on(&self, environment: &str) -> Result<()> {
        self.run(environment, &["maintenance:on"])
    }

    pub fn maintenance_off(&self, environment: &str) -> Result<()> {
        self.run(environment, &["maintenance:off"])
    }

    /// Promote the source environment's current build onto `to_app`.
    pub fn promote_artifact(&self, from_environment: &str, to_app: &str) -> Result<()> {
        self.run(from_environment, &["pipelines:promote", "--to", to_app])
    }

    /// Build the checked-out source on the platform, labelled with `commit`.
    pub fn create_build(&self, app: &str, commit: &str) -> Result<()> {
        let command = CommandLine::new(["heroku", "builds:create", "--app", app, "--version", commit]);
        self.executor
            .execute_or_fail(&command, &ExecOptions::new().progress())
    }

    pub fn run_migration_and_restart(&self, environment: &str) -> Result<()> {
        let mut words = vec!["run", "-x"];
        words.extend(self.config.migrate_command.iter().map(String::as_str));
        self.run(environment, &words)?;
        self.run(environment, &["ps:restart"])
    }

    /// Run the hook commands configured for `phase`, in file order.
    pub fn run_hook(&self, environment: &str, phase: HookPhase) -> Result<()> {
        let invocations = hooks::invocations(self.config.hooks(phase));
        if !invocations.is_empty() {
            log_status!("hooks", "Running {} {} hook(s)", invocations.len(), phase.as_str());
        }

        for (command_type, argument) in invocations {
            self.run(environment, &[command_type, argument])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_counts_exclude_web_scheduler_and_run() {
        let json = r#"[
            {"type": "web", "name": "web.1"},
            {"type": "web", "name": "web.2"},
            {"type": "worker", "name": "worker.1"},
            {"type": "worker", "name": "worker.2"},
            {"type": "clock", "name": "clock.1"},
            {"type": "scheduler", "name": "scheduler.1"},
            {"type": "run", "name": "run.4821"}
        ]"#;

        let counts = count_workers(json).unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts["worker"], 2);
        assert_eq!(counts["clock"], 1);
    }

    #[test]
    fn no_dynos_means_no_workers() {
        assert!(count_workers("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_ps_output_is_an_invalid_response() {
        let err = count_workers("not json").unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::PlatformInvalidResponse);
    }

    #[test]
    fn scale_arguments_are_sorted_by_type() {
        let mut counts = WorkerCounts::new();
        counts.insert("worker".to_string(), 3);
        counts.insert("clock".to_string(), 1);

        assert_eq!(scale_arguments(&counts, true), vec!["clock=0", "worker=0"]);
        assert_eq!(scale_arguments(&counts, false), vec!["clock=1", "worker=3"]);
    }

    #[test]
    fn app_names_follow_pipeline_unless_overridden() {
        let executor = crate::executor::ProcessExecutor::new();
        let mut config = Config::default();
        config
            .apps
            .insert("production".to_string(), "acme-live".to_string());
        let heroku = Heroku::new(&executor, &config);

        assert_eq!(heroku.app_name("acme", "staging"), "acme-staging");
        assert_eq!(heroku.app_name("acme", "production"), "acme-live");
        assert_eq!(heroku.git_remote("staging"), "staging");
        assert_eq!(
            heroku.git_remote("production"),
            "https://git.heroku.com/acme-live.git"
        );
    }

    #[test]
    fn app_commands_target_remote_or_app() {
        let executor = crate::executor::ProcessExecutor::new();
        let mut config = Config::default();
        config
            .apps
            .insert("production".to_string(), "acme-live".to_string());
        let heroku = Heroku::new(&executor, &config);

        assert_eq!(
            heroku.app_command("staging", &["maintenance:on"]).words,
            vec!["heroku", "maintenance:on", "--remote", "staging"]
        );
        assert_eq!(
            heroku.app_command("production", &["maintenance:on"]).words,
            vec!["heroku", "maintenance:on", "--app", "acme-live"]
        );
    }
}
