//! Deploy and promote workflows.
//!
//! The orchestrator owns the per-run state: the adapters, the resolved
//! pipeline name, the resolved tag names and the run's start time. The
//! workflows themselves live in [`crate::deploy`] and [`crate::promote`];
//! this module holds the guards they share.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::build::Builder;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::git::Git;
use crate::guard::{with_guard, with_guard_if, ReleasePolicy};
use crate::platform::Heroku;
use crate::prompt::Prompt;
use crate::report;
use crate::tag;

/// What a finished run released.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_environment: Option<String>,
    pub commit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

pub type DeployOutcome = Result<DeployReport>;

pub struct Orchestrator<'a> {
    pub(crate) executor: &'a dyn Executor,
    pub(crate) prompt: &'a dyn Prompt,
    pub(crate) config: &'a Config,
    pub(crate) workdir: PathBuf,
    pub(crate) git: Git<'a>,
    pub(crate) heroku: Heroku<'a>,
    started_at: DateTime<Local>,
    pipeline: OnceCell<String>,
    tag_names: RefCell<HashMap<String, String>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        prompt: &'a dyn Prompt,
        config: &'a Config,
        workdir: &Path,
    ) -> Self {
        Self {
            executor,
            prompt,
            config,
            workdir: workdir.to_path_buf(),
            git: Git::new(executor),
            heroku: Heroku::new(executor, config),
            started_at: Local::now(),
            pipeline: OnceCell::new(),
            tag_names: RefCell::new(HashMap::new()),
        }
    }

    /// Fix the run's clock; tag names and messages are derived from it.
    pub fn with_start_time(mut self, started_at: DateTime<Local>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn started_at(&self) -> &DateTime<Local> {
        &self.started_at
    }

    /// Platform pipeline: configured, else the repository directory name.
    pub fn pipeline(&self) -> Result<&str> {
        if let Some(pipeline) = self.pipeline.get() {
            return Ok(pipeline.as_str());
        }

        let pipeline = match &self.config.pipeline {
            Some(pipeline) => pipeline.clone(),
            None => self.git.project_name()?,
        };
        Ok(self.pipeline.get_or_init(|| pipeline).as_str())
    }

    pub fn app_name(&self, environment: &str) -> Result<String> {
        Ok(self.heroku.app_name(self.pipeline()?, environment))
    }

    /// Collision-free deploy tag name for `environment`, resolved once per run.
    pub fn tag_name(&self, environment: &str) -> Result<String> {
        if let Some(name) = self.tag_names.borrow().get(environment) {
            return Ok(name.clone());
        }

        let base = tag::base_name(
            self.config.tag_prefix.as_deref(),
            environment,
            self.started_at.date_naive(),
        );
        let name = tag::next_available(&base, self.git.existing_tags()?);
        self.tag_names
            .borrow_mut()
            .insert(environment.to_string(), name.clone());
        Ok(name)
    }

    pub(crate) fn builder(&self) -> Builder<'_> {
        Builder::new(
            self.executor,
            &self.workdir,
            &self.config.log_dir,
            &self.config.build_caches,
        )
    }

    pub(crate) fn capture_backup_if(&self, enabled: bool, environment: &str) -> Result<()> {
        if !enabled {
            return Ok(());
        }
        report::info(&format!("Capturing database backup of {}", environment));
        self.heroku.capture_backup(environment)
    }

    /// Tag `commit` around `body`. The tag is pushed only when `body`
    /// succeeds and is always deleted locally afterwards.
    pub(crate) fn with_tag<B>(
        &self,
        enabled: bool,
        environment: &str,
        commit: &str,
        message: &str,
        body: B,
    ) -> Result<Option<String>>
    where
        B: FnOnce() -> Result<()>,
    {
        if !enabled {
            body()?;
            return Ok(None);
        }

        let name = self.tag_name(environment)?;
        with_guard(
            "deploy tag",
            ReleasePolicy::BestEffort,
            || self.git.create_annotated_tag(&name, message, commit),
            || {
                body()?;
                self.git.push_tag(&self.config.tag_remote, &name)
            },
            || self.git.delete_tag(&name),
        )?;
        Ok(Some(name))
    }

    /// Scale worker processes to zero around `body`, then restore the counts
    /// captured before scaling down.
    pub(crate) fn with_scaled_down<B>(&self, enabled: bool, environment: &str, body: B) -> Result<()>
    where
        B: FnOnce() -> Result<()>,
    {
        if !enabled {
            return body();
        }

        let counts = self.heroku.worker_counts(environment)?;
        with_guard(
            "worker scale",
            ReleasePolicy::Propagate,
            || self.heroku.scale_to_zero(environment, &counts),
            body,
            || self.heroku.restore_scale(environment, &counts),
        )
    }

    pub(crate) fn with_maintenance<B>(&self, enabled: bool, environment: &str, body: B) -> Result<()>
    where
        B: FnOnce() -> Result<()>,
    {
        with_guard_if(
            enabled,
            "maintenance mode",
            ReleasePolicy::Propagate,
            || self.heroku.maintenance_on(environment),
            body,
            || self.heroku.maintenance_off(environment),
        )
    }

    /// Make the operator type the environment name before a force push.
    pub(crate) fn confirm_force(&self, environment: &str) -> Result<()> {
        report::warning("Force push");
        println!("You are force-pushing to a deployed environment!");
        println!("Verify you want to do this by typing the name of the remote:");

        let answer = self.prompt.ask("> ")?;
        if answer == environment {
            Ok(())
        } else {
            Err(Error::verification_failed(environment))
        }
    }
}
