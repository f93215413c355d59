//! Project configuration read from `config/stairstep.yml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::hooks::{self, HookEntry, HookPhase};
use crate::utils::validation;

/// Location of the configuration file relative to the repository root.
pub const DEFAULT_CONFIG_PATH: &str = "config/stairstep.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inserted into deploy tag names: `deploy-<prefix>-<env>-<date>`.
    pub tag_prefix: Option<String>,
    /// Platform pipeline; defaults to the repository directory name.
    pub pipeline: Option<String>,
    /// Application name per environment, overriding `<pipeline>-<env>`.
    pub apps: BTreeMap<String, String>,
    pub tag_remote: String,
    pub deploy_branch: String,
    pub migrate_command: Vec<String>,
    pub build_caches: Vec<PathBuf>,
    pub log_dir: PathBuf,
    #[serde(deserialize_with = "hooks::deserialize_hooks")]
    pub before_deploy: Vec<HookEntry>,
    #[serde(deserialize_with = "hooks::deserialize_hooks")]
    pub after_deploy: Vec<HookEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tag_prefix: None,
            pipeline: None,
            apps: BTreeMap::new(),
            tag_remote: "origin".to_string(),
            deploy_branch: "main".to_string(),
            migrate_command: vec!["rake".to_string(), "db:migrate".to_string()],
            build_caches: vec![PathBuf::from("tmp/cache"), PathBuf::from("node_modules/.cache")],
            log_dir: PathBuf::from("log"),
            before_deploy: Vec::new(),
            after_deploy: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
        })?;

        Self::parse(&content, &path.to_string_lossy())
    }

    /// Parse configuration text; `origin` is only used in error details.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yml::from_str(content).map_err(|e| Error::config_invalid_yaml(origin, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.tag_prefix {
            require_config_name("tag_prefix", prefix)?;
        }
        if let Some(pipeline) = &self.pipeline {
            require_config_name("pipeline", pipeline)?;
        }
        for (env, app) in &self.apps {
            require_config_name("apps", env)?;
            require_config_name(&format!("apps.{}", env), app)?;
        }
        if self.tag_remote.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "tag_remote",
                None,
                "Remote for deploy tags cannot be empty",
            ));
        }
        if self.deploy_branch.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "deploy_branch",
                None,
                "Platform deploy branch cannot be empty",
            ));
        }
        if self.migrate_command.is_empty() {
            return Err(Error::config_invalid_value(
                "migrate_command",
                None,
                "Migration command cannot be empty",
            ));
        }
        Ok(())
    }

    pub fn hooks(&self, phase: HookPhase) -> &[HookEntry] {
        match phase {
            HookPhase::BeforeDeploy => &self.before_deploy,
            HookPhase::AfterDeploy => &self.after_deploy,
        }
    }

    pub fn app_override(&self, environment: &str) -> Option<&str> {
        self.apps.get(environment).map(String::as_str)
    }
}

fn require_config_name(key: &str, value: &str) -> Result<()> {
    if validation::is_valid_name(value) {
        Ok(())
    } else {
        Err(Error::config_invalid_value(
            key,
            Some(value.to_string()),
            "May only contain letters, digits, '.', '_' and '-'",
        ))
    }
}
