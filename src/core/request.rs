//! Deploy and promote requests.

use serde::Serialize;

use crate::build::BuildStep;
use crate::error::{Error, Result};
use crate::utils::validation;

/// Options for deploying a local commit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployFlags {
    pub create_tag: bool,
    pub allow_downtime: bool,
    pub capture_backup_first: bool,
    pub force_push: bool,
    pub initial_deploy: bool,
    pub precompile_assets: bool,
    pub package_dependencies: bool,
    /// Skips build commits and tagging.
    pub development_mode: bool,
}

impl Default for DeployFlags {
    fn default() -> Self {
        Self {
            create_tag: true,
            allow_downtime: false,
            capture_backup_first: false,
            force_push: false,
            initial_deploy: false,
            precompile_assets: false,
            package_dependencies: false,
            development_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    environment: String,
    commit: Option<String>,
    flags: DeployFlags,
}

impl DeployRequest {
    pub fn new(environment: &str, commit: Option<String>, flags: DeployFlags) -> Result<Self> {
        let environment = validation::require_name(environment, "environment")?.to_string();
        let commit = match commit {
            Some(commit) => Some(
                validation::require_non_empty(&commit, "commit", "Commit reference cannot be empty")?
                    .to_string(),
            ),
            None => None,
        };

        Ok(Self {
            environment,
            commit,
            flags,
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Commit to deploy; the current `HEAD` when none was given.
    pub fn commit_ref(&self) -> &str {
        self.commit.as_deref().unwrap_or("HEAD")
    }

    pub fn flags(&self) -> &DeployFlags {
        &self.flags
    }

    pub fn creates_tag(&self) -> bool {
        self.flags.create_tag && !self.flags.development_mode
    }

    pub fn precompiles_assets(&self) -> bool {
        self.flags.precompile_assets && !self.flags.development_mode
    }

    pub fn packages_dependencies(&self) -> bool {
        self.flags.package_dependencies && !self.flags.development_mode
    }

    /// Build commits to stack on the deploy ref, in order.
    pub fn build_steps(&self) -> Vec<BuildStep> {
        let mut steps = Vec::new();
        if self.precompiles_assets() {
            steps.push(BuildStep::PrecompileAssets);
        }
        if self.packages_dependencies() {
            steps.push(BuildStep::PackageDependencies);
        }
        steps
    }
}

/// Options for re-releasing another environment's current build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteFlags {
    pub create_tag: bool,
    pub allow_downtime: bool,
    pub capture_backup_first: bool,
}

impl Default for PromoteFlags {
    fn default() -> Self {
        Self {
            create_tag: true,
            allow_downtime: false,
            capture_backup_first: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteRequest {
    environment: String,
    from: Option<String>,
    flags: PromoteFlags,
}

impl PromoteRequest {
    pub fn new(environment: &str, from: Option<String>, flags: PromoteFlags) -> Result<Self> {
        let environment = validation::require_name(environment, "environment")?.to_string();
        let from = match from {
            Some(from) => Some(validation::require_name(&from, "from")?.to_string()),
            None => None,
        };

        Ok(Self {
            environment,
            from,
            flags,
        })
    }

    pub fn flags(&self) -> &PromoteFlags {
        &self.flags
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Explicit `from`, else the environment chain default.
    pub fn source_environment(&self) -> Result<String> {
        self.from
            .clone()
            .or_else(|| default_source_environment(&self.environment).map(str::to_string))
            .ok_or_else(|| Error::unknown_source_environment(&self.environment))
    }
}

/// The environment chain: demo feeds staging, staging feeds production.
pub fn default_source_environment(target: &str) -> Option<&'static str> {
    match target {
        "production" => Some("staging"),
        "staging" => Some("demo"),
        _ => None,
    }
}
