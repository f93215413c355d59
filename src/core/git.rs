//! Version-control adapter over the `git` CLI.

use std::cell::OnceCell;
use std::path::Path;

use crate::error::{Error, Result};
use crate::executor::{CommandLine, ExecOptions, Executor};

/// Namespace for temporary deploy refs; kept out of `refs/heads` so they
/// never show up as branches.
pub const DEPLOY_REF_NAMESPACE: &str = "refs/stairstep";

/// Deploy ref for an environment, e.g. `refs/stairstep/staging`.
pub fn deploy_ref_name(environment: &str) -> String {
    format!("{}/{}", DEPLOY_REF_NAMESPACE, environment)
}

pub struct Git<'a> {
    executor: &'a dyn Executor,
    existing_tags: OnceCell<Vec<String>>,
}

fn git<I, S>(words: I) -> CommandLine
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandLine::new(["git"]).args(words)
}

impl<'a> Git<'a> {
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self {
            executor,
            existing_tags: OnceCell::new(),
        }
    }

    fn run(&self, command: CommandLine) -> Result<()> {
        self.executor.execute_or_fail(&command, &ExecOptions::new())
    }

    fn read(&self, command: CommandLine) -> Result<String> {
        self.executor
            .capture_text(&command, &ExecOptions::new())
            .map(|text| text.trim().to_string())
    }

    /// Name of the repository's top-level directory.
    pub fn project_name(&self) -> Result<String> {
        let toplevel = self.read(git(["rev-parse", "--show-toplevel"]))?;
        Path::new(&toplevel)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                Error::internal_unexpected(format!(
                    "Cannot derive a project name from '{}'",
                    toplevel
                ))
            })
    }

    pub fn resolve_commit(&self, reference: &str) -> Result<String> {
        self.read(git([
            "rev-parse".to_string(),
            "--verify".to_string(),
            format!("{}^{{commit}}", reference),
        ]))
    }

    /// Fail, listing the changed paths, when tracked files have uncommitted changes.
    pub fn verify_clean(&self) -> Result<()> {
        let status = self.executor.capture_text(
            &git(["status", "--porcelain", "--untracked-files=no"]),
            &ExecOptions::new().message("Checking for uncommitted changes"),
        )?;

        let changed: Vec<String> = status
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.trim_end().to_string())
            .collect();

        if changed.is_empty() {
            Ok(())
        } else {
            Err(Error::dirty_working_tree(changed))
        }
    }

    /// Current branch name, or the commit when `HEAD` is detached.
    pub fn current_checkout(&self) -> Result<String> {
        let branch = self.read(git(["rev-parse", "--abbrev-ref", "HEAD"]))?;
        if branch == "HEAD" {
            self.resolve_commit("HEAD")
        } else {
            Ok(branch)
        }
    }

    pub fn create_ref(&self, name: &str, commit: &str) -> Result<()> {
        self.run(git(["update-ref", name, commit]))
    }

    /// Point `name` at the current `HEAD`, provided it still points at `expected`.
    pub fn advance_ref(&self, name: &str, expected: &str) -> Result<()> {
        self.run(git(["update-ref", name, "HEAD", expected]))
    }

    pub fn delete_ref(&self, name: &str) -> Result<()> {
        self.run(git(["update-ref", "-d", name]))
    }

    pub fn checkout(&self, target: &str) -> Result<()> {
        self.run(git(["checkout", "--quiet", target]))
    }

    pub fn checkout_detached(&self, target: &str) -> Result<()> {
        self.run(git(["checkout", "--quiet", "--detach", target]))
    }

    /// Stage build output even when it is ignored.
    pub fn add_force(&self, path: &str, log: &Path) -> Result<()> {
        self.executor.execute_or_fail(
            &git(["add", "-f", path]),
            &ExecOptions::new().log_to(log),
        )
    }

    pub fn commit(&self, message: &str, log: &Path) -> Result<()> {
        self.executor.execute_or_fail(
            &git(["commit", "-m", message]),
            &ExecOptions::new()
                .message(format!("git commit -m'{}'", message))
                .log_to(log),
        )
    }

    /// All tag names, after fetching from remotes. Fetched once per run.
    pub fn existing_tags(&self) -> Result<&[String]> {
        if let Some(tags) = self.existing_tags.get() {
            return Ok(tags);
        }

        self.run(git(["fetch", "--tags"]))?;
        let tags = self
            .read(git(["tag"]))?
            .lines()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        Ok(self.existing_tags.get_or_init(|| tags))
    }

    pub fn create_annotated_tag(&self, name: &str, message: &str, commit: &str) -> Result<()> {
        self.run(git(["tag", "-a", "-m", message, name, commit]))
    }

    pub fn push_tag(&self, remote: &str, name: &str) -> Result<()> {
        self.run(git(["push", remote, name]))
    }

    pub fn delete_tag(&self, name: &str) -> Result<()> {
        self.run(git(["tag", "-d", name]))
    }

    pub fn push(&self, remote: &str, refspec: &str, force: bool) -> Result<()> {
        let mut command = git(["push"]);
        if force {
            command = command.arg("--force");
        }
        self.run(command.args([remote, refspec]))
    }
}
