//! Local build preparation: dependency install and build commits stacked on
//! the deploy ref.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::executor::{CommandLine, ExecOptions, Executor};
use crate::git::Git;

/// Placeholder credentials so asset compilation does not reach for real storage.
const ASSET_COMPILE_ENV: [(&str, &str); 5] = [
    ("RAILS_ENV", "production"),
    ("NODE_ENV", "production"),
    ("AWS_ACCESS_KEY_ID", "dummy"),
    ("AWS_SECRET_ACCESS_KEY", "dummy"),
    ("S3_BUCKET_NAME", "dummy"),
];

/// A build that produces one commit on top of the deploy ref.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    PrecompileAssets,
    PackageDependencies,
}

impl BuildStep {
    pub fn log_file(&self) -> &'static str {
        match self {
            BuildStep::PrecompileAssets => "assets-precompile.log",
            BuildStep::PackageDependencies => "bundle-package.log",
        }
    }

    /// Build output to force-add, relative to the repository root.
    pub fn output_path(&self) -> &'static str {
        match self {
            BuildStep::PrecompileAssets => "public/packs",
            BuildStep::PackageDependencies => "vendor/cache",
        }
    }

    pub fn commit_message(&self) -> &'static str {
        match self {
            BuildStep::PrecompileAssets => "Precompile assets",
            BuildStep::PackageDependencies => "Package gems",
        }
    }

    fn commands(&self) -> Vec<CommandLine> {
        match self {
            BuildStep::PrecompileAssets => ["webpacker:clobber", "webpacker:compile"]
                .into_iter()
                .map(|task| {
                    ASSET_COMPILE_ENV.iter().fold(
                        CommandLine::new(["bundle", "exec", "rake", task]),
                        |command, (key, value)| command.with_env(*key, *value),
                    )
                })
                .collect(),
            BuildStep::PackageDependencies => vec![CommandLine::new(["bundle", "package"])],
        }
    }
}

pub struct Builder<'a> {
    executor: &'a dyn Executor,
    workdir: PathBuf,
    log_dir: PathBuf,
    build_caches: &'a [PathBuf],
}

impl<'a> Builder<'a> {
    /// `log_dir` and `build_caches` are resolved against `workdir` when relative.
    pub fn new(
        executor: &'a dyn Executor,
        workdir: &Path,
        log_dir: &Path,
        build_caches: &'a [PathBuf],
    ) -> Self {
        Self {
            executor,
            workdir: workdir.to_path_buf(),
            log_dir: workdir.join(log_dir),
            build_caches,
        }
    }

    fn log_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(name)
    }

    pub fn ensure_log_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.log_dir).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("create {}", self.log_dir.display())),
            )
        })
    }

    fn start_log(&self, name: &str) -> Result<PathBuf> {
        let path = self.log_path(name);
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::internal_io(e.to_string(), Some(format!("open {}", path.display()))))?;
        Ok(path)
    }

    /// `bundle check`, falling back to a full `bundle install`.
    pub fn install_dependencies(&self) -> Result<()> {
        let log = self.start_log("bundle-install.log")?;
        let satisfied = self.executor.execute(
            &CommandLine::new(["bundle", "check"]),
            &ExecOptions::new().log_to(&log),
        )?;
        if satisfied {
            return Ok(());
        }

        self.executor.execute_or_fail(
            &CommandLine::new(["bundle", "install"]),
            &ExecOptions::new().log_to(&log).progress(),
        )
    }

    /// Run `step`, commit its output and advance `ref_name` onto that commit.
    pub fn run_step(&self, git: &Git, ref_name: &str, step: BuildStep) -> Result<()> {
        log_status!("build", "{:?} onto {}", step, ref_name);

        let log = self.start_log(step.log_file())?;
        let tip = git.resolve_commit(ref_name)?;

        for command in step.commands() {
            self.executor
                .execute_or_fail(&command, &ExecOptions::new().log_to(&log).progress())?;
        }

        git.add_force(step.output_path(), &log)?;
        git.commit(step.commit_message(), &log)?;
        git.advance_ref(ref_name, &tip)
    }

    /// Remove local-only caches so they are not shipped to a platform build.
    pub fn strip_caches(&self) -> Result<()> {
        for cache in self.build_caches {
            let path = self.workdir.join(cache);
            match fs::remove_dir_all(&path) {
                Ok(()) => log_status!("build", "Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::internal_io(
                        e.to_string(),
                        Some(format!("remove {}", path.display())),
                    ))
                }
            }
        }
        Ok(())
    }
}
