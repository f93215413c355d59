use std::path::{Path, PathBuf};

use stairstep::config::Config;
use stairstep::executor::ProcessExecutor;
use stairstep::prompt::TerminalPrompt;
use stairstep::Orchestrator;

pub type CmdResult<T> = stairstep::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config: PathBuf,
    pub debug: bool,
}

pub mod deploy;
pub mod promote;

/// Run `f` against an orchestrator wired to real processes in the current directory.
pub(crate) fn with_orchestrator<T, F>(global: &GlobalArgs, f: F) -> stairstep::Result<T>
where
    F: FnOnce(&Orchestrator) -> stairstep::Result<T>,
{
    let workdir = std::env::current_dir().map_err(|e| {
        stairstep::Error::internal_io(e.to_string(), Some("resolve working directory".to_string()))
    })?;
    let config = load_config(&workdir, &global.config)?;

    let executor = ProcessExecutor::in_dir(&workdir);
    let prompt = TerminalPrompt;
    let orchestrator = Orchestrator::new(&executor, &prompt, &config, &workdir);
    f(&orchestrator)
}

fn load_config(workdir: &Path, path: &Path) -> stairstep::Result<Config> {
    Config::load(&workdir.join(path))
}

pub(crate) fn run(
    command: crate::Commands,
    global: &GlobalArgs,
) -> CmdResult<stairstep::DeployReport> {
    match command {
        crate::Commands::Deploy(args) => deploy::run(args, global),
        crate::Commands::Promote(args) => promote::run(args, global),
    }
}
