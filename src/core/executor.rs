//! Command port: runs external commands and streams their output.
//!
//! Every `git`, `heroku` and `bundle` invocation the orchestrator makes goes
//! through [`Executor`], so the workflows can be driven against a recording
//! double in tests and against [`ProcessExecutor`] for real.

use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::interrupt;
use crate::utils::shell;

/// An external command: argument vector plus environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub env: Vec<(String, String)>,
    pub words: Vec<String>,
}

impl CommandLine {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            env: Vec::new(),
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, word: impl Into<String>) -> Self {
        self.words.push(word.into());
        self
    }

    pub fn args<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.words.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        self.words.first().map(String::as_str).unwrap_or("")
    }

    /// Shell-quoted rendering, for messages only.
    pub fn display(&self) -> String {
        shell::quote_args(&self.words)
    }

    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.words.len() >= prefix.len()
            && self.words.iter().zip(prefix).all(|(word, want)| word == want)
    }
}

/// Where streamed command output goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputSink {
    #[default]
    Terminal,
    Discard,
    /// Appended to; callers truncate the file when starting a new log.
    File(PathBuf),
}

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Announced instead of the command line itself.
    pub message: Option<String>,
    pub sink: OutputSink,
    /// Print a dot per output line.
    pub progress: bool,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn silent(mut self) -> Self {
        self.sink = OutputSink::Discard;
        self
    }

    pub fn log_to(mut self, path: impl AsRef<Path>) -> Self {
        self.sink = OutputSink::File(path.as_ref().to_path_buf());
        self
    }

    pub fn progress(mut self) -> Self {
        self.progress = true;
        self
    }
}

/// Stdout of a capture-only invocation.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub success: bool,
    pub stdout: String,
}

pub trait Executor {
    /// Start a command and run it to completion, streaming output to the
    /// options' sink.
    ///
    /// Returns whether the command exited successfully. Errors only when the
    /// process could not be started at all.
    fn run(&self, command: &CommandLine, options: &ExecOptions) -> Result<bool>;

    /// Start a command and collect its stdout instead of streaming it.
    fn run_capture(&self, command: &CommandLine, options: &ExecOptions) -> Result<Captured>;

    /// Whether the operator has interrupted this run.
    fn interrupted(&self) -> bool {
        interrupt::received()
    }

    /// Refuse to start anything after an interrupt, unless a guard is
    /// releasing what the run took hold of.
    fn checkpoint(&self, command: &CommandLine) -> Result<()> {
        if self.interrupted() && !interrupt::releasing() {
            log_status!("interrupt", "Refusing to start `{}`", command.display());
            return Err(Error::interrupted(command));
        }
        Ok(())
    }

    fn execute(&self, command: &CommandLine, options: &ExecOptions) -> Result<bool> {
        self.checkpoint(command)?;
        let success = self.run(command, options)?;
        if !success {
            self.checkpoint(command)?;
        }
        Ok(success)
    }

    fn capture(&self, command: &CommandLine, options: &ExecOptions) -> Result<Captured> {
        self.checkpoint(command)?;
        self.run_capture(command, options)
    }

    fn execute_or_fail(&self, command: &CommandLine, options: &ExecOptions) -> Result<()> {
        if self.execute(command, options)? {
            Ok(())
        } else {
            Err(self.failure(command))
        }
    }

    fn capture_text(&self, command: &CommandLine, options: &ExecOptions) -> Result<String> {
        let captured = self.capture(command, options)?;
        if captured.success {
            Ok(captured.stdout)
        } else {
            Err(self.failure(command))
        }
    }

    fn failure(&self, command: &CommandLine) -> Error {
        if self.interrupted() {
            Error::interrupted(command)
        } else {
            Error::command_failed(command)
        }
    }
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }

    fn build(&self, command: &CommandLine) -> Result<Command> {
        let Some((program, args)) = command.words.split_first() else {
            return Err(Error::internal_unexpected("Cannot execute an empty command"));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }
}

fn announce(command: &CommandLine, options: &ExecOptions) {
    let text = options
        .message
        .clone()
        .unwrap_or_else(|| command.display());
    println!("*** {}", text);
}

fn open_sink(sink: &OutputSink) -> Result<Box<dyn Write + Send>> {
    Ok(match sink {
        OutputSink::Terminal => Box::new(io::stdout()),
        OutputSink::Discard => Box::new(io::sink()),
        OutputSink::File(path) => Box::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::internal_io(e.to_string(), Some(format!("open {}", path.display())))
                })?,
        ),
    })
}

fn forward_lines<R: Read>(reader: R, sink: &Mutex<Box<dyn Write + Send>>, progress: bool) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        if progress {
            print!(".");
            io::stdout().flush().ok();
        }

        if let Ok(mut out) = sink.lock() {
            let _ = out.write_all(&buf);
            if !buf.ends_with(b"\n") {
                let _ = out.write_all(b"\n");
            }
            let _ = out.flush();
        }
    }
}

impl Executor for ProcessExecutor {
    fn run(&self, command: &CommandLine, options: &ExecOptions) -> Result<bool> {
        announce(command, options);

        let sink = Mutex::new(open_sink(&options.sink)?);
        let mut child = self
            .build(command)?
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::command_spawn_failed(command, &e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let progress = options.progress;
        let sink_ref = &sink;

        std::thread::scope(|scope| {
            if let Some(stderr) = stderr {
                scope.spawn(move || forward_lines(stderr, sink_ref, progress));
            }
            if let Some(stdout) = stdout {
                forward_lines(stdout, sink_ref, progress);
            }
        });

        if progress {
            println!();
        }

        let status = child.wait().map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("wait for {}", command.program())))
        })?;

        Ok(status.success())
    }

    fn run_capture(&self, command: &CommandLine, options: &ExecOptions) -> Result<Captured> {
        announce(command, options);

        let stderr = if options.sink == OutputSink::Discard {
            Stdio::null()
        } else {
            Stdio::inherit()
        };

        let output = self
            .build(command)?
            .stdin(Stdio::inherit())
            .stderr(stderr)
            .output()
            .map_err(|e| Error::command_spawn_failed(command, &e))?;

        Ok(Captured {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}
