#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use chrono::{DateTime, Local, TimeZone};
use stairstep::config::Config;
use stairstep::executor::{Captured, CommandLine, ExecOptions, Executor};
use stairstep::prompt::Prompt;
use stairstep::Result;

/// Command port double: records every command line, answers captures from
/// canned output, fails commands matching a configured prefix and simulates
/// Ctrl-C while a matching command runs.
pub struct ScriptedExecutor {
    commands: RefCell<Vec<CommandLine>>,
    responses: Vec<(Vec<String>, String)>,
    failures: Vec<Vec<String>>,
    interrupts: Vec<Vec<String>>,
    interrupted: Cell<bool>,
}

fn words(prefix: &[&str]) -> Vec<String> {
    prefix.iter().map(|w| w.to_string()).collect()
}

impl ScriptedExecutor {
    /// A repository on `main` at `abc123` with a clean tree, no tags and two
    /// running workers; a source release `slug-1` built from `def456`.
    pub fn new() -> Self {
        Self {
            commands: RefCell::new(Vec::new()),
            responses: Vec::new(),
            failures: Vec::new(),
            interrupts: Vec::new(),
            interrupted: Cell::new(false),
        }
        .respond(&["git", "rev-parse", "--show-toplevel"], "/work/acme\n")
        .respond(&["git", "rev-parse", "--verify"], "abc123\n")
        .respond(&["git", "rev-parse", "--abbrev-ref", "HEAD"], "main\n")
        .respond(&["git", "status"], "")
        .respond(&["git", "tag"], "")
        .respond(
            &["heroku", "ps", "--json"],
            r#"[{"type":"web"},{"type":"worker"},{"type":"worker"},{"type":"run"}]"#,
        )
        .respond(
            &["heroku", "releases:info", "--json"],
            r#"{"version": 42, "slug": {"id": "slug-1"}}"#,
        )
        .respond(&["heroku", "api", "GET"], r#"{"id": "slug-1", "commit": "def456"}"#)
    }

    /// Later responses take precedence over earlier ones.
    pub fn respond(mut self, prefix: &[&str], stdout: &str) -> Self {
        self.responses.push((words(prefix), stdout.to_string()));
        self
    }

    pub fn fail(mut self, prefix: &[&str]) -> Self {
        self.failures.push(words(prefix));
        self
    }

    /// The operator presses Ctrl-C while a command matching `prefix` runs.
    /// Whether that command still fails is set separately with [`Self::fail`].
    pub fn interrupt_during(mut self, prefix: &[&str]) -> Self {
        self.interrupts.push(words(prefix));
        self
    }

    fn record(&self, command: &CommandLine) -> bool {
        self.commands.borrow_mut().push(command.clone());
        if self.interrupts.iter().any(|prefix| matches(command, prefix)) {
            self.interrupted.set(true);
        }
        !self.failures.iter().any(|prefix| matches(command, prefix))
    }

    pub fn commands(&self) -> Vec<CommandLine> {
        self.commands.borrow().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.commands().iter().map(|c| c.words.join(" ")).collect()
    }

    pub fn count(&self, prefix: &[&str]) -> usize {
        let prefix = words(prefix);
        self.commands()
            .iter()
            .filter(|c| matches(c, &prefix))
            .count()
    }

    pub fn find(&self, prefix: &[&str]) -> Option<CommandLine> {
        let prefix = words(prefix);
        self.commands().into_iter().find(|c| matches(c, &prefix))
    }

    /// Workflow milestones in the order they happened.
    pub fn milestones(&self) -> Vec<&'static str> {
        self.commands().iter().filter_map(milestone).collect()
    }
}

fn matches(command: &CommandLine, prefix: &[String]) -> bool {
    command.words.len() >= prefix.len() && command.words.iter().zip(prefix).all(|(a, b)| a == b)
}

fn milestone(command: &CommandLine) -> Option<&'static str> {
    let w: Vec<&str> = command.words.iter().map(String::as_str).collect();
    Some(match w.as_slice() {
        ["heroku", "apps:info", ..] => "app-verify",
        ["heroku", "pipelines:info", ..] => "pipeline-verify",
        ["git", "status", ..] => "clean-check",
        ["git", "update-ref", "-d", ..] => "ref-delete",
        ["git", "update-ref", _, "HEAD", _] => "ref-advance",
        ["git", "update-ref", _, _] => "ref-create",
        ["git", "tag", "-a", ..] => "tag-create",
        ["git", "tag", "-d", ..] => "tag-delete",
        ["git", "push", "origin", ..] => "tag-push",
        ["git", "push", ..] => "push",
        ["heroku", "ps:scale", args @ ..] => {
            if args.iter().any(|a| a.ends_with("=0")) {
                "scale-down"
            } else {
                "scale-up"
            }
        }
        ["heroku", "maintenance:on", ..] => "maintenance-on",
        ["heroku", "maintenance:off", ..] => "maintenance-off",
        ["heroku", "config:set", "PHASE=before", ..] => "before-hook",
        ["heroku", "config:set", "PHASE=after", ..] => "after-hook",
        ["heroku", "run", "-x", ..] => "migrate",
        ["heroku", "ps:restart", ..] => "restart",
        ["heroku", "pg:backups", "capture", ..] => "backup-capture",
        ["heroku", "pg:backups", "cancel", ..] => "backup-cancel",
        ["heroku", "pipelines:promote", ..] => "promote",
        ["heroku", "builds:create", ..] => "build",
        _ => return None,
    })
}

impl Executor for ScriptedExecutor {
    fn run(&self, command: &CommandLine, _options: &ExecOptions) -> Result<bool> {
        Ok(self.record(command))
    }

    fn interrupted(&self) -> bool {
        self.interrupted.get()
    }

    fn run_capture(&self, command: &CommandLine, _options: &ExecOptions) -> Result<Captured> {
        let success = self.record(command);
        let stdout = self
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| matches(command, prefix))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default();
        Ok(Captured { success, stdout })
    }
}

/// Answers every prompt with the same text.
pub struct ScriptedPrompt {
    answer: String,
    pub questions: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            questions: RefCell::new(Vec::new()),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, question: &str) -> Result<String> {
        self.questions.borrow_mut().push(question.to_string());
        Ok(self.answer.clone())
    }
}

/// Pipeline `acme` with one hook per phase.
pub fn config() -> Config {
    Config::parse(
        r#"
pipeline: acme
before_deploy:
  "config:set": PHASE=before
after_deploy:
  "config:set": PHASE=after
"#,
        "stairstep.yml",
    )
    .unwrap()
}

pub fn new_year() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}
