mod support;

use stairstep::config::Config;
use stairstep::{ErrorCode, Orchestrator, PromoteFlags, PromoteRequest};
use support::{config, new_year, ScriptedExecutor, ScriptedPrompt};
use tempfile::tempdir;

fn promote(
    executor: &ScriptedExecutor,
    config: &Config,
    environment: &str,
    from: Option<&str>,
    flags: PromoteFlags,
) -> stairstep::DeployOutcome {
    let dir = tempdir().unwrap();
    let prompt = ScriptedPrompt::answering("");
    let orchestrator =
        Orchestrator::new(executor, &prompt, config, dir.path()).with_start_time(new_year());
    let request = PromoteRequest::new(environment, from.map(str::to_string), flags).unwrap();
    orchestrator.promote(&request)
}

#[test]
fn production_promotes_the_staging_release_by_default() {
    let executor = ScriptedExecutor::new();
    let config = config();

    let report = promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap();

    assert_eq!(report.source_environment.as_deref(), Some("staging"));
    assert_eq!(report.commit, "def456");
    assert_eq!(report.tag.as_deref(), Some("deploy-production-2024-01-01"));

    let lines = executor.lines();
    assert_eq!(lines[0], "heroku pipelines:info acme");
    assert!(lines.contains(&"heroku apps:info --remote staging".to_string()));
    assert!(lines.contains(&"heroku apps:info --remote production".to_string()));
    assert!(lines.contains(&"heroku releases:info --json --remote staging".to_string()));
    assert!(lines.contains(&"heroku api GET /apps/acme-staging/slugs/slug-1".to_string()));
    assert!(lines.contains(
        &"heroku pipelines:promote --to acme-production --remote staging".to_string()
    ));

    let tag = executor.find(&["git", "tag", "-a"]).unwrap();
    assert!(tag.words[4].starts_with("Deploy to production from staging at 2024-01-01"));
    assert_eq!(tag.words[6], "def456");
}

#[test]
fn promote_without_downtime_scales_but_skips_maintenance() {
    let executor = ScriptedExecutor::new();
    let config = config();

    promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap();

    assert_eq!(
        executor.milestones(),
        vec![
            "pipeline-verify",
            "app-verify",
            "app-verify",
            "tag-create",
            "scale-down",
            "before-hook",
            "promote",
            "after-hook",
            "scale-up",
            "tag-push",
            "tag-delete",
        ]
    );
}

#[test]
fn promote_with_downtime_migrates_after_the_after_hook() {
    let executor = ScriptedExecutor::new();
    let config = config();
    let flags = PromoteFlags {
        allow_downtime: true,
        ..PromoteFlags::default()
    };

    promote(&executor, &config, "staging", Some("demo"), flags).unwrap();

    let milestones = executor.milestones();
    let inner: Vec<&str> = milestones
        .iter()
        .skip_while(|m| **m != "maintenance-on")
        .copied()
        .collect();
    assert_eq!(
        inner,
        vec![
            "maintenance-on",
            "before-hook",
            "promote",
            "after-hook",
            "migrate",
            "restart",
            "maintenance-off",
            "scale-up",
            "tag-push",
            "tag-delete",
        ]
    );
    assert!(executor
        .lines()
        .contains(&"heroku pipelines:promote --to acme-staging --remote demo".to_string()));
}

#[test]
fn staging_defaults_to_demo() {
    let executor = ScriptedExecutor::new();
    let config = config();

    let report = promote(&executor, &config, "staging", None, PromoteFlags::default()).unwrap();

    assert_eq!(report.source_environment.as_deref(), Some("demo"));
}

#[test]
fn unknown_source_fails_before_touching_any_app() {
    let executor = ScriptedExecutor::new();
    let config = config();

    let err = promote(&executor, &config, "qa", None, PromoteFlags::default()).unwrap_err();

    assert_eq!(err.code, ErrorCode::PromoteUnknownSource);
    assert_eq!(err.message, "Unknown remote to promote from");
    assert_eq!(executor.milestones(), vec!["pipeline-verify"]);
}

#[test]
fn failed_backup_is_cancelled_and_no_guard_is_entered() {
    let executor = ScriptedExecutor::new().fail(&["heroku", "pg:backups", "capture"]);
    let config = config();
    let flags = PromoteFlags {
        capture_backup_first: true,
        allow_downtime: true,
        ..PromoteFlags::default()
    };

    let err = promote(&executor, &config, "staging", Some("demo"), flags).unwrap_err();

    assert_eq!(err.code, ErrorCode::CommandFailed);
    assert_eq!(
        err.command_words().unwrap(),
        vec!["heroku", "pg:backups", "capture", "--remote", "staging"]
    );

    let lines = executor.lines();
    let capture = lines
        .iter()
        .position(|l| l == "heroku pg:backups capture --remote staging")
        .unwrap();
    assert_eq!(lines[capture + 1], "heroku pg:backups cancel --remote staging");
    assert_eq!(lines.len(), capture + 2);

    let milestones = executor.milestones();
    for guard in ["tag-create", "scale-down", "maintenance-on"] {
        assert!(!milestones.contains(&guard), "{} entered: {:?}", guard, milestones);
    }
}

#[test]
fn unknown_pipeline_is_reported() {
    let executor = ScriptedExecutor::new().fail(&["heroku", "pipelines:info"]);
    let config = config();

    let err = promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap_err();

    assert_eq!(err.code, ErrorCode::PlatformPipelineNotFound);
    assert_eq!(err.code.exit_code(), 4);
}

#[test]
fn pipeline_defaults_to_repository_name() {
    let executor = ScriptedExecutor::new();
    let config = Config::default();

    promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap();

    let lines = executor.lines();
    assert_eq!(lines[0], "git rev-parse --show-toplevel");
    assert_eq!(lines[1], "heroku pipelines:info acme");
}

#[test]
fn release_without_a_build_is_an_invalid_response() {
    let executor =
        ScriptedExecutor::new().respond(&["heroku", "releases:info", "--json"], r#"{"version": 1}"#);
    let config = config();

    let err = promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap_err();

    assert_eq!(err.code, ErrorCode::PlatformInvalidResponse);
    assert_eq!(executor.count(&["git", "tag", "-a"]), 0);
}

#[test]
fn failed_promotion_restores_workers_and_skips_tag_push() {
    let executor = ScriptedExecutor::new().fail(&["heroku", "pipelines:promote"]);
    let config = config();

    promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap_err();

    let milestones = executor.milestones();
    assert!(milestones.contains(&"scale-up"));
    assert!(milestones.contains(&"tag-delete"));
    assert!(!milestones.contains(&"tag-push"));
    assert!(!milestones.contains(&"after-hook"));
}

#[test]
fn overridden_target_app_receives_the_promotion() {
    let executor = ScriptedExecutor::new();
    let config = Config::parse(
        "pipeline: acme\napps:\n  production: acme-live\n",
        "stairstep.yml",
    )
    .unwrap();

    promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap();

    assert!(executor
        .lines()
        .contains(&"heroku pipelines:promote --to acme-live --remote staging".to_string()));
    assert!(executor
        .lines()
        .contains(&"heroku apps:info --app acme-live".to_string()));
}

#[test]
fn interrupt_after_promotion_skips_the_after_hook_and_tag_push() {
    let executor = ScriptedExecutor::new().interrupt_during(&["heroku", "pipelines:promote"]);
    let config = config();

    let err = promote(&executor, &config, "production", None, PromoteFlags::default()).unwrap_err();

    assert_eq!(err.code, ErrorCode::DeployInterrupted);
    let milestones = executor.milestones();
    let after_promote: Vec<&str> = milestones
        .iter()
        .skip_while(|m| **m != "promote")
        .skip(1)
        .copied()
        .collect();
    assert_eq!(after_promote, vec!["scale-up", "tag-delete"]);
}
