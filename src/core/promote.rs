//! Re-release the build running on one environment onto another.

use crate::hooks::HookPhase;
use crate::orchestrator::{DeployOutcome, DeployReport, Orchestrator};
use crate::report;
use crate::request::PromoteRequest;
use crate::tag;

impl Orchestrator<'_> {
    pub fn promote(&self, request: &PromoteRequest) -> DeployOutcome {
        let environment = request.environment();
        let flags = request.flags();

        let pipeline = self.pipeline()?.to_string();
        self.heroku.verify_pipeline(&pipeline)?;

        let source = request.source_environment()?;
        report::info(&format!("Promoting {} to {}", source, environment));

        self.heroku.verify_app(&source)?;
        self.heroku.verify_app(environment)?;

        self.capture_backup_if(flags.capture_backup_first, environment)?;

        let release = self.heroku.current_release(&source)?;
        let source_app = self.heroku.app_name(&pipeline, &source);
        let commit = self.heroku.release_commit(&source_app, &release)?;
        let target_app = self.heroku.app_name(&pipeline, environment);

        log_status!("promote", "Promoting {} ({}) to {}", release, commit, target_app);

        let message = tag::promote_message(environment, &source, self.started_at());
        let tag = self.with_tag(flags.create_tag, environment, &commit, &message, || {
            self.with_scaled_down(true, environment, || {
                self.with_maintenance(flags.allow_downtime, environment, || {
                    self.heroku.run_hook(environment, HookPhase::BeforeDeploy)?;
                    self.heroku.promote_artifact(&source, &target_app)?;
                    self.heroku.run_hook(environment, HookPhase::AfterDeploy)?;
                    if flags.allow_downtime {
                        self.heroku.run_migration_and_restart(environment)?;
                    }
                    Ok(())
                })
            })
        })?;

        Ok(DeployReport {
            environment: environment.to_string(),
            source_environment: Some(source),
            commit,
            tag,
        })
    }
}
