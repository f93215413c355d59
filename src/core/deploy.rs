//! Deploy a local commit to an environment.
//!
//! Guards nest as ref > tag > worker scale > maintenance, so a failure at
//! any step unwinds maintenance first and the deploy ref last.

use crate::build::Builder;
use crate::error::Result;
use crate::git::deploy_ref_name;
use crate::guard::{with_guard, ReleasePolicy};
use crate::hooks::HookPhase;
use crate::orchestrator::{DeployOutcome, DeployReport, Orchestrator};
use crate::report;
use crate::request::DeployRequest;
use crate::tag;

/// Deploy tip and tag produced under the deploy ref.
struct Released {
    commit: String,
    tag: Option<String>,
}

impl Orchestrator<'_> {
    pub fn deploy(&self, request: &DeployRequest) -> DeployOutcome {
        let environment = request.environment();
        let flags = request.flags();

        report::info(&format!("Deploying to {}", environment));

        self.heroku.verify_app(environment)?;
        self.git.verify_clean()?;

        let builder = self.builder();
        builder.ensure_log_dir()?;

        self.capture_backup_if(flags.capture_backup_first, environment)?;

        let commit = self.git.resolve_commit(request.commit_ref())?;
        let prior_checkout = self.git.current_checkout()?;
        let ref_name = deploy_ref_name(environment);

        log_status!("deploy", "Deploying {} via {}", commit, ref_name);

        let released = with_guard(
            "deploy ref",
            ReleasePolicy::Propagate,
            || {
                self.git.create_ref(&ref_name, &commit)?;
                self.git.checkout_detached(&ref_name)
            },
            || self.build_and_release(request, &builder, &ref_name),
            || {
                let restored = self.git.checkout(&prior_checkout);
                let deleted = self.git.delete_ref(&ref_name);
                restored.and(deleted)
            },
        )?;

        Ok(DeployReport {
            environment: environment.to_string(),
            source_environment: None,
            commit: released.commit,
            tag: released.tag,
        })
    }

    fn build_and_release(
        &self,
        request: &DeployRequest,
        builder: &Builder,
        ref_name: &str,
    ) -> Result<Released> {
        let environment = request.environment();
        let flags = request.flags();

        builder.install_dependencies()?;
        for step in request.build_steps() {
            builder.run_step(&self.git, ref_name, step)?;
        }

        let tip = self.git.resolve_commit(ref_name)?;
        let message = tag::deploy_message(environment, self.started_at());

        let tag = self.with_tag(request.creates_tag(), environment, &tip, &message, || {
            if flags.force_push {
                self.confirm_force(environment)?;
            }

            self.with_scaled_down(!flags.initial_deploy, environment, || {
                self.with_maintenance(flags.allow_downtime, environment, || {
                    self.release(request, builder, ref_name, &tip)
                })
            })
        })?;

        Ok(Released { commit: tip, tag })
    }

    fn release(
        &self,
        request: &DeployRequest,
        builder: &Builder,
        ref_name: &str,
        tip: &str,
    ) -> Result<()> {
        let environment = request.environment();
        let flags = request.flags();

        self.heroku.run_hook(environment, HookPhase::BeforeDeploy)?;

        if request.precompiles_assets() {
            builder.strip_caches()?;
            let app = self.app_name(environment)?;
            self.heroku.create_build(&app, tip)?;
        } else {
            let refspec = format!("{}:refs/heads/{}", ref_name, self.config.deploy_branch);
            self.git
                .push(&self.heroku.git_remote(environment), &refspec, flags.force_push)?;
        }

        if flags.allow_downtime {
            self.heroku.run_migration_and_restart(environment)?;
        }

        self.heroku.run_hook(environment, HookPhase::AfterDeploy)
    }
}
