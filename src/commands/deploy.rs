use clap::{ArgAction, Args};

use stairstep::{DeployFlags, DeployReport, DeployRequest};

use super::CmdResult;

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Environment to deploy to (also the name of its git remote)
    pub environment: String,

    /// Commit to deploy instead of HEAD
    #[arg(long, value_name = "REF")]
    pub commit: Option<String>,

    /// Skip creating and pushing a deploy tag
    #[arg(long = "no-tag", action = ArgAction::SetFalse)]
    pub tag: bool,

    /// Enable maintenance mode and run migrations
    #[arg(long)]
    pub downtime: bool,

    /// Capture a database backup before deploying
    #[arg(long)]
    pub db_capture: bool,

    /// Force push to the platform (asks for confirmation)
    #[arg(long)]
    pub force: bool,

    /// First deploy to the environment; leaves worker processes alone
    #[arg(long)]
    pub initial_deploy: bool,

    /// Commit precompiled assets and build on the platform
    #[arg(long)]
    pub assets_precompile: bool,

    /// Commit packaged gems into vendor/cache
    #[arg(long)]
    pub bundle_package: bool,

    /// Deploy the working commit as-is: no build commits, no tag
    #[arg(long)]
    pub development: bool,
}

impl DeployArgs {
    pub fn flags(&self) -> DeployFlags {
        DeployFlags {
            create_tag: self.tag,
            allow_downtime: self.downtime,
            capture_backup_first: self.db_capture,
            force_push: self.force,
            initial_deploy: self.initial_deploy,
            precompile_assets: self.assets_precompile,
            package_dependencies: self.bundle_package,
            development_mode: self.development,
        }
    }

    /// Force pushes need an operator at the terminal to confirm.
    pub fn is_interactive(&self) -> bool {
        self.force
    }
}

pub fn run(args: DeployArgs, global: &crate::commands::GlobalArgs) -> CmdResult<DeployReport> {
    let request = DeployRequest::new(&args.environment, args.commit.clone(), args.flags())?;
    let report = super::with_orchestrator(global, |orchestrator| orchestrator.deploy(&request))?;
    Ok((report, 0))
}
