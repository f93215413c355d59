use clap::{ArgAction, Args};

use stairstep::{DeployReport, PromoteFlags, PromoteRequest};

use super::CmdResult;

#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// Environment to promote onto
    pub environment: String,

    /// Environment whose current release is promoted (production: staging, staging: demo)
    #[arg(long, value_name = "ENV")]
    pub from: Option<String>,

    /// Skip creating and pushing a deploy tag
    #[arg(long = "no-tag", action = ArgAction::SetFalse)]
    pub tag: bool,

    /// Enable maintenance mode and run migrations
    #[arg(long)]
    pub downtime: bool,

    /// Capture a database backup of the target first
    #[arg(long)]
    pub db_capture: bool,
}

impl PromoteArgs {
    pub fn flags(&self) -> PromoteFlags {
        PromoteFlags {
            create_tag: self.tag,
            allow_downtime: self.downtime,
            capture_backup_first: self.db_capture,
        }
    }
}

pub fn run(args: PromoteArgs, global: &crate::commands::GlobalArgs) -> CmdResult<DeployReport> {
    let request = PromoteRequest::new(&args.environment, args.from.clone(), args.flags())?;
    let report = super::with_orchestrator(global, |orchestrator| orchestrator.promote(&request))?;
    Ok((report, 0))
}
