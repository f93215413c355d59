use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::GlobalArgs;

#[macro_use]
extern crate stairstep;

mod commands;
mod output;
mod tty;

use commands::{deploy, promote};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "stairstep")]
#[command(version = VERSION)]
#[command(about = "Deploy and promote environments of a Heroku pipeline")]
struct Cli {
    /// Configuration file, relative to the working directory
    #[arg(long, global = true, value_name = "PATH", default_value = stairstep::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the full error, including the failed command, on failure
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a local commit to an environment
    Deploy(deploy::DeployArgs),
    /// Promote another environment's release onto an environment
    Promote(promote::PromoteArgs),
}

fn requires_tty(command: &Commands) -> bool {
    match command {
        Commands::Deploy(args) => args.is_interactive(),
        Commands::Promote(_) => false,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        config: cli.config,
        debug: cli.debug,
    };

    if requires_tty(&cli.command) && !tty::require_tty_for_interactive() {
        let err = stairstep::Error::validation_invalid_argument(
            "tty",
            "--force asks for confirmation and requires an interactive TTY",
        );
        output::print_failure(&err, global.debug);
        return std::process::ExitCode::from(exit_code_to_u8(output::exit_code_for_error(err.code)));
    }

    stairstep::interrupt::install();
    tty::status("stairstep is working...");

    match commands::run(cli.command, &global) {
        Ok((result, exit_code)) => {
            output::print_success(&result);
            std::process::ExitCode::from(exit_code_to_u8(exit_code))
        }
        Err(err) => {
            output::print_failure(&err, global.debug);
            std::process::ExitCode::from(exit_code_to_u8(output::exit_code_for_error(err.code)))
        }
    }
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
