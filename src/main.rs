use clap::{Parser, Subcommand};

mod commands;
mod output;
mod tty;

use commands::{config, deploy, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "cachebust")]
#[command(version = VERSION)]
#[command(about = "Build, cache-bust and deploy a static web app")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, rename assets with a run suffix and deploy to each target project
    Deploy(deploy::DeployArgs),
    /// Inspect resolved project configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
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
