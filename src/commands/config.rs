use clap::{Args, Subcommand};
use serde::Serialize;

use cachebust::config::{self, Settings};

use super::{CmdResult, ProjectArgs};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display resolved settings (platform defaults + cachebust.json)
    Show {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    settings: Settings,
    scratch_path: String,
}

pub fn run(args: ConfigArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { project } => show(&project),
    }
}

fn show(project: &ProjectArgs) -> CmdResult<ConfigOutput> {
    let settings = config::resolve(&project.root, project.config.as_deref(), project.platform()?)?;
    let scratch_path = settings.scratch_path().display().to_string();

    Ok((
        ConfigOutput {
            command: "config.show".to_string(),
            settings,
            scratch_path,
        },
        0,
    ))
}
