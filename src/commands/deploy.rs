use clap::Args;
use serde::Serialize;

use cachebust::deploy::{self, DeployRequest, DeployRunResult};
use cachebust::utils::parser;

use super::{CmdResult, ProjectArgs};

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Target project IDs, comma-separated (defaults to defaultProjects)
    #[arg(long, value_name = "IDS")]
    pub projects: Option<String>,

    /// Version label (required for app-engine)
    #[arg(long)]
    pub version: Option<String>,

    /// Build, copy, rename and rewrite without invoking the deploy CLI
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
pub struct DeployOutput {
    pub command: String,
    #[serde(flatten)]
    pub run: DeployRunResult,
}

pub fn run(args: DeployArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let request = DeployRequest {
        project_root: args.project.root.clone(),
        config_path: args.project.config.clone(),
        platform: args.project.platform()?,
        projects: args
            .projects
            .as_deref()
            .map(parser::split_list)
            .unwrap_or_default(),
        version: args.version,
        dry_run: args.dry_run,
    };

    let result = deploy::run(&request)?;
    let exit_code = result.exit_code();

    Ok((
        DeployOutput {
            command: "deploy.run".to_string(),
            run: result,
        },
        exit_code,
    ))
}
