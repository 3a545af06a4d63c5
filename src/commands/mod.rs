use clap::Args;
use std::path::PathBuf;

use cachebust::platform::Platform;

pub type CmdResult<T> = cachebust::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Arguments shared by every command that resolves project settings.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root containing the source tree
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Config file (defaults to <root>/cachebust.json when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deploy platform: hosting or app-engine
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,
}

impl ProjectArgs {
    /// Parsed here rather than by clap so a bad value gets the JSON envelope.
    pub fn platform(&self) -> cachebust::Result<Option<Platform>> {
        self.platform.as_deref().map(str::parse).transpose()
    }
}

pub mod config;
pub mod deploy;

macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (cachebust::Result<serde_json::Value>, i32) {
    crate::tty::status("cachebust is working...");

    match command {
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
