use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::build::{self, BuildReport};
use crate::config::{self, Settings};
use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::rename::{self, RenameEntry};
use crate::rewrite::{self, ReferenceRewriter, RewriteSummary};
use crate::scratch::{self, ScratchDir};
use crate::suffix::RunSuffix;
use crate::tree::{self, CopySummary, ExcludeRules};
use crate::utils::command::{execute_program_in_dir, CapturedOutput};
use crate::utils::parser;
use crate::utils::shell;

/// Everything the CLI hands to one deploy run.
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    pub project_root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub platform: Option<Platform>,
    /// Explicit targets; empty falls back to the config's default projects.
    pub projects: Vec<String>,
    pub version: Option<String>,
    pub dry_run: bool,
}

/// Result for a single target project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDeployResult {
    pub project: String,
    pub status: String,
    pub command: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    #[serde(flatten)]
    pub output: CapturedOutput,
}

impl TargetDeployResult {
    fn new(project: &str, command: String) -> Self {
        Self {
            project: project.to_string(),
            status: String::new(),
            command,
            exit_code: None,
            error: None,
            output: CapturedOutput::default(),
        }
    }

    fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    fn with_output(mut self, output: CapturedOutput) -> Self {
        self.output = output;
        self
    }
}

/// Summary of per-target outcomes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploySummary {
    pub total: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl DeploySummary {
    fn from_results(results: &[TargetDeployResult]) -> Self {
        let mut summary = DeploySummary {
            total: results.len() as u32,
            ..DeploySummary::default()
        };
        for result in results {
            match result.status.as_str() {
                "deployed" => summary.succeeded += 1,
                "skipped" => summary.skipped += 1,
                _ => summary.failed += 1,
            }
        }
        summary
    }
}

/// Outcome of one full run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRunResult {
    pub platform: Platform,
    pub suffix: RunSuffix,
    pub scratch_path: PathBuf,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildReport>,
    pub copy: CopySummary,
    /// Files that received the suffix; identity entries are omitted.
    pub renamed: Vec<RenameEntry>,
    /// Files left unrenamed because their name is not valid UTF-8.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rename_skipped: Vec<PathBuf>,
    pub rewrite: RewriteSummary,
    pub results: Vec<TargetDeployResult>,
    pub summary: DeploySummary,
}

impl DeployRunResult {
    /// Process exit status: 1 when any target failed.
    pub fn exit_code(&self) -> i32 {
        if self.summary.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// Resolve settings, validate the request, then execute one run.
pub fn run(request: &DeployRequest) -> Result<DeployRunResult> {
    let settings = config::resolve(
        &request.project_root,
        request.config_path.as_deref(),
        request.platform,
    )?;

    let targets = resolve_targets(&request.projects, &settings)?;
    let version = resolve_version(settings.platform, request.version.as_deref())?;

    execute(
        &settings,
        &targets,
        version.as_deref(),
        request.dry_run,
        &RunSuffix::now(),
    )
}

/// Explicit projects win over the config's defaults. At least one is required.
///
/// Repeated ids are kept: each occurrence is its own deploy invocation.
pub fn resolve_targets(projects: &[String], settings: &Settings) -> Result<Vec<String>> {
    let targets = if projects.is_empty() {
        settings.default_projects.clone()
    } else {
        projects.to_vec()
    };

    let targets: Vec<String> = targets
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if targets.is_empty() {
        return Err(Error::validation_missing_argument(vec![
            "projects".to_string()
        ])
        .with_hint("Pass --projects a,b or set defaultProjects in cachebust.json"));
    }

    Ok(targets)
}

/// Version label required by the platform, if any.
pub fn resolve_version(platform: Platform, version: Option<&str>) -> Result<Option<String>> {
    let version = version.map(str::trim).filter(|v| !v.is_empty());

    if !platform.requires_version() {
        if let Some(v) = version {
            log_status!("deploy", "Ignoring --version {} for {}", v, platform);
        }
        return Ok(None);
    }

    match version {
        Some(v) => Ok(Some(v.to_string())),
        None => Err(Error::validation_missing_argument(vec!["version".to_string()])
            .with_hint(format!("The {} platform deploys a named version", platform))),
    }
}

/// Execute one run with already-validated inputs.
///
/// Build failure aborts before the scratch tree exists. Once created, the
/// scratch tree is removed on every return path.
pub fn execute(
    settings: &Settings,
    targets: &[String],
    version: Option<&str>,
    dry_run: bool,
    suffix: &RunSuffix,
) -> Result<DeployRunResult> {
    let scratch_path = settings.scratch_path();
    scratch::clear_leftover(&scratch_path)?;

    let build = build::run_build(settings.build_command.as_deref(), &settings.project_root)?;

    let scratch = ScratchDir::create(scratch_path)?;
    log_status!(
        "copy",
        "Copying {} to {}",
        settings.project_root.display(),
        scratch.path().display()
    );
    let copy = tree::copy_tree(
        &settings.project_root,
        scratch.path(),
        &ExcludeRules::new(settings.exclude.clone()),
    )?;

    let table = rename::apply_renames(scratch.path(), &settings.rename_rules(), suffix)?;
    let rewriter = ReferenceRewriter::new(&table.substitutions())?;
    let rewrite = rewrite::rewrite_tree(scratch.path(), &rewriter, &settings.cache_patch())?;

    let results: Vec<TargetDeployResult> = targets
        .iter()
        .map(|project| deploy_target(settings, project, version, scratch.path(), dry_run))
        .collect();
    let summary = DeploySummary::from_results(&results);

    log_status!(
        "deploy",
        "{} deployed, {} failed, {} skipped",
        summary.succeeded,
        summary.failed,
        summary.skipped
    );

    Ok(DeployRunResult {
        platform: settings.platform,
        suffix: suffix.clone(),
        scratch_path: scratch.path().to_path_buf(),
        dry_run,
        build,
        copy,
        renamed: table.renamed().cloned().collect(),
        rename_skipped: table.skipped_non_utf8().to_vec(),
        rewrite,
        results,
        summary,
    })
}

/// Invoke the deploy program for one target. Failures are data, not errors.
fn deploy_target(
    settings: &Settings,
    project: &str,
    version: Option<&str>,
    scratch_root: &Path,
    dry_run: bool,
) -> TargetDeployResult {
    let invocation =
        settings
            .platform
            .deploy_invocation(&settings.deploy_program, project, version, scratch_root);
    let command = shell::command_line(&invocation.program, &invocation.args);
    let result = TargetDeployResult::new(project, command.clone());

    if dry_run {
        log_status!("deploy", "Dry run, not running: {}", command);
        return result.with_status("skipped");
    }

    log_status!("deploy", "Deploying {}: {}", project, command);
    let output = execute_program_in_dir(
        &invocation.program,
        &invocation.args,
        invocation.current_dir.as_deref(),
    );

    let result = result
        .with_exit_code(output.exit_code)
        .with_output(CapturedOutput::from(&output));

    if output.success {
        result.with_status("deployed")
    } else {
        log_status!(
            "deploy",
            "Deploy to {} failed (exit code {})",
            project,
            output.exit_code
        );
        let error = match output.error_text() {
            "" => format!("Deploy command exited with code {}", output.exit_code),
            text => parser::tail_lines(text, 15),
        };
        result.with_status("failed").with_error(error)
    }
}
