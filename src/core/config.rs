//! Project configuration.
//!
//! `cachebust.json` in the project root is optional. Every key falls back to
//! the selected platform's defaults, and CLI flags override both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::platform::{CachePatch, Platform};
use crate::rename::RenameRules;
use crate::scratch;
use crate::utils::io;

pub const CONFIG_FILE_NAME: &str = "cachebust.json";
pub const DEFAULT_BUILD_COMMAND: &str = "./node_modules/typescript/bin/tsc";
pub const DEFAULT_SCRATCH_NAME: &str = "cachebust_deploy";
pub const DEFAULT_SKIP_RENAME_DIRS: &[&str] = &["tests"];

/// On-disk shape of `cachebust.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// Shell command run in the project root. Empty string disables the build step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    /// Directory-name glob patterns left out of the scratch copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_rename_dirs: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_extensions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_rename: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_projects: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_program: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_name: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub project_root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    pub exclude: Vec<String>,
    pub skip_rename_dirs: Vec<String>,
    pub index_extensions: Vec<String>,
    pub always_rename: Vec<String>,
    pub default_projects: Vec<String>,
    pub deploy_program: String,
    pub scratch_root: PathBuf,
    pub scratch_name: String,
}

impl Settings {
    pub fn cache_patch(&self) -> CachePatch {
        self.platform.cache_patch()
    }

    pub fn rename_rules(&self) -> RenameRules {
        RenameRules {
            index_extensions: self.index_extensions.clone(),
            always_rename: self.always_rename.clone(),
            never_rename: vec![self.platform.config_file().to_string()],
            skip_dirs: self.skip_rename_dirs.clone(),
        }
    }

    /// Scratch path for this process.
    pub fn scratch_path(&self) -> PathBuf {
        scratch::path_for(&self.scratch_root, &self.scratch_name)
    }
}

/// Read and parse a config file.
pub fn read(path: &Path) -> Result<ProjectConfig> {
    let raw = io::read_file(path, "read config")?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::config_invalid_json(path.to_string_lossy(), e))
}

/// Locate the config file: an explicit path must exist, the implicit
/// `<root>/cachebust.json` may be absent.
pub fn locate(project_root: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        let path = expand_path(path, project_root);
        if !path.is_file() {
            return Err(Error::validation_invalid_argument(
                "config",
                format!("Config file not found: {}", path.display()),
                None,
            ));
        }
        return Ok(Some(path));
    }

    let implicit = project_root.join(CONFIG_FILE_NAME);
    Ok(implicit.is_file().then_some(implicit))
}

/// Resolve settings for a project root, layering file config over platform defaults.
pub fn resolve(
    project_root: &Path,
    explicit_config: Option<&Path>,
    platform_override: Option<Platform>,
) -> Result<Settings> {
    let project_root = resolve_project_root(project_root)?;
    let config_path = locate(&project_root, explicit_config)?;
    let config = match &config_path {
        Some(path) => read(path)?,
        None => ProjectConfig::default(),
    };

    build_settings(project_root, config_path, config, platform_override)
}

/// Merge a parsed config with platform defaults. Pure apart from `~` expansion.
pub fn build_settings(
    project_root: PathBuf,
    config_path: Option<PathBuf>,
    config: ProjectConfig,
    platform_override: Option<Platform>,
) -> Result<Settings> {
    let platform = platform_override.or(config.platform).unwrap_or_default();

    let build_command = match config.build_command {
        Some(cmd) if cmd.trim().is_empty() => None,
        Some(cmd) => Some(cmd),
        None => Some(DEFAULT_BUILD_COMMAND.to_string()),
    };

    let exclude = config
        .exclude
        .unwrap_or_else(|| to_strings(platform.default_exclude()));
    validate_names("exclude", &exclude)?;

    let skip_rename_dirs = config
        .skip_rename_dirs
        .unwrap_or_else(|| to_strings(DEFAULT_SKIP_RENAME_DIRS));
    validate_names("skipRenameDirs", &skip_rename_dirs)?;

    let index_extensions = config
        .index_extensions
        .unwrap_or_else(|| to_strings(platform.default_index_extensions()))
        .iter()
        .map(|ext| normalize_extension(ext))
        .collect::<Result<Vec<_>>>()?;

    let always_rename = config
        .always_rename
        .unwrap_or_else(|| to_strings(platform.default_always_rename()));
    validate_names("alwaysRename", &always_rename)?;

    let default_projects = config.default_projects.unwrap_or_default();

    let deploy_program = match config.deploy_program {
        Some(program) if program.trim().is_empty() => {
            return Err(Error::config_invalid_value(
                "deployProgram",
                Some(program),
                "must not be empty",
            ))
        }
        Some(program) => program,
        None => platform.default_deploy_program().to_string(),
    };

    let scratch_root = match config.scratch_root {
        Some(root) => expand_path(Path::new(&root), &project_root),
        None => std::env::temp_dir(),
    };

    let scratch_name = config
        .scratch_name
        .unwrap_or_else(|| DEFAULT_SCRATCH_NAME.to_string());
    if scratch_name.trim().is_empty()
        || scratch_name.contains(&['/', '\\'][..])
        || scratch_name == ".."
    {
        return Err(Error::config_invalid_value(
            "scratchName",
            Some(scratch_name),
            "must be a plain directory name",
        ));
    }

    Ok(Settings {
        project_root,
        config_path,
        platform,
        build_command,
        exclude,
        skip_rename_dirs,
        index_extensions,
        always_rename,
        default_projects,
        deploy_program,
        scratch_root,
        scratch_name,
    })
}

fn resolve_project_root(root: &Path) -> Result<PathBuf> {
    let expanded = PathBuf::from(shellexpand::tilde(&root.to_string_lossy()).as_ref());
    if !expanded.is_dir() {
        return Err(Error::validation_invalid_argument(
            "root",
            format!("Project root is not a directory: {}", expanded.display()),
            None,
        ));
    }
    expanded.canonicalize().map_err(|e| {
        Error::internal_io(
            format!("{}: {}", expanded.display(), e),
            Some("resolve project root".to_string()),
        )
    })
}

/// Expand `~` and anchor relative paths at `base`.
fn expand_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

fn normalize_extension(ext: &str) -> Result<String> {
    let trimmed = ext.trim();
    let bare = trimmed.trim_start_matches('.');
    if bare.is_empty() || bare.contains(&['/', '\\'][..]) {
        return Err(Error::config_invalid_value(
            "indexExtensions",
            Some(ext.to_string()),
            "extensions must be non-empty, like \".js\"",
        ));
    }
    Ok(format!(".{}", bare))
}

fn validate_names(key: &str, names: &[String]) -> Result<()> {
    match names.iter().find(|n| n.trim().is_empty()) {
        Some(bad) => Err(Error::config_invalid_value(
            key,
            Some(bad.clone()),
            "entries must not be empty",
        )),
        None => Ok(()),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
