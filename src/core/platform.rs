//! Deploy platforms and their fixed conventions.
//!
//! Each platform names the config file the deploy CLI reads, the cache
//! header patch applied to it, and the argv used to deploy one project.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Static hosting CLI (`firebase deploy --project <id>`), run from the scratch root.
    #[default]
    Hosting,
    /// Cloud app deploy CLI (`gcloud app deploy ...`), given an explicit config path.
    AppEngine,
}

/// Literal text substitution applied to the platform config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePatch {
    pub file_name: String,
    pub pattern: String,
    pub replacement: String,
}

impl CachePatch {
    pub fn applies_to(&self, file_name: &str) -> bool {
        self.file_name == file_name
    }
}

/// One fully resolved deploy subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Hosting, Platform::AppEngine];

    pub fn id(self) -> &'static str {
        match self {
            Platform::Hosting => "hosting",
            Platform::AppEngine => "app-engine",
        }
    }

    /// Config file the deploy CLI reads. Never renamed.
    pub fn config_file(self) -> &'static str {
        match self {
            Platform::Hosting => "firebase.json",
            Platform::AppEngine => "app.yaml",
        }
    }

    pub fn cache_patch(self) -> CachePatch {
        let (pattern, replacement) = match self {
            Platform::Hosting => ("max-age=0", "max-age=31536000"),
            Platform::AppEngine => (r#"expiration: "0""#, r#"expiration: "365d""#),
        };
        CachePatch {
            file_name: self.config_file().to_string(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }

    pub fn requires_version(self) -> bool {
        matches!(self, Platform::AppEngine)
    }

    pub fn default_deploy_program(self) -> &'static str {
        match self {
            Platform::Hosting => "firebase",
            Platform::AppEngine => "gcloud",
        }
    }

    pub fn default_index_extensions(self) -> &'static [&'static str] {
        match self {
            Platform::Hosting => &[".js"],
            Platform::AppEngine => &[".js", ".json"],
        }
    }

    pub fn default_always_rename(self) -> &'static [&'static str] {
        match self {
            Platform::Hosting => &["manifest.json"],
            Platform::AppEngine => &[],
        }
    }

    pub fn default_exclude(self) -> &'static [&'static str] {
        match self {
            Platform::Hosting => &["node_modules", "static", "tests", "__tests__"],
            Platform::AppEngine => &["node_modules", "tests", "__tests__"],
        }
    }

    /// Build the deploy subprocess for one target project.
    ///
    /// `version` is only consulted by platforms that require one; callers
    /// validate its presence before reaching here.
    pub fn deploy_invocation(
        self,
        program: &str,
        project: &str,
        version: Option<&str>,
        scratch_root: &Path,
    ) -> DeployInvocation {
        match self {
            Platform::Hosting => DeployInvocation {
                program: program.to_string(),
                args: vec![
                    "deploy".to_string(),
                    "--project".to_string(),
                    project.to_string(),
                ],
                current_dir: Some(scratch_root.to_path_buf()),
            },
            Platform::AppEngine => DeployInvocation {
                program: program.to_string(),
                args: vec![
                    "app".to_string(),
                    "deploy".to_string(),
                    "-q".to_string(),
                    "--project".to_string(),
                    project.to_string(),
                    "--version".to_string(),
                    version.unwrap_or_default().to_string(),
                    scratch_root
                        .join(self.config_file())
                        .to_string_lossy()
                        .to_string(),
                ],
                current_dir: None,
            },
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.id() == s.trim())
            .ok_or_else(|| {
                Error::validation_invalid_argument(
                    "platform",
                    format!("Unknown platform '{}'", s),
                    Some(Platform::ALL.iter().map(|p| p.id().to_string()).collect()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_ids() {
        assert_eq!("hosting".parse::<Platform>().unwrap(), Platform::Hosting);
        assert_eq!("app-engine".parse::<Platform>().unwrap(), Platform::AppEngine);
    }

    #[test]
    fn rejects_unknown_id_with_candidates() {
        let err = "heroku".parse::<Platform>().unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert_eq!(err.details["tried"][1], "app-engine");
    }

    #[test]
    fn serde_uses_kebab_case() {
        let p: Platform = serde_json::from_str(r#""app-engine""#).unwrap();
        assert_eq!(p, Platform::AppEngine);
    }

    #[test]
    fn hosting_runs_inside_scratch_root() {
        let inv = Platform::Hosting.deploy_invocation(
            "firebase",
            "mk-time",
            None,
            Path::new("/tmp/scratch"),
        );
        assert_eq!(inv.args, vec!["deploy", "--project", "mk-time"]);
        assert_eq!(inv.current_dir.as_deref(), Some(Path::new("/tmp/scratch")));
    }

    #[test]
    fn app_engine_passes_explicit_config_path() {
        let inv = Platform::AppEngine.deploy_invocation(
            "gcloud",
            "google.com:make-time",
            Some("stable"),
            Path::new("/tmp/scratch"),
        );
        assert_eq!(
            inv.args,
            vec![
                "app",
                "deploy",
                "-q",
                "--project",
                "google.com:make-time",
                "--version",
                "stable",
                "/tmp/scratch/app.yaml",
            ]
        );
        assert!(inv.current_dir.is_none());
    }

    #[test]
    fn cache_patches_target_platform_config() {
        let hosting = Platform::Hosting.cache_patch();
        assert!(hosting.applies_to("firebase.json"));
        assert_eq!(hosting.replacement, "max-age=31536000");

        let gae = Platform::AppEngine.cache_patch();
        assert!(gae.applies_to("app.yaml"));
        assert_eq!(gae.pattern, r#"expiration: "0""#);
        assert_eq!(gae.replacement, r#"expiration: "365d""#);
    }
}
