//! Filtered recursive copy of the source tree into the scratch tree.

use glob_match::glob_match;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::utils::io;

/// Directory exclusions applied while copying.
///
/// Hidden directories (name starts with `.`) are always excluded; the
/// configured patterns are globs matched against the directory name only.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    patterns: Vec<String>,
}

impl ExcludeRules {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn excludes_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.patterns.iter().any(|p| glob_match(p, name))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySummary {
    pub files: usize,
    pub dirs: usize,
    /// Excluded directories, relative to the source root.
    pub excluded: Vec<PathBuf>,
}

pub(crate) fn walk_error(e: walkdir::Error, operation: &str) -> Error {
    Error::internal_io(e.to_string(), Some(operation.to_string()))
}

pub(crate) fn relative<'a>(path: &'a Path, root: &Path) -> Result<&'a Path> {
    path.strip_prefix(root).map_err(|_| {
        Error::internal_unexpected(format!(
            "{} is outside {}",
            path.display(),
            root.display()
        ))
    })
}

/// Copy `source` into `dest`, skipping excluded directories.
///
/// `dest` must already exist. A `dest` nested inside `source` is never
/// copied into itself. Symlinks are followed and their targets copied as
/// regular files and directories; a symlink cycle is an error.
pub fn copy_tree(source: &Path, dest: &Path, rules: &ExcludeRules) -> Result<CopySummary> {
    let mut summary = CopySummary::default();
    let mut excluded = Vec::new();

    let walker = WalkDir::new(source)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.path().starts_with(dest) {
                return false;
            }
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                if rules.excludes_dir(&name) {
                    excluded.push(entry.path().to_path_buf());
                    return false;
                }
            }
            true
        });

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(e, "walk source tree"))?;
        if entry.depth() == 0 {
            continue;
        }

        let rel = relative(entry.path(), source)?;
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            io::create_dir_all(&target, "copy directory")?;
            summary.dirs += 1;
        } else if file_type.is_file() {
            io::copy_file(entry.path(), &target, "copy file")?;
            summary.files += 1;
        } else {
            log_status!("copy", "Skipping {} (not a file or directory)", rel.display());
        }
    }

    summary.excluded = excluded
        .iter()
        .filter_map(|p| p.strip_prefix(source).ok().map(Path::to_path_buf))
        .collect();

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn excludes_hidden_and_named_dirs() {
        let rules = ExcludeRules::new(vec!["node_modules".to_string(), "__*__".to_string()]);
        assert!(rules.excludes_dir(".git"));
        assert!(rules.excludes_dir("node_modules"));
        assert!(rules.excludes_dir("__tests__"));
        assert!(!rules.excludes_dir("public"));
        assert!(!rules.excludes_dir("node_modules_extra"));
    }

    #[test]
    fn copies_tree_without_excluded_dirs() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "app.js", "app");
        write(src.path(), "public/index.html", "<html>");
        write(src.path(), ".git/HEAD", "ref");
        write(src.path(), "node_modules/lib/index.js", "lib");
        write(src.path(), "tests/app.test.js", "test");
        write(src.path(), ".env", "SECRET=1");

        let rules = ExcludeRules::new(vec!["node_modules".to_string(), "tests".to_string()]);
        let summary = copy_tree(src.path(), dst.path(), &rules).unwrap();

        assert!(dst.path().join("app.js").is_file());
        assert!(dst.path().join("public/index.html").is_file());
        assert!(dst.path().join(".env").is_file());
        assert!(!dst.path().join(".git").exists());
        assert!(!dst.path().join("node_modules").exists());
        assert!(!dst.path().join("tests").exists());
        assert_eq!(summary.files, 3);
        assert_eq!(summary.dirs, 1);
        assert_eq!(summary.excluded.len(), 3);
    }

    #[test]
    fn excluding_several_siblings_prunes_each() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        for dir in [".a", ".b", "tests", "keep"] {
            write(src.path(), &format!("{}/f.js", dir), "x");
        }

        let rules = ExcludeRules::new(vec!["tests".to_string()]);
        copy_tree(src.path(), dst.path(), &rules).unwrap();

        assert!(dst.path().join("keep/f.js").exists());
        for dir in [".a", ".b", "tests"] {
            assert!(!dst.path().join(dir).exists(), "{} should be excluded", dir);
        }
    }

    #[test]
    fn nested_destination_is_not_copied_into_itself() {
        let src = tempfile::tempdir().unwrap();
        write(src.path(), "app.js", "app");
        let dest = src.path().join("tmp/scratch");
        fs::create_dir_all(&dest).unwrap();

        copy_tree(src.path(), &dest, &ExcludeRules::default()).unwrap();

        assert!(dest.join("app.js").is_file());
        assert!(!dest.join("tmp/scratch").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_contents_are_copied() {
        let src = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(outside.path(), "app.js", "app");
        write(outside.path(), "nested/util.js", "util");
        std::os::unix::fs::symlink(outside.path(), src.path().join("gen")).unwrap();

        let summary = copy_tree(src.path(), dst.path(), &ExcludeRules::default()).unwrap();

        let linked = dst.path().join("gen");
        assert!(linked.is_dir());
        assert!(!fs::symlink_metadata(&linked).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(linked.join("app.js")).unwrap(), "app");
        assert!(linked.join("nested/util.js").is_file());
        assert_eq!(summary.files, 2);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_file_is_copied_as_regular_file() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        write(src.path(), "real.js", "real");
        std::os::unix::fs::symlink(src.path().join("real.js"), src.path().join("alias.js")).unwrap();

        copy_tree(src.path(), dst.path(), &ExcludeRules::default()).unwrap();

        let alias = dst.path().join("alias.js");
        assert!(!fs::symlink_metadata(&alias).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(alias).unwrap(), "real");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_an_error() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a")).unwrap();
        std::os::unix::fs::symlink(src.path(), src.path().join("a/loop")).unwrap();

        let err = copy_tree(src.path(), dst.path(), &ExcludeRules::default()).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }
}
