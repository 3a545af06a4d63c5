//! Cache-busting renames: rules, the first tree walk, and the rename table.

use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::suffix::RunSuffix;
use crate::tree::{relative, walk_error};
use crate::utils::io;

const SOURCE_MAP_EXTENSION: &str = ".map";

/// Which files get the run suffix.
#[derive(Debug, Clone, Default)]
pub struct RenameRules {
    /// Extensions (with leading dot) that are always suffixed.
    pub index_extensions: Vec<String>,
    /// Full file names that are always suffixed.
    pub always_rename: Vec<String>,
    /// Full file names that are never renamed, checked first.
    pub never_rename: Vec<String>,
    /// Directory names the walk does not descend into.
    pub skip_dirs: Vec<String>,
}

impl RenameRules {
    pub fn skips_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.skip_dirs.iter().any(|d| d == name)
    }

    /// New name for `file_name`. Unmatched names map to themselves.
    pub fn renamed(&self, file_name: &str, suffix: &RunSuffix) -> String {
        if self.never_rename.iter().any(|n| n == file_name) {
            return file_name.to_string();
        }

        let (base, ext) = split_extension(file_name);

        if self.always_rename.iter().any(|n| n == file_name)
            || self.index_extensions.iter().any(|e| e == ext)
        {
            return format!("{}{}{}", base, suffix, ext);
        }

        if ext == SOURCE_MAP_EXTENSION {
            let (inner, sub_ext) = split_extension(base);
            return format!("{}{}{}{}", inner, suffix, sub_ext, ext);
        }

        file_name.to_string()
    }
}

/// Split `name` at its last `.`. Leading dots never start an extension,
/// so `.htaccess` has none and `app.js.map` splits into `app.js` + `.map`.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// One file seen by the rename walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameEntry {
    /// Original path, relative to the scratch root.
    pub path: PathBuf,
    pub from: String,
    pub to: String,
}

impl RenameEntry {
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

/// Rename table keyed by relative path, in walk order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameTable {
    entries: Vec<RenameEntry>,
    /// Files whose basename is not valid UTF-8; never renamed or matched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped_non_utf8: Vec<PathBuf>,
}

impl RenameTable {
    pub fn push(&mut self, entry: RenameEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped_non_utf8(&self) -> &[PathBuf] {
        &self.skipped_non_utf8
    }

    pub fn get(&self, path: &Path) -> Option<&RenameEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn renamed(&self) -> impl Iterator<Item = &RenameEntry> {
        self.entries.iter().filter(|e| !e.is_identity())
    }

    /// Distinct non-identity `(from, to)` basename pairs, first occurrence wins.
    ///
    /// Files sharing a basename in different directories always share a new
    /// name too, since the rules only look at the basename.
    pub fn substitutions(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for entry in self.renamed() {
            if !pairs.iter().any(|(from, _)| *from == entry.from) {
                pairs.push((entry.from.clone(), entry.to.clone()));
            }
        }
        pairs
    }
}

/// Walk `root` top-down, renaming matching files in place.
///
/// Directories are pruned before descent; files inside pruned directories
/// are neither renamed nor recorded.
pub fn apply_renames(root: &Path, rules: &RenameRules, suffix: &RunSuffix) -> Result<RenameTable> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !rules.skips_dir(&entry.file_name().to_string_lossy())
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(e, "walk scratch tree"))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    let mut table = RenameTable::default();
    for path in files {
        let rel = relative(&path, root)?.to_path_buf();
        let Some(from) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            log_status!("rename", "Leaving {} in place (name is not UTF-8)", rel.display());
            table.skipped_non_utf8.push(rel);
            continue;
        };
        let to = rules.renamed(&from, suffix);

        if to != from {
            io::rename_new(&path, &path.with_file_name(&to), "rename file")?;
        }

        table.push(RenameEntry { path: rel, from, to });
    }

    log_status!(
        "rename",
        "Renamed {} of {} files with suffix {}",
        table.renamed().count(),
        table.len(),
        suffix
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rules() -> RenameRules {
        RenameRules {
            index_extensions: vec![".js".to_string(), ".json".to_string()],
            always_rename: vec!["manifest.webmanifest".to_string()],
            never_rename: vec!["firebase.json".to_string()],
            skip_dirs: vec!["tests".to_string()],
        }
    }

    fn suffix() -> RunSuffix {
        RunSuffix::from_timestamp(1700000000)
    }

    #[test]
    fn split_extension_cases() {
        assert_eq!(split_extension("app.js"), ("app", ".js"));
        assert_eq!(split_extension("app.js.map"), ("app.js", ".map"));
        assert_eq!(split_extension("Makefile"), ("Makefile", ""));
        assert_eq!(split_extension(".htaccess"), (".htaccess", ""));
        assert_eq!(split_extension("..hidden"), ("..hidden", ""));
        assert_eq!(split_extension(".eslintrc.json"), (".eslintrc", ".json"));
    }

    #[test]
    fn index_extensions_get_suffix_before_extension() {
        let r = rules();
        assert_eq!(r.renamed("app.js", &suffix()), "app-1700000000.js");
        assert_eq!(r.renamed("manifest.json", &suffix()), "manifest-1700000000.json");
    }

    #[test]
    fn always_rename_matches_full_name() {
        let r = rules();
        assert_eq!(
            r.renamed("manifest.webmanifest", &suffix()),
            "manifest-1700000000.webmanifest"
        );
        assert_eq!(r.renamed("other.webmanifest", &suffix()), "other.webmanifest");
    }

    #[test]
    fn source_maps_get_suffix_before_inner_extension() {
        let r = rules();
        assert_eq!(r.renamed("app.js.map", &suffix()), "app-1700000000.js.map");
        assert_eq!(r.renamed("style.map", &suffix()), "style-1700000000.map");
    }

    #[test]
    fn unmatched_and_protected_names_are_identity() {
        let r = rules();
        assert_eq!(r.renamed("index.html", &suffix()), "index.html");
        assert_eq!(r.renamed("firebase.json", &suffix()), "firebase.json");
    }

    #[test]
    fn walk_renames_on_disk_and_records_identity() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("gen")).unwrap();
        fs::write(root.join("index.html"), "").unwrap();
        fs::write(root.join("gen/main.js"), "").unwrap();
        fs::write(root.join("gen/main.js.map"), "").unwrap();

        let table = apply_renames(root, &rules(), &suffix()).unwrap();

        assert!(root.join("gen/main-1700000000.js").is_file());
        assert!(root.join("gen/main-1700000000.js.map").is_file());
        assert!(!root.join("gen/main.js").exists());
        assert_eq!(table.len(), 3);

        let html = table.get(Path::new("index.html")).unwrap();
        assert!(html.is_identity());
        let js = table.get(Path::new("gen/main.js")).unwrap();
        assert_eq!(js.to, "main-1700000000.js");
    }

    #[test]
    fn walk_skips_hidden_and_test_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for d in [".cache", ".git", "tests", "src"] {
            fs::create_dir_all(root.join(d)).unwrap();
            fs::write(root.join(d).join("a.js"), "").unwrap();
        }

        let table = apply_renames(root, &rules(), &suffix()).unwrap();

        assert_eq!(table.len(), 1);
        assert!(root.join("src/a-1700000000.js").exists());
        assert!(root.join(".cache/a.js").exists());
        assert!(root.join(".git/a.js").exists());
        assert!(root.join("tests/a.js").exists());
    }

    #[test]
    fn substitutions_dedupe_shared_basenames() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("a/util.js"), "").unwrap();
        fs::write(root.join("b/util.js"), "").unwrap();
        fs::write(root.join("readme.txt"), "").unwrap();

        let table = apply_renames(root, &rules(), &suffix()).unwrap();

        assert_eq!(table.renamed().count(), 2);
        assert_eq!(
            table.substitutions(),
            vec![("util.js".to_string(), "util-1700000000.js".to_string())]
        );
    }

    #[test]
    fn existing_target_name_fails_instead_of_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("data.txt"), "new").unwrap();
        fs::write(root.join("data-1700000000.txt"), "old").unwrap();

        let rules = RenameRules {
            always_rename: vec!["data.txt".to_string()],
            ..RenameRules::default()
        };

        let err = apply_renames(root, &rules, &suffix()).unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
        assert_eq!(
            fs::read_to_string(root.join("data-1700000000.txt")).unwrap(),
            "old"
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_name_is_left_in_place_and_recorded() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let name = OsStr::from_bytes(b"app\xff.js");
        if fs::write(root.join(name), "x").is_err() {
            // Filesystem rejects non UTF-8 names.
            return;
        }
        fs::write(root.join("main.js"), "").unwrap();

        let table = apply_renames(root, &rules(), &suffix()).unwrap();

        assert!(root.join(name).is_file());
        assert_eq!(table.skipped_non_utf8(), &[PathBuf::from(name)]);
        assert_eq!(table.len(), 1);
        assert!(table.entries().iter().all(|e| !e.to.contains('\u{FFFD}')));
        assert!(root.join("main-1700000000.js").is_file());
    }
}
