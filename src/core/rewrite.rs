//! Reference rewriting and cache patching: the second tree walk.
//!
//! Every old basename is matched literally as a whole filename: it must not
//! be preceded by a word character, `.` or `-`, and when it ends in a word
//! character it must not run on into another one. All pairs are applied in a
//! single pass, so a replacement is never re-matched by another pair and a
//! second pass over rewritten text changes nothing.

use regex::{Captures, Regex, RegexBuilder};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::platform::CachePatch;
use crate::tree::{relative, walk_error};
use crate::utils::io;

const MATCHER_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Replaces references to renamed files.
#[derive(Debug, Clone)]
pub struct ReferenceRewriter {
    matcher: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl ReferenceRewriter {
    pub fn new(pairs: &[(String, String)]) -> Result<Self> {
        let replacements: HashMap<String, String> = pairs
            .iter()
            .filter(|(from, to)| from != to && !from.is_empty())
            .cloned()
            .collect();

        if replacements.is_empty() {
            return Ok(Self {
                matcher: None,
                replacements,
            });
        }

        // Longest first so `app.js.map` wins over `app.js` at the same position.
        let mut names: Vec<&String> = replacements.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternatives: Vec<String> = names
            .iter()
            .map(|name| {
                let escaped = regex::escape(name);
                if name.chars().last().is_some_and(is_word_char) {
                    format!(r"{}\b", escaped)
                } else {
                    escaped
                }
            })
            .collect();

        let pattern = format!(r"(?m)(^|[^\w.\-])({})", alternatives.join("|"));
        let matcher = RegexBuilder::new(&pattern)
            .size_limit(MATCHER_SIZE_LIMIT)
            .build()
            .map_err(|e| {
                Error::internal_unexpected(format!("Failed to build reference matcher: {}", e))
            })?;

        Ok(Self {
            matcher: Some(matcher),
            replacements,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.matcher.is_none()
    }

    pub fn rewrite<'a>(&self, content: &'a str) -> Cow<'a, str> {
        let Some(matcher) = &self.matcher else {
            return Cow::Borrowed(content);
        };

        matcher.replace_all(content, |caps: &Captures| {
            let name = &caps[2];
            let replacement = self
                .replacements
                .get(name)
                .map_or(name, String::as_str);
            format!("{}{}", &caps[1], replacement)
        })
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Apply a cache patch to `content`, replacing every occurrence.
pub fn apply_cache_patch<'a>(content: &'a str, patch: &CachePatch) -> Cow<'a, str> {
    if content.contains(&patch.pattern) {
        Cow::Owned(content.replace(&patch.pattern, &patch.replacement))
    } else {
        Cow::Borrowed(content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRewrite {
    Unchanged,
    Rewritten { cache_patched: bool },
    SkippedBinary,
}

/// Rewrite one file in place. Non UTF-8 files are left untouched.
pub fn rewrite_file(
    path: &Path,
    rewriter: &ReferenceRewriter,
    patch: &CachePatch,
) -> Result<FileRewrite> {
    let bytes = io::read_bytes(path, "read file for rewrite")?;
    let Ok(original) = std::str::from_utf8(&bytes) else {
        return Ok(FileRewrite::SkippedBinary);
    };

    let mut content = rewriter.rewrite(original);

    let is_config = path
        .file_name()
        .is_some_and(|n| patch.applies_to(&n.to_string_lossy()));
    let patched = if is_config {
        match apply_cache_patch(&content, patch) {
            Cow::Owned(patched) => Some(patched),
            Cow::Borrowed(_) => None,
        }
    } else {
        None
    };
    let cache_patched = patched.is_some();
    if let Some(patched) = patched {
        content = Cow::Owned(patched);
    }

    if content == original {
        return Ok(FileRewrite::Unchanged);
    }

    io::write_file(path, &content, "write rewritten file")?;
    Ok(FileRewrite::Rewritten { cache_patched })
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteSummary {
    pub scanned: usize,
    pub rewritten: usize,
    /// Files that received the cache patch, relative to the scratch root.
    pub cache_patched: Vec<PathBuf>,
    /// Non UTF-8 files left untouched, relative to the scratch root.
    pub skipped_binary: Vec<PathBuf>,
}

/// Rewrite every file under `root`. No directories are pruned.
pub fn rewrite_tree(
    root: &Path,
    rewriter: &ReferenceRewriter,
    patch: &CachePatch,
) -> Result<RewriteSummary> {
    let mut summary = RewriteSummary::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(e, "walk scratch tree"))?;
        if !entry.file_type().is_file() {
            continue;
        }

        summary.scanned += 1;
        match rewrite_file(entry.path(), rewriter, patch)? {
            FileRewrite::Unchanged => {}
            FileRewrite::Rewritten { cache_patched } => {
                summary.rewritten += 1;
                if cache_patched {
                    summary
                        .cache_patched
                        .push(relative(entry.path(), root)?.to_path_buf());
                }
            }
            FileRewrite::SkippedBinary => {
                summary
                    .skipped_binary
                    .push(relative(entry.path(), root)?.to_path_buf());
            }
        }
    }

    log_status!(
        "rewrite",
        "Rewrote {} of {} files ({} binary skipped)",
        summary.rewritten,
        summary.scanned,
        summary.skipped_binary.len()
    );

    Ok(summary)
}
