//! Small text primitives shared by the CLI and core layers.

/// Split a comma-separated list, trimming entries and dropping empty ones.
///
/// Project identifiers may themselves contain `:` or `.`
/// (`google.com:make-time`), so only commas separate entries.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Last `count` lines of `text`, joined with newlines.
pub fn tail_lines(text: &str, count: usize) -> String {
    let tail: Vec<&str> = text.lines().rev().take(count).collect();
    tail.into_iter().rev().collect::<Vec<_>>().join("\n")
}
