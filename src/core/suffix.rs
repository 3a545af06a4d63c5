//! Run suffix: the timestamp tag embedded into renamed filenames.

use serde::Serialize;

pub const SEPARATOR: &str = "-";

/// `-<unix seconds>`, fixed for the lifetime of one run.
///
/// Unique across successive runs, not across two runs started in the same second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunSuffix(String);

impl RunSuffix {
    pub fn now() -> Self {
        Self::from_timestamp(chrono::Utc::now().timestamp())
    }

    pub fn from_timestamp(seconds: i64) -> Self {
        Self(format!("{}{}", SEPARATOR, seconds))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_timestamp_prefixes_separator() {
        assert_eq!(RunSuffix::from_timestamp(1700000000).as_str(), "-1700000000");
    }

    #[test]
    fn now_is_integer_seconds() {
        let suffix = RunSuffix::now();
        let digits = suffix.as_str().strip_prefix(SEPARATOR).unwrap();
        assert!(digits.parse::<i64>().unwrap() > 1_600_000_000);
    }
}
