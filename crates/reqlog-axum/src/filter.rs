//! Path filtering for capture exemption.

use std::collections::HashSet;

/// Decides which request paths bypass capture entirely.
///
/// Two pattern forms are supported:
/// - exact: `"/health"` matches only `/health`
/// - prefix: `"/internal/*"` matches `/internal` and every path that
///   starts with `/internal`
///
/// Prefix matching is on raw bytes, so `"/internal/*"` also matches
/// `/internals`. An empty filter matches nothing.
#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl PathFilter {
    /// Build a filter from a list of patterns.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut exact = HashSet::new();
        let mut prefixes = Vec::new();

        for pattern in patterns {
            let pattern = pattern.into();
            if let Some(prefix) = pattern.strip_suffix("/*") {
                prefixes.push(prefix.to_string());
            } else {
                exact.insert(pattern);
            }
        }

        Self { exact, prefixes }
    }

    /// Build a filter from a comma-separated pattern list, the form
    /// used by the `REQLOG_PATH_FILTER` environment variable. Entries
    /// are trimmed; empty entries are skipped.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(
            csv.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string),
        )
    }

    /// Whether `path` is exempt from capture.
    pub fn matches(&self, path: &str) -> bool {
        if self.exact.contains(path) {
            return true;
        }
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Whether the filter has no patterns at all.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}
