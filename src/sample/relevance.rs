// src/sample/relevance.rs
// =============================================================================
// Decides which paths are worth reading at all.
//
// A file is relevant when:
// - its extension is on the list (py, js, ts, md, ...), or
// - it has no extension and its name is a well-known project file
//   (README, LICENSE, Dockerfile, ...)
//
// Matching is case-insensitive throughout.
// =============================================================================

use std::collections::HashSet;

const DEFAULT_EXTENSIONS: &[&str] = &["py", "js", "jsx", "ts", "html", "css", "json", "md", "txt"];

const EXTENSIONLESS_WHITELIST: &[&str] = &[
    "readme",
    "license",
    "makefile",
    "dockerfile",
    "contributing",
    "changelog",
    "authors",
    "todo",
];

/// Extension and file-name rules for picking candidate files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceFilter {
    extensions: HashSet<String>,
    file_names: HashSet<String>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            file_names: EXTENSIONLESS_WHITELIST.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl RelevanceFilter {
    /// Adds more extensions (a leading dot is allowed: ".rs" or "rs").
    pub fn with_extensions<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for ext in extra {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase();
            if !ext.is_empty() {
                self.extensions.insert(ext);
            }
        }
        self
    }

    pub fn is_relevant(&self, path: &str) -> bool {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();

        match file_name.rsplit_once('.') {
            Some((_, ext)) => self.extensions.contains(ext),
            None => self.file_names.contains(&file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_extensions() {
        let filter = RelevanceFilter::default();
        assert!(filter.is_relevant("src/app.py"));
        assert!(filter.is_relevant("web/Index.HTML"));
        assert!(filter.is_relevant("docs/guide.md"));
        assert!(!filter.is_relevant("assets/logo.png"));
        assert!(!filter.is_relevant("src/main.rs"));
    }

    #[test]
    fn test_extensionless_whitelist() {
        let filter = RelevanceFilter::default();
        assert!(filter.is_relevant("README"));
        assert!(filter.is_relevant("docker/Dockerfile"));
        assert!(filter.is_relevant("LICENSE"));
        assert!(!filter.is_relevant("bin/run"));
    }

    #[test]
    fn test_extra_extensions() {
        let filter = RelevanceFilter::default().with_extensions([".rs", "TOML", " "]);
        assert!(filter.is_relevant("src/main.rs"));
        assert!(filter.is_relevant("Cargo.toml"));
        assert!(filter.is_relevant("app.py"));
    }
}
