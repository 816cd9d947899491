// src/github/repo.rs
// =============================================================================
// Repository identity and the file types the pipeline passes around.
//
// Parsing strategy:
// - Accept https://host/owner/repo, with or without a trailing .git or /
// - Accept a scheme-less host/owner/repo (we prepend https://)
// - Anything after owner/repo (like /tree/main) is ignored
// =============================================================================

use crate::error::{FetchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// An owner/name pair identifying one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Builds a reference, rejecting empty parts and parts containing '/'.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();

        let valid = |part: &str| !part.is_empty() && !part.contains(|c: char| c == '/' || c == '\\');
        if !valid(&owner) || !valid(&name) {
            return Err(FetchError::InvalidUrl(format!("{}/{}", owner, name)));
        }

        Ok(Self { owner, name })
    }

    /// Parses a repository URL into its owner and name.
    ///
    /// Examples:
    ///   "https://github.com/rust-lang/rust"      -> rust-lang/rust
    ///   "https://github.com/user/repo.git"       -> user/repo
    ///   "github.com/user/repo/tree/main/src"     -> user/repo
    pub fn parse(repo_url: &str) -> Result<Self> {
        let trimmed = repo_url.trim();
        let invalid = || FetchError::InvalidUrl(repo_url.to_string());

        if trimmed.is_empty() {
            return Err(invalid());
        }

        // Url::parse needs a scheme; "github.com/a/b" is common on the command line
        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&with_scheme).map_err(|_| invalid())?;
        if url.host_str().is_none() {
            return Err(invalid());
        }

        let mut parts = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty());

        let owner = parts.next().ok_or_else(invalid)?;
        let name = parts.next().ok_or_else(invalid)?;
        let name = name.strip_suffix(".git").unwrap_or(name);

        Self::new(owner, name).map_err(|_| invalid())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// "owner/name", the form GitHub uses in API paths and logs.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// What a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A file
    Blob,
    /// A directory
    Tree,
    /// A submodule pointer
    Commit,
}

/// One line of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (GitHub omits it for directories)
    #[serde(default)]
    pub size: u64,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, size: u64) -> Self {
        Self { path: path.into(), kind: EntryKind::Blob, size }
    }

    pub fn is_blob(&self) -> bool {
        self.kind == EntryKind::Blob
    }

    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }
}

/// A decoded file ready for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedFile {
    pub path: String,
    pub content: String,
    /// Content length in bytes
    pub size: usize,
    pub extension: String,
}

impl FetchedFile {
    pub fn new(path: impl Into<String>, content: String) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self { size: content.len(), path, content, extension }
    }
}

/// Lower-cased extension of the file name, or "no_ext".
///
/// Only the last path component is considered, so "docs.v2/README" has no
/// extension.
pub fn extension_of(path: &str) -> String {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "no_ext".to_string(),
    }
}
