// src/github/api.rs
// =============================================================================
// The three GitHub REST endpoints we use, and the parts of their responses
// we care about:
//
//   GET /repos/{owner}/{repo}                          -> default_branch
//   GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1 -> tree[]
//   GET /repos/{owner}/{repo}/contents/{path}?ref={branch}   -> base64 body
//
// URLs are built with the url crate so that branch names and file paths with
// spaces or '#' are percent-encoded correctly.
// =============================================================================

use crate::github::repo::{RepositoryRef, TreeEntry};
use serde::Deserialize;
use url::Url;

/// GET /repos/{owner}/{repo}
#[derive(Debug, Deserialize)]
pub struct RepoMetadata {
    pub default_branch: Option<String>,
}

/// GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1
#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    /// GitHub cuts very large listings short and sets this flag
    #[serde(default)]
    pub truncated: bool,
}

/// GET /repos/{owner}/{repo}/contents/{path}
#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    pub content: Option<String>,
    pub encoding: Option<String>,
}

// Appends path segments to the API base ("https://api.github.com" or a
// GitHub Enterprise "https://host/api/v3")
fn endpoint<'a>(api_base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = api_base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

pub fn repo_url(api_base: &Url, repo: &RepositoryRef) -> String {
    endpoint(api_base, ["repos", repo.owner(), repo.name()]).into()
}

pub fn tree_url(api_base: &Url, repo: &RepositoryRef, branch: &str) -> String {
    let mut url = endpoint(api_base, ["repos", repo.owner(), repo.name(), "git", "trees", branch]);
    url.query_pairs_mut().append_pair("recursive", "1");
    url.into()
}

pub fn contents_url(api_base: &Url, repo: &RepositoryRef, path: &str, branch: &str) -> String {
    let segments = ["repos", repo.owner(), repo.name(), "contents"]
        .into_iter()
        .chain(path.split('/').filter(|segment| !segment.is_empty()));
    let mut url = endpoint(api_base, segments);
    url.query_pairs_mut().append_pair("ref", branch);
    url.into()
}
