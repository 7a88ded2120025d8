//! Forge backends: the GitHub/GitLab surface the release workflow talks to.
//!
//! Callers hold a `Box<dyn Forge>` picked by [detect] from the remote URL
//! and never see a concrete backend type. All calls are synchronous and
//! propagate failures as-is; the workflow aborts on the first error.

pub mod github;
pub mod gitlab;

pub use github::GithubForge;
pub use gitlab::GitlabForge;

use crate::error::{GitReleaseError, Result};

/// The well-known source branch the release merge request is opened from
pub const RELEASE_BRANCH: &str = "git-release/release";

/// Operations a forge must offer for the release workflow
pub trait Forge {
    /// Backend identifier for log output
    fn name(&self) -> &'static str;

    /// Create a release for `tag` at commit `target`, described by
    /// `changelog`
    fn release(&self, tag: &str, target: &str, changelog: &str) -> Result<()>;

    /// Create or update the open merge request from [RELEASE_BRANCH] into
    /// `target`
    fn merge_request(&self, target: &str, title: &str, description: &str, labels: &str)
        -> Result<()>;

    /// Close the open merge request from [RELEASE_BRANCH], if any
    fn close_merge_request(&self) -> Result<()>;

    /// Name of the repository's default branch
    fn main_branch(&self) -> Result<String>;

    /// Username/password pair for pushing over HTTPS
    fn git_credentials(&self) -> (String, String);
}

/// Host and `owner/name` id extracted from a remote URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInfo {
    pub host: String,
    pub repo: String,
}

/// Parse an HTTPS or scp-style remote URL into host and repository id
pub fn parse_remote(remote: &str) -> Result<RemoteInfo> {
    fn repo_id(path: &str) -> String {
        path.trim_start_matches('/')
            .trim_end_matches(".git")
            .to_string()
    }

    // scp-style: git@github.com:owner/repo.git
    if !remote.contains("://") {
        if let Some((user_host, path)) = remote.split_once(':') {
            let host = user_host.rsplit('@').next().unwrap_or(user_host);
            return Ok(RemoteInfo {
                host: host.to_string(),
                repo: repo_id(path),
            });
        }
        return Err(GitReleaseError::config(format!(
            "unable to parse remote URL: {}",
            remote
        )));
    }

    let url = url::Url::parse(remote)
        .map_err(|e| GitReleaseError::config(format!("unable to parse remote URL {}: {}", remote, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| GitReleaseError::config(format!("remote URL has no host: {}", remote)))?;

    Ok(RemoteInfo {
        host: host.to_string(),
        repo: repo_id(url.path()),
    })
}

/// Pick a forge backend for the remote: GitHub for github.com, GitLab for
/// any host containing "gitlab". Unknown hosts get no backend.
pub fn detect(remote: &RemoteInfo, token: &str) -> Option<Box<dyn Forge>> {
    if remote.host == "github.com" {
        Some(Box::new(GithubForge::new(token, &remote.repo)))
    } else if remote.host.contains("gitlab") {
        Some(Box::new(GitlabForge::new(token, &remote.host, &remote.repo)))
    } else {
        None
    }
}
