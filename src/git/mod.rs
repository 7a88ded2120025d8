//! Git operations abstraction layer
//!
//! The [Provider] trait defines the version-control operations the scanner
//! and release workflow need. Two implementations exist:
//!
//! - [repository::Git2Provider]: the real implementation backed by `git2`
//! - [mock::MockProvider]: an in-memory implementation for tests
//!
//! Code that only reads history should depend on the trait, not on a
//! concrete implementation.

pub mod mock;
pub mod repository;

pub use mock::MockProvider;
pub use repository::Git2Provider;

use std::collections::HashMap;

use git2::Oid;

use crate::error::Result;
use crate::signing::GpgSigner;

/// Commit data needed for history scanning
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    pub id: Oid,
    /// Full multi-line commit message
    pub message: String,
    /// Committer time, seconds since the epoch
    pub committer_time: i64,
    /// Committer timezone offset, minutes east of UTC
    pub committer_offset: i32,
    pub parents: Vec<Oid>,
}

impl CommitInfo {
    /// More than one parent means a merge commit
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// A changelog commit to create on top of HEAD and force-push to the
/// release branch. The worktree and HEAD are never touched; the tree is
/// assembled in memory.
pub struct BranchUpdate<'a> {
    /// Path and new contents for every file the commit rewrites
    pub files: Vec<(String, Vec<u8>)>,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    /// Short branch name, e.g. `git-release/release`
    pub branch: String,
    pub remote: String,
    /// Username/token pair for pushing over HTTPS
    pub credentials: Option<(String, String)>,
    /// Sign the commit when present
    pub signer: Option<&'a GpgSigner>,
}

/// Version-control access for the scanner and the release workflow.
///
/// Read failures for tags, log and HEAD map to the distinct
/// [crate::error::GitReleaseError] variants so callers can report which of
/// the three scans failed.
pub trait Provider: Send + Sync {
    /// The commit id HEAD points at
    fn head_id(&self) -> Result<Oid>;

    /// All commits reachable from HEAD, newest committer time first
    fn log(&self) -> Result<Vec<CommitInfo>>;

    /// Random access to a single commit
    fn find_commit(&self, id: Oid) -> Result<CommitInfo>;

    /// Map from target commit id to the names of the tags pointing at it.
    /// Annotated tags are dereferenced to the commit they ultimately target.
    fn tagged_commits(&self) -> Result<HashMap<Oid, Vec<String>>>;

    /// Whether `ancestor` is a (strict) ancestor of `descendant`
    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool>;

    /// Contents of a root-level file in the commit's tree, matched
    /// case-insensitively against `file_name` (itself lower-case).
    fn tree_file(&self, commit: Oid, file_name: &str) -> Result<Option<String>>;

    /// URL of the named remote
    fn remote_url(&self, name: &str) -> Result<String>;

    /// Commit the update's files on top of HEAD and force-push the result
    /// to the update's branch. Returns the created commit id.
    fn publish(&self, update: &BranchUpdate<'_>) -> Result<Oid>;
}
