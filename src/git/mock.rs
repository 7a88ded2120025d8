use std::collections::HashMap;
use std::sync::Mutex;

use git2::Oid;

use crate::error::{GitReleaseError, Result};
use crate::git::{BranchUpdate, CommitInfo, Provider};

/// Mock provider for testing without actual git operations.
///
/// Commits are appended oldest first with strictly increasing committer
/// times; [Provider::log] returns them newest first, matching the real
/// committer-time ordering.
pub struct MockProvider {
    commits: HashMap<Oid, CommitInfo>,
    order: Vec<Oid>,
    head: Option<Oid>,
    tags: HashMap<Oid, Vec<String>>,
    files: HashMap<(Oid, String), String>,
    remote: String,
    sequence: u64,
    published: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Create a new empty mock provider
    pub fn new() -> Self {
        MockProvider {
            commits: HashMap::new(),
            order: Vec::new(),
            head: None,
            tags: HashMap::new(),
            files: HashMap::new(),
            remote: "https://github.com/example/project.git".to_string(),
            sequence: 0,
            published: Mutex::new(Vec::new()),
        }
    }

    /// The id the n-th added commit receives (1-based). Handy when a test
    /// needs to reference a commit that does not exist yet.
    pub fn oid(sequence: u64) -> Oid {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&sequence.to_be_bytes());
        Oid::from_bytes(&bytes).expect("oid from bytes")
    }

    fn next_oid(&mut self) -> Oid {
        self.sequence += 1;
        Self::oid(self.sequence)
    }

    /// Append a commit with the given parents and move HEAD to it
    pub fn add_commit(&mut self, message: impl Into<String>, parents: &[Oid]) -> Oid {
        let id = self.next_oid();
        let info = CommitInfo {
            id,
            message: message.into(),
            committer_time: 1_700_000_000 + self.sequence as i64 * 60,
            committer_offset: 0,
            parents: parents.to_vec(),
        };
        self.commits.insert(id, info);
        self.order.push(id);
        self.head = Some(id);
        id
    }

    /// Append a commit on top of the current HEAD
    pub fn commit(&mut self, message: impl Into<String>) -> Oid {
        let parents: Vec<Oid> = self.head.into_iter().collect();
        self.add_commit(message, &parents)
    }

    /// Add a tag pointing at a commit
    pub fn add_tag(&mut self, name: impl Into<String>, oid: Oid) {
        self.tags.entry(oid).or_default().push(name.into());
    }

    /// Add a file to a commit's tree
    pub fn add_file(&mut self, oid: Oid, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert((oid, name.into()), contents.into());
    }

    /// Messages of the commits published through this provider
    pub fn published_messages(&self) -> Vec<String> {
        self.published.lock().expect("published lock").clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for MockProvider {
    fn head_id(&self) -> Result<Oid> {
        self.head
            .ok_or_else(|| GitReleaseError::Head(git2::Error::from_str("no commits")))
    }

    fn log(&self) -> Result<Vec<CommitInfo>> {
        Ok(self
            .order
            .iter()
            .rev()
            .map(|id| self.commits[id].clone())
            .collect())
    }

    fn find_commit(&self, id: Oid) -> Result<CommitInfo> {
        self.commits
            .get(&id)
            .cloned()
            .ok_or_else(|| GitReleaseError::Git(git2::Error::from_str("commit not found")))
    }

    fn tagged_commits(&self) -> Result<HashMap<Oid, Vec<String>>> {
        Ok(self.tags.clone())
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        let Some(start) = self.commits.get(&descendant) else {
            return Ok(false);
        };
        let mut queue: Vec<Oid> = start.parents.clone();
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = queue.pop() {
            if !seen.insert(id) {
                continue;
            }
            if id == ancestor {
                return Ok(true);
            }
            if let Some(commit) = self.commits.get(&id) {
                queue.extend(commit.parents.iter().copied());
            }
        }
        Ok(false)
    }

    fn tree_file(&self, commit: Oid, file_name: &str) -> Result<Option<String>> {
        Ok(self
            .files
            .iter()
            .find(|((id, name), _)| *id == commit && name.to_lowercase() == file_name)
            .map(|(_, contents)| contents.clone()))
    }

    fn remote_url(&self, _name: &str) -> Result<String> {
        Ok(self.remote.clone())
    }

    fn publish(&self, update: &BranchUpdate<'_>) -> Result<Oid> {
        self.published
            .lock()
            .expect("published lock")
            .push(update.message.clone());
        Ok(Oid::zero())
    }
}
