use std::collections::HashMap;
use std::path::{Path, PathBuf};

use git2::build::TreeUpdateBuilder;
use git2::{FileMode, ObjectType, Oid, PushOptions, RemoteCallbacks, Repository, Signature};

use crate::error::{GitReleaseError, Result};
use crate::git::{BranchUpdate, CommitInfo};

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Provider {
    repo: Repository,
}

impl Git2Provider {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path)?;

        Ok(Git2Provider { repo })
    }

    /// Create from an existing git2::Repository
    pub fn from_git2(repo: Repository) -> Self {
        Git2Provider { repo }
    }

    /// The working directory of the repository, absent for bare repositories
    pub fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }

    fn commit_info(&self, commit: &git2::Commit<'_>) -> CommitInfo {
        CommitInfo {
            id: commit.id(),
            message: String::from_utf8_lossy(commit.message_bytes()).to_string(),
            committer_time: commit.time().seconds(),
            committer_offset: commit.time().offset_minutes(),
            parents: commit.parent_ids().collect(),
        }
    }
}

impl super::Provider for Git2Provider {
    fn head_id(&self) -> Result<Oid> {
        let head = self.repo.head().map_err(GitReleaseError::Head)?;
        head.target().ok_or_else(|| {
            GitReleaseError::Head(git2::Error::from_str("HEAD is not a direct reference"))
        })
    }

    fn log(&self) -> Result<Vec<CommitInfo>> {
        let mut revwalk = self.repo.revwalk().map_err(GitReleaseError::Log)?;
        revwalk.push_head().map_err(GitReleaseError::Log)?;
        revwalk
            .set_sorting(git2::Sort::TIME)
            .map_err(GitReleaseError::Log)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let oid = oid.map_err(GitReleaseError::Log)?;
            let commit = self.repo.find_commit(oid).map_err(GitReleaseError::Log)?;
            commits.push(self.commit_info(&commit));
        }

        Ok(commits)
    }

    fn find_commit(&self, id: Oid) -> Result<CommitInfo> {
        let commit = self.repo.find_commit(id)?;
        Ok(self.commit_info(&commit))
    }

    fn tagged_commits(&self) -> Result<HashMap<Oid, Vec<String>>> {
        let names = self.repo.tag_names(None).map_err(GitReleaseError::Tags)?;

        let mut tags: HashMap<Oid, Vec<String>> = HashMap::new();
        for name in names.iter().flatten() {
            let reference = match self.repo.find_reference(&format!("refs/tags/{}", name)) {
                Ok(r) => r,
                Err(_) => continue,
            };
            // annotated tags peel to the commit they ultimately target
            if let Ok(target) = reference.peel(ObjectType::Any) {
                tags.entry(target.id()).or_default().push(name.to_string());
            }
        }

        Ok(tags)
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        Ok(self.repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn tree_file(&self, commit: Oid, file_name: &str) -> Result<Option<String>> {
        let tree = self.repo.find_commit(commit)?.tree()?;

        for entry in tree.iter() {
            let matches = entry
                .name()
                .map(|n| n.to_lowercase() == file_name)
                .unwrap_or(false);
            if !matches {
                continue;
            }
            let object = entry.to_object(&self.repo)?;
            if let Some(blob) = object.as_blob() {
                return Ok(Some(String::from_utf8_lossy(blob.content()).to_string()));
            }
        }

        Ok(None)
    }

    fn remote_url(&self, name: &str) -> Result<String> {
        let remote = self.repo.find_remote(name)?;
        remote
            .url()
            .map(|u| u.to_string())
            .ok_or_else(|| GitReleaseError::Git(git2::Error::from_str("remote URL is not valid UTF-8")))
    }

    fn publish(&self, update: &BranchUpdate<'_>) -> Result<Oid> {
        let head = self.repo.head().map_err(GitReleaseError::Head)?.peel_to_commit()?;

        // assemble the new tree in memory so the worktree stays untouched
        let mut builder = TreeUpdateBuilder::new();
        for (path, contents) in &update.files {
            let blob = self.repo.blob(contents)?;
            builder.upsert(path.as_str(), blob, FileMode::Blob);
        }
        let tree_id = builder.create_updated(&self.repo, &head.tree()?)?;
        let tree = self.repo.find_tree(tree_id)?;

        let signature = Signature::now(&update.author_name, &update.author_email)?;
        let oid = match update.signer {
            Some(signer) => {
                let buffer = self.repo.commit_create_buffer(
                    &signature,
                    &signature,
                    &update.message,
                    &tree,
                    &[&head],
                )?;
                let content = buffer.as_str().ok_or_else(|| {
                    GitReleaseError::signing("commit buffer is not valid UTF-8")
                })?;
                let detached = signer.sign(content.as_bytes())?;
                self.repo.commit_signed(content, &detached, None)?
            }
            None => self.repo.commit(
                None,
                &signature,
                &signature,
                &update.message,
                &tree,
                &[&head],
            )?,
        };

        // keep a local branch at the new commit and force-push it
        let commit = self.repo.find_commit(oid)?;
        self.repo.branch(&update.branch, &commit, true)?;

        let mut remote = self.repo.find_remote(&update.remote)?;
        let mut callbacks = RemoteCallbacks::new();
        if let Some((username, token)) = update.credentials.clone() {
            callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
                git2::Cred::userpass_plaintext(&username, &token)
            });
        }
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                return Err(git2::Error::from_str(&format!(
                    "push rejected for {}: {}",
                    refname, status
                )));
            }
            Ok(())
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        let refspec = format!("+refs/heads/{0}:refs/heads/{0}", update.branch);
        remote.push(&[refspec.as_str()], Some(&mut options))?;

        Ok(oid)
    }
}

// SAFETY: Git2Provider wraps git2::Repository which is Send.
// git2 is thread-safe for read operations via libgit2's thread-safe design.
unsafe impl Sync for Git2Provider {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git2_provider_open() {
        // Should either succeed or fail gracefully outside a repository
        let result = Git2Provider::open(".");
        let _ = result;
    }
}
