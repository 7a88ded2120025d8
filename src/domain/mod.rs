//! Domain logic - pure rules independent of git plumbing

pub mod anchor;
pub mod commit;
pub mod version;

pub use anchor::{detect_release_commit, ReleaseAnchor};
pub use commit::{classify, ClassifiedCommit, CommitType};
pub use version::{BumpKind, Version};
