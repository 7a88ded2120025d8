use thiserror::Error;

/// Unified error type for git-release operations
#[derive(Error, Debug)]
pub enum GitReleaseError {
    #[error("unable to read repository tags: {0}")]
    Tags(#[source] git2::Error),

    #[error("unable to read repository log: {0}")]
    Log(#[source] git2::Error),

    #[error("unable to resolve HEAD: {0}")]
    Head(#[source] git2::Error),

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("forge request failed: {0}")]
    Forge(String),

    /// Neither a key file nor key material in the environment. Callers treat
    /// this as "commit unsigned", unlike every other signing failure.
    #[error("no signing key found")]
    NoSigningKey,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-release
pub type Result<T> = std::result::Result<T, GitReleaseError>;

impl GitReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GitReleaseError::Config(msg.into())
    }

    /// Create a forge error with context
    pub fn forge(msg: impl Into<String>) -> Self {
        GitReleaseError::Forge(msg.into())
    }

    /// Create a signing error with context
    pub fn signing(msg: impl Into<String>) -> Self {
        GitReleaseError::Signing(msg.into())
    }
}
