use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Semantic version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Version bump decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl BumpKind {
    /// Decide the bump for a scanned range.
    ///
    /// Strict priority: a breaking change with major bumps permitted beats
    /// any feature count, which beats the plain patch bump. Without the
    /// permission a breaking change alone earns no more than the
    /// feature/patch decision.
    pub fn decide(breaking: bool, allow_major: bool, feature_count: usize) -> Self {
        if breaking && allow_major {
            BumpKind::Major
        } else if feature_count > 0 {
            BumpKind::Minor
        } else {
            BumpKind::Patch
        }
    }
}

// Loose on purpose: matches anywhere in a tag name, so "release-1.2.3" and
// "refs/tags/v1.2.3" both carry a version.
static VERSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(v?)(\d+).(\d+).(\d+)").expect("invalid version regex"));

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Find a version-like pattern inside `text` (typically a tag name).
    ///
    /// Returns the preserved `v` prefix (possibly empty) and the parsed
    /// triple, or `None` when no version pattern occurs.
    pub fn find_in(text: &str) -> Option<(String, Version)> {
        let caps = VERSION_REGEX.captures(text)?;
        let parse = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let (major, minor, patch) = (parse(2)?, parse(3)?, parse(4)?);
        Some((
            caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
            Version::new(major, minor, patch),
        ))
    }

    /// Apply a bump, resetting the lower components
    pub fn bump(&self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Version::new(self.major + 1, 0, 0),
            BumpKind::Minor => Version::new(self.major, self.minor + 1, 0),
            BumpKind::Patch => Version::new(self.major, self.minor, self.patch + 1),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
