use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Version;

/// A "Release vX.Y.Z" commit found in history. Marks the boundary beyond
/// which everything is considered already released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAnchor {
    /// `"v"` or `""`, preserved verbatim from the commit message
    pub prefix: String,
    pub version: Version,
}

// The whole line must be the release statement; an optional trailing
// parenthetical (a merge-request back-reference) is tolerated.
static RELEASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Release (v?)(\d+).(\d+).(\d+)( \(.*\))?$").expect("invalid release regex")
});

/// Detect a release commit in `message`.
///
/// For regular commits only the first paragraph (text before the first blank
/// line) is considered, and it must consist of the anchor line alone. Merge
/// commits embed the statement anywhere in their body, so every line is a
/// candidate.
pub fn detect_release_commit(message: &str, merge: bool) -> Option<ReleaseAnchor> {
    let candidates: Vec<&str> = if merge {
        message.split('\n').collect()
    } else {
        vec![message.splitn(2, "\n\n").next().unwrap_or_default()]
    };

    for candidate in candidates {
        if let Some(caps) = RELEASE_REGEX.captures(candidate) {
            let parse = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            if let (Some(major), Some(minor), Some(patch)) = (parse(2), parse(3), parse(4)) {
                return Some(ReleaseAnchor {
                    prefix: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    version: Version::new(major, minor, patch),
                });
            }
        }
    }

    None
}
