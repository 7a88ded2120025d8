use std::sync::LazyLock;

use regex::Regex;

/// Commit categories used for changelog grouping.
///
/// Classification is total: every message maps to exactly one category,
/// falling back to [CommitType::Other].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitType {
    Fix,
    Feat,
    Test,
    Chore,
    Ops,
    Docs,
    Perf,
    Refactor,
    Security,
    Other,
}

/// Parsed representation of a single commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedCommit {
    pub kind: CommitType,
    /// Lower-cased, trimmed and markup-escaped; empty when absent
    pub scope: String,
    /// First non-blank line of the effective description, markup-escaped
    pub description: String,
    pub breaking: bool,
}

impl ClassifiedCommit {
    /// Render the changelog bullet line for this commit.
    ///
    /// `hash` is the full commit id; only the first 8 characters appear.
    pub fn render_line(&self, hash: &str) -> String {
        let short = &hash[..8.min(hash.len())];
        if self.scope.is_empty() {
            format!("{} ({})", self.description, short)
        } else {
            format!("**{}:** {} ({})", self.scope, self.description, short)
        }
    }
}

// Shape: optional ticket/number prefix, type word, optional (scope) or
// [scope], optional "!", optional ":", rest of the line.
static COMMIT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#?\d*\s*\[?([a-zA-Z]*)\]?\s*([\(\[]([^\]\)]*)[\]\)])?\s*?(!?)(:?)\s*(.*)")
        .expect("invalid commit regex")
});

/// Escape the characters that would be interpreted by the rendered
/// changelog: `&`, `<` and `>`. Single pass, so `&lt;` stays intact.
fn escape_markup(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Classify one commit message into (type, scope, description, breaking).
///
/// Messages without a `:` separator are treated as non-conventional: the
/// whole raw message becomes the description while the matched type word is
/// still used for the category lookup. Unknown type words land in
/// [CommitType::Other] with scope cleared and the raw message as description.
pub fn classify(message: &str) -> ClassifiedCommit {
    let mut type_word = String::new();
    let mut scope = String::new();
    let mut description = String::new();
    let mut breaking = false;

    if let Some(caps) = COMMIT_REGEX.captures(message) {
        type_word = caps
            .get(1)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        scope = caps
            .get(3)
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default();
        description = caps
            .get(6)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if caps.get(4).map(|m| m.as_str()) == Some("!") {
            breaking = true;
        }
        // without a `:` after type and scope this is a non-conventional commit
        if caps.get(5).map(|m| m.as_str()) != Some(":") {
            description = message.to_string();
        }
    }
    if description.is_empty() {
        type_word.clear();
    }

    let kind = if type_word.starts_with("fix") || type_word.starts_with("bug") {
        CommitType::Fix
    } else if type_word.starts_with("feat") {
        CommitType::Feat
    } else if type_word.starts_with("test") {
        CommitType::Test
    } else if type_word.starts_with("chore") || type_word.starts_with("update") {
        CommitType::Chore
    } else if type_word.starts_with("ops")
        || type_word.starts_with("ci")
        || type_word.starts_with("cd")
        || type_word.starts_with("build")
    {
        CommitType::Ops
    } else if type_word.starts_with("doc") {
        CommitType::Docs
    } else if type_word.starts_with("perf") {
        CommitType::Perf
    } else if type_word.starts_with("refactor") || type_word.starts_with("rework") {
        CommitType::Refactor
    } else if type_word.starts_with("sec") {
        CommitType::Security
    } else {
        scope.clear();
        description = message.to_string();
        CommitType::Other
    };

    let scope = scope.trim().to_string();
    let mut first_line = String::new();
    for line in description.lines() {
        let line = line.trim();
        if !line.is_empty() {
            first_line = line.to_string();
            break;
        }
    }
    for line in message.lines() {
        if line.starts_with("BREAKING CHANGE:") {
            breaking = true;
            break;
        }
    }

    ClassifiedCommit {
        kind,
        scope: escape_markup(&scope),
        description: escape_markup(&first_line),
        breaking,
    }
}
