//! History scanning: walk the commit graph back to the last released
//! version, classify everything in between and derive the next version and
//! changelog.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use git2::Oid;
use regex::Regex;

use crate::changelog;
use crate::domain::{classify, detect_release_commit, BumpKind, CommitType, Version};
use crate::error::Result;
use crate::git::Provider;

/// Scan behavior switches, passed explicitly instead of living in process
/// globals
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Permit breaking changes to bump the major version
    pub allow_major: bool,
}

/// A "Release vX.Y.Z" commit that has not been tagged or released yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreleasedAnchor {
    pub id: Oid,
    /// The newest changelog section recorded in that commit's tree, empty
    /// when the commit carries no changelog
    pub changelog: String,
}

/// Aggregate result of one history scan. Built exclusively by [scan] and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct ReleaseState {
    /// The next version when changes were found, otherwise the latest
    /// released version
    pub version: Version,
    /// `"v"` or `""`, preserved from the tag or anchor that supplied the
    /// version
    pub prefix: String,
    /// The latest released version as a string, e.g. `"v1.2.3"`
    pub latest: String,
    /// Rendered changelog lines per category, in traversal order
    pub buckets: HashMap<CommitType, Vec<String>>,
    pub breaking: bool,
    /// Most recent committer date among the classified commits
    pub release_date: Option<NaiveDate>,
    /// `"<count> <label>"` summary entries for the release description
    pub details: Vec<String>,
    /// Rendered changelog document, empty when nothing changed
    pub changelog: String,
    pub anchor: Option<UnreleasedAnchor>,
    /// The applied bump, absent when nothing changed
    pub bump: Option<BumpKind>,
}

impl ReleaseState {
    /// The next version including its prefix, e.g. `"v1.3.0"`
    pub fn version_string(&self) -> String {
        format!("{}{}", self.prefix, self.version)
    }

    /// Whether the scan classified any commit
    pub fn has_changes(&self) -> bool {
        !self.changelog.is_empty()
    }
}

static REVERT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"This reverts commit ([a-zA-Z0-9]+)").expect("invalid revert regex"));

/// Scan the repository history from HEAD back to the last version boundary.
///
/// The walk happens in three phases: a committer-time pass over tagged
/// commits establishes the current version and the boundary commit, a
/// breadth-first ancestor traversal collects the unreleased commits, and a
/// final pass classifies them with revert cancellation. Revert suppression
/// is traversal-order sensitive: a revert only cancels its target when the
/// revert is visited first.
pub fn scan<P: Provider>(provider: &P, options: &ScanOptions) -> Result<ReleaseState> {
    let tags = provider.tagged_commits()?;
    let log = provider.log()?;

    // phase 1: highest released version among tags reachable from HEAD,
    // taking the first tagged commit carrying any parseable version
    let mut prefix = String::from("v");
    let mut version = Version::default();
    let mut boundary: Option<Oid> = None;
    'tags: for commit in &log {
        if let Some(names) = tags.get(&commit.id) {
            for name in names {
                if let Some((tag_prefix, tag_version)) = Version::find_in(name) {
                    if tag_version > version {
                        version = tag_version;
                        prefix = tag_prefix;
                        boundary = Some(commit.id);
                        break 'tags;
                    }
                }
            }
        }
    }

    let head = provider.head_id()?;

    // phase 2: breadth-first ancestor traversal, never crossing the boundary
    let mut collected = Vec::new();
    let mut visited: HashSet<Oid> = HashSet::new();
    if let Some(boundary) = boundary {
        visited.insert(boundary);
    }
    let mut frontier: VecDeque<Oid> = VecDeque::new();
    if visited.insert(head) {
        frontier.push_back(head);
    }
    while let Some(id) = frontier.pop_front() {
        let commit = provider.find_commit(id)?;
        if let Some(boundary) = boundary {
            if provider.is_ancestor(id, boundary)? {
                break;
            }
        }
        for parent in &commit.parents {
            if visited.insert(*parent) {
                frontier.push_back(*parent);
            }
        }
        collected.push(commit);
    }

    // phase 3: classification with revert cancellation
    let mut buckets: HashMap<CommitType, Vec<String>> = HashMap::new();
    let mut reverted: HashSet<String> = HashSet::new();
    let mut breaking = false;
    let mut committer: Option<(i64, i32)> = None;
    let mut anchor = None;
    let mut updates = 0usize;

    for commit in &collected {
        if reverted.contains(&commit.id.to_string()) {
            continue;
        }
        let message = commit.message.trim();
        if let Some(caps) = REVERT_REGEX.captures(message) {
            reverted.insert(caps[1].to_string());
            continue;
        }

        if let Some(found) = detect_release_commit(message, commit.is_merge()) {
            if !found.version.is_zero() {
                // everything at and behind this commit is already released
                version = found.version;
                prefix = found.prefix;
                let section = provider
                    .tree_file(commit.id, "changelog.md")?
                    .and_then(|contents| changelog::latest_section(&contents))
                    .unwrap_or_default();
                anchor = Some(UnreleasedAnchor {
                    id: commit.id,
                    changelog: section,
                });
                break;
            }
        }

        if commit.is_merge() {
            continue;
        }
        if committer.map_or(true, |(time, _)| commit.committer_time > time) {
            committer = Some((commit.committer_time, commit.committer_offset));
        }

        let parsed = classify(message);
        breaking = breaking || parsed.breaking;
        let line = parsed.render_line(&commit.id.to_string());
        buckets.entry(parsed.kind).or_default().push(line);
        updates += 1;
    }

    let latest = format!("{}{}", prefix, version);

    if updates == 0 {
        return Ok(ReleaseState {
            version,
            prefix,
            latest,
            buckets,
            breaking,
            release_date: None,
            details: Vec::new(),
            changelog: String::new(),
            anchor,
            bump: None,
        });
    }

    let feature_count = buckets.get(&CommitType::Feat).map_or(0, Vec::len);
    let bump = BumpKind::decide(breaking, options.allow_major, feature_count);
    let next = version.bump(bump);

    let release_date = committer
        .and_then(|(seconds, offset)| {
            DateTime::from_timestamp(seconds + i64::from(offset) * 60, 0)
        })
        .unwrap_or(DateTime::UNIX_EPOCH)
        .date_naive();

    let (document, details) = changelog::render(&buckets, &prefix, &next, release_date);

    Ok(ReleaseState {
        version: next,
        prefix,
        latest,
        buckets,
        breaking,
        release_date: Some(release_date),
        details,
        changelog: document,
        anchor,
        bump: Some(bump),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockProvider;

    fn scan_with(provider: &MockProvider, allow_major: bool) -> ReleaseState {
        scan(provider, &ScanOptions { allow_major }).expect("scan")
    }

    #[test]
    fn test_scan_without_tags_starts_from_zero() {
        let mut provider = MockProvider::new();
        provider.commit("test(core): initial commit");

        let state = scan_with(&provider, true);
        assert_eq!(state.latest, "v0.0.0");
        assert_eq!(state.version, Version::new(0, 0, 1));
        assert_eq!(state.buckets[&CommitType::Test].len(), 1);
        assert!(state.anchor.is_none());
    }

    #[test]
    fn test_scan_bump_priorities_end_to_end() {
        let mut provider = MockProvider::new();
        let tagged = provider.commit("chore: bootstrap");
        provider.add_tag("v0.0.2", tagged);
        provider.commit("ci: x");
        provider.commit("feat: y");
        provider.commit("fix!: z");

        let state = scan_with(&provider, true);
        assert!(state.breaking);
        assert_eq!(state.buckets[&CommitType::Feat].len(), 1);
        assert_eq!(state.buckets[&CommitType::Fix].len(), 1);
        assert_eq!(state.buckets[&CommitType::Ops].len(), 1);
        assert_eq!(state.latest, "v0.0.2");
        assert_eq!(state.version, Version::new(1, 0, 0));
        assert_eq!(state.bump, Some(BumpKind::Major));

        let state = scan_with(&provider, false);
        assert_eq!(state.version, Version::new(0, 1, 0));
        assert_eq!(state.bump, Some(BumpKind::Minor));
    }

    #[test]
    fn test_scan_excludes_commits_behind_the_tag_boundary() {
        let mut provider = MockProvider::new();
        provider.commit("feat: released long ago");
        let tagged = provider.commit("fix: also released");
        provider.add_tag("v1.0.0", tagged);
        provider.commit("fix: fresh");

        let state = scan_with(&provider, true);
        assert_eq!(state.latest, "v1.0.0");
        assert_eq!(state.buckets[&CommitType::Fix].len(), 1);
        assert!(!state.buckets.contains_key(&CommitType::Feat));
        assert_eq!(state.version, Version::new(1, 0, 1));
    }

    #[test]
    fn test_scan_prefix_preserved_from_tag() {
        let mut provider = MockProvider::new();
        let tagged = provider.commit("chore: setup");
        provider.add_tag("2.5.0", tagged);
        provider.commit("feat: shiny");

        let state = scan_with(&provider, true);
        assert_eq!(state.latest, "2.5.0");
        assert_eq!(state.version_string(), "2.6.0");
    }

    #[test]
    fn test_scan_revert_suppresses_target_when_visited_first() {
        let mut provider = MockProvider::new();
        let target = provider.commit("feat: add thing");
        provider.commit(format!("This reverts commit {}", target));

        // traversal is newest first: the revert is seen before its target,
        // so both disappear and nothing is left to release
        let state = scan_with(&provider, true);
        assert!(!state.has_changes());
        assert_eq!(state.buckets.get(&CommitType::Feat), None);
        assert_eq!(state.bump, None);
    }

    #[test]
    fn test_scan_revert_after_target_does_not_suppress() {
        let mut provider = MockProvider::new();
        provider.commit("chore: base");
        // the revert sits behind its target in history, so the target is
        // visited first and survives
        let future_target = MockProvider::oid(3);
        provider.commit(format!("This reverts commit {}", future_target));
        let target = provider.commit("feat: add thing");
        assert_eq!(target, future_target);

        let state = scan_with(&provider, true);
        assert_eq!(state.buckets.get(&CommitType::Feat).map(Vec::len), Some(1));
    }

    #[test]
    fn test_scan_release_anchor_stops_the_walk() {
        let mut provider = MockProvider::new();
        provider.commit("feat: released work");
        let release = provider.commit("Release v0.0.3");
        provider.add_file(
            release,
            "Changelog.md",
            "# Changelog\n\n## Version v0.0.3 (2024-01-01)\n\n### Features\n\n- released work (00000000)\n",
        );
        provider.commit("fix: fresh work");

        let state = scan_with(&provider, true);
        assert_eq!(state.latest, "v0.0.3");
        let anchor = state.anchor.expect("anchor");
        assert_eq!(anchor.id, release);
        assert!(anchor.changelog.starts_with("## Version v0.0.3"));
        assert!(!state.buckets.contains_key(&CommitType::Feat));
        assert_eq!(state.buckets[&CommitType::Fix].len(), 1);
        assert_eq!(state.version, Version::new(0, 0, 4));
    }

    #[test]
    fn test_scan_is_idempotent_at_an_anchor() {
        let mut provider = MockProvider::new();
        provider.commit("feat: released work");
        provider.commit("Release v0.0.3");

        let state = scan_with(&provider, true);
        assert!(!state.has_changes());
        assert_eq!(state.version, Version::new(0, 0, 3));
        assert_eq!(state.latest, "v0.0.3");
        assert!(state.anchor.is_some());
        assert_eq!(state.bump, None);
    }

    #[test]
    fn test_scan_anchor_beats_older_tag() {
        let mut provider = MockProvider::new();
        let tagged = provider.commit("chore: old");
        provider.add_tag("v0.0.1", tagged);
        provider.commit("Release v0.5.0");
        provider.commit("fix: after release");

        let state = scan_with(&provider, true);
        assert_eq!(state.latest, "v0.5.0");
        assert_eq!(state.version, Version::new(0, 5, 1));
    }

    #[test]
    fn test_scan_merge_commits_are_not_classified() {
        let mut provider = MockProvider::new();
        let base = provider.commit("chore: base");
        let side = provider.add_commit("feat: on a branch", &[base]);
        let main = provider.add_commit("fix: on main", &[base]);
        provider.add_commit("Merge branch 'side'", &[main, side]);

        let state = scan_with(&provider, true);
        assert_eq!(state.buckets.get(&CommitType::Feat).map(Vec::len), Some(1));
        assert_eq!(state.buckets.get(&CommitType::Fix).map(Vec::len), Some(1));
        assert_eq!(state.buckets.get(&CommitType::Chore).map(Vec::len), Some(1));
        assert_eq!(state.buckets.get(&CommitType::Other), None);
    }

    #[test]
    fn test_scan_release_anchor_inside_merge_commit_body() {
        let mut provider = MockProvider::new();
        let base = provider.commit("feat: released");
        let side = provider.add_commit("chore: side", &[base]);
        provider.add_commit("Merge branch 'next'\n\nRelease v1.1.0\n\nback-reference", &[base, side]);

        let state = scan_with(&provider, true);
        assert_eq!(state.latest, "v1.1.0");
        assert!(state.anchor.is_some());
        assert!(!state.has_changes());
    }

    #[test]
    fn test_scan_empty_repository_fails_on_head() {
        let provider = MockProvider::new();
        let result = scan(&provider, &ScanOptions::default());
        assert!(matches!(
            result,
            Err(crate::error::GitReleaseError::Head(_))
        ));
    }

    #[test]
    fn test_scan_rendered_lines_carry_short_hashes_and_scopes() {
        let mut provider = MockProvider::new();
        let id = provider.commit("fix(api): handle null");

        let state = scan_with(&provider, true);
        let line = &state.buckets[&CommitType::Fix][0];
        assert_eq!(line, &format!("**api:** handle null ({})", &id.to_string()[..8]));
    }

    #[test]
    fn test_scan_details_summarize_counts() {
        let mut provider = MockProvider::new();
        provider.commit("feat: one");
        provider.commit("feat: two");
        provider.commit("fix: three");

        let state = scan_with(&provider, true);
        assert_eq!(state.details, vec!["2 🆕 feature", "1 👾 fix"]);
    }
}
