//! Changelog rendering and document surgery.
//!
//! The rendered document always starts with `# Changelog` followed by the
//! newest `## Version ...` section; merging and trimming key off these exact
//! markers.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{CommitType, Version};

/// Render order, section headings and the emoji labels used in the
/// merge-request summary. Sections without entries are omitted entirely.
pub const SECTIONS: [(CommitType, &str, &str); 10] = [
    (CommitType::Feat, "### Features", "🆕 feature"),
    (CommitType::Security, "### Security Fixes", "🚨 security"),
    (CommitType::Fix, "### Fixes", "👾 fix"),
    (CommitType::Test, "### Tests", "🛡 test"),
    (CommitType::Refactor, "### Refactoring", "🔁 refactor"),
    (CommitType::Ops, "### Ops and CI/CD", "🤖 devops"),
    (CommitType::Docs, "### Documentation", "📚 doc"),
    (CommitType::Perf, "### Performance", "⚡️ performance"),
    (CommitType::Chore, "### Chores and tidying", "🧹 chore"),
    (CommitType::Other, "### Other", "📝 other"),
];

/// Render the changelog document plus the `"<count> <label>"` summary list
/// used in release descriptions.
pub fn render(
    buckets: &HashMap<CommitType, Vec<String>>,
    prefix: &str,
    version: &Version,
    date: NaiveDate,
) -> (String, Vec<String>) {
    let mut document = format!(
        "# Changelog\n\n## Version {}{} ({})\n\n",
        prefix,
        version,
        date.format("%Y-%m-%d")
    );
    let mut details = Vec::new();

    for (kind, title, label) in SECTIONS {
        let Some(lines) = buckets.get(&kind).filter(|l| !l.is_empty()) else {
            continue;
        };
        document.push_str(title);
        document.push_str("\n\n");
        for line in lines {
            document.push_str("- ");
            document.push_str(line);
            document.push('\n');
        }
        document.push('\n');
        details.push(format!("{} {}", lines.len(), label));
    }

    (document, details)
}

/// Bound a changelog document to roughly `max_lines` lines.
///
/// Scans backward from line `max_lines - 1` for a version-section heading
/// and truncates everything from that heading on, so a section is never
/// split. Documents below the budget, or without a heading in the scanned
/// window, come back unchanged.
pub fn trim(contents: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = contents.split('\n').collect();

    if lines.len() < max_lines {
        return contents.to_string();
    }

    for i in (1..max_lines).rev() {
        let l = lines[i].replace(' ', "").to_lowercase();
        if l.starts_with("##version") {
            return lines[..i].join("\n");
        }
    }

    contents.to_string()
}

/// Insert a freshly rendered document into an existing changelog.
///
/// Without a `# Changelog` header the fresh document is simply prepended;
/// otherwise the fresh document (which carries its own header) replaces the
/// first header occurrence, which puts the new version section on top of the
/// existing ones.
pub fn merge_document(existing: &str, fresh: &str) -> String {
    if !existing.contains("# Changelog") {
        format!("{}{}", fresh, existing)
    } else {
        existing.replacen("# Changelog\n\n", fresh, 1)
    }
}

/// Extract the newest `## Version ...` section from a changelog document.
pub fn latest_section(contents: &str) -> Option<String> {
    contents
        .split("## Version ")
        .nth(1)
        .map(|section| format!("## Version {}", section).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_render_orders_sections_and_skips_empty_ones() {
        let mut buckets = HashMap::new();
        buckets.insert(CommitType::Fix, vec!["broken thing (12345678)".to_string()]);
        buckets.insert(
            CommitType::Feat,
            vec![
                "new thing (aaaaaaaa)".to_string(),
                "**api:** other thing (bbbbbbbb)".to_string(),
            ],
        );
        buckets.insert(CommitType::Docs, Vec::new());

        let (document, details) = render(&buckets, "v", &Version::new(1, 2, 0), date());

        assert_eq!(
            document,
            "# Changelog\n\n\
             ## Version v1.2.0 (2024-03-05)\n\n\
             ### Features\n\n\
             - new thing (aaaaaaaa)\n\
             - **api:** other thing (bbbbbbbb)\n\n\
             ### Fixes\n\n\
             - broken thing (12345678)\n\n"
        );
        assert_eq!(details, vec!["2 🆕 feature", "1 👾 fix"]);
    }

    #[test]
    fn test_render_empty_prefix() {
        let mut buckets = HashMap::new();
        buckets.insert(CommitType::Chore, vec!["tidy (cccccccc)".to_string()]);

        let (document, _) = render(&buckets, "", &Version::new(0, 0, 1), date());
        assert!(document.contains("## Version 0.0.1 (2024-03-05)"));
    }

    fn sample_changelog() -> String {
        let mut doc = String::from("# Changelog\n\n");
        for version in ["3.0.0", "2.1.0", "2.0.0", "1.0.0"] {
            doc.push_str(&format!("## Version {} (2024-01-01)\n\n", version));
            doc.push_str("### Fixes\n\n");
            for i in 0..10 {
                doc.push_str(&format!("- fix number {} (0000000{})\n", i, i));
            }
            doc.push('\n');
        }
        doc
    }

    #[test]
    fn test_trim_below_budget_is_byte_identical() {
        let doc = sample_changelog();
        assert_eq!(trim(&doc, 10_000), doc);
    }

    #[test]
    fn test_trim_cuts_at_version_boundary() {
        let doc = sample_changelog();
        let lines: Vec<&str> = doc.split('\n').collect();

        // section headings sit at fixed offsets: 2, 17, 32, 47
        assert!(lines[17].starts_with("## Version 2.1.0"));

        let trimmed = trim(&doc, 20);
        let trimmed_lines: Vec<&str> = trimmed.split('\n').collect();
        assert_eq!(trimmed_lines.len(), 17);
        assert_eq!(trimmed_lines, &lines[..17]);
    }

    #[test]
    fn test_trim_without_boundary_in_window_returns_original() {
        let doc = sample_changelog();
        // only line 2 carries a heading inside a 2-line window, and the scan
        // stops before line 0
        let trimmed = trim(&doc, 2);
        assert_eq!(trimmed, doc);
    }

    #[test]
    fn test_trim_edge_cases() {
        assert_eq!(trim("", 100), "");
        assert_eq!(trim("# Changelog", 100), "# Changelog");
        let doc = sample_changelog();
        assert_eq!(trim(&doc, 0), doc);
    }

    #[test]
    fn test_merge_into_empty_document() {
        let fresh = "# Changelog\n\n## Version v1.0.0 (2024-03-05)\n\n### Fixes\n\n- x (00000000)\n\n";
        assert_eq!(merge_document("", fresh), fresh.to_string());
    }

    #[test]
    fn test_merge_prepends_without_header() {
        let fresh = "# Changelog\n\nfresh\n";
        assert_eq!(merge_document("old notes\n", fresh), "# Changelog\n\nfresh\nold notes\n");
    }

    #[test]
    fn test_merge_replaces_header_keeping_older_sections() {
        let existing = "# Changelog\n\n## Version v1.0.0 (2024-01-01)\n\n- old (11111111)\n";
        let fresh = "# Changelog\n\n## Version v1.1.0 (2024-03-05)\n\n- new (22222222)\n\n";
        let merged = merge_document(existing, fresh);
        assert_eq!(
            merged,
            "# Changelog\n\n## Version v1.1.0 (2024-03-05)\n\n- new (22222222)\n\n\
             ## Version v1.0.0 (2024-01-01)\n\n- old (11111111)\n"
        );
    }

    #[test]
    fn test_latest_section() {
        let doc = sample_changelog();
        let section = latest_section(&doc).unwrap();
        assert!(section.starts_with("## Version 3.0.0"));
        assert!(!section.contains("2.1.0"));

        assert_eq!(latest_section("no versions here"), None);
    }
}
