use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::domain::Version;
use crate::ui;

#[derive(Debug, Deserialize)]
struct PackageManifest {
    version: String,
}

/// Rewrite the `"version"` field of an npm package manifest to the freshly
/// computed version.
///
/// The replacement is regex surgery on the raw text so the manifest's
/// formatting survives. Returns the staged path and contents, or `None`
/// when the file cannot be processed (logged, never fatal).
pub fn npm_update_version(
    workdir: &Path,
    manifest_path: &str,
    version: &Version,
) -> Option<(String, Vec<u8>)> {
    let contents = match std::fs::read_to_string(workdir.join(manifest_path)) {
        Ok(contents) => contents,
        Err(e) => {
            ui::display_status(&format!(
                "npm-update-version: unable to read {}: {}",
                manifest_path, e
            ));
            return None;
        }
    };

    let manifest: PackageManifest = match serde_json::from_str(&contents) {
        Ok(manifest) => manifest,
        Err(e) => {
            ui::display_status(&format!(
                "npm-update-version: unable to parse {}: {}",
                manifest_path, e
            ));
            return None;
        }
    };

    let pattern = format!(r#""version"\s*:\s*"{}""#, regex::escape(&manifest.version));
    let regex = match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(e) => {
            ui::display_status(&format!("npm-update-version: {}", e));
            return None;
        }
    };

    let updated = regex
        .replace_all(&contents, format!(r#""version": "{}""#, version))
        .into_owned();

    Some((manifest_path.to_string(), updated.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npm_update_version_rewrites_only_the_version_field() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            "{\n  \"name\": \"widgets\",\n  \"version\": \"1.2.3\",\n  \"dependencies\": {\n    \"left-pad\": \"1.2.3\"\n  }\n}\n",
        )
        .unwrap();

        let (path, contents) =
            npm_update_version(dir.path(), "package.json", &Version::new(1, 3, 0)).unwrap();
        let text = String::from_utf8(contents).unwrap();

        assert_eq!(path, "package.json");
        assert!(text.contains("\"version\": \"1.3.0\""));
        // dependency pins keep their value
        assert!(text.contains("\"left-pad\": \"1.2.3\""));
        assert!(text.contains("\"name\": \"widgets\""));
    }

    #[test]
    fn test_npm_update_version_missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(npm_update_version(dir.path(), "package.json", &Version::new(1, 0, 0)).is_none());
    }

    #[test]
    fn test_npm_update_version_invalid_json_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "not json").unwrap();
        assert!(npm_update_version(dir.path(), "package.json", &Version::new(1, 0, 0)).is_none());
    }
}
