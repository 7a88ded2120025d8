use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GitReleaseError, Result};

/// Environment variable carrying the forge API token
pub const TOKEN_ENV: &str = "GIT_RELEASE_TOKEN";

/// Complete configuration for git-release.
///
/// Loaded from a toml file and overridden by CLI flags; the merged value is
/// passed explicitly into the scan and workflow, there is no process-wide
/// state.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub hooks: HooksConfig,
}

fn default_true() -> bool {
    true
}

/// Line budget keeping the on-disk changelog to the most recent sections
fn default_changelog_max_lines() -> usize {
    50
}

/// Release behavior switches
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReleaseConfig {
    /// Allow breaking changes to bump the major version
    #[serde(default)]
    pub major: bool,

    /// Create forge releases for discovered release commits
    #[serde(default = "default_true")]
    pub create_release: bool,

    /// Commit/push the changelog and open a merge request
    #[serde(default = "default_true")]
    pub merge_request: bool,

    #[serde(default = "default_changelog_max_lines")]
    pub changelog_max_lines: usize,

    /// GPG key file used to sign the release commit
    #[serde(default)]
    pub sign_key_file: Option<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            major: false,
            create_release: true,
            merge_request: true,
            changelog_max_lines: default_changelog_max_lines(),
            sign_key_file: None,
        }
    }
}

fn default_bot_name() -> String {
    "git-release bot".to_string()
}

fn default_bot_email() -> String {
    "bot@git-release.dev".to_string()
}

/// Author/committer identity of the release commit
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BotConfig {
    #[serde(default = "default_bot_name")]
    pub name: String,

    #[serde(default = "default_bot_email")]
    pub email: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            name: default_bot_name(),
            email: default_bot_email(),
        }
    }
}

/// Hook configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HooksConfig {
    /// package.json whose version field follows the release version
    #[serde(default)]
    pub npm_package: Option<String>,
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitrelease.toml` in current directory
/// 3. `.gitrelease.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new("./gitrelease.toml").exists() {
        fs::read_to_string("./gitrelease.toml")?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".gitrelease.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    toml::from_str(&config_str)
        .map_err(|e| GitReleaseError::config(format!("unable to parse configuration: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.release.major);
        assert!(config.release.create_release);
        assert!(config.release.merge_request);
        assert_eq!(config.release.changelog_max_lines, 50);
        assert_eq!(config.bot.name, "git-release bot");
        assert!(config.hooks.npm_package.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [release]
            major = true
            changelog_max_lines = 120

            [hooks]
            npm_package = "package.json"
            "#,
        )
        .unwrap();

        assert!(config.release.major);
        assert_eq!(config.release.changelog_max_lines, 120);
        // untouched sections keep their defaults
        assert!(config.release.merge_request);
        assert_eq!(config.bot.email, "bot@git-release.dev");
        assert_eq!(config.hooks.npm_package.as_deref(), Some("package.json"));
    }

    #[test]
    fn test_parse_invalid_config_is_a_config_error() {
        let result: Result<Config> = toml::from_str("release = \"nope\"")
            .map_err(|e| GitReleaseError::config(e.to_string()));
        assert!(matches!(result, Err(GitReleaseError::Config(_))));
    }
}
