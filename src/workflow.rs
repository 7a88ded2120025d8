//! The release workflow: scan, release discovered anchors, commit the
//! changelog and open the merge request.
//!
//! Fail-fast: the first error aborts the whole run. Local repository state
//! is never modified; the changelog commit is assembled in memory and only
//! leaves the machine as a push to the release branch.

use std::fs;
use std::path::Path;

use crate::changelog;
use crate::config::{self, Config};
use crate::domain::BumpKind;
use crate::error::{GitReleaseError, Result};
use crate::forge::{self, Forge, RELEASE_BRANCH};
use crate::git::{BranchUpdate, Git2Provider, Provider};
use crate::hooks;
use crate::scanner::{self, ScanOptions};
use crate::signing::GpgSigner;
use crate::ui;

/// Run one release pass over the repository at `path`.
///
/// With `dry_run` the scan and changelog rendering happen normally but
/// nothing is released, committed, pushed or opened.
pub fn run(config: &Config, path: &Path, dry_run: bool) -> Result<()> {
    let provider = Git2Provider::open(path)?;
    let remote_url = provider.remote_url("origin")?;
    let remote = forge::parse_remote(&remote_url)?;
    ui::display_status(&format!("repository: {} at {}", remote.repo, remote.host));

    let token = std::env::var(config::TOKEN_ENV).unwrap_or_default();
    let backend: Option<Box<dyn Forge>> = if token.is_empty() {
        ui::display_status(&format!(
            "{} unset, no commits/changelog will be done",
            config::TOKEN_ENV
        ));
        None
    } else {
        let backend = forge::detect(&remote, &token);
        match &backend {
            Some(backend) => ui::display_status(&format!("using {} backend", backend.name())),
            None => ui::display_status(&format!("no backend available for {}", remote.host)),
        }
        backend
    };

    let state = scanner::scan(
        &provider,
        &ScanOptions {
            allow_major: config.release.major,
        },
    )?;
    ui::display_status(&format!("current version: {}", state.latest));

    if let Some(anchor) = &state.anchor {
        ui::display_status(&format!("found version {} at {}", state.latest, anchor.id));
        if config.release.create_release && !dry_run {
            if let Some(backend) = &backend {
                backend
                    .release(&state.latest, &anchor.id.to_string(), &anchor.changelog)
                    .map_err(|e| {
                        GitReleaseError::forge(format!(
                            "unable to release {} at {}: {}",
                            state.latest, anchor.id, e
                        ))
                    })?;
                ui::display_success(&format!("released {}", state.latest));
            }
        }
    }

    if !state.has_changes() {
        ui::display_status("no changes detected, no changelog created");
        if config.release.merge_request && !dry_run {
            if let Some(backend) = &backend {
                backend.close_merge_request()?;
            }
        }
        return Ok(());
    }

    println!("{}", state.changelog);

    let Some(backend) = backend else {
        return Ok(());
    };
    if !config.release.merge_request || dry_run {
        return Ok(());
    }

    // merge the fresh document into the on-disk changelog and bound it
    let workdir = provider
        .workdir()
        .ok_or_else(|| GitReleaseError::config("repository has no working directory"))?;
    let filename = changelog_filename(&workdir);
    let existing = fs::read_to_string(workdir.join(&filename)).unwrap_or_default();
    let merged = changelog::merge_document(&existing, &state.changelog);
    let trimmed = changelog::trim(&merged, config.release.changelog_max_lines);
    let mut files = vec![(filename, trimmed.into_bytes())];

    if let Some(manifest) = &config.hooks.npm_package {
        if let Some(staged) = hooks::npm_update_version(&workdir, manifest, &state.version) {
            files.push(staged);
        }
    }

    let signer = match GpgSigner::from_sources(config.release.sign_key_file.as_deref().map(Path::new))
    {
        Ok(signer) => Some(signer),
        Err(GitReleaseError::NoSigningKey) => {
            ui::display_status("no signing key found, committing unsigned");
            None
        }
        Err(e) => return Err(e),
    };

    let update = BranchUpdate {
        files,
        message: format!("Release {}", state.version_string()),
        author_name: config.bot.name.clone(),
        author_email: config.bot.email.clone(),
        branch: RELEASE_BRANCH.to_string(),
        remote: "origin".to_string(),
        credentials: Some(backend.git_credentials()),
        signer: signer.as_ref(),
    };
    let commit = provider.publish(&update)?;
    ui::display_success(&format!("committed changelog: {}", commit));

    let release_type = match state.bump {
        Some(BumpKind::Major) => "major 👑",
        Some(BumpKind::Minor) => "minor 📦",
        _ => "patch 🩹",
    };
    let labels = format!("Release 🏆,{}", release_type);
    let title = format!("Release {}", state.version);
    let description = format!(
        "# Release {} 🏆\n\n\
         ## Summary\n\n\
         There are {} commits since {}.\n\n\
         This is a {} release.\n\n\
         {}\n\n\
         ---\n\n\
         This changelog was generated by your friendly release bot\n",
        state.version,
        state.details.join(", "),
        state.latest,
        release_type,
        state.changelog.trim(),
    );

    let main_branch = backend.main_branch()?;
    backend.merge_request(&main_branch, &title, &description, &labels)?;
    ui::display_success(&format!("merge request for {} updated", state.version_string()));

    Ok(())
}

/// Detect the changelog filename in the working directory, preserving its
/// case. Falls back to `Changelog.md` for repositories without one.
fn changelog_filename(workdir: &Path) -> String {
    let mut filename = "Changelog.md".to_string();
    if let Ok(entries) = fs::read_dir(workdir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_file() && name.to_lowercase() == "changelog.md" {
                filename = name;
            }
        }
    }
    filename
}
