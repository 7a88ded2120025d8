//! Optional hooks contributing extra files to the release commit.
//!
//! Hooks are best-effort: a failing hook logs a warning and is skipped, it
//! never aborts the release.

pub mod npm;

pub use npm::npm_update_version;
