use std::path::Path;

use anyhow::Result;
use clap::Parser;

use git_release::{config, ui, workflow};

#[derive(clap::Parser)]
#[command(
    name = "git-release",
    about = "Scan conventional commits, bump the version and ship a changelog merge request"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, default_value = ".", help = "Repository path to operate on")]
    path: String,

    #[arg(long, help = "Allow breaking changes to bump the major version")]
    major: bool,

    #[arg(long, help = "Do not create forge releases for release commits")]
    no_release: bool,

    #[arg(long, help = "Do not commit a changelog or open a merge request")]
    no_merge_request: bool,

    #[arg(long, value_name = "FILE", help = "Update the version field of this package.json")]
    npm_update_version: Option<String>,

    #[arg(long, value_name = "FILE", help = "GPG key file used to sign the release commit")]
    sign_key_file: Option<String>,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(short, long, help = "Print version information")]
    version: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        println!("git-release {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration; CLI flags override file values
    let mut config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    if args.major {
        config.release.major = true;
    }
    if args.no_release {
        config.release.create_release = false;
    }
    if args.no_merge_request {
        config.release.merge_request = false;
    }
    if args.npm_update_version.is_some() {
        config.hooks.npm_package = args.npm_update_version;
    }
    if args.sign_key_file.is_some() {
        config.release.sign_key_file = args.sign_key_file;
    }

    if let Err(e) = workflow::run(&config, Path::new(&args.path), args.dry_run) {
        ui::display_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}
