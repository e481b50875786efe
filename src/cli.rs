//! # Command Line Interface
//!
//! Argument parsing and the top-level dispatch for `tag`. This is the only
//! layer that decides whether an error ends the process; the library hands
//! back [`TagError`] values and [`report_failure`] maps them to output and
//! an exit status.
//!
//! ## Commands
//!
//! - `folder <dir>` - Zip a folder, then tag the archive in place
//! - `file <path>` - Write a tagged copy next to the file
//! - `file-inplace <path>` - Rename the file to its tagged name
//! - `verify <path>` - Check a tagged file against the digest in its name
//! - `fetch <pattern> <location>` - Copy matching files from a sync location
//! - `seek <pattern>` - List matching files across all sync locations
//! - `balance` - Reserved
//!
//! Each tagging command also exists as `<command>-nosync` and accepts
//! `--nosync`, which skips replication for that run.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{Config, SyncDisabled, SyncState};
use crate::copy::Cleanup;
use crate::error::{Severity, TagError};
use crate::locate::{self, FetchEvent, Listing};
use crate::sync::{self, SyncEvent};
use crate::tagging::{self, TaggedArtifact};
use crate::verify;

/// Command-line interface structure for tag.
#[derive(Parser)]
#[command(name = "tag")]
#[command(about = "Uniquely identify a file or folder by prepending its hash to its name")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Zip a folder and tag the archive
    Folder {
        /// Folder to pack
        path: PathBuf,
        /// Do not replicate to sync locations
        #[arg(long)]
        nosync: bool,
    },

    /// Same as `folder --nosync`
    FolderNosync { path: PathBuf },

    /// Write a tagged copy of a file next to it
    File {
        /// File to tag
        path: PathBuf,
        /// Do not replicate to sync locations
        #[arg(long)]
        nosync: bool,
    },

    /// Same as `file --nosync`
    FileNosync { path: PathBuf },

    /// Rename a file to its tagged name
    FileInplace {
        /// File to tag
        path: PathBuf,
        /// Do not replicate to sync locations
        #[arg(long)]
        nosync: bool,
    },

    /// Same as `file-inplace --nosync`
    FileInplaceNosync { path: PathBuf },

    /// Check a tagged file against the digest in its name
    Verify { path: PathBuf },

    /// Copy files matching a pattern from a sync location into the current directory
    Fetch {
        /// Substring to look for in file names
        pattern: String,
        /// Sync location name from the sync manifest
        location: String,
    },

    /// List files matching a pattern in every sync location
    Seek {
        /// Substring to look for in file names
        pattern: String,
    },

    /// Reconcile sync locations (not implemented)
    Balance,
}

impl Commands {
    /// Whether this invocation asked to skip replication.
    pub fn nosync(&self) -> bool {
        match self {
            Commands::Folder { nosync, .. }
            | Commands::File { nosync, .. }
            | Commands::FileInplace { nosync, .. } => *nosync,
            Commands::FolderNosync { .. }
            | Commands::FileNosync { .. }
            | Commands::FileInplaceNosync { .. } => true,
            _ => false,
        }
    }
}

fn warn_line(message: impl Display) {
    println!("{} {}", "W:".yellow().bold(), message);
}

fn error_line(message: impl Display) {
    println!("{} {}", "E:".red().bold(), message);
}

/// Run one command against an already-loaded configuration.
pub async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Folder { path, .. } | Commands::FolderNosync { path } => {
            let tagged = tagging::tag_folder(&path).await?;
            publish(config, tagged).await
        }
        Commands::File { path, .. } | Commands::FileNosync { path } => {
            let tagged = tagging::tag_copy(&path).await?;
            publish(config, tagged).await
        }
        Commands::FileInplace { path, .. } | Commands::FileInplaceNosync { path } => {
            let tagged = tagging::tag_in_place(&path).await?;
            publish(config, tagged).await
        }
        Commands::Verify { path } => verify_artifact(&path).await,
        Commands::Fetch { pattern, location } => {
            let dest = std::env::current_dir()?;
            fetch(config, &pattern, &location, &dest).await
        }
        Commands::Seek { pattern } => seek(config, &pattern).await,
        Commands::Balance => Err(TagError::Unsupported("balance").into()),
    }
}

/// Announce a freshly tagged artifact and replicate it if sync is on.
async fn publish(config: &Config, tagged: TaggedArtifact) -> Result<()> {
    println!("> {}", tagged.digest);

    match config.sync_state() {
        SyncState::Enabled => replicate(config, &tagged).await,
        SyncState::Disabled(reason @ (SyncDisabled::ConfigMissing(_) | SyncDisabled::ConfigMalformed(_))) => {
            warn_line(format!("sync disabled: {}", reason));
            Ok(())
        }
        SyncState::Disabled(reason) => {
            debug!("Sync skipped: {}", reason);
            Ok(())
        }
    }
}

async fn replicate(config: &Config, tagged: &TaggedArtifact) -> Result<()> {
    let result = sync::sync(config, &tagged.path, &tagged.digest, |event| match event {
        SyncEvent::Started { index, total, location } => {
            println!("({} / {}): {}", index, total, location.id);
        }
        SyncEvent::Copied(copy) => println!("> {}", copy.digest),
        SyncEvent::SkippedSelf(location) => {
            warn_line(format!("{} is the source directory, skipped", location.id));
        }
    })
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(TagError::MalformedManifest(path)) => {
            warn_line(format!("malformed sync manifest {}, sync disabled", path.display()));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn verify_artifact(path: &Path) -> Result<()> {
    let report = verify::inspect(path).await?;
    if report.passed() {
        println!("> {}", report.actual);
        return Ok(());
    }

    match report.claimed {
        Some(claimed) => anyhow::bail!(
            "{}: digest mismatch (name claims {}, content hashes to {})",
            path.display(),
            claimed,
            report.actual
        ),
        None => anyhow::bail!(
            "{}: name carries no digest (content hashes to {})",
            path.display(),
            report.actual
        ),
    }
}

async fn seek(config: &Config, pattern: &str) -> Result<()> {
    let reports = locate::seek(config, pattern).await?;

    for report in reports {
        println!("[{}] {}", report.location.id, report.location.path.display());
        match report.listing {
            Listing::Matches(names) => {
                for (i, name) in names.iter().enumerate() {
                    println!(" {}: {}", i + 1, name);
                }
            }
            Listing::Inaccessible(e) => warn_line(format!(
                "cannot access {} ({}): {}",
                report.location.id,
                report.location.path.display(),
                e
            )),
        }
    }

    Ok(())
}

async fn fetch(config: &Config, pattern: &str, location: &str, dest: &Path) -> Result<()> {
    locate::fetch(config, pattern, location, dest, |event| match event {
        FetchEvent::Matched { index, name } => println!(" {}: {}", index, name),
        FetchEvent::Copied(copy) => println!("> {}", copy.digest),
        FetchEvent::SkippedSelf(path) => {
            warn_line(format!("{} is already here, skipped", path.display()));
        }
    })
    .await?;
    Ok(())
}

fn copy_cleanup(err: &TagError) -> Option<&Cleanup> {
    match err {
        TagError::Copy(copy_err) => copy_err.cleanup(),
        _ => None,
    }
}

/// Print a failure the way users expect and return the exit status.
///
/// Fatal errors exit with 1. Recoverable ones are still reported with `E:`
/// since they ended the requested operation, but exit with 0.
pub fn report_failure(err: &anyhow::Error) -> i32 {
    let Some(tag_err) = err.downcast_ref::<TagError>() else {
        error_line(err);
        return 1;
    };

    if let Some(cleanup) = copy_cleanup(tag_err) {
        match cleanup {
            Cleanup::Removed => warn_line("corrupt copy removed"),
            Cleanup::Failed(reason) => warn_line(format!("could not remove corrupt copy: {}", reason)),
        }
    }

    error_line(tag_err);
    match tag_err.severity() {
        Severity::Fatal => 1,
        Severity::Recoverable => 0,
    }
}
