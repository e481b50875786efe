//! # Seek and Fetch
//!
//! Finds tagged artifacts across the sync locations by case-sensitive
//! substring match on the base name.
//!
//! - [`seek`] only reports. An unreadable location is noted and skipped.
//! - [`fetch`] copies matches from one location into a local directory.
//!   Each source is verified against its own name *before* it is copied;
//!   a source whose name lies about its content stops the whole fetch.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::copy::{self, VerifiedCopy};
use crate::error::{Result, TagError};
use crate::manifest::{self, Location, Manifest, LOCATION_DELIMITER};
use crate::verify;

/// Seek result for one location.
#[derive(Debug)]
pub struct LocationReport {
    pub location: Location,
    pub listing: Listing,
}

#[derive(Debug)]
pub enum Listing {
    /// Matching base names, sorted.
    Matches(Vec<String>),
    Inaccessible(std::io::Error),
}

/// Progress notifications emitted while fetching.
#[derive(Debug)]
pub enum FetchEvent<'a> {
    /// A matching entry, 1-based within the location.
    Matched { index: usize, name: &'a str },
    Copied(&'a VerifiedCopy),
    /// The match already sits at the destination.
    SkippedSelf(&'a Path),
}

async fn load_locations(manifest_path: &Path) -> Result<Manifest> {
    let manifest = manifest::parse_manifest(manifest_path, LOCATION_DELIMITER).await?;
    if manifest.is_malformed() {
        return Err(TagError::MalformedManifest(manifest_path.to_path_buf()));
    }
    Ok(manifest)
}

/// Entries of `dir` whose name contains `pattern`, sorted by name.
async fn matching_entries(
    dir: &Path,
    pattern: &str,
    files_only: bool,
) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut matches = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            debug!("Skipping non UTF-8 entry in {}", dir.display());
            continue;
        };
        if !name.contains(pattern) {
            continue;
        }
        if files_only && !entry.file_type().await?.is_file() {
            debug!("Skipping non-file match {}", name);
            continue;
        }
        matches.push((name, entry.path()));
    }

    matches.sort();
    Ok(matches)
}

/// Report every entry matching `pattern` in every sync location.
pub async fn seek(config: &Config, pattern: &str) -> Result<Vec<LocationReport>> {
    seek_with_manifest(&config.sync_manifest_path()?, pattern).await
}

pub async fn seek_with_manifest(manifest_path: &Path, pattern: &str) -> Result<Vec<LocationReport>> {
    let manifest = load_locations(manifest_path).await?;
    let mut reports = Vec::with_capacity(manifest.len());

    for location in manifest.locations() {
        let listing = match matching_entries(&location.path, pattern, false).await {
            Ok(found) => Listing::Matches(found.into_iter().map(|(name, _)| name).collect()),
            Err(e) => {
                warn!("Cannot list {} ({}): {}", location.id, location.path.display(), e);
                Listing::Inaccessible(e)
            }
        };
        reports.push(LocationReport { location, listing });
    }

    Ok(reports)
}

/// Copy every file matching `pattern` from `location_id` into `dest_dir`.
pub async fn fetch<F>(
    config: &Config,
    pattern: &str,
    location_id: &str,
    dest_dir: &Path,
    on_event: F,
) -> Result<Vec<VerifiedCopy>>
where
    F: FnMut(FetchEvent<'_>),
{
    let manifest_path = config.sync_manifest_path()?;
    fetch_with_manifest(&manifest_path, pattern, location_id, dest_dir, on_event).await
}

pub async fn fetch_with_manifest<F>(
    manifest_path: &Path,
    pattern: &str,
    location_id: &str,
    dest_dir: &Path,
    mut on_event: F,
) -> Result<Vec<VerifiedCopy>>
where
    F: FnMut(FetchEvent<'_>),
{
    let manifest = load_locations(manifest_path).await?;
    let source_dir = manifest
        .get(location_id)
        .map(PathBuf::from)
        .ok_or_else(|| TagError::UnknownLocation(location_id.to_string()))?;

    let found = matching_entries(&source_dir, pattern, true)
        .await
        .map_err(|source| TagError::LocationUnreadable {
            id: location_id.to_string(),
            path: source_dir.clone(),
            source,
        })?;

    let mut copies = Vec::new();
    for (i, (name, source)) in found.iter().enumerate() {
        on_event(FetchEvent::Matched {
            index: i + 1,
            name: name.as_str(),
        });

        let check = verify::inspect(source).await?;
        if !check.passed() {
            warn!("Aborting fetch: {} fails verification", source.display());
            return Err(TagError::FetchRejected {
                path: source.clone(),
                claimed: check.claimed,
                actual: check.actual.to_string(),
            });
        }

        let dest = dest_dir.join(name);
        if copy::same_file(source, &dest).await {
            on_event(FetchEvent::SkippedSelf(&dest));
            continue;
        }

        let copy = copy::copy_and_verify(source, &dest, Some(&check.actual)).await?;
        info!("Fetched {} from {}", name, location_id);
        on_event(FetchEvent::Copied(&copy));
        copies.push(copy);
    }

    Ok(copies)
}
