use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::copy::{self, VerifiedCopy};
use crate::digest::Digest;
use crate::error::{Result, TagError};
use crate::manifest::{self, Location, LOCATION_DELIMITER};
use crate::naming;

/// Progress notifications emitted while replicating.
#[derive(Debug)]
pub enum SyncEvent<'a> {
    /// About to copy to location `index` of `total` (1-based).
    Started {
        index: usize,
        total: usize,
        location: &'a Location,
    },
    Copied(&'a VerifiedCopy),
    /// The location already is the artifact's own directory.
    SkippedSelf(&'a Location),
}

/// Replicate `artifact` into every location of the sync manifest.
///
/// Every copy must hash to `digest`, the digest computed when the artifact
/// was tagged. The manifest is read fresh. If it contains malformed lines
/// nothing is copied and [`TagError::MalformedManifest`] is returned.
/// Locations are visited one after another; the first copy failure ends the
/// run.
pub async fn sync<F>(
    config: &Config,
    artifact: &Path,
    digest: &Digest,
    on_event: F,
) -> Result<Vec<VerifiedCopy>>
where
    F: FnMut(SyncEvent<'_>),
{
    let manifest_path = config.sync_manifest_path()?;
    sync_with_manifest(&manifest_path, artifact, digest, on_event).await
}

pub async fn sync_with_manifest<F>(
    manifest_path: &Path,
    artifact: &Path,
    digest: &Digest,
    mut on_event: F,
) -> Result<Vec<VerifiedCopy>>
where
    F: FnMut(SyncEvent<'_>),
{
    let manifest = manifest::parse_manifest(manifest_path, LOCATION_DELIMITER).await?;
    if manifest.is_malformed() {
        warn!("Sync disabled: {} is malformed", manifest_path.display());
        return Err(TagError::MalformedManifest(manifest_path.to_path_buf()));
    }

    let name = naming::basename(artifact)?;
    let locations = manifest.locations();
    let total = locations.len();
    let mut copies = Vec::with_capacity(total);

    for (i, location) in locations.iter().enumerate() {
        on_event(SyncEvent::Started {
            index: i + 1,
            total,
            location,
        });

        let dest = location.path.join(name);
        if copy::same_file(artifact, &dest).await {
            debug!("{} already lives in {}", name, location.id);
            on_event(SyncEvent::SkippedSelf(location));
            continue;
        }

        let copy = copy::copy_and_verify(artifact, &dest, Some(digest)).await?;
        info!("Synced {} to {}", name, location.id);
        on_event(SyncEvent::Copied(&copy));
        copies.push(copy);
    }

    Ok(copies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::CopyError;
    use crate::digest::digest_bytes;
    use assert_matches::assert_matches;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        manifest: PathBuf,
        artifact: PathBuf,
        digest: Digest,
        root: PathBuf,
    }

    async fn fixture(locations: &[&str]) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let mut manifest = String::from("# sync locations\n");
        for id in locations {
            let dir = root.join(id);
            tokio::fs::create_dir_all(&dir).await.unwrap();
            manifest.push_str(&format!("{},{}\n", id, dir.display()));
        }
        let manifest_path = root.join("sync");
        tokio::fs::write(&manifest_path, manifest).await.unwrap();

        let artifact = root.join("2cf24dba5fb0_report.txt");
        tokio::fs::write(&artifact, b"hello").await.unwrap();

        Fixture {
            _temp_dir: temp_dir,
            manifest: manifest_path,
            artifact,
            digest: digest_bytes(b"hello"),
            root,
        }
    }

    #[tokio::test]
    async fn test_sync_to_every_location() {
        let fx = fixture(&["archive", "backup"]).await;
        let mut progress = Vec::new();

        let copies = sync_with_manifest(&fx.manifest, &fx.artifact, &fx.digest, |event| {
            if let SyncEvent::Started { index, total, location } = event {
                progress.push(format!("({} / {}): {}", index, total, location.id));
            }
        })
        .await
        .unwrap();

        assert_eq!(progress, vec!["(1 / 2): archive", "(2 / 2): backup"]);
        assert_eq!(copies.len(), 2);
        for id in ["archive", "backup"] {
            let copy = fx.root.join(id).join("2cf24dba5fb0_report.txt");
            assert_eq!(tokio::fs::read(&copy).await.unwrap(), b"hello");
        }
        assert!(copies.iter().all(|c| c.digest == digest_bytes(b"hello")));
    }

    #[tokio::test]
    async fn test_malformed_manifest_copies_nothing() {
        let fx = fixture(&["backup"]).await;
        let mut content = tokio::fs::read_to_string(&fx.manifest).await.unwrap();
        content.push_str("garbage\n");
        tokio::fs::write(&fx.manifest, content).await.unwrap();

        let err = sync_with_manifest(&fx.manifest, &fx.artifact, &fx.digest, |_| {})
            .await
            .unwrap_err();

        assert_matches!(err, TagError::MalformedManifest(_));
        assert!(!err.is_fatal());
        assert!(!fx.root.join("backup").join("2cf24dba5fb0_report.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_location_directory_stops_sync() {
        let fx = fixture(&["archive"]).await;
        let mut content = tokio::fs::read_to_string(&fx.manifest).await.unwrap();
        content.push_str(&format!("zzz,{}\n", fx.root.join("gone").display()));
        tokio::fs::write(&fx.manifest, content).await.unwrap();

        let err = sync_with_manifest(&fx.manifest, &fx.artifact, &fx.digest, |_| {})
            .await
            .unwrap_err();

        assert_matches!(err, TagError::Copy(CopyError::Create { .. }));
        assert!(err.is_fatal());
        // Earlier locations keep their verified copy.
        assert!(fx.root.join("archive").join("2cf24dba5fb0_report.txt").exists());
    }

    #[tokio::test]
    async fn test_location_equal_to_source_dir_is_skipped() {
        let fx = fixture(&[]).await;
        tokio::fs::write(&fx.manifest, format!("here,{}\n", fx.root.display()))
            .await
            .unwrap();
        let mut skipped = 0;

        let copies = sync_with_manifest(&fx.manifest, &fx.artifact, &fx.digest, |event| {
            if matches!(event, SyncEvent::SkippedSelf(_)) {
                skipped += 1;
            }
        })
        .await
        .unwrap();

        assert!(copies.is_empty());
        assert_eq!(skipped, 1);
        assert_eq!(tokio::fs::read(&fx.artifact).await.unwrap(), b"hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hard_linked_location_keeps_artifact_intact() {
        let fx = fixture(&["backup"]).await;
        let linked = fx.root.join("backup").join("2cf24dba5fb0_report.txt");
        tokio::fs::hard_link(&fx.artifact, &linked).await.unwrap();
        let mut skipped = Vec::new();

        let copies = sync_with_manifest(&fx.manifest, &fx.artifact, &fx.digest, |event| {
            if let SyncEvent::SkippedSelf(location) = event {
                skipped.push(location.id.clone());
            }
        })
        .await
        .unwrap();

        assert!(copies.is_empty());
        assert_eq!(skipped, vec!["backup"]);
        assert_eq!(tokio::fs::read(&fx.artifact).await.unwrap(), b"hello");
        assert!(crate::verify::verify(&fx.artifact).await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_checked_against_tagged_digest() {
        let fx = fixture(&["backup"]).await;
        // The artifact changed after it was tagged.
        tokio::fs::write(&fx.artifact, b"hellx").await.unwrap();

        let err = sync_with_manifest(&fx.manifest, &fx.artifact, &fx.digest, |_| {})
            .await
            .unwrap_err();

        assert_matches!(err, TagError::Copy(CopyError::Mismatch { .. }));
        assert!(!fx.root.join("backup").join("2cf24dba5fb0_report.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_manifest_is_fatal() {
        let fx = fixture(&[]).await;
        tokio::fs::remove_file(&fx.manifest).await.unwrap();

        let err = sync_with_manifest(&fx.manifest, &fx.artifact, &fx.digest, |_| {})
            .await
            .unwrap_err();
        assert_matches!(err, TagError::ManifestOpen { .. });
    }
}
