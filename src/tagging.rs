//! # Tagging
//!
//! Turns an untagged file or folder into a named artifact:
//!
//! - [`tag_copy`] leaves the original alone and writes a verified,
//!   digest-named copy next to it
//! - [`tag_in_place`] renames the file itself
//! - [`tag_folder`] packs a folder into `<folder>.zip` and tags that in place

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive;
use crate::copy;
use crate::digest::{self, Digest};
use crate::error::{Result, TagError};
use crate::naming;

/// A file whose name now carries its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedArtifact {
    pub path: PathBuf,
    pub digest: Digest,
}

async fn require_file(path: &Path) -> Result<()> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| TagError::Digest {
            path: path.to_path_buf(),
            source,
        })?;
    if !metadata.is_file() {
        return Err(TagError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Write a verified `<digest>_<name>` copy beside `path`.
pub async fn tag_copy(path: &Path) -> Result<TaggedArtifact> {
    require_file(path).await?;
    let digest = digest::digest_file(path).await?;
    let tagged = naming::tagged_path(path, &digest)?;

    let copy = copy::copy_and_verify(path, &tagged, Some(&digest)).await?;
    info!("Tagged copy {}", copy.path.display());
    Ok(TaggedArtifact {
        path: copy.path,
        digest: copy.digest,
    })
}

/// Rename `path` to `<digest>_<name>` in its own directory.
pub async fn tag_in_place(path: &Path) -> Result<TaggedArtifact> {
    require_file(path).await?;
    let digest = digest::digest_file(path).await?;
    let tagged = naming::tagged_path(path, &digest)?;

    if tokio::fs::try_exists(&tagged).await.unwrap_or(false) {
        debug!("Replacing existing {} with identical content", tagged.display());
    }
    tokio::fs::rename(path, &tagged)
        .await
        .map_err(|source| TagError::Rename {
            from: path.to_path_buf(),
            to: tagged.clone(),
            source,
        })?;
    info!("Renamed {} -> {}", path.display(), tagged.display());
    Ok(TaggedArtifact {
        path: tagged,
        digest,
    })
}

/// Pack `dir` into `<dir>.zip` and tag the archive in place.
pub async fn tag_folder(dir: &Path) -> Result<TaggedArtifact> {
    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(TagError::NotADirectory(dir.to_path_buf()));
    }

    let packed = archive::archive(dir).await?;
    tag_in_place(&packed).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_tag_copy_keeps_original() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let tagged = tag_copy(&path).await.unwrap();

        assert_eq!(tagged.path, temp_dir.path().join("2cf24dba5fb0_report.txt"));
        assert_eq!(tagged.digest.as_str(), "2cf24dba5fb0");
        assert!(path.exists());
        assert!(verify::verify(&tagged.path).await.unwrap());
    }

    #[tokio::test]
    async fn test_tag_in_place_renames() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("q3_sales_final.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let tagged = tag_in_place(&path).await.unwrap();

        assert!(!path.exists());
        assert_eq!(
            tagged.path,
            temp_dir.path().join("2cf24dba5fb0_q3_sales_final.txt")
        );
        assert!(verify::verify(&tagged.path).await.unwrap());
    }

    #[tokio::test]
    async fn test_tag_in_place_over_existing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("2cf24dba5fb0_report.txt");
        tokio::fs::write(&existing, b"hello").await.unwrap();
        let path = temp_dir.path().join("report.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let tagged = tag_in_place(&path).await.unwrap();

        assert_eq!(tagged.path, existing);
        assert!(!path.exists());
        assert_eq!(tokio::fs::read(&existing).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_tag_folder_produces_tagged_zip() {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("photos");
        tokio::fs::create_dir_all(&folder).await.unwrap();
        tokio::fs::write(folder.join("img.jpg"), b"jpeg").await.unwrap();

        let tagged = tag_folder(&folder).await.unwrap();

        let name = tagged.path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(name, format!("{}_photos.zip", tagged.digest));
        assert!(!temp_dir.path().join("photos.zip").exists());
        assert!(folder.exists());
        assert!(verify::verify(&tagged.path).await.unwrap());
    }

    #[tokio::test]
    async fn test_tag_rejects_wrong_kinds() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("report.txt");
        tokio::fs::write(&file, b"hello").await.unwrap();

        assert_matches!(tag_copy(temp_dir.path()).await, Err(TagError::NotAFile(_)));
        assert_matches!(tag_folder(&file).await, Err(TagError::NotADirectory(_)));
        assert_matches!(
            tag_in_place(&temp_dir.path().join("missing")).await,
            Err(TagError::Digest { .. })
        );
    }
}
