//! # Verified Copy
//!
//! Copies a file and refuses to call it done until the destination, re-read
//! from disk after an fsync, hashes to the expected digest. A destination that
//! fails the check is deleted before the error is returned: a corrupt
//! duplicate carrying a content-addressed name must never be left behind.

use sha2::{Digest as _, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::digest::{self, Digest, BLOCK_SIZE};

/// What happened to a destination that failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Removed,
    Failed(String),
}

impl fmt::Display for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cleanup::Removed => f.write_str("corrupt copy removed"),
            Cleanup::Failed(reason) => write!(f, "corrupt copy could not be removed: {}", reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("could not open source {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not create destination {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("copy to {path} failed: {source} ({cleanup})")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        cleanup: Cleanup,
    },

    #[error("could not flush {path} to disk: {source} ({cleanup})")]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        cleanup: Cleanup,
    },

    #[error("could not re-read {path} for verification: {source}")]
    Reread {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source and destination are the same file: {path}")]
    SameFile { path: PathBuf },

    #[error("post-copy checksum mismatch for {path}: expected {expected}, found {actual} ({cleanup})")]
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
        cleanup: Cleanup,
    },
}

impl CopyError {
    /// What happened to the partial or corrupt destination, if one was written.
    pub fn cleanup(&self) -> Option<&Cleanup> {
        match self {
            CopyError::Write { cleanup, .. }
            | CopyError::Sync { cleanup, .. }
            | CopyError::Mismatch { cleanup, .. } => Some(cleanup),
            _ => None,
        }
    }
}

/// A destination whose content was confirmed against its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCopy {
    pub path: PathBuf,
    pub digest: Digest,
}

/// Copy `source` to `dest` and verify the result.
///
/// With `expected` set, the destination must hash to it. Without it, the
/// destination is compared against the digest of the bytes read from the
/// source during the transfer.
pub async fn copy_and_verify(
    source: &Path,
    dest: &Path,
    expected: Option<&Digest>,
) -> Result<VerifiedCopy, CopyError> {
    debug!("Copying {} -> {}", source.display(), dest.display());
    if same_file(source, dest).await {
        return Err(CopyError::SameFile {
            path: dest.to_path_buf(),
        });
    }

    let source_digest = {
        let mut reader = File::open(source).await.map_err(|e| CopyError::Open {
            path: source.to_path_buf(),
            source: e,
        })?;
        let mut writer = File::create(dest).await.map_err(|e| CopyError::Create {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let source_digest = fill(&mut reader, &mut writer, dest).await?;

        if let Err(e) = writer.sync_all().await {
            drop(writer);
            return Err(CopyError::Sync {
                path: dest.to_path_buf(),
                source: e,
                cleanup: discard(dest).await,
            });
        }
        source_digest
    };

    let expected = expected.cloned().unwrap_or(source_digest);
    let copy = confirm(dest, &expected).await?;
    info!("Verified copy {} ({})", copy.path.display(), copy.digest);
    Ok(copy)
}

/// Whether `dest` is the same file as `source`, including through hard links
/// and bind mounts. Creating the destination would truncate the source before
/// it is read.
#[cfg(unix)]
pub(crate) async fn same_file(source: &Path, dest: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (tokio::fs::metadata(source).await, tokio::fs::metadata(dest).await) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
pub(crate) async fn same_file(source: &Path, dest: &Path) -> bool {
    match (
        tokio::fs::canonicalize(source).await,
        tokio::fs::canonicalize(dest).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Stream `reader` into the already created `dest`, removing `dest` if the
/// transfer fails part way.
pub(crate) async fn fill<R, W>(reader: &mut R, writer: &mut W, dest: &Path) -> Result<Digest, CopyError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match transfer(reader, writer).await {
        Ok(digest) => Ok(digest),
        Err(e) => {
            warn!("Copy to {} failed: {}", dest.display(), e);
            Err(CopyError::Write {
                path: dest.to_path_buf(),
                source: e,
                cleanup: discard(dest).await,
            })
        }
    }
}

/// Remove a destination that must not be left behind.
async fn discard(dest: &Path) -> Cleanup {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => Cleanup::Removed,
        Err(e) => {
            warn!("Could not remove corrupt copy {}: {}", dest.display(), e);
            Cleanup::Failed(e.to_string())
        }
    }
}

/// Stream everything from `reader` into `writer`, hashing the bytes on the way.
pub(crate) async fn transfer<R, W>(reader: &mut R, writer: &mut W) -> std::io::Result<Digest>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n]).await?;
    }
    writer.flush().await?;
    Ok(Digest::from_hasher(hasher))
}

/// Re-hash `dest` and compare it to `expected`, deleting it on mismatch.
pub(crate) async fn confirm(dest: &Path, expected: &Digest) -> Result<VerifiedCopy, CopyError> {
    let actual = {
        let mut file = File::open(dest).await.map_err(|e| CopyError::Reread {
            path: dest.to_path_buf(),
            source: e,
        })?;
        digest::digest_reader(&mut file)
            .await
            .map_err(|e| CopyError::Reread {
                path: dest.to_path_buf(),
                source: e,
            })?
    };

    if actual == *expected {
        return Ok(VerifiedCopy {
            path: dest.to_path_buf(),
            digest: actual,
        });
    }

    Err(CopyError::Mismatch {
        path: dest.to_path_buf(),
        expected: expected.to_string(),
        actual: actual.to_string(),
        cleanup: discard(dest).await,
    })
}
