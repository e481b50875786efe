//! # Digest Engine
//!
//! Computes the SHA-256 fingerprint of a byte stream and renders it as the
//! short lowercase hex prefix that gets embedded in artifact names.
//!
//! Hashing is incremental: files are read in fixed-size blocks, so arbitrarily
//! large artifacts never have to fit in memory.

use sha2::{Digest as _, Sha256};
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::{Result, TagError};

/// Number of hex characters kept from the full SHA-256 digest.
pub const DIGEST_LEN: usize = 12;

pub(crate) const BLOCK_SIZE: usize = 64 * 1024;

/// Truncated, lowercase hex digest of a file's full content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Truncate a finished hasher into the display form.
    pub(crate) fn from_hasher(hasher: Sha256) -> Self {
        let mut hex = hex::encode(hasher.finalize());
        hex.truncate(DIGEST_LEN);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a digest string taken from a file name.
    pub fn matches(&self, claimed: &str) -> bool {
        self.0 == claimed
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Digest an in-memory buffer.
pub fn digest_bytes(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Digest::from_hasher(hasher)
}

/// Read `reader` to completion and digest everything it yielded.
pub async fn digest_reader<R>(reader: &mut R) -> std::io::Result<Digest>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest::from_hasher(hasher))
}

/// Digest the file at `path`.
///
/// Open and read failures are reported as [`TagError::Digest`], which the
/// dispatch layer treats as fatal.
pub async fn digest_file(path: &Path) -> Result<Digest> {
    let wrap = |source| TagError::Digest {
        path: path.to_path_buf(),
        source,
    };
    let mut file = tokio::fs::File::open(path).await.map_err(wrap)?;
    let digest = digest_reader(&mut file).await.map_err(wrap)?;
    debug!("Digest of {}: {}", path.display(), digest);
    Ok(digest)
}
