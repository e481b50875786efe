//! # Verify
//!
//! Re-hashes a tagged artifact and checks the digest its own name claims.
//! Verification never touches the file and never decides what happens next;
//! a `false` is just a report.

use std::path::{Path, PathBuf};

use crate::digest::{self, Digest};
use crate::error::Result;
use crate::naming;

/// Outcome of checking one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub path: PathBuf,
    /// Digest embedded in the name, `None` if the name has no separator.
    pub claimed: Option<String>,
    pub actual: Digest,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.claimed
            .as_deref()
            .is_some_and(|claimed| self.actual.matches(claimed))
    }
}

/// Compute the full verification report for `path`.
///
/// Fails only if the file cannot be hashed.
pub async fn inspect(path: &Path) -> Result<Verification> {
    let name = naming::basename(path)?;
    let claimed = naming::extract_embedded_digest(name).map(str::to_string);
    let actual = digest::digest_file(path).await?;
    Ok(Verification {
        path: path.to_path_buf(),
        claimed,
        actual,
    })
}

/// True only if the content of `path` hashes to the digest in its name.
pub async fn verify(path: &Path) -> Result<bool> {
    Ok(inspect(path).await?.passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_verify_tagged_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("2cf24dba5fb0_report.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        assert!(verify(&path).await.unwrap());

        tokio::fs::write(&path, b"hellx").await.unwrap();
        assert!(!verify(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_untagged_name_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let report = inspect(&path).await.unwrap();
        assert_eq!(report.claimed, None);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_underscored_untagged_name_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("q3_sales.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        let report = inspect(&path).await.unwrap();
        assert_eq!(report.claimed.as_deref(), Some("q3"));
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_verify_does_not_modify() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("000000000000_report.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();

        assert!(!verify(&path).await.unwrap());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(verify(&temp_dir.path().join("2cf24dba5fb0_gone")).await.is_err());
    }
}
