//! # Named Artifacts
//!
//! A tagged artifact's base name is `{digest}_{original_name}`. The digest is
//! recovered by splitting on the *first* `_` only, so original names that
//! contain underscores survive verbatim after the separator. The flip side is
//! that an untagged name such as `my_file.txt` yields `my` as its "digest";
//! callers detect that by comparing against a freshly computed digest.

use std::path::{Path, PathBuf};

use crate::digest::Digest;
use crate::error::{Result, TagError};

/// Reserved separator between the digest prefix and the original name.
pub const SEPARATOR: char = '_';

/// Base name for `original` once tagged with `digest`.
pub fn tagged_basename(digest: &Digest, original: &str) -> String {
    format!("{}{}{}", digest, SEPARATOR, original)
}

/// Full path of the tagged name, placed in `directory`.
pub fn build_name(directory: &Path, digest: &Digest, original: &str) -> PathBuf {
    directory.join(tagged_basename(digest, original))
}

/// Path of `path` once tagged: same directory, digest-prefixed base name.
pub fn tagged_path(path: &Path, digest: &Digest) -> Result<PathBuf> {
    let original = basename(path)?;
    let directory = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(build_name(directory, digest, original))
}

/// The digest string embedded in `basename`, or `None` if it has no separator.
///
/// The result is not validated as hex; that is up to the caller.
pub fn extract_embedded_digest(basename: &str) -> Option<&str> {
    basename
        .split_once(SEPARATOR)
        .map(|(digest, _rest)| digest)
}

/// UTF-8 base name of `path`.
pub fn basename(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| TagError::NoFileName(path.to_path_buf()))
}
