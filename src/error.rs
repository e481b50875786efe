//! # Error Taxonomy
//!
//! Every library operation returns [`TagError`]. The library never decides
//! to terminate the process; the dispatch layer in [`crate::cli`] inspects
//! [`TagError::severity`] and chooses between a loud stop and a reported
//! warning.

use std::path::PathBuf;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::copy::CopyError;

/// How the dispatch layer should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The content-addressing guarantee is at risk; stop the process.
    Fatal,
    /// Report and carry on (or end the current operation quietly).
    Recoverable,
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("could not read {path} for hashing: {source}")]
    Digest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("could not rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("path has no usable file name: {0}")]
    NoFileName(PathBuf),

    #[error("could not open manifest {path}: {source}")]
    ManifestOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {0} contains malformed lines")]
    MalformedManifest(PathBuf),

    #[error("no configuration directory could be determined")]
    NoConfigDir,

    #[error("location {id} ({path}) is not accessible: {source}")]
    LocationUnreadable {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown location: {0}")]
    UnknownLocation(String),

    #[error("refusing to fetch {path}: name claims {claimed:?} but content hashes to {actual}")]
    FetchRejected {
        path: PathBuf,
        claimed: Option<String>,
        actual: String,
    },

    #[error("{0} is not supported yet")]
    Unsupported(&'static str),
}

impl TagError {
    pub fn severity(&self) -> Severity {
        match self {
            TagError::MalformedManifest(_)
            | TagError::UnknownLocation(_)
            | TagError::LocationUnreadable { .. }
            | TagError::FetchRejected { .. } => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

pub type Result<T> = std::result::Result<T, TagError>;
