//! # Tag
//!
//! Content-addressed identification and verified replication of files and
//! folders. Tag computes the SHA-256 digest of an artifact, embeds the first
//! twelve hex characters into its file name (`2cf24dba5fb0_report.txt`) and
//! can replicate the tagged artifact to a set of locally mounted sync
//! locations, verifying every copy against the digest.
//!
//! ## Core Modules
//!
//! - [`digest`] - Streaming SHA-256 and the truncated display form
//! - [`naming`] - The `<digest>_<name>` naming convention
//! - [`copy`] - Copy-then-verify, removing corrupt output
//! - [`manifest`] - Delimited manifest parsing (sync locations, options)
//! - [`config`] - Immutable run configuration and sync state
//! - [`tagging`] - Tag a file by copy or rename, or a folder via zip
//! - [`sync`] - Replicate a tagged artifact to every sync location
//! - [`locate`] - Seek and fetch artifacts across sync locations
//! - [`verify`] - Check an artifact against the digest in its name
//! - [`cli`] - Argument parsing and top-level dispatch
//!
//! ## Quick Start
//!
//! ```bash
//! # Tag a copy of a file and sync it
//! tag file report.txt
//!
//! # Check it later
//! tag verify 2cf24dba5fb0_report.txt
//!
//! # Find and retrieve it from a sync location
//! tag seek report
//! tag fetch report backup
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod copy;
pub mod digest;
pub mod error;
pub mod locate;
pub mod manifest;
pub mod naming;
pub mod sync;
pub mod tagging;
pub mod verify;

pub use config::Config;
pub use digest::Digest;
pub use error::TagError;
