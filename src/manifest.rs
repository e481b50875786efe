//! # Location Registry
//!
//! Parser for the small delimited text files under the config directory:
//! the `sync` manifest (`name,path`) and the `config` file (`key=value`).
//!
//! Parsing is lenient about content and strict about trust. A malformed line
//! does not stop the parse, but it marks the whole manifest as malformed and
//! callers must refuse to act on it. That includes lines that are not UTF-8.
//! Only an unopenable or unreadable file is an error here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::error::{Result, TagError};

pub const COMMENT_MARKER: char = '#';

/// Delimiter of the sync manifest.
pub const LOCATION_DELIMITER: char = ',';

/// Delimiter of the global config file.
pub const OPTION_DELIMITER: char = '=';

/// A named sync location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: String,
    pub path: PathBuf,
}

/// Parsed key/value pairs plus the malformed flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: BTreeMap<String, String>,
    /// 1-based line numbers that failed to parse.
    pub malformed_lines: Vec<usize>,
}

impl Manifest {
    pub fn is_malformed(&self) -> bool {
        !self.malformed_lines.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries interpreted as sync locations, in key order.
    pub fn locations(&self) -> Vec<Location> {
        self.entries
            .iter()
            .map(|(id, path)| Location {
                id: id.clone(),
                path: PathBuf::from(path),
            })
            .collect()
    }

    /// Like [`Manifest::absorb`] for a line read from disk; bytes that are
    /// not UTF-8 make the line malformed.
    fn absorb_bytes(&mut self, line_no: usize, line: &[u8], delimiter: char) -> bool {
        match std::str::from_utf8(line) {
            Ok(text) => self.absorb(line_no, text, delimiter),
            Err(_) => {
                self.malformed_lines.push(line_no);
                false
            }
        }
    }

    /// Fold one raw line into the manifest. Returns false if it was malformed.
    fn absorb(&mut self, line_no: usize, line: &str, delimiter: char) -> bool {
        match parse_line(line, delimiter) {
            None => true,
            Some(Ok((key, value))) => {
                if let Some(previous) = self.entries.insert(key.clone(), value) {
                    debug!("Duplicate key {} replaces {}", key, previous);
                }
                true
            }
            Some(Err(())) => {
                self.malformed_lines.push(line_no);
                false
            }
        }
    }
}

/// Parse one line. `None` means skip, `Some(Err(()))` means malformed.
fn parse_line(line: &str, delimiter: char) -> Option<std::result::Result<(String, String), ()>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
        return None;
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    let mut fields = compact.split(delimiter);
    let parsed = match (fields.next(), fields.next(), fields.next()) {
        (Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(()),
    };
    Some(parsed)
}

/// Parse manifest text already in memory.
pub fn parse_str(content: &str, delimiter: char) -> Manifest {
    let mut manifest = Manifest::default();
    for (index, line) in content.lines().enumerate() {
        manifest.absorb(index + 1, line, delimiter);
    }
    manifest
}

/// Read and parse the manifest at `path`, line by line.
pub async fn parse_manifest(path: &Path, delimiter: char) -> Result<Manifest> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| TagError::ManifestOpen {
            path: path.to_path_buf(),
            source,
        })?;

    let mut manifest = Manifest::default();
    let mut lines = BufReader::new(file).split(b'\n');
    let mut line_no = 0;
    while let Some(mut line) = lines
        .next_segment()
        .await
        .map_err(|source| TagError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?
    {
        line_no += 1;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if !manifest.absorb_bytes(line_no, &line, delimiter) {
            warn!("{}:{}: malformed line", path.display(), line_no);
        }
    }

    debug!(
        "Loaded {} entries from {} ({} malformed)",
        manifest.len(),
        path.display(),
        manifest.malformed_lines.len()
    );
    Ok(manifest)
}
