//! # Folder Packing
//!
//! Folders are tagged by packing them into a zip archive next to the folder
//! and tagging the archive like any other file. Entries are stored under the
//! folder's own name (`photos/2024/img.jpg`) and written in sorted order.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("could not create archive {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read {path} while archiving: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not add {path} to archive: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("archive task failed: {0}")]
    Task(String),
}

/// Path of the archive produced for `source_dir`: `<parent>/<name>.zip`.
pub fn archive_path(source_dir: &Path) -> Option<PathBuf> {
    let name = source_dir.file_name()?;
    let mut file_name = name.to_os_string();
    file_name.push(".zip");
    Some(source_dir.with_file_name(file_name))
}

/// Pack `source_dir` into a zip archive and return the archive's path.
///
/// On failure the partially written archive is removed.
pub async fn archive(source_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let source_dir = source_dir.to_path_buf();
    tokio::task::spawn_blocking(move || archive_blocking(&source_dir))
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
}

fn archive_blocking(source_dir: &Path) -> Result<PathBuf, ArchiveError> {
    let dest = archive_path(source_dir).ok_or_else(|| ArchiveError::Read {
        path: source_dir.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "folder has no name"),
    })?;

    match write_archive(source_dir, &dest) {
        Ok(entries) => {
            info!("Packed {} entries into {}", entries, dest.display());
            Ok(dest)
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&dest) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!("Could not remove partial archive {}: {}", dest.display(), cleanup);
                }
            }
            Err(e)
        }
    }
}

fn write_archive(source_dir: &Path, dest: &Path) -> Result<usize, ArchiveError> {
    let file = File::create(dest).map_err(|source| ArchiveError::Create {
        path: dest.to_path_buf(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    // Entry names are relative to the folder's parent so the folder name is kept.
    let base = source_dir.parent().unwrap_or_else(|| Path::new(""));
    let mut count = 0;
    let mut pending = vec![source_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let dir_name = entry_name(base, &dir);
        zip.add_directory(dir_name.as_str(), options)
            .map_err(|source| ArchiveError::Write {
                path: dir.clone(),
                source,
            })?;
        count += 1;

        let mut subdirs = Vec::new();
        for child in read_sorted(&dir)? {
            let metadata = std::fs::metadata(&child).map_err(|source| ArchiveError::Read {
                path: child.clone(),
                source,
            })?;
            if metadata.is_dir() {
                subdirs.push(child);
            } else if metadata.is_file() {
                add_file(&mut zip, base, &child, options)?;
                count += 1;
            } else {
                debug!("Skipping special file {}", child.display());
            }
        }
        // Reversed so the stack pops subdirectories in sorted order.
        pending.extend(subdirs.into_iter().rev());
    }

    let mut file = zip.finish().map_err(|source| ArchiveError::Write {
        path: dest.to_path_buf(),
        source,
    })?;
    io::Write::flush(&mut file)
        .and_then(|_| file.sync_all())
        .map_err(|source| ArchiveError::Create {
            path: dest.to_path_buf(),
            source,
        })?;
    Ok(count)
}

fn add_file(
    zip: &mut ZipWriter<File>,
    base: &Path,
    path: &Path,
    options: FileOptions,
) -> Result<(), ArchiveError> {
    let name = entry_name(base, path);
    zip.start_file(name.as_str(), options)
        .map_err(|source| ArchiveError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    let mut input = File::open(path).map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    io::copy(&mut input, zip).map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Archived {}", name);
    Ok(())
}

fn read_sorted(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let read_error = |source| ArchiveError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut children = std::fs::read_dir(dir)
        .map_err(read_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(read_error)?;
    children.sort();
    Ok(children)
}

/// Forward-slash entry name of `path` relative to `base`.
fn entry_name(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
