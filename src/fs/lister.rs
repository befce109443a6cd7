//! Directory lister
//!
//! Reads one directory in a single pass and partitions its children into
//! files and subdirectories. Classification uses the file type carried by
//! the directory entry; files additionally get one metadata call (size,
//! mode, validator input) and one identifier lookup.

use crate::fs::identity::FileIdentity;
use crate::fs::types::{EntryType, FileRecord};
use crate::validator::Validator;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Children of a single directory
#[derive(Debug, Default)]
pub struct Listing {
    /// Files accepted by the validator
    pub files: Vec<FileRecord>,

    /// Direct subdirectories
    pub dirs: Vec<PathBuf>,

    /// Files rejected by the validator
    pub rejected: u64,

    /// Entries dropped because their metadata or identifier was unavailable
    pub skipped: u64,
}

/// List the direct children of `dir`
///
/// Only a failure to open or enumerate the directory is an error.
/// Individual entries that disappear or cannot be identified are skipped
/// and counted in `Listing::skipped`.
pub fn list_directory(
    dir: &Path,
    validator: &dyn Validator,
    identity: &dyn FileIdentity,
) -> io::Result<Listing> {
    let mut listing = Listing::default();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "Skipping unreadable entry");
                listing.skipped += 1;
                continue;
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping entry without file type");
                listing.skipped += 1;
                continue;
            }
        };

        let entry_type = EntryType::from_file_type(file_type);
        if entry_type.is_dir() {
            listing.dirs.push(path);
            continue;
        }

        // Does not follow symlinks
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping entry without metadata");
                listing.skipped += 1;
                continue;
            }
        };

        if !validator.accept(&path, &metadata) {
            trace!(path = %path.display(), "Rejected by validator");
            listing.rejected += 1;
            continue;
        }

        let file_id = match identity.identify(&path) {
            Ok(id) => id,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Identifier lookup failed, skipping");
                listing.skipped += 1;
                continue;
            }
        };

        listing
            .files
            .push(FileRecord::from_metadata(path, &metadata, entry_type, file_id));
    }

    Ok(listing)
}

/// Check that `dir` exists and is a directory
pub fn ensure_directory(dir: &Path) -> Result<(), String> {
    match fs::metadata(dir) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err("not a directory".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
