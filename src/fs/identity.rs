//! Unique file identifier lookup
//!
//! The scanner treats identifier lookup as an injected capability. The
//! default implementation returns the inode number on Unix; elsewhere it
//! reports `FileId::UNKNOWN` rather than failing every entry.

use crate::fs::types::FileId;
use std::io;
use std::path::Path;

/// Resolves the platform identifier of a path
pub trait FileIdentity: Send + Sync {
    /// Look up the identifier of `path`
    ///
    /// A failure makes the lister skip the entry.
    fn identify(&self, path: &Path) -> io::Result<FileId>;
}

impl<F> FileIdentity for F
where
    F: Fn(&Path) -> io::Result<FileId> + Send + Sync,
{
    fn identify(&self, path: &Path) -> io::Result<FileId> {
        self(path)
    }
}

/// Default platform lookup
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformIdentity;

impl FileIdentity for PlatformIdentity {
    #[cfg(unix)]
    fn identify(&self, path: &Path) -> io::Result<FileId> {
        use std::os::unix::fs::MetadataExt;
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(FileId(metadata.ino()))
    }

    #[cfg(not(unix))]
    fn identify(&self, path: &Path) -> io::Result<FileId> {
        // Still surfaces vanished entries as lookup errors
        std::fs::symlink_metadata(path)?;
        Ok(FileId::UNKNOWN)
    }
}
