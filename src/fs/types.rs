//! Filesystem entry types
//!
//! These types describe what the directory lister hands to workers and
//! what workers publish on the Results stream.

use std::fmt;
use std::fs::{FileType, Metadata};
use std::path::{Path, PathBuf};

/// Type of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryType {
    /// Regular file
    File = 0,
    /// Directory
    Directory = 1,
    /// Symbolic link
    Symlink = 2,
    /// Block device
    BlockDevice = 3,
    /// Character device
    CharDevice = 4,
    /// Named pipe (FIFO)
    Fifo = 5,
    /// Unix socket
    Socket = 6,
    /// Unknown type
    Unknown = 255,
}

impl EntryType {
    /// Classify a `FileType` as returned by a directory read
    ///
    /// Symlinks are reported as symlinks, never as their target.
    pub fn from_file_type(ft: FileType) -> Self {
        if ft.is_symlink() {
            return EntryType::Symlink;
        }
        if ft.is_dir() {
            return EntryType::Directory;
        }
        if ft.is_file() {
            return EntryType::File;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if ft.is_block_device() {
                return EntryType::BlockDevice;
            }
            if ft.is_char_device() {
                return EntryType::CharDevice;
            }
            if ft.is_fifo() {
                return EntryType::Fifo;
            }
            if ft.is_socket() {
                return EntryType::Socket;
            }
        }

        EntryType::Unknown
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryType::Directory
    }

    /// Check if this is a symbolic link
    pub fn is_symlink(&self) -> bool {
        *self == EntryType::Symlink
    }
}

/// Platform-level unique file identifier (inode number or equivalent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u64);

impl FileId {
    /// Identifier used where the platform offers none
    pub const UNKNOWN: FileId = FileId(0);

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform file mode bits (type + permissions on Unix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Read the mode from metadata
    ///
    /// On platforms without Unix mode bits only a synthetic
    /// read-only/writable distinction is kept.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self(metadata.mode())
        }

        #[cfg(not(unix))]
        {
            if metadata.permissions().readonly() {
                Self(0o444)
            } else {
                Self(0o644)
            }
        }
    }

    /// Permission bits only (type stripped)
    pub fn permissions(&self) -> u32 {
        self.0 & 0o7777
    }
}

/// A file accepted by the validator
///
/// Immutable once created; ownership passes to whoever receives it from
/// the Results stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full path (root joined with the relative components)
    pub path: PathBuf,

    /// Size in bytes
    pub size: u64,

    /// Platform mode bits
    pub mode: FileMode,

    /// Unique file identifier
    pub file_id: FileId,

    /// Entry type as seen in the directory listing
    pub entry_type: EntryType,
}

impl FileRecord {
    /// Build a record from an entry's metadata and resolved identifier
    pub fn from_metadata(
        path: PathBuf,
        metadata: &Metadata,
        entry_type: EntryType,
        file_id: FileId,
    ) -> Self {
        Self {
            path,
            size: metadata.len(),
            mode: FileMode::from_metadata(metadata),
            file_id,
            entry_type,
        }
    }

    /// File name component
    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
