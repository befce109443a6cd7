//! Local filesystem access
//!
//! - `types`: entry and record types
//! - `identity`: platform file identifier lookup
//! - `lister`: single-directory enumeration

pub mod identity;
pub mod lister;
pub mod types;

pub use identity::{FileIdentity, PlatformIdentity};
pub use lister::{ensure_directory, list_directory, Listing};
pub use types::{EntryType, FileId, FileMode, FileRecord};
