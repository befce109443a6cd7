//! File validators
//!
//! A validator decides which discovered files are reported. Every worker
//! calls the same validator concurrently, so implementations must be
//! `Send + Sync` and must not rely on hidden mutable state.

use crate::error::ConfigError;
use regex::Regex;
use std::fs::Metadata;
use std::path::Path;

/// Predicate selecting which files end up on the Results stream
pub trait Validator: Send + Sync {
    /// Return true to report the file
    fn accept(&self, path: &Path, metadata: &Metadata) -> bool;
}

impl<F> Validator for F
where
    F: Fn(&Path, &Metadata) -> bool + Send + Sync,
{
    fn accept(&self, path: &Path, metadata: &Metadata) -> bool {
        self(path, metadata)
    }
}

/// Accepts every non-directory entry (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn accept(&self, _path: &Path, _metadata: &Metadata) -> bool {
        true
    }
}

/// Accepts regular files only (no symlinks, devices, fifos or sockets)
#[derive(Debug, Clone, Copy, Default)]
pub struct RegularFilesOnly;

impl Validator for RegularFilesOnly {
    fn accept(&self, _path: &Path, metadata: &Metadata) -> bool {
        metadata.file_type().is_file()
    }
}

/// Accepts files of at least the given size in bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct MinSize(pub u64);

impl Validator for MinSize {
    fn accept(&self, _path: &Path, metadata: &Metadata) -> bool {
        metadata.len() >= self.0
    }
}

/// Rejects files whose path matches any of the patterns
#[derive(Debug, Clone, Default)]
pub struct ExcludePatterns {
    patterns: Vec<Regex>,
}

impl ExcludePatterns {
    /// Compile the patterns, failing on the first invalid one
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.patterns.iter().any(|re| re.is_match(&path))
    }
}

impl Validator for ExcludePatterns {
    fn accept(&self, path: &Path, _metadata: &Metadata) -> bool {
        !self.is_excluded(path)
    }
}

/// Accepts a file only if every inner validator does
#[derive(Default)]
pub struct All {
    validators: Vec<Box<dyn Validator>>,
}

impl All {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Validator for All {
    fn accept(&self, path: &Path, metadata: &Metadata) -> bool {
        self.validators.iter().all(|v| v.accept(path, metadata))
    }
}
