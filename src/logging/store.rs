//! Durable append targets for daily log partitions
//!
//! A partition is a file named `YYYY-MM-DD.log` holding one JSON entry per line.
//! [`FsStore`] keeps partitions in a directory on disk; [`MemoryStore`] is an
//! in-memory stand-in with switchable failures for exercising error paths.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;

/// File extension of partition files
pub const PARTITION_EXTENSION: &str = "log";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// File name of the partition holding entries flushed on `date`
pub fn partition_name(date: NaiveDate) -> String {
    format!("{}.{}", date.format(DATE_FORMAT), PARTITION_EXTENSION)
}

/// Parse a partition file name back into its date
///
/// Returns `None` for names that are not partition files at all (wrong
/// extension), and `Some(Err(..))` for `.log` files whose stem is not a date.
pub fn parse_partition_name(name: &str) -> Option<Result<NaiveDate, chrono::ParseError>> {
    let stem = name.strip_suffix(PARTITION_EXTENSION)?.strip_suffix('.')?;
    Some(NaiveDate::parse_from_str(stem, DATE_FORMAT))
}

/// Storage backend for partition files
pub trait PartitionStore: Send + Sync {
    /// Create the storage location if missing; must succeed when it already exists
    fn ensure_dir(&self) -> io::Result<()>;

    /// Append a block of text to the named partition, creating it if needed
    fn append(&self, name: &str, block: &str) -> io::Result<()>;

    /// Read the whole partition, or `None` if it does not exist
    fn read(&self, name: &str) -> io::Result<Option<String>>;

    /// Names of every file in the storage location
    fn list(&self) -> io::Result<Vec<String>>;

    /// Delete the named partition
    fn remove(&self, name: &str) -> io::Result<()>;
}

/// Partitions stored as files in a directory
#[derive(Debug)]
pub struct FsStore {
    dir: PathBuf,
    /// Serializes appends so concurrent flushes never interleave lines
    write_lock: Mutex<()>,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory holding the partition files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of a partition file
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl PartitionStore for FsStore {
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    fn append(&self, name: &str, block: &str) -> io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(name))?;
        file.write_all(block.as_bytes())?;
        file.flush()
    }

    fn read(&self, name: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(name)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self) -> io::Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(name))
    }
}

/// In-memory partition store
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, String>>,
    fail_writes: AtomicBool,
    fail_removals: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent removal fail
    pub fn set_fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    /// Put a file in place verbatim, replacing any existing content
    pub fn insert(&self, name: impl Into<String>, content: impl Into<String>) {
        self.files().insert(name.into(), content.into());
    }

    /// Current content of a file
    pub fn contents(&self, name: &str) -> Option<String> {
        self.files().get(name).cloned()
    }

    fn files(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartitionStore for MemoryStore {
    fn ensure_dir(&self) -> io::Result<()> {
        Ok(())
    }

    fn append(&self, name: &str, block: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                "simulated write failure",
            ));
        }
        self.files()
            .entry(name.to_string())
            .or_default()
            .push_str(block);
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Option<String>> {
        Ok(self.contents(name))
    }

    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.files().keys().cloned().collect())
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated removal failure",
            ));
        }
        match self.files().remove(name) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, name.to_string())),
        }
    }
}
