//! Persistent storage for dump artifacts.
//!
//! Dump files are plain-text captures of the device's CLI output, named by
//! creation timestamp and immutable once written. The store rejects any
//! requested filename containing a path separator or parent-directory token
//! before touching the filesystem.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, SkyhookError};
use crate::identify;

/// A successfully persisted capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DumpRecord {
    /// File name inside the dump directory.
    #[schema(example = "dump_20250115-093042.txt")]
    pub filename: String,

    /// When the capture was written (UTC).
    pub created_at: DateTime<Utc>,

    /// Size of the capture in bytes.
    #[schema(example = 48_213)]
    pub size_bytes: u64,

    /// Firmware identity parsed from the capture, when one was recognized.
    #[schema(example = "Betaflight / STM32F405 (S405) 4.4.0")]
    pub firmware: Option<String>,
}

/// Storage backend for dump artifacts.
#[derive(Debug, Clone)]
pub struct DumpStore {
    dir: PathBuf,
}

impl DumpStore {
    /// Create a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this store writes into.
    #[must_use]
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Create the dump directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Persist a capture as a new timestamped file and return its record.
    ///
    /// Files are never overwritten; a stamp collision gets a numeric suffix.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be created or written.
    pub fn write_capture(
        &self,
        text: &str,
        firmware: Option<String>,
        stamp: DateTime<Utc>,
    ) -> Result<DumpRecord> {
        self.ensure_dir()?;
        let base = stamp.format("dump_%Y%m%d-%H%M%S");
        let mut filename = format!("{base}.txt");
        let mut attempt = 0u32;
        let mut file = loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&filename))
            {
                Ok(file) => break file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 100 => {
                    attempt += 1;
                    filename = format!("{base}-{attempt}.txt");
                }
                Err(e) => return Err(e.into()),
            }
        };
        file.write_all(text.as_bytes())?;
        file.flush()?;

        Ok(DumpRecord {
            filename,
            created_at: stamp,
            size_bytes: text.len() as u64,
            firmware,
        })
    }

    /// List all stored dumps, newest first.
    ///
    /// The firmware identity is re-scanned from the head of each file, so
    /// listing stays correct across restarts without a sidecar index.
    ///
    /// # Errors
    ///
    /// Returns an error when the dump directory cannot be read.
    pub fn list(&self) -> Result<Vec<DumpRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("dump_") || !name.ends_with(".txt") {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            records.push(DumpRecord {
                firmware: self.scan_identity(&name),
                created_at: metadata.modified().map_or_else(|_| Utc::now(), DateTime::from),
                size_bytes: metadata.len(),
                filename: name,
            });
        }
        records.sort_by(|a, b| b.filename.cmp(&a.filename));
        Ok(records)
    }

    /// The most recent dump, if any exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the dump directory cannot be read.
    pub fn latest(&self) -> Result<Option<DumpRecord>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Read a stored dump's content by filename.
    ///
    /// # Errors
    ///
    /// Returns [`SkyhookError::InvalidFilename`] before any filesystem access
    /// when the name carries traversal tokens, and an I/O error when the file
    /// is absent or unreadable.
    pub fn read(&self, filename: &str) -> Result<String> {
        validate_filename(filename)?;
        Ok(std::fs::read_to_string(self.dir.join(filename))?)
    }

    fn scan_identity(&self, filename: &str) -> Option<String> {
        let file = std::fs::File::open(self.dir.join(filename)).ok()?;
        let head: String = BufReader::new(file)
            .lines()
            .map_while(std::result::Result::ok)
            .take(identify::IDENTITY_SCAN_LINES)
            .collect::<Vec<_>>()
            .join("\n");
        identify::detect_identity(&head)
    }
}

/// Reject names that could escape the dump directory.
///
/// # Errors
///
/// Returns [`SkyhookError::InvalidFilename`] for empty names and names
/// containing a path separator or a `..` component.
pub fn validate_filename(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name.contains("..");
    if invalid {
        return Err(SkyhookError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, DumpStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DumpStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_rejects_traversal_before_filesystem_access() {
        // The store's directory does not even exist; validation must fire first.
        let store = DumpStore::new("/nonexistent/skyhook-test");
        let err = store.read("../../etc/passwd").unwrap_err();
        assert!(matches!(err, SkyhookError::InvalidFilename(_)));
    }

    #[test]
    fn test_validate_filename_cases() {
        assert!(validate_filename("dump_20250101-120000.txt").is_ok());
        assert!(validate_filename("../../etc/passwd").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("a/b.txt").is_err());
        assert!(validate_filename("a\\b.txt").is_err());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("dump_..txt").is_err());
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let (_guard, store) = store();
        let capture = "# dump all\nset serial = 1\n";
        let record = store.write_capture(capture, None, Utc::now()).unwrap();
        assert!(record.filename.starts_with("dump_"));
        assert_eq!(record.size_bytes, capture.len() as u64);

        let content = store.read(&record.filename).unwrap();
        assert!(content.contains("set serial = 1"));
    }

    #[test]
    fn test_collision_gets_suffix() {
        let (_guard, store) = store();
        let stamp = Utc::now();
        let first = store.write_capture("a", None, stamp).unwrap();
        let second = store.write_capture("b", None, stamp).unwrap();
        assert_ne!(first.filename, second.filename);
        assert_eq!(store.read(&first.filename).unwrap(), "a");
        assert_eq!(store.read(&second.filename).unwrap(), "b");
    }

    #[test]
    fn test_list_newest_first() {
        let (_guard, store) = store();
        let early = "2025-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let late = "2025-06-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        store.write_capture("old", None, early).unwrap();
        store.write_capture("new", None, late).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].filename > records[1].filename);
    }

    #[test]
    fn test_list_recovers_firmware_identity() {
        let (_guard, store) = store();
        store
            .write_capture(
                "# dump\n# Betaflight / STM32F405 (S405) 4.4.0 Apr  1 2023\n",
                Some("ignored at list time".into()),
                Utc::now(),
            )
            .unwrap();

        let records = store.list().unwrap();
        let firmware = records[0].firmware.as_deref().unwrap();
        assert!(firmware.contains("Betaflight"));
    }

    #[test]
    fn test_list_empty_when_dir_absent() {
        let store = DumpStore::new("/nonexistent/skyhook-test");
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_foreign_files() {
        let (_guard, store) = store();
        store.ensure_dir().unwrap();
        std::fs::write(store.dir().join("notes.md"), "not a dump").unwrap();
        store.write_capture("real", None, Utc::now()).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }
}
