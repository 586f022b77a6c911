//! Forward-only cursor over the font files of one directory.

use std::fs::{self, DirEntry, ReadDir};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use crate::constants::MAX_DIR_PATH_LENGTH;
use crate::handle::Handle;
use crate::host::{Factory, FontFile, FontFileEnumerator, HostError};

enum Listing {
    NotStarted,
    Open(ReadDir),
    Exhausted,
}

struct Cursor {
    listing: Listing,
    /// Reused for every entry; holds the current file's full path.
    path: PathBuf,
    modified: Option<SystemTime>,
    has_current: bool,
}

/// Yields the regular files of a directory once each. Subdirectories are
/// skipped and never descended into. Once exhausted it stays exhausted.
pub struct DirectoryFontEnumerator {
    factory: Handle<dyn Factory>,
    dir: PathBuf,
    cursor: Mutex<Cursor>,
}

impl DirectoryFontEnumerator {
    pub fn new(factory: Handle<dyn Factory>, dir: &Path) -> Result<Self, HostError> {
        if dir.as_os_str().len() > MAX_DIR_PATH_LENGTH {
            return Err(HostError::InvalidArgument);
        }
        Ok(Self {
            factory,
            dir: dir.to_path_buf(),
            cursor: Mutex::new(Cursor {
                listing: Listing::NotStarted,
                path: PathBuf::with_capacity(dir.as_os_str().len() + 64),
                modified: None,
                has_current: false,
            }),
        })
    }

    /// Steps to the next file. The first call opens the listing; if that
    /// fails the error is returned once and every later call returns
    /// `Ok(false)`.
    pub fn advance(&self) -> Result<bool, HostError> {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        cursor.has_current = false;

        if let Listing::NotStarted = cursor.listing {
            match fs::read_dir(&self.dir) {
                Ok(entries) => cursor.listing = Listing::Open(entries),
                Err(e) => {
                    log::debug!("Cannot open font directory {}: {}", self.dir.display(), e);
                    cursor.listing = Listing::Exhausted;
                    return Err(HostError::InvalidArgument);
                }
            }
        }

        let next = match &mut cursor.listing {
            Listing::Open(entries) => entries
                .filter_map(Result::ok)
                .find(|entry| !is_directory(entry)),
            _ => return Ok(false),
        };

        let Some(entry) = next else {
            cursor.listing = Listing::Exhausted;
            return Ok(false);
        };

        cursor.path.clear();
        cursor.path.push(&self.dir);
        cursor.path.push(entry.file_name());
        cursor.modified = entry.metadata().and_then(|m| m.modified()).ok();
        cursor.has_current = true;
        Ok(true)
    }

    /// Whether the last `advance` landed on a file.
    pub fn has_more(&self) -> bool {
        self.cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .has_current
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        let cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        cursor.has_current.then(|| cursor.path.clone())
    }

    /// A host file reference for the current entry.
    pub fn current(&self) -> Result<Handle<dyn FontFile>, HostError> {
        let cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if !cursor.has_current {
            return Err(HostError::InvalidArgument);
        }
        self.factory
            .create_font_file_reference(&cursor.path, cursor.modified)
    }
}

fn is_directory(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Ok(ft) if ft.is_symlink() => entry.path().is_dir(),
        Ok(ft) => ft.is_dir(),
        Err(_) => false,
    }
}

impl FontFileEnumerator for DirectoryFontEnumerator {
    fn move_next(&self) -> Result<bool, HostError> {
        self.advance()
    }

    fn current_font_file(&self) -> Result<Handle<dyn FontFile>, HostError> {
        self.current()
    }
}
