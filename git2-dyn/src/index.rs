#![allow(unsafe_code)]
//! The index (staging area).

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use git2_dyn_sys as sys;

use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Borrowed, Handle, kind};
use crate::runtime::Runtime;
use crate::types::{FileMode, Oid};

/// An index file loaded in memory.
pub type Index = Handle<kind::Index>;

/// An entry owned by an [`Index`]. Valid until the index is modified.
pub type IndexEntryRef<'a> = Borrowed<'a, kind::IndexEntry>;

/// Data for a new index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIndexEntry {
    /// Path relative to the working directory, `/` separated.
    pub path: String,
    /// Blob id of the content.
    pub id: Oid,
    /// File mode.
    pub mode: FileMode,
    /// Size of the working file in bytes.
    pub file_size: i64,
}

struct RawEntry {
    _path: CString,
    entry: sys::git_index_entry,
}

impl NewIndexEntry {
    fn to_raw(&self) -> Result<RawEntry> {
        let path = encoding::to_c_string(&self.path)?;
        let mode = u32::try_from(self.mode.to_ffi())
            .map_err(|_| Error::InvalidArgument(format!("bad file mode {:?}", self.mode)))?;
        let entry = sys::git_index_entry {
            ctime: sys::git_index_time::default(),
            mtime: sys::git_index_time::default(),
            dev: 0,
            ino: 0,
            mode,
            uid: 0,
            gid: 0,
            file_size: self.file_size,
            oid: self.id.0,
            flags: 0,
            flags_extended: 0,
            path: path.as_ptr().cast_mut(),
        };
        Ok(RawEntry { _path: path, entry })
    }
}

/// The three sides of a conflicted path. Missing sides are `None`.
#[derive(Debug)]
pub struct Conflict<'a> {
    /// Common ancestor (stage 1).
    pub ancestor: Option<IndexEntryRef<'a>>,
    /// Our side (stage 2).
    pub ours: Option<IndexEntryRef<'a>>,
    /// Their side (stage 3).
    pub theirs: Option<IndexEntryRef<'a>>,
}

impl Index {
    /// Open an index file that is not attached to a repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_in(Runtime::global(), path.as_ref())
    }

    pub(crate) fn open_in(rt: &'static Runtime, path: &Path) -> Result<Self> {
        let path = encoding::path_to_c(path)?;
        Handle::create(rt, &exports::git_index_open, |f, out| unsafe {
            f(out, path.as_ptr())
        })
    }

    /// Add or replace an entry.
    pub fn add(&self, entry: &NewIndexEntry) -> Result<()> {
        let raw = entry.to_raw()?;
        self.call_checked(&exports::git_index_add, |f, index| unsafe {
            f(index, &raw const raw.entry)
        })
        .map(drop)
    }

    /// Stage a file from the working directory.
    pub fn add_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = encoding::path_to_c(path.as_ref())?;
        self.call_checked(&exports::git_index_add_bypath, |f, index| unsafe {
            f(index, path.as_ptr())
        })
        .map(drop)
    }

    /// Remove the entry for `path` at `stage`.
    pub fn remove(&self, path: impl AsRef<Path>, stage: i32) -> Result<()> {
        let path = encoding::path_to_c(path.as_ref())?;
        self.call_checked(&exports::git_index_remove, |f, index| unsafe {
            f(index, path.as_ptr(), stage)
        })
        .map(drop)
    }

    /// Position of the first entry for `path`.
    pub fn find(&self, path: impl AsRef<Path>) -> Result<Option<usize>> {
        let path = encoding::path_to_c(path.as_ref())?;
        let mut pos = 0usize;
        let rc = self.call(&exports::git_index_find, |f, index| unsafe {
            f(&raw mut pos, index, path.as_ptr())
        })?;
        Ok(self.runtime().check_found(rc)?.map(|_| pos))
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize> {
        self.call(&exports::git_index_entrycount, |f, index| unsafe { f(index) })
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Entry at position `n`.
    pub fn get(&self, n: usize) -> Result<Option<IndexEntryRef<'_>>> {
        let entry = self.call(&exports::git_index_get_byindex, |f, index| unsafe { f(index, n) })?;
        Ok(Borrowed::new(self.runtime(), entry))
    }

    /// Entry for `path` at `stage`.
    pub fn get_by_path(&self, path: impl AsRef<Path>, stage: i32) -> Result<Option<IndexEntryRef<'_>>> {
        let path = encoding::path_to_c(path.as_ref())?;
        let entry = self.call(&exports::git_index_get_bypath, |f, index| unsafe {
            f(index, path.as_ptr(), stage)
        })?;
        Ok(Borrowed::new(self.runtime(), entry))
    }

    /// Whether any path has conflict entries.
    pub fn has_conflicts(&self) -> Result<bool> {
        self.call(&exports::git_index_has_conflicts, |f, index| unsafe { f(index) })
            .map(|rc| rc != 0)
    }

    /// Conflict entries for `path`. `None` if the path is not conflicted.
    pub fn conflict(&self, path: impl AsRef<Path>) -> Result<Option<Conflict<'_>>> {
        let path = encoding::path_to_c(path.as_ref())?;
        let (mut ancestor, mut ours, mut theirs) = (ptr::null(), ptr::null(), ptr::null());
        let rc = self.call(&exports::git_index_conflict_get, |f, index| unsafe {
            f(&raw mut ancestor, &raw mut ours, &raw mut theirs, index, path.as_ptr())
        })?;
        if self.runtime().check_found(rc)?.is_none() {
            return Ok(None);
        }
        let rt = self.runtime();
        Ok(Some(Conflict {
            ancestor: Borrowed::new(rt, ancestor),
            ours: Borrowed::new(rt, ours),
            theirs: Borrowed::new(rt, theirs),
        }))
    }

    /// Write the index back to its file.
    pub fn write(&self) -> Result<()> {
        self.call_checked(&exports::git_index_write, |f, index| unsafe { f(index) })
            .map(drop)
    }

    /// Write the index as a tree object and return its id.
    pub fn write_tree(&self) -> Result<Oid> {
        let mut id = Oid::default();
        self.call_checked(&exports::git_index_write_tree, |f, index| unsafe {
            f(&raw mut id.0, index)
        })?;
        Ok(id)
    }
}

impl IndexEntryRef<'_> {
    fn raw(&self) -> &sys::git_index_entry {
        unsafe { &*self.as_ptr() }
    }

    /// Path of the entry.
    pub fn path(&self) -> Result<String> {
        unsafe { encoding::borrowed_str_required(self.raw().path) }
    }

    /// Blob id.
    #[must_use]
    pub fn id(&self) -> Oid {
        Oid(self.raw().oid)
    }

    /// Raw mode bits.
    #[must_use]
    pub fn mode(&self) -> u32 {
        self.raw().mode
    }

    /// File size recorded at staging time.
    #[must_use]
    pub fn file_size(&self) -> i64 {
        self.raw().file_size
    }

    /// Merge stage: 0 for normal entries, 1 to 3 for conflict sides.
    pub fn stage(&self) -> Result<i32> {
        let entry = self.as_ptr();
        self.runtime()
            .call(&exports::git_index_entry_stage, |f| unsafe { f(entry) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn new_entry_marshals_path_and_mode() {
        let entry = NewIndexEntry {
            path: "src/lib.rs".into(),
            id: Oid::from_bytes([7; 20]),
            mode: FileMode::BlobExecutable,
            file_size: 42,
        };
        let raw = entry.to_raw().unwrap();
        assert_eq!(raw.entry.mode, 0o100_755);
        assert_eq!(raw.entry.file_size, 42);
        assert_eq!(raw.entry.oid.id, [7; 20]);
        let path = unsafe { CStr::from_ptr(raw.entry.path) };
        assert_eq!(path.to_str().unwrap(), "src/lib.rs");
    }

    #[test]
    fn interior_nul_in_path_is_rejected() {
        let entry = NewIndexEntry {
            path: "a\0b".into(),
            id: Oid::default(),
            mode: FileMode::Blob,
            file_size: 0,
        };
        assert!(matches!(entry.to_raw(), Err(Error::InteriorNul)));
    }
}
