#![allow(unsafe_code)]
//! Trees, tree entries and tree builders.
//!
//! Entries looked up by position are borrowed from their tree
//! ([`TreeEntryRef`]); entries looked up by path are separate allocations the
//! caller owns ([`TreeEntry`]).

use std::path::Path;
use std::ptr;

use git2_dyn_sys as sys;

use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Borrowed, Handle, kind};
use crate::object::object_type;
use crate::runtime::Runtime;
use crate::types::{FileMode, ObjectType, Oid};
use crate::{Object, Repository};

/// A tree entry owned by the caller.
pub type TreeEntry = Handle<kind::TreeEntry>;

/// A tree entry borrowed from its tree.
pub type TreeEntryRef<'a> = Borrowed<'a, kind::TreeEntry>;

/// Builds a new tree in memory.
pub type TreeBuilder = Handle<kind::TreeBuilder>;

/// Accessors shared by owned and borrowed entries.
fn entry_name(rt: &Runtime, entry: *const sys::git_tree_entry) -> Result<String> {
    let name = rt.call(&exports::git_tree_entry_name, |f| unsafe { f(entry) })?;
    unsafe { encoding::borrowed_str_required(name) }
}

fn entry_id(rt: &Runtime, entry: *const sys::git_tree_entry) -> Result<Oid> {
    let id = rt.call(&exports::git_tree_entry_id, |f| unsafe { f(entry) })?;
    unsafe { Oid::from_raw(id) }.ok_or(Error::NullPointer)
}

fn entry_type(rt: &Runtime, entry: *const sys::git_tree_entry) -> Result<ObjectType> {
    object_type(rt.call(&exports::git_tree_entry_type, |f| unsafe { f(entry) })?)
}

fn entry_filemode(rt: &Runtime, entry: *const sys::git_tree_entry) -> Result<FileMode> {
    let mode = rt.call(&exports::git_tree_entry_filemode, |f| unsafe { f(entry) })?;
    i32::try_from(mode)
        .ok()
        .and_then(FileMode::from_ffi)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown file mode {mode:o}")))
}

impl Object {
    /// Number of entries in a tree.
    pub fn tree_len(&self) -> Result<usize> {
        self.call(&exports::git_tree_entrycount, |f, tree| unsafe { f(tree) })
    }

    /// Entry at position `idx` of a tree.
    pub fn tree_entry(&self, idx: usize) -> Result<Option<TreeEntryRef<'_>>> {
        let entry = self.call(&exports::git_tree_entry_byindex, |f, tree| unsafe { f(tree, idx) })?;
        Ok(Borrowed::new(self.runtime(), entry))
    }

    /// Entry at `path` below this tree, searching subtrees. `None` if absent.
    pub fn tree_entry_by_path(&self, path: impl AsRef<Path>) -> Result<Option<TreeEntry>> {
        let tree = self.as_ptr()?;
        let path = encoding::path_to_c(path.as_ref())?;
        Handle::create_optional(self.runtime(), &exports::git_tree_entry_bypath, |f, out| unsafe {
            f(out, tree, path.as_ptr())
        })
    }
}

impl TreeEntry {
    /// File name.
    pub fn name(&self) -> Result<String> {
        entry_name(self.runtime(), self.as_ptr()?)
    }

    /// Object id.
    pub fn id(&self) -> Result<Oid> {
        entry_id(self.runtime(), self.as_ptr()?)
    }

    /// Object type.
    pub fn object_type(&self) -> Result<ObjectType> {
        entry_type(self.runtime(), self.as_ptr()?)
    }

    /// File mode.
    pub fn filemode(&self) -> Result<FileMode> {
        entry_filemode(self.runtime(), self.as_ptr()?)
    }
}

impl TreeEntryRef<'_> {
    /// File name.
    pub fn name(&self) -> Result<String> {
        entry_name(self.runtime(), self.as_ptr())
    }

    /// Object id.
    pub fn id(&self) -> Result<Oid> {
        entry_id(self.runtime(), self.as_ptr())
    }

    /// Object type.
    pub fn object_type(&self) -> Result<ObjectType> {
        entry_type(self.runtime(), self.as_ptr())
    }

    /// File mode.
    pub fn filemode(&self) -> Result<FileMode> {
        entry_filemode(self.runtime(), self.as_ptr())
    }
}

impl Repository {
    /// A builder seeded with the entries of `source`, or empty.
    pub fn tree_builder(&self, source: Option<&Object>) -> Result<TreeBuilder> {
        let source = source.map(Object::as_ptr).transpose()?.unwrap_or(ptr::null_mut());
        Handle::create(self.runtime(), &exports::git_treebuilder_create, |f, out| unsafe {
            f(out, source)
        })
    }
}

impl TreeBuilder {
    /// Add or replace `filename`.
    pub fn insert(&self, filename: &str, id: &Oid, mode: FileMode) -> Result<()> {
        let filename = encoding::to_c_string(filename)?;
        let mode = u32::try_from(mode.to_ffi())
            .map_err(|_| Error::InvalidArgument(format!("bad file mode {mode:?}")))?;
        self.call_checked(&exports::git_treebuilder_insert, |f, bld| unsafe {
            f(ptr::null_mut(), bld, filename.as_ptr(), id.raw(), mode)
        })
        .map(drop)
    }

    /// Write the tree into `repo` and return its id.
    pub fn write(&self, repo: &Repository) -> Result<Oid> {
        let repo = repo.as_ptr()?;
        let mut id = Oid::default();
        self.call_checked(&exports::git_treebuilder_write, |f, bld| unsafe {
            f(&raw mut id.0, repo, bld)
        })?;
        Ok(id)
    }
}
