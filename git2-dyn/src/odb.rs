#![allow(unsafe_code)]
//! The object database.

use std::ffi::c_void;

use git2_dyn_sys as sys;

use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Handle, kind};
use crate::types::Oid;

/// An object database.
pub type Odb = Handle<kind::Odb>;

impl Odb {
    /// Whether `id` is stored in any backend.
    pub fn exists(&self, id: &Oid) -> Result<bool> {
        self.call(&exports::git_odb_exists, |f, odb| unsafe { f(odb, id.raw()) })
            .map(|rc| rc != 0)
    }

    /// Register a custom storage backend at `priority`.
    ///
    /// # Safety
    /// `backend` must be a fully initialized `git_odb_backend` whose function
    /// table stays valid until the database frees it; ownership passes to the
    /// database on success.
    pub unsafe fn add_backend(&self, backend: *mut sys::git_odb_backend, priority: i32) -> Result<()> {
        if backend.is_null() {
            return Err(Error::NullPointer);
        }
        self.call_checked(&exports::git_odb_add_backend, |f, odb| unsafe {
            f(odb, backend, priority)
        })
        .map(drop)
    }
}

/// Allocate `len` bytes for a backend to return to the library, which frees
/// them.
///
/// # Safety
/// `backend` must be a backend registered with a live database.
pub unsafe fn backend_malloc(backend: *mut sys::git_odb_backend, len: usize) -> Result<*mut c_void> {
    let rt = crate::Runtime::global();
    let mem = rt.call(&exports::git_odb_backend_malloc, |f| unsafe { f(backend, len) })?;
    if mem.is_null() {
        Err(rt.native_error(sys::GIT_ERROR))
    } else {
        Ok(mem)
    }
}
