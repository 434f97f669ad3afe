#![allow(unsafe_code)]
//! Branches: create, rename, delete, enumerate and upstream lookups.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::ops::ControlFlow;
use std::ptr;

use git2_dyn_sys as sys;

use crate::callback;
use crate::encoding::{self, FillBuffer};
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::Handle;
use crate::types::{Branch, BranchType, Unimplemented};
use crate::{Object, Reference, Repository};

impl Repository {
    /// Create a local branch `name` pointing at the commit `target`.
    pub fn create_branch(&self, name: &str, target: &Object, force: bool) -> Result<Reference> {
        let repo = self.as_ptr()?;
        let target = target.as_ptr()?;
        let name = encoding::to_c_string(name)?;
        Handle::create(self.runtime(), &exports::git_branch_create, |f, out| unsafe {
            f(out, repo, name.as_ptr(), target, c_int::from(force))
        })
    }

    /// Visit branches of the given kind.
    ///
    /// Returning `Break` from `visitor` stops the enumeration; no further
    /// branch is delivered.
    pub fn for_each_branch(
        &self,
        kind: BranchType,
        visitor: impl FnMut(Branch) -> ControlFlow<i32>,
    ) -> Result<ControlFlow<i32>> {
        let repo = self.as_ptr()?;
        let rt = self.runtime();
        let flags = c_uint::try_from(kind.to_ffi()).unwrap_or(sys::GIT_BRANCH_LOCAL);
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_branch_foreach, |f| unsafe {
                f(repo, flags, Some(branch_cb), payload)
            })
        })
    }

    /// Every branch of the given kind.
    pub fn branches(&self, kind: BranchType) -> Result<Vec<Branch>> {
        callback::collect(|visit| self.for_each_branch(kind, visit))
    }

    /// Remote-tracking branch configured for a local branch, e.g.
    /// `refs/remotes/origin/main` for `refs/heads/main`. `None` if the branch
    /// tracks nothing.
    pub fn branch_tracking_name(&self, canonical_name: &str) -> Result<Option<String>> {
        let name = encoding::to_c_string(canonical_name)?;
        // A null buffer asks for the required size, terminator included.
        let needed = self.call(&exports::git_branch_tracking_name, |f, repo| unsafe {
            f(ptr::null_mut(), 0, repo, name.as_ptr())
        })?;
        let Some(needed) = self.runtime().check_found(needed)? else {
            return Ok(None);
        };
        let capacity = usize::try_from(needed)
            .map_err(|_| Error::InvalidArgument(format!("bad tracking name size {needed}")))?;
        self.branch_tracking_name_into(canonical_name, FillBuffer::with_capacity(capacity))
    }

    /// [`branch_tracking_name`](Self::branch_tracking_name) into a caller-sized buffer.
    pub fn branch_tracking_name_into(
        &self,
        canonical_name: &str,
        mut buf: FillBuffer,
    ) -> Result<Option<String>> {
        let name = encoding::to_c_string(canonical_name)?;
        let capacity = buf.capacity();
        let out = buf.as_mut_ptr();
        let rc = self.call(&exports::git_branch_tracking_name, |f, repo| unsafe {
            f(out, capacity, repo, name.as_ptr())
        })?;
        if self.runtime().check_found(rc)?.is_none() {
            return Ok(None);
        }
        buf.read_string().map(Some)
    }

    /// Upstream of a local branch as configured (`branch.<name>.merge`
    /// resolved against the remote). `None` if there is none.
    pub fn branch_upstream_name(&self, canonical_name: &str) -> Result<Option<String>> {
        let name = encoding::to_c_string(canonical_name)?;
        let mut buf = encoding::empty_buf();
        let rc = self.call(&exports::git_branch_upstream_name, |f, repo| unsafe {
            f(&raw mut buf, repo, name.as_ptr())
        })?;
        let rt = self.runtime();
        let status = rt.check_found(rc);
        // The buffer is ours to free whatever the outcome.
        let text = rt.take_buf(&mut buf)?;
        Ok(status?.map(|_| text))
    }

    /// Name of the remote a remote-tracking branch belongs to.
    ///
    /// The export is not bound; this returns an empty name.
    pub fn branch_remote_name(&self, _canonical_name: &str) -> Unimplemented<String> {
        Unimplemented::stand_in("git_branch_remote_name", String::new())
    }
}

impl Reference {
    /// Rename a local branch in place.
    pub fn move_branch(&self, new_name: &str, force: bool) -> Result<()> {
        let new_name = encoding::to_c_string(new_name)?;
        self.call_checked(&exports::git_branch_move, |f, branch| unsafe {
            f(branch, new_name.as_ptr(), c_int::from(force))
        })
        .map(drop)
    }

    /// Delete the branch. The native object is freed on success and the
    /// handle is released.
    pub fn delete_branch(&mut self) -> Result<()> {
        self.consume(&exports::git_branch_delete)
    }
}

unsafe extern "system" fn branch_cb(name: *const c_char, branch_type: c_uint, payload: *mut c_void) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            let kind = i32::try_from(branch_type)
                .ok()
                .and_then(BranchType::from_ffi)
                .ok_or_else(|| Error::Callback(format!("unknown branch type {branch_type}")))?;
            Ok(Branch {
                name: encoding::borrowed_str_required(name)?,
                kind,
            })
        })
    }
}
