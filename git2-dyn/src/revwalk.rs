#![allow(unsafe_code)]
//! Revision walking.

use git2_dyn_sys as sys;

use crate::error::Result;
use crate::exports;
use crate::handle::{Handle, kind};
use crate::types::{Oid, Sort};
use crate::Repository;

/// A commit traversal. Iterating yields commit ids until the walk is exhausted.
pub type RevWalk = Handle<kind::RevWalk>;

impl Repository {
    /// Start a new, empty traversal.
    pub fn revwalk(&self) -> Result<RevWalk> {
        let repo = self.as_ptr()?;
        Handle::create(self.runtime(), &exports::git_revwalk_new, |f, out| unsafe {
            f(out, repo)
        })
    }
}

impl RevWalk {
    /// Start from `id`.
    pub fn push(&self, id: &Oid) -> Result<()> {
        self.call_checked(&exports::git_revwalk_push, |f, w| unsafe { f(w, id.raw()) })
            .map(drop)
    }

    /// Exclude `id` and its ancestors.
    pub fn hide(&self, id: &Oid) -> Result<()> {
        self.call_checked(&exports::git_revwalk_hide, |f, w| unsafe { f(w, id.raw()) })
            .map(drop)
    }

    /// Forget pushed and hidden commits.
    pub fn reset(&self) -> Result<()> {
        self.call(&exports::git_revwalk_reset, |f, w| unsafe { f(w) })
    }

    /// Traversal order. Resets the walk.
    pub fn set_sorting(&self, sort: Sort) -> Result<()> {
        self.call(&exports::git_revwalk_sorting, |f, w| unsafe { f(w, sort.bits()) })
    }
}

impl Iterator for RevWalk {
    type Item = Result<Oid>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_released() {
            return None;
        }
        let mut id = Oid::default();
        let rc = match self.call(&exports::git_revwalk_next, |f, w| unsafe { f(&raw mut id.0, w) }) {
            Ok(rc) => rc,
            Err(e) => return Some(Err(e)),
        };
        if rc == sys::GIT_ITEROVER {
            return None;
        }
        Some(self.runtime().check(rc).map(|_| id))
    }
}
