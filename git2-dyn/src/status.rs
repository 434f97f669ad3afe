#![allow(unsafe_code)]
//! Working directory status.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::ops::ControlFlow;
use std::path::Path;

use crate::callback;
use crate::encoding;
use crate::error::Result;
use crate::exports;
use crate::types::{Status, StatusEntry};
use crate::Repository;

impl Repository {
    /// Status of a single path.
    pub fn status_file(&self, path: impl AsRef<Path>) -> Result<Status> {
        let path = encoding::path_to_c(path.as_ref())?;
        let mut flags: c_uint = 0;
        self.call_checked(&exports::git_status_file, |f, repo| unsafe {
            f(&raw mut flags, repo, path.as_ptr())
        })?;
        Ok(Status::from_bits(flags))
    }

    /// Visit every path whose status is not current.
    pub fn for_each_status(&self, visitor: impl FnMut(StatusEntry) -> ControlFlow<i32>) -> Result<ControlFlow<i32>> {
        let repo = self.as_ptr()?;
        let rt = self.runtime();
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_status_foreach, |f| unsafe {
                f(repo, Some(status_cb), payload)
            })
        })
    }

    /// Every path whose status is not current.
    pub fn statuses(&self) -> Result<Vec<StatusEntry>> {
        callback::collect(|visit| self.for_each_status(visit))
    }
}

unsafe extern "system" fn status_cb(path: *const c_char, status_flags: c_uint, payload: *mut c_void) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            Ok(StatusEntry {
                path: encoding::borrowed_str_required(path)?,
                status: Status::from_bits(status_flags),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;
    use git2_dyn_sys as sys;

    const ROOT: &str = "/stub/status";

    #[test]
    fn reports_seeded_paths() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let repo = Repository::init_in(rt, Path::new(ROOT), false).unwrap();
        git2_dyn_stub::seed_status(ROOT, "new.txt", sys::GIT_STATUS_WT_NEW);
        git2_dyn_stub::seed_status(ROOT, "src/lib.rs", sys::GIT_STATUS_INDEX_MODIFIED | sys::GIT_STATUS_WT_MODIFIED);

        let all = repo.statuses().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].path, "new.txt");
        assert!(all[0].status.contains(Status::WT_NEW));

        let lib = repo.status_file("src/lib.rs").unwrap();
        assert!(lib.contains(Status::INDEX_MODIFIED | Status::WT_MODIFIED));
        let err = repo.status_file("missing.rs").unwrap_err();
        assert!(err.is_not_found());
    }
}
