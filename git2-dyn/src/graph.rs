#![allow(unsafe_code)]
//! Commit graph queries, commit message cleanup and ignore rules.

use std::ffi::c_int;
use std::path::Path;
use std::ptr;

use crate::encoding::{self, FillBuffer};
use crate::error::{Error, Result};
use crate::exports;
use crate::runtime::Runtime;
use crate::types::Oid;
use crate::Repository;

impl Repository {
    /// Commits `local` has that `upstream` lacks, and the reverse.
    pub fn ahead_behind(&self, local: &Oid, upstream: &Oid) -> Result<(usize, usize)> {
        let (mut ahead, mut behind) = (0usize, 0usize);
        self.call_checked(&exports::git_graph_ahead_behind, |f, repo| unsafe {
            f(&raw mut ahead, &raw mut behind, repo, local.raw(), upstream.raw())
        })?;
        Ok((ahead, behind))
    }

    /// Best common ancestor of two commits. `None` if they share no history.
    pub fn merge_base(&self, one: &Oid, two: &Oid) -> Result<Option<Oid>> {
        let mut out = Oid::default();
        let rc = self.call(&exports::git_merge_base, |f, repo| unsafe {
            f(&raw mut out.0, repo, one.raw(), two.raw())
        })?;
        Ok(self.runtime().check_found(rc)?.map(|_| out))
    }

    /// Add in-memory ignore rules (gitignore syntax, newline separated).
    pub fn add_ignore_rule(&self, rules: &str) -> Result<()> {
        let rules = encoding::to_c_string(rules)?;
        self.call_checked(&exports::git_ignore_add_rule, |f, repo| unsafe {
            f(repo, rules.as_ptr())
        })
        .map(drop)
    }

    /// Drop every rule added with [`add_ignore_rule`](Self::add_ignore_rule).
    pub fn clear_ignore_rules(&self) -> Result<()> {
        self.call_checked(&exports::git_ignore_clear_internal_rules, |f, repo| unsafe {
            f(repo)
        })
        .map(drop)
    }

    /// Whether `path` (relative to the working directory) is ignored.
    pub fn is_path_ignored(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = encoding::path_to_c(path.as_ref())?;
        let mut ignored: c_int = 0;
        self.call_checked(&exports::git_ignore_path_is_ignored, |f, repo| unsafe {
            f(&raw mut ignored, repo, path.as_ptr())
        })?;
        Ok(ignored != 0)
    }
}

/// Clean up a commit message: trim trailing whitespace, collapse blank lines,
/// ensure a final newline and optionally strip `#` comment lines.
pub fn prettify_message(message: &str, strip_comments: bool) -> Result<String> {
    prettify_in(Runtime::global(), message, strip_comments, None)
}

/// [`prettify_message`] into a buffer of exactly `capacity` bytes.
pub fn prettify_message_with_capacity(
    message: &str,
    strip_comments: bool,
    capacity: usize,
) -> Result<String> {
    prettify_in(Runtime::global(), message, strip_comments, Some(capacity))
}

pub(crate) fn prettify_in(
    rt: &Runtime,
    message: &str,
    strip_comments: bool,
    capacity: Option<usize>,
) -> Result<String> {
    let message = encoding::to_c_string(message)?;
    let strip = c_int::from(strip_comments);
    let capacity = match capacity {
        Some(c) => c,
        None => {
            // A null buffer asks for the required size, terminator included.
            let needed = rt.call(&exports::git_message_prettify, |f| unsafe {
                f(ptr::null_mut(), 0, message.as_ptr(), strip)
            })?;
            let needed = rt.check(needed)?;
            usize::try_from(needed)
                .map_err(|_| Error::InvalidArgument(format!("bad message size {needed}")))?
        }
    };
    let mut buf = FillBuffer::with_capacity(capacity);
    let out = buf.as_mut_ptr();
    let rc = rt.call(&exports::git_message_prettify, |f| unsafe {
        f(out, capacity, message.as_ptr(), strip)
    })?;
    rt.check(rc)?;
    buf.read_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;
    use git2_dyn_sys as sys;

    #[test]
    fn prettify_sizes_its_own_buffer() {
        let rt = stub_runtime(ResolvePolicy::PerCall);
        let out = prettify_in(rt, "subject  \n\n\n# comment\nbody", true, None).unwrap();
        assert_eq!(out, "subject\n\nbody\n");
    }

    #[test]
    fn prettify_keeps_comments_unless_asked() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let out = prettify_in(rt, "a\n# b", false, None).unwrap();
        assert_eq!(out, "a\n# b\n");
    }

    #[test]
    fn prettify_into_small_buffer_fails_without_overflow() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let err = prettify_in(rt, "a fairly long subject line", false, Some(8)).unwrap_err();
        assert!(matches!(err, Error::Native { code: sys::GIT_EBUFS, .. }));
    }
}
