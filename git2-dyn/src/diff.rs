#![allow(unsafe_code)]
//! Diffs between trees, the index and the working directory, and
//! blob-to-blob diffs streamed through callbacks.

use std::ffi::{CString, c_char, c_int, c_void};
use std::ops::ControlFlow;
use std::ptr;

use git2_dyn_sys as sys;

use crate::callback;
use crate::encoding::{self, StrArray};
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Handle, kind};
use crate::types::{DeltaStatus, LineOrigin, Oid};
use crate::{Index, Object, Repository};

/// A computed list of file deltas.
pub type DiffList = Handle<kind::DiffList>;

/// Options shared by every diff constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Raw `GIT_DIFF_*` flag bits.
    pub flags: u32,
    /// Unchanged lines around each hunk. `0` keeps the library default.
    pub context_lines: u16,
    /// Maximum unchanged lines between hunks before they are split.
    pub interhunk_lines: u16,
    /// Prefix for old paths in patches (default `a/`).
    pub old_prefix: Option<String>,
    /// Prefix for new paths in patches (default `b/`).
    pub new_prefix: Option<String>,
    /// Limit the diff to these pathspecs.
    pub pathspec: Vec<String>,
    /// Files larger than this are treated as binary. `0` keeps the default.
    pub max_size: i64,
}

pub(crate) struct RawDiffOptions {
    _old_prefix: Option<CString>,
    _new_prefix: Option<CString>,
    _pathspec: StrArray,
    pub(crate) opts: sys::git_diff_options,
}

impl DiffOptions {
    pub(crate) fn to_raw(&self) -> Result<RawDiffOptions> {
        let old_prefix = encoding::optional_c_string(self.old_prefix.as_deref())?;
        let new_prefix = encoding::optional_c_string(self.new_prefix.as_deref())?;
        let mut pathspec = StrArray::new(&self.pathspec)?;
        let opts = sys::git_diff_options {
            version: sys::GIT_DIFF_OPTIONS_VERSION,
            flags: self.flags,
            context_lines: self.context_lines,
            interhunk_lines: self.interhunk_lines,
            old_prefix: encoding::c_str_ptr(&old_prefix),
            new_prefix: encoding::c_str_ptr(&new_prefix),
            pathspec: pathspec.raw(),
            max_size: self.max_size,
        };
        Ok(RawDiffOptions {
            _old_prefix: old_prefix,
            _new_prefix: new_prefix,
            _pathspec: pathspec,
            opts,
        })
    }
}

fn options_ptr(raw: Option<&RawDiffOptions>) -> *const sys::git_diff_options {
    raw.map_or(ptr::null(), |r| &raw const r.opts)
}

/// One side of a file delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFile {
    /// Blob id; zero when the side does not exist.
    pub id: Oid,
    /// Path relative to the repository root.
    pub path: Option<String>,
    /// Size in bytes.
    pub size: i64,
    /// File mode bits.
    pub mode: u16,
}

/// A changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffDelta {
    /// Old side.
    pub old_file: DiffFile,
    /// New side.
    pub new_file: DiffFile,
    /// Kind of change. `None` for values this binding does not know.
    pub status: Option<DeltaStatus>,
    /// Similarity score for renames and copies.
    pub similarity: u32,
}

/// Line numbers covered by a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffRange {
    /// First old line.
    pub old_start: i32,
    /// Old line count.
    pub old_lines: i32,
    /// First new line.
    pub new_start: i32,
    /// New line count.
    pub new_lines: i32,
}

/// A line of patch output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// What kind of line this is.
    pub origin: LineOrigin,
    /// Raw content, including any newline.
    pub content: Vec<u8>,
    /// Hunk the line belongs to, absent for file headers.
    pub range: Option<DiffRange>,
}

/// Events delivered while diffing two blobs.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEvent {
    /// A file starts; `progress` runs from 0 to 1.
    File {
        /// The file.
        delta: DiffDelta,
        /// Fraction of files processed.
        progress: f32,
    },
    /// A hunk starts.
    Hunk {
        /// Line ranges.
        range: DiffRange,
        /// `@@ ... @@` header text.
        header: Vec<u8>,
    },
    /// One line of a hunk.
    Line(DiffLine),
}

unsafe fn read_file(file: &sys::git_diff_file) -> Result<DiffFile> {
    Ok(DiffFile {
        id: Oid(file.oid),
        path: unsafe { encoding::borrowed_str(file.path) }?,
        size: file.size,
        mode: file.mode,
    })
}

unsafe fn read_delta(delta: *const sys::git_diff_delta) -> Result<DiffDelta> {
    let delta = unsafe { delta.as_ref() }.ok_or(Error::NullPointer)?;
    Ok(DiffDelta {
        old_file: unsafe { read_file(&delta.old_file) }?,
        new_file: unsafe { read_file(&delta.new_file) }?,
        status: DeltaStatus::from_ffi(delta.status),
        similarity: delta.similarity,
    })
}

unsafe fn read_range(range: *const sys::git_diff_range) -> Option<DiffRange> {
    unsafe { range.as_ref() }.map(|r| DiffRange {
        old_start: r.old_start,
        old_lines: r.old_lines,
        new_start: r.new_start,
        new_lines: r.new_lines,
    })
}

unsafe fn read_bytes(ptr: *const c_char, len: usize) -> Vec<u8> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) }.to_vec()
}

impl Repository {
    /// Differences between two trees. `None` on either side means an empty tree.
    pub fn diff_tree_to_tree(
        &self,
        old_tree: Option<&Object>,
        new_tree: Option<&Object>,
        options: Option<&DiffOptions>,
    ) -> Result<DiffList> {
        let repo = self.as_ptr()?;
        let old_tree = nullable(old_tree)?;
        let new_tree = nullable(new_tree)?;
        let raw = options.map(DiffOptions::to_raw).transpose()?;
        Handle::create(self.runtime(), &exports::git_diff_tree_to_tree, |f, out| unsafe {
            f(out, repo, old_tree, new_tree, options_ptr(raw.as_ref()))
        })
    }

    /// Differences between a tree and an index (the repository's own when `None`).
    pub fn diff_tree_to_index(
        &self,
        old_tree: Option<&Object>,
        index: Option<&Index>,
        options: Option<&DiffOptions>,
    ) -> Result<DiffList> {
        let repo = self.as_ptr()?;
        let old_tree = nullable(old_tree)?;
        let index = index.map(Index::as_ptr).transpose()?.unwrap_or(ptr::null_mut());
        let raw = options.map(DiffOptions::to_raw).transpose()?;
        Handle::create(self.runtime(), &exports::git_diff_tree_to_index, |f, out| unsafe {
            f(out, repo, old_tree, index, options_ptr(raw.as_ref()))
        })
    }

    /// Unstaged changes: index against working directory.
    pub fn diff_index_to_workdir(&self, index: Option<&Index>, options: Option<&DiffOptions>) -> Result<DiffList> {
        let repo = self.as_ptr()?;
        let index = index.map(Index::as_ptr).transpose()?.unwrap_or(ptr::null_mut());
        let raw = options.map(DiffOptions::to_raw).transpose()?;
        Handle::create(self.runtime(), &exports::git_diff_index_to_workdir, |f, out| unsafe {
            f(out, repo, index, options_ptr(raw.as_ref()))
        })
    }

    /// A tree against the working directory, bypassing the index.
    pub fn diff_tree_to_workdir(&self, old_tree: Option<&Object>, options: Option<&DiffOptions>) -> Result<DiffList> {
        let repo = self.as_ptr()?;
        let old_tree = nullable(old_tree)?;
        let raw = options.map(DiffOptions::to_raw).transpose()?;
        Handle::create(self.runtime(), &exports::git_diff_tree_to_workdir, |f, out| unsafe {
            f(out, repo, old_tree, options_ptr(raw.as_ref()))
        })
    }
}

fn nullable(obj: Option<&Object>) -> Result<*mut sys::git_object> {
    Ok(obj.map(Object::as_ptr).transpose()?.unwrap_or(ptr::null_mut()))
}

impl DiffList {
    /// Fold `from` into this list.
    pub fn merge(&self, from: &DiffList) -> Result<()> {
        let from = from.as_ptr()?;
        self.call_checked(&exports::git_diff_merge, |f, onto| unsafe { f(onto, from) })
            .map(drop)
    }

    /// Render the list as a unified patch, one line at a time.
    pub fn print_patch(&self, visitor: impl FnMut(DiffLine) -> ControlFlow<i32>) -> Result<ControlFlow<i32>> {
        let diff = self.as_ptr()?;
        let rt = self.runtime();
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_diff_print_patch, |f| unsafe {
                f(diff, Some(patch_line_cb), payload)
            })
        })
    }

    /// The whole patch as bytes.
    pub fn patch(&self) -> Result<Vec<u8>> {
        let lines = callback::collect(|visit| self.print_patch(visit))?;
        Ok(lines.into_iter().flat_map(|l| l.content).collect())
    }
}

/// Diff two blobs (either may be `None` for an empty side), streaming file,
/// hunk and line events to `visitor`.
pub fn diff_blobs(
    old_blob: Option<&Object>,
    new_blob: Option<&Object>,
    options: Option<&DiffOptions>,
    visitor: impl FnMut(DiffEvent) -> ControlFlow<i32>,
) -> Result<ControlFlow<i32>> {
    let rt = old_blob
        .or(new_blob)
        .map_or_else(crate::Runtime::global, Object::runtime);
    let old_blob = nullable(old_blob)?;
    let new_blob = nullable(new_blob)?;
    let raw = options.map(DiffOptions::to_raw).transpose()?;
    callback::enumerate(rt, visitor, |payload| {
        rt.call(&exports::git_diff_blobs, |f| unsafe {
            f(
                old_blob,
                new_blob,
                options_ptr(raw.as_ref()),
                Some(blob_file_cb),
                Some(blob_hunk_cb),
                Some(blob_line_cb),
                payload,
            )
        })
    })
}

unsafe extern "system" fn patch_line_cb(
    _delta: *const sys::git_diff_delta,
    range: *const sys::git_diff_range,
    origin: c_char,
    content: *const c_char,
    content_len: usize,
    payload: *mut c_void,
) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            Ok(DiffLine {
                origin: LineOrigin::from_ffi(origin as u8),
                content: read_bytes(content, content_len),
                range: read_range(range),
            })
        })
    }
}

unsafe extern "system" fn blob_file_cb(delta: *const sys::git_diff_delta, progress: f32, payload: *mut c_void) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            Ok(DiffEvent::File {
                delta: read_delta(delta)?,
                progress,
            })
        })
    }
}

unsafe extern "system" fn blob_hunk_cb(
    _delta: *const sys::git_diff_delta,
    range: *const sys::git_diff_range,
    header: *const c_char,
    header_len: usize,
    payload: *mut c_void,
) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            Ok(DiffEvent::Hunk {
                range: read_range(range).ok_or(Error::NullPointer)?,
                header: read_bytes(header, header_len),
            })
        })
    }
}

unsafe extern "system" fn blob_line_cb(
    _delta: *const sys::git_diff_delta,
    range: *const sys::git_diff_range,
    origin: c_char,
    content: *const c_char,
    content_len: usize,
    payload: *mut c_void,
) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            Ok(DiffEvent::Line(DiffLine {
                origin: LineOrigin::from_ffi(origin as u8),
                content: read_bytes(content, content_len),
                range: read_range(range),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;
    use std::ffi::CStr;

    #[test]
    fn raw_options_keep_their_strings() {
        let options = DiffOptions {
            context_lines: 5,
            old_prefix: Some("old/".into()),
            pathspec: vec!["*.rs".into()],
            ..DiffOptions::default()
        };
        let raw = options.to_raw().unwrap();
        assert_eq!(raw.opts.version, sys::GIT_DIFF_OPTIONS_VERSION);
        assert_eq!(raw.opts.context_lines, 5);
        assert!(raw.opts.new_prefix.is_null());
        let prefix = unsafe { CStr::from_ptr(raw.opts.old_prefix) };
        assert_eq!(prefix.to_str().unwrap(), "old/");
        assert_eq!(raw.opts.pathspec.count, 1);
    }

    /// Feeds the three blob trampolines as the native diff would.
    #[test]
    fn blob_trampolines_share_one_bridge() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let path = CString::new("README").unwrap();
        let file = sys::git_diff_file {
            oid: sys::git_oid::default(),
            path: path.as_ptr(),
            size: 12,
            flags: 0,
            mode: 0o100_644,
        };
        let delta = sys::git_diff_delta {
            old_file: sys::git_diff_file { ..file },
            new_file: sys::git_diff_file { ..file },
            status: sys::GIT_DELTA_MODIFIED,
            similarity: 0,
            flags: 0,
        };
        let range = sys::git_diff_range {
            old_start: 1,
            old_lines: 1,
            new_start: 1,
            new_lines: 1,
        };
        let header = b"@@ -1 +1 @@\n";
        let line = b"+hello\n";
        let mut events = Vec::new();
        let flow = callback::enumerate(
            rt,
            |e: DiffEvent| {
                events.push(e);
                ControlFlow::Continue(())
            },
            |payload| unsafe {
                assert_eq!(blob_file_cb(&raw const delta, 0.5, payload), 0);
                assert_eq!(
                    blob_hunk_cb(&raw const delta, &raw const range, header.as_ptr().cast(), header.len(), payload),
                    0
                );
                assert_eq!(
                    blob_line_cb(
                        &raw const delta,
                        &raw const range,
                        b'+' as c_char,
                        line.as_ptr().cast(),
                        line.len(),
                        payload,
                    ),
                    0
                );
                Ok(0)
            },
        )
        .unwrap();
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(events.len(), 3);
        let DiffEvent::File { delta, progress } = &events[0] else {
            panic!("expected a file event first");
        };
        assert_eq!(delta.status, Some(DeltaStatus::Modified));
        assert_eq!(delta.new_file.path.as_deref(), Some("README"));
        assert!((progress - 0.5).abs() < f32::EPSILON);
        assert!(matches!(&events[2], DiffEvent::Line(l) if l.origin == LineOrigin::Addition && l.content == line));
    }
}
