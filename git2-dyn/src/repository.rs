#![allow(unsafe_code)]
//! Repositories: open, create, discover, clone and repository-wide state.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use git2_dyn_sys as sys;

use crate::callback;
use crate::checkout::CloneOptions;
use crate::encoding::{self, FillBuffer};
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Handle, kind};
use crate::resolver::FunctionBinding;
use crate::runtime::Runtime;
use crate::types::{Oid, RepositoryState, ResetType};
use crate::{GitConfig, Index, Object, Odb};

/// An open repository.
pub type Repository = Handle<kind::Repository>;

/// One line of `FETCH_HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchHead {
    /// Fetched reference name.
    pub reference: String,
    /// URL it was fetched from.
    pub remote_url: String,
    /// Fetched commit.
    pub id: Oid,
    /// Whether the entry is marked for merge.
    pub is_merge: bool,
}

type RepoPredicate = unsafe extern "system" fn(*mut sys::git_repository) -> c_int;

#[cfg(unix)]
const PATH_LIST_SEPARATOR: &str = ":";
#[cfg(not(unix))]
const PATH_LIST_SEPARATOR: &str = ";";

impl Repository {
    /// Open the repository at `path` (a working directory or a `.git` directory).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_in(Runtime::global(), path.as_ref())
    }

    pub(crate) fn open_in(rt: &'static Runtime, path: &Path) -> Result<Self> {
        let path = encoding::path_to_c(path)?;
        Handle::create(rt, &exports::git_repository_open, |f, out| unsafe {
            f(out, path.as_ptr())
        })
    }

    /// Create a new repository at `path`.
    pub fn init(path: impl AsRef<Path>, bare: bool) -> Result<Self> {
        Self::init_in(Runtime::global(), path.as_ref(), bare)
    }

    pub(crate) fn init_in(rt: &'static Runtime, path: &Path, bare: bool) -> Result<Self> {
        let path = encoding::path_to_c(path)?;
        Handle::create(rt, &exports::git_repository_init, |f, out| unsafe {
            f(out, path.as_ptr(), c_uint::from(bare))
        })
    }

    /// Clone `url` into `path`.
    pub fn clone_from_url(url: &str, path: impl AsRef<Path>, options: &CloneOptions) -> Result<Self> {
        Self::clone_in(Runtime::global(), url, path.as_ref(), options)
    }

    pub(crate) fn clone_in(rt: &'static Runtime, url: &str, path: &Path, options: &CloneOptions) -> Result<Self> {
        let url = encoding::to_c_string(url)?;
        let path = encoding::path_to_c(path)?;
        let raw = options.to_raw()?;
        Handle::create(rt, &exports::git_clone, |f, out| unsafe {
            f(out, url.as_ptr(), path.as_ptr(), &raw const raw.opts)
        })
    }

    /// Walk up from `start` looking for a repository. `None` if there is none.
    ///
    /// The search stops at any of `ceiling_dirs` and, unless `across_fs`, at
    /// filesystem boundaries.
    pub fn discover(
        start: impl AsRef<Path>,
        across_fs: bool,
        ceiling_dirs: &[&Path],
    ) -> Result<Option<PathBuf>> {
        Self::discover_in(
            Runtime::global(),
            start.as_ref(),
            across_fs,
            ceiling_dirs,
            FillBuffer::for_path(),
        )
    }

    /// [`discover`](Self::discover) with a caller-chosen buffer capacity.
    pub fn discover_with_capacity(
        start: impl AsRef<Path>,
        across_fs: bool,
        ceiling_dirs: &[&Path],
        capacity: usize,
    ) -> Result<Option<PathBuf>> {
        Self::discover_in(
            Runtime::global(),
            start.as_ref(),
            across_fs,
            ceiling_dirs,
            FillBuffer::with_capacity(capacity),
        )
    }

    pub(crate) fn discover_in(
        rt: &'static Runtime,
        start: &Path,
        across_fs: bool,
        ceiling_dirs: &[&Path],
        mut buf: FillBuffer,
    ) -> Result<Option<PathBuf>> {
        let start = encoding::path_to_c(start)?;
        let ceiling = if ceiling_dirs.is_empty() {
            None
        } else {
            let joined = ceiling_dirs
                .iter()
                .map(|p| {
                    p.to_str().map(str::to_owned).ok_or_else(|| {
                        Error::InvalidArgument(format!("ceiling dir is not valid Unicode: {p:?}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?
                .join(PATH_LIST_SEPARATOR);
            Some(encoding::to_c_string(&joined)?)
        };
        let capacity = buf.capacity();
        let out = buf.as_mut_ptr();
        let rc = rt.call(&exports::git_repository_discover, |f| unsafe {
            f(
                out,
                capacity,
                start.as_ptr(),
                c_int::from(across_fs),
                encoding::c_str_ptr(&ceiling),
            )
        })?;
        if rt.check_found(rc)?.is_none() {
            return Ok(None);
        }
        buf.read_path().map(Some)
    }

    fn flag(&self, binding: &FunctionBinding<RepoPredicate>) -> Result<bool> {
        self.call_checked(binding, |f, repo| unsafe { f(repo) })
            .map(|rc| rc != 0)
    }

    /// Whether the repository has no working directory.
    pub fn is_bare(&self) -> Result<bool> {
        self.flag(&exports::git_repository_is_bare)
    }

    /// Whether the repository has no commits.
    pub fn is_empty(&self) -> Result<bool> {
        self.flag(&exports::git_repository_is_empty)
    }

    /// Whether HEAD points directly at a commit.
    pub fn is_head_detached(&self) -> Result<bool> {
        self.flag(&exports::git_repository_head_detached)
    }

    /// Whether HEAD points at a branch with no commits.
    pub fn is_head_orphan(&self) -> Result<bool> {
        self.flag(&exports::git_repository_head_orphan)
    }

    /// Path of the `.git` directory.
    pub fn path(&self) -> Result<PathBuf> {
        let p = self.call(&exports::git_repository_path, |f, repo| unsafe { f(repo) })?;
        unsafe { encoding::borrowed_path(p) }?.ok_or(Error::NullPointer)
    }

    /// Working directory, `None` for a bare repository.
    pub fn workdir(&self) -> Result<Option<PathBuf>> {
        let p = self.call(&exports::git_repository_workdir, |f, repo| unsafe { f(repo) })?;
        unsafe { encoding::borrowed_path(p) }
    }

    /// Point the repository at a different working directory.
    pub fn set_workdir(&self, path: impl AsRef<Path>, update_gitlink: bool) -> Result<()> {
        let path = encoding::path_to_c(path.as_ref())?;
        self.call_checked(&exports::git_repository_set_workdir, |f, repo| unsafe {
            f(repo, path.as_ptr(), c_int::from(update_gitlink))
        })
        .map(drop)
    }

    /// Operation in progress, if any.
    pub fn state(&self) -> Result<RepositoryState> {
        let rc = self.call_checked(&exports::git_repository_state, |f, repo| unsafe { f(repo) })?;
        RepositoryState::from_ffi(rc)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown repository state {rc}")))
    }

    /// The repository's index.
    pub fn index(&self) -> Result<Index> {
        let repo = self.as_ptr()?;
        Handle::create(self.runtime(), &exports::git_repository_index, |f, out| unsafe {
            f(out, repo)
        })
    }

    /// The repository's object database.
    pub fn odb(&self) -> Result<Odb> {
        let repo = self.as_ptr()?;
        Handle::create(self.runtime(), &exports::git_repository_odb, |f, out| unsafe {
            f(out, repo)
        })
    }

    /// Replace the repository's configuration.
    pub fn set_config(&self, config: &GitConfig) -> Result<()> {
        let cfg = config.as_ptr()?;
        self.call(&exports::git_repository_set_config, |f, repo| unsafe { f(repo, cfg) })
    }

    /// Replace the repository's index.
    pub fn set_index(&self, index: &Index) -> Result<()> {
        let index = index.as_ptr()?;
        self.call(&exports::git_repository_set_index, |f, repo| unsafe { f(repo, index) })
    }

    /// Remove merge metadata (`MERGE_HEAD`, `MERGE_MSG`, ...).
    pub fn merge_cleanup(&self) -> Result<()> {
        self.call_checked(&exports::git_repository_merge_cleanup, |f, repo| unsafe { f(repo) })
            .map(drop)
    }

    /// Visit each `FETCH_HEAD` entry.
    pub fn for_each_fetchhead(
        &self,
        visitor: impl FnMut(FetchHead) -> ControlFlow<i32>,
    ) -> Result<ControlFlow<i32>> {
        let repo = self.as_ptr()?;
        let rt = self.runtime();
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_repository_fetchhead_foreach, |f| unsafe {
                f(repo, Some(fetchhead_cb), payload)
            })
        })
    }

    /// Visit each `MERGE_HEAD` commit.
    pub fn for_each_mergehead(
        &self,
        visitor: impl FnMut(Oid) -> ControlFlow<i32>,
    ) -> Result<ControlFlow<i32>> {
        let repo = self.as_ptr()?;
        let rt = self.runtime();
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_repository_mergehead_foreach, |f| unsafe {
                f(repo, Some(mergehead_cb), payload)
            })
        })
    }

    /// Move HEAD to `target`, updating index / workdir per `kind`.
    pub fn reset(&self, target: &Object, kind: ResetType) -> Result<()> {
        let target = target.as_ptr()?;
        self.call_checked(&exports::git_reset, |f, repo| unsafe {
            f(repo, target, kind.to_ffi())
        })
        .map(drop)
    }

    /// Resolve a revision expression (`HEAD~2`, `v1.0^{tree}`, ...).
    pub fn revparse_single(&self, spec: &str) -> Result<Object> {
        let repo = self.as_ptr()?;
        let spec = encoding::to_c_string(spec)?;
        Handle::create(self.runtime(), &exports::git_revparse_single, |f, out| unsafe {
            f(out, repo, spec.as_ptr())
        })
    }
}

unsafe extern "system" fn fetchhead_cb(
    ref_name: *const c_char,
    remote_url: *const c_char,
    oid: *const sys::git_oid,
    is_merge: c_uint,
    payload: *mut c_void,
) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            Ok(FetchHead {
                reference: encoding::borrowed_str_required(ref_name)?,
                remote_url: encoding::borrowed_str(remote_url)?.unwrap_or_default(),
                id: Oid::from_raw(oid).ok_or(Error::NullPointer)?,
                is_merge: is_merge != 0,
            })
        })
    }
}

unsafe extern "system" fn mergehead_cb(oid: *const sys::git_oid, payload: *mut c_void) -> c_int {
    unsafe { callback::deliver(payload, || Oid::from_raw(oid).ok_or(Error::NullPointer)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;

    #[test]
    fn open_missing_is_not_found_and_leaks_nothing() {
        let rt = stub_runtime(ResolvePolicy::PerCall);
        let err = Repository::open_in(rt, Path::new("/stub/repository-open-missing")).unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, Error::Native { ref message, .. } if message.contains("repository-open-missing")));
        assert_eq!(rt.live_handles(), 0);
    }

    #[test]
    fn clone_from_url_without_the_export_leaks_no_token() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let err = Repository::clone_in(rt, "https://example.com/a.git", Path::new("/stub/clone"), &CloneOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::SymbolNotFound { ref symbol } if symbol == "git_clone"));
        assert_eq!(rt.live_handles(), 0);
    }

    #[test]
    fn init_then_open_reports_paths() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let root = Path::new("/stub/repository-init-open");
        let created = Repository::init_in(rt, root, false).unwrap();
        let opened = Repository::open_in(rt, root).unwrap();
        assert_eq!(rt.live_handles(), 2);
        assert_eq!(opened.path().unwrap(), root.join(".git/"));
        assert_eq!(opened.workdir().unwrap(), Some(root.join("")));
        assert!(!opened.is_bare().unwrap());
        assert!(opened.is_empty().unwrap());
        assert_eq!(opened.state().unwrap(), RepositoryState::Clean);
        drop((created, opened));
        assert_eq!(rt.live_handles(), 0);
    }

    #[test]
    fn bare_init_has_no_workdir() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let repo = Repository::init_in(rt, Path::new("/stub/repository-bare"), true).unwrap();
        assert!(repo.is_bare().unwrap());
        assert_eq!(repo.workdir().unwrap(), None);
    }

    #[test]
    fn released_repository_rejects_calls() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let mut repo = Repository::init_in(rt, Path::new("/stub/repository-released"), false).unwrap();
        repo.release().unwrap();
        assert!(matches!(
            repo.is_bare(),
            Err(Error::Released { kind: crate::ResourceKind::Repository })
        ));
    }

    #[test]
    fn discover_finds_enclosing_repository() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let root = Path::new("/stub/repository-discover");
        let _repo = Repository::init_in(rt, root, false).unwrap();
        let found =
            Repository::discover_in(rt, &root.join("a/b"), false, &[], FillBuffer::for_path())
                .unwrap();
        assert_eq!(found, Some(root.join(".git/")));
        let none = Repository::discover_in(
            rt,
            Path::new("/stub/nowhere"),
            false,
            &[],
            FillBuffer::for_path(),
        )
        .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn discover_into_small_buffer_fails_cleanly() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let root = Path::new("/stub/repository-discover-small");
        let _repo = Repository::init_in(rt, root, false).unwrap();
        let err = Repository::discover_in(rt, root, false, &[], FillBuffer::with_capacity(4))
            .unwrap_err();
        assert!(matches!(err, Error::Native { code: sys::GIT_EBUFS, .. }));
    }
}
