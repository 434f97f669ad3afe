//! Repository registry: init/open/discover, branches and status entries.
//!
//! Repositories live in a process-wide table keyed by their working directory
//! root. Nothing touches the filesystem; a repository exists once it has been
//! initialized.

use std::collections::{BTreeMap, HashMap};
use std::ffi::{CString, c_char, c_int, c_uint, c_void};
use std::sync::Mutex;

use git2_dyn_sys as sys;

use crate::ffi::{self, arg, fail, fill, lock, owned_c, view, write_out};

/// Target of a stored reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RefValue {
    Direct(sys::git_oid),
    Symbolic(String),
}

#[derive(Debug, Default)]
pub(crate) struct RepoState {
    pub(crate) bare: bool,
    pub(crate) branches: Vec<(String, c_uint)>,
    pub(crate) refs: BTreeMap<String, RefValue>,
    pub(crate) statuses: Vec<(String, c_uint)>,
}

static REGISTRY: Mutex<Option<HashMap<String, RepoState>>> = Mutex::new(None);

/// Run `f` against the state of the repository at `root`.
pub(crate) fn with_repo<R>(root: &str, f: impl FnOnce(&mut RepoState) -> R) -> Option<R> {
    lock(&REGISTRY)
        .get_or_insert_with(HashMap::new)
        .get_mut(root)
        .map(f)
}

/// An open repository as handed across the ABI.
pub(crate) struct StubRepository {
    pub(crate) root: String,
    path: CString,
    workdir: Option<CString>,
    bare: bool,
}

impl StubRepository {
    fn new(root: &str, bare: bool) -> Self {
        let path = if bare { format!("{root}/") } else { format!("{root}/.git/") };
        Self {
            root: root.to_owned(),
            path: owned_c(&path),
            workdir: (!bare).then(|| owned_c(&format!("{root}/"))),
            bare,
        }
    }
}

/// The repository behind `repo`, or `None` with an error recorded.
pub(crate) unsafe fn repo<'a>(repo: *mut sys::git_repository) -> Option<&'a mut StubRepository> {
    let found = unsafe { view::<StubRepository, _>(repo) };
    if found.is_none() {
        ffi::set_error(sys::GITERR_INVALID, "null repository");
    }
    found
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/.git").unwrap_or(trimmed);
    if trimmed.is_empty() { "/".to_owned() } else { trimmed.to_owned() }
}

/// Seed a branch of `kind` (`GIT_BRANCH_LOCAL` or `GIT_BRANCH_REMOTE`).
/// Seeding an existing branch is a no-op.
pub fn seed_branch(root: &str, name: &str, kind: c_uint) {
    let root = normalize(root);
    let mut guard = lock(&REGISTRY);
    let state = guard.get_or_insert_with(HashMap::new).entry(root).or_default();
    if !state.branches.iter().any(|(n, k)| n == name && *k == kind) {
        state.branches.push((name.to_owned(), kind));
    }
}

/// Record `flags` as the status of `path`, replacing any previous entry.
pub fn seed_status(root: &str, path: &str, flags: c_uint) {
    let root = normalize(root);
    let mut guard = lock(&REGISTRY);
    let state = guard.get_or_insert_with(HashMap::new).entry(root).or_default();
    match state.statuses.iter_mut().find(|(p, _)| p == path) {
        Some(entry) => entry.1 = flags,
        None => state.statuses.push((path.to_owned(), flags)),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_init(
    out: *mut *mut sys::git_repository,
    path: *const c_char,
    is_bare: c_uint,
) -> c_int {
    let path = match unsafe { arg(path, "path") } {
        Ok(p) => p,
        Err(rc) => return rc,
    };
    let root = normalize(path);
    let bare = is_bare != 0;
    lock(&REGISTRY)
        .get_or_insert_with(HashMap::new)
        .entry(root.clone())
        .or_default()
        .bare = bare;
    unsafe { write_out(out, StubRepository::new(&root, bare)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_open(out: *mut *mut sys::git_repository, path: *const c_char) -> c_int {
    let path = match unsafe { arg(path, "path") } {
        Ok(p) => p,
        Err(rc) => return rc,
    };
    let root = normalize(path);
    match with_repo(&root, |state| state.bare) {
        Some(bare) => unsafe { write_out(out, StubRepository::new(&root, bare)) },
        None => fail(
            sys::GIT_ENOTFOUND,
            sys::GITERR_REPOSITORY,
            format!("could not find repository at '{path}'"),
        ),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_free(repo: *mut sys::git_repository) {
    unsafe { ffi::free_boxed::<StubRepository, _>(repo) };
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_path(r: *mut sys::git_repository) -> *const c_char {
    unsafe { repo(r) }.map_or(std::ptr::null(), |r| r.path.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_workdir(r: *mut sys::git_repository) -> *const c_char {
    unsafe { repo(r) }
        .and_then(|r| r.workdir.as_ref())
        .map_or(std::ptr::null(), |w| w.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_is_bare(r: *mut sys::git_repository) -> c_int {
    unsafe { repo(r) }.map_or(sys::GIT_ERROR, |r| c_int::from(r.bare))
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_is_empty(r: *mut sys::git_repository) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    with_repo(&r.root, |s| c_int::from(s.refs.values().all(|v| matches!(v, RefValue::Symbolic(_)))))
        .unwrap_or(1)
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_state(r: *mut sys::git_repository) -> c_int {
    unsafe { repo(r) }.map_or(sys::GIT_ERROR, |_| sys::GIT_REPOSITORY_STATE_NONE)
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_repository_discover(
    repository_path: *mut c_char,
    size: usize,
    start_path: *const c_char,
    _across_fs: c_int,
    _ceiling_dirs: *const c_char,
) -> c_int {
    let start = match unsafe { arg(start_path, "start path") } {
        Ok(p) => normalize(p),
        Err(rc) => return rc,
    };
    let found = lock(&REGISTRY)
        .get_or_insert_with(HashMap::new)
        .iter()
        .filter(|(root, _)| start == **root || start.starts_with(&format!("{root}/")))
        .max_by_key(|(root, _)| root.len())
        .map(|(root, state)| if state.bare { format!("{root}/") } else { format!("{root}/.git/") });
    let Some(found) = found else {
        return fail(
            sys::GIT_ENOTFOUND,
            sys::GITERR_REPOSITORY,
            format!("could not find repository from '{start}'"),
        );
    };
    let rc = unsafe { fill(repository_path, size, &found, sys::GITERR_REPOSITORY) };
    if rc < 0 { rc } else { sys::GIT_OK }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_branch_foreach(
    r: *mut sys::git_repository,
    list_flags: c_uint,
    callback: Option<sys::git_branch_foreach_cb>,
    payload: *mut c_void,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let Some(callback) = callback else {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null callback");
    };
    // Snapshot so callbacks may re-enter.
    let branches: Vec<_> = with_repo(&r.root, |s| {
        s.branches
            .iter()
            .filter(|(_, kind)| kind & list_flags != 0)
            .map(|(name, kind)| (owned_c(name), *kind))
            .collect()
    })
    .unwrap_or_default();
    for (name, kind) in branches {
        if unsafe { callback(name.as_ptr(), kind, payload) } != 0 {
            return sys::GIT_EUSER;
        }
    }
    sys::GIT_OK
}

fn tracking_name(root: &str, canonical: &str) -> Option<String> {
    let short = canonical.strip_prefix("refs/heads/")?;
    with_repo(root, |s| {
        s.branches
            .iter()
            .any(|(n, k)| n == short && *k == sys::GIT_BRANCH_LOCAL)
    })
    .filter(|found| *found)
    .map(|_| format!("refs/remotes/origin/{short}"))
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_branch_tracking_name(
    out: *mut c_char,
    buffer_size: usize,
    r: *mut sys::git_repository,
    canonical_branch_name: *const c_char,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let name = match unsafe { arg(canonical_branch_name, "branch name") } {
        Ok(n) => n,
        Err(rc) => return rc,
    };
    match tracking_name(&r.root, name) {
        Some(tracking) => unsafe { fill(out, buffer_size, &tracking, sys::GITERR_REFERENCE) },
        None => fail(
            sys::GIT_ENOTFOUND,
            sys::GITERR_REFERENCE,
            format!("no tracking branch for '{name}'"),
        ),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_branch_upstream_name(
    out: *mut sys::git_buf,
    r: *mut sys::git_repository,
    refname: *const c_char,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let name = match unsafe { arg(refname, "reference name") } {
        Ok(n) => n,
        Err(rc) => return rc,
    };
    match tracking_name(&r.root, name) {
        Some(upstream) => unsafe { ffi::set_buf(out, &upstream) },
        None => fail(
            sys::GIT_ENOTFOUND,
            sys::GITERR_REFERENCE,
            format!("no upstream configured for '{name}'"),
        ),
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_status_file(
    status_flags: *mut c_uint,
    r: *mut sys::git_repository,
    path: *const c_char,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let path = match unsafe { arg(path, "path") } {
        Ok(p) => p,
        Err(rc) => return rc,
    };
    let flags = with_repo(&r.root, |s| {
        s.statuses.iter().find(|(p, _)| p == path).map(|(_, f)| *f)
    })
    .flatten();
    match (flags, unsafe { status_flags.as_mut() }) {
        (Some(flags), Some(out)) => {
            *out = flags;
            sys::GIT_OK
        }
        (Some(_), None) => fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null status output"),
        (None, _) => fail(
            sys::GIT_ENOTFOUND,
            sys::GITERR_INVALID,
            format!("attempt to get status of nonexistent file '{path}'"),
        ),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_status_foreach(
    r: *mut sys::git_repository,
    callback: Option<sys::git_status_cb>,
    payload: *mut c_void,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let Some(callback) = callback else {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null callback");
    };
    let entries: Vec<_> = with_repo(&r.root, |s| {
        s.statuses
            .iter()
            .map(|(p, f)| (owned_c(p), *f))
            .collect()
    })
    .unwrap_or_default();
    for (path, flags) in entries {
        if unsafe { callback(path.as_ptr(), flags, payload) } != 0 {
            return sys::GIT_EUSER;
        }
    }
    sys::GIT_OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn open_before_init_is_not_found() {
        let path = owned_c("/stub-crate/never-created");
        let mut out = ptr::null_mut();
        assert_eq!(unsafe { git_repository_open(&raw mut out, path.as_ptr()) }, sys::GIT_ENOTFOUND);
        assert!(out.is_null());
    }

    #[test]
    fn discover_prefers_the_innermost_root() {
        let mut out = ptr::null_mut();
        for root in ["/stub-crate/outer", "/stub-crate/outer/inner"] {
            let root = owned_c(root);
            assert_eq!(unsafe { git_repository_init(&raw mut out, root.as_ptr(), 0) }, 0);
            unsafe { git_repository_free(out) };
        }
        let start = owned_c("/stub-crate/outer/inner/src");
        let mut buf = [0 as c_char; 64];
        let rc = unsafe { git_repository_discover(buf.as_mut_ptr(), buf.len(), start.as_ptr(), 0, ptr::null()) };
        assert_eq!(rc, 0);
        let found = unsafe { ffi::c_str(buf.as_ptr()) };
        assert_eq!(found, Some("/stub-crate/outer/inner/.git/"));
    }
}
