//! References: direct and symbolic names stored per repository.

use std::ffi::{CString, c_char, c_int, c_uint, c_void};
use std::ptr;

use git2_dyn_sys as sys;

use crate::ffi::{self, arg, fail, owned_c, view, write_out};
use crate::repository::{RefValue, repo, with_repo};

const MAX_NESTING: usize = 5;

/// A reference snapshot owned by the caller.
struct StubReference {
    root: String,
    name: CString,
    target: Option<sys::git_oid>,
    symbolic: Option<CString>,
}

impl StubReference {
    fn new(root: &str, name: &str, value: &RefValue) -> Self {
        let (target, symbolic) = match value {
            RefValue::Direct(id) => (Some(*id), None),
            RefValue::Symbolic(to) => (None, Some(owned_c(to))),
        };
        Self {
            root: root.to_owned(),
            name: owned_c(name),
            target,
            symbolic,
        }
    }

    fn name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

unsafe fn reference<'a>(r: *mut sys::git_reference) -> Option<&'a mut StubReference> {
    let found = unsafe { view::<StubReference, _>(r) };
    if found.is_none() {
        ffi::set_error(sys::GITERR_INVALID, "null reference");
    }
    found
}

fn component_ok(c: &str) -> bool {
    !c.is_empty()
        && !c.starts_with('.')
        && !c.ends_with(".lock")
        && !c.contains("..")
        && !c.contains("@{")
        && !c.chars().any(|ch| ch.is_ascii_control() || " ~^:?*[\\".contains(ch))
}

/// Reference name rules: `refs/...` with well-formed components, or an
/// all-caps top-level name such as `HEAD`.
pub(crate) fn valid_name(name: &str) -> bool {
    if name.ends_with('/') || name.ends_with('.') {
        return false;
    }
    if name.starts_with("refs/") {
        return name.split('/').all(component_ok);
    }
    !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

/// `*` matches any run of characters, `?` exactly one.
pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.split_first(), text.split_first()) {
        (None, None) => true,
        (Some((b'*', rest)), _) => {
            glob_match(rest, text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some((b'?', prest)), Some((_, trest))) => glob_match(prest, trest),
        (Some((p, prest)), Some((t, trest))) if p == t => glob_match(prest, trest),
        _ => false,
    }
}

fn invalid_name(name: &str) -> c_int {
    fail(
        sys::GIT_EINVALIDSPEC,
        sys::GITERR_REFERENCE,
        format!("the given reference name '{name}' is not valid"),
    )
}

/// Store `value` under `name`, honoring `force`.
fn store(root: &str, name: &str, value: RefValue, force: bool) -> Result<(), c_int> {
    if !valid_name(name) {
        return Err(invalid_name(name));
    }
    let stored = with_repo(root, |s| {
        if !force && s.refs.contains_key(name) {
            return false;
        }
        s.refs.insert(name.to_owned(), value);
        true
    });
    match stored {
        Some(true) => Ok(()),
        Some(false) => Err(fail(
            sys::GIT_EEXISTS,
            sys::GITERR_REFERENCE,
            format!("a reference with that name ('{name}') already exists"),
        )),
        None => Err(fail(sys::GIT_ENOTFOUND, sys::GITERR_REPOSITORY, "repository is gone")),
    }
}

fn not_found(name: &str) -> c_int {
    fail(
        sys::GIT_ENOTFOUND,
        sys::GITERR_REFERENCE,
        format!("reference '{name}' not found"),
    )
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_create(
    out: *mut *mut sys::git_reference,
    r: *mut sys::git_repository,
    name: *const c_char,
    id: *const sys::git_oid,
    force: c_int,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let (name, id) = match (unsafe { arg(name, "reference name") }, unsafe { id.as_ref() }) {
        (Ok(name), Some(id)) => (name, *id),
        (Err(rc), _) => return rc,
        (_, None) => return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null target"),
    };
    let value = RefValue::Direct(id);
    if let Err(rc) = store(&r.root, name, value.clone(), force != 0) {
        return rc;
    }
    unsafe { write_out(out, StubReference::new(&r.root, name, &value)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_symbolic_create(
    out: *mut *mut sys::git_reference,
    r: *mut sys::git_repository,
    name: *const c_char,
    target: *const c_char,
    force: c_int,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let (name, target) = match (unsafe { arg(name, "reference name") }, unsafe { arg(target, "target") }) {
        (Ok(name), Ok(target)) => (name, target),
        (Err(rc), _) | (_, Err(rc)) => return rc,
    };
    if !valid_name(target) {
        return invalid_name(target);
    }
    let value = RefValue::Symbolic(target.to_owned());
    if let Err(rc) = store(&r.root, name, value.clone(), force != 0) {
        return rc;
    }
    unsafe { write_out(out, StubReference::new(&r.root, name, &value)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_lookup(
    out: *mut *mut sys::git_reference,
    r: *mut sys::git_repository,
    name: *const c_char,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let name = match unsafe { arg(name, "reference name") } {
        Ok(n) => n,
        Err(rc) => return rc,
    };
    match with_repo(&r.root, |s| s.refs.get(name).cloned()).flatten() {
        Some(value) => unsafe { write_out(out, StubReference::new(&r.root, name, &value)) },
        None => not_found(name),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_free(reference: *mut sys::git_reference) {
    unsafe { ffi::free_boxed::<StubReference, _>(reference) };
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_name(r: *mut sys::git_reference) -> *const c_char {
    unsafe { reference(r) }.map_or(ptr::null(), |r| r.name.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_target(r: *mut sys::git_reference) -> *const sys::git_oid {
    unsafe { reference(r) }
        .and_then(|r| r.target.as_ref())
        .map_or(ptr::null(), ptr::from_ref)
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_symbolic_target(r: *mut sys::git_reference) -> *const c_char {
    unsafe { reference(r) }
        .and_then(|r| r.symbolic.as_ref())
        .map_or(ptr::null(), |s| s.as_ptr())
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_type(r: *mut sys::git_reference) -> c_int {
    match unsafe { reference(r) } {
        Some(r) if r.symbolic.is_some() => sys::GIT_REF_SYMBOLIC,
        Some(_) => sys::GIT_REF_OID,
        None => sys::GIT_REF_INVALID,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_resolve(
    out: *mut *mut sys::git_reference,
    r: *mut sys::git_reference,
) -> c_int {
    let Some(r) = (unsafe { reference(r) }) else {
        return sys::GIT_ERROR;
    };
    let start = r.name();
    let resolved = with_repo(&r.root, |s| {
        let mut name = start.clone();
        for _ in 0..=MAX_NESTING {
            match s.refs.get(&name) {
                Some(RefValue::Direct(id)) => return Ok((name, RefValue::Direct(*id))),
                Some(RefValue::Symbolic(to)) => name.clone_from(to),
                None => return Err(name),
            }
        }
        Err(name)
    });
    match resolved {
        Some(Ok((name, value))) => unsafe { write_out(out, StubReference::new(&r.root, &name, &value)) },
        Some(Err(name)) => not_found(&name),
        None => fail(sys::GIT_ENOTFOUND, sys::GITERR_REPOSITORY, "repository is gone"),
    }
}

/// Deletes the stored reference and frees `reference`.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_delete(r: *mut sys::git_reference) -> c_int {
    let Some(stub) = (unsafe { reference(r) }) else {
        return sys::GIT_ERROR;
    };
    let name = stub.name();
    match with_repo(&stub.root, |s| s.refs.remove(&name)).flatten() {
        Some(_) => {
            unsafe { git_reference_free(r) };
            sys::GIT_OK
        }
        None => not_found(&name),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_rename(
    r: *mut sys::git_reference,
    new_name: *const c_char,
    force: c_int,
) -> c_int {
    let Some(r) = (unsafe { reference(r) }) else {
        return sys::GIT_ERROR;
    };
    let new_name = match unsafe { arg(new_name, "reference name") } {
        Ok(n) => n,
        Err(rc) => return rc,
    };
    let old = r.name();
    let Some(value) = with_repo(&r.root, |s| s.refs.get(&old).cloned()).flatten() else {
        return not_found(&old);
    };
    if let Err(rc) = store(&r.root, new_name, value, force != 0) {
        return rc;
    }
    if old != new_name {
        with_repo(&r.root, |s| s.refs.remove(&old));
    }
    r.name = owned_c(new_name);
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_set_target(r: *mut sys::git_reference, id: *const sys::git_oid) -> c_int {
    let Some(r) = (unsafe { reference(r) }) else {
        return sys::GIT_ERROR;
    };
    let Some(id) = (unsafe { id.as_ref() }).copied() else {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null target");
    };
    if r.symbolic.is_some() {
        return fail(sys::GIT_ERROR, sys::GITERR_REFERENCE, "cannot set an object id on a symbolic reference");
    }
    let name = r.name();
    with_repo(&r.root, |s| s.refs.insert(name, RefValue::Direct(id)));
    r.target = Some(id);
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_symbolic_set_target(r: *mut sys::git_reference, target: *const c_char) -> c_int {
    let Some(r) = (unsafe { reference(r) }) else {
        return sys::GIT_ERROR;
    };
    let target = match unsafe { arg(target, "target") } {
        Ok(t) => t,
        Err(rc) => return rc,
    };
    if r.symbolic.is_none() {
        return fail(sys::GIT_ERROR, sys::GITERR_REFERENCE, "cannot set a symbolic target on a direct reference");
    }
    if !valid_name(target) {
        return invalid_name(target);
    }
    let name = r.name();
    with_repo(&r.root, |s| s.refs.insert(name, RefValue::Symbolic(target.to_owned())));
    r.symbolic = Some(owned_c(target));
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_foreach_glob(
    r: *mut sys::git_repository,
    glob: *const c_char,
    list_flags: c_uint,
    callback: Option<sys::git_reference_foreach_cb>,
    payload: *mut c_void,
) -> c_int {
    let Some(r) = (unsafe { repo(r) }) else {
        return sys::GIT_ERROR;
    };
    let Some(callback) = callback else {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null callback");
    };
    let glob = match unsafe { arg(glob, "glob") } {
        Ok(g) => g.as_bytes().to_vec(),
        Err(rc) => return rc,
    };
    let flags = c_int::try_from(list_flags).unwrap_or(sys::GIT_REF_LISTALL);
    let names: Vec<_> = with_repo(&r.root, |s| {
        s.refs
            .iter()
            .filter(|(name, value)| {
                let kind = match value {
                    RefValue::Direct(_) => sys::GIT_REF_OID,
                    RefValue::Symbolic(_) => sys::GIT_REF_SYMBOLIC,
                };
                kind & flags != 0 && glob_match(&glob, name.as_bytes())
            })
            .map(|(name, _)| owned_c(name))
            .collect()
    })
    .unwrap_or_default();
    for name in names {
        if unsafe { callback(name.as_ptr(), payload) } != 0 {
            return sys::GIT_EUSER;
        }
    }
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_reference_is_valid_name(refname: *const c_char) -> c_int {
    unsafe { ffi::c_str(refname) }.map_or(0, |n| c_int::from(valid_name(n)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_rules() {
        assert!(valid_name("refs/heads/main"));
        assert!(valid_name("refs/remotes/origin/feature-1"));
        assert!(valid_name("HEAD"));
        assert!(valid_name("FETCH_HEAD"));
        assert!(!valid_name("refs/heads/"));
        assert!(!valid_name("refs/heads/.hidden"));
        assert!(!valid_name("refs/heads/a..b"));
        assert!(!valid_name("refs/heads/x.lock"));
        assert!(!valid_name("refs/heads/what?"));
        assert!(!valid_name("head"));
    }

    #[test]
    fn glob_wildcards() {
        assert!(glob_match(b"refs/heads/*", b"refs/heads/a/b"));
        assert!(glob_match(b"refs/tags/v?", b"refs/tags/v1"));
        assert!(!glob_match(b"refs/tags/v?", b"refs/tags/v10"));
        assert!(!glob_match(b"refs/heads/*", b"refs/tags/a"));
    }
}
