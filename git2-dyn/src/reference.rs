#![allow(unsafe_code)]
//! References: lookup, creation, enumeration and retargeting.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::ops::ControlFlow;

use crate::callback;
use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Handle, kind};
use crate::runtime::Runtime;
use crate::types::{Oid, ReferenceType};
use crate::Repository;

/// A reference loaded from the repository.
pub type Reference = Handle<kind::Reference>;

/// Whether `name` is a well-formed reference name.
pub fn is_valid_name(name: &str) -> Result<bool> {
    is_valid_name_in(Runtime::global(), name)
}

pub(crate) fn is_valid_name_in(rt: &Runtime, name: &str) -> Result<bool> {
    let name = encoding::to_c_string(name)?;
    rt.call(&exports::git_reference_is_valid_name, |f| unsafe { f(name.as_ptr()) })
        .map(|rc| rc != 0)
}

impl Repository {
    /// Create a direct reference `name` pointing at `id`.
    pub fn create_reference(&self, name: &str, id: &Oid, force: bool) -> Result<Reference> {
        let repo = self.as_ptr()?;
        let name = encoding::to_c_string(name)?;
        Handle::create(self.runtime(), &exports::git_reference_create, |f, out| unsafe {
            f(out, repo, name.as_ptr(), id.raw(), c_int::from(force))
        })
    }

    /// Create a symbolic reference `name` pointing at the reference `target`.
    pub fn create_symbolic_reference(&self, name: &str, target: &str, force: bool) -> Result<Reference> {
        let repo = self.as_ptr()?;
        let name = encoding::to_c_string(name)?;
        let target = encoding::to_c_string(target)?;
        Handle::create(self.runtime(), &exports::git_reference_symbolic_create, |f, out| unsafe {
            f(out, repo, name.as_ptr(), target.as_ptr(), c_int::from(force))
        })
    }

    /// Load the reference `name`. `None` if it does not exist.
    pub fn find_reference(&self, name: &str) -> Result<Option<Reference>> {
        let repo = self.as_ptr()?;
        let name = encoding::to_c_string(name)?;
        Handle::create_optional(self.runtime(), &exports::git_reference_lookup, |f, out| unsafe {
            f(out, repo, name.as_ptr())
        })
    }

    /// Visit the names of references matching `glob` (e.g. `refs/tags/*`).
    pub fn for_each_reference(
        &self,
        glob: &str,
        kind: ReferenceType,
        visitor: impl FnMut(String) -> ControlFlow<i32>,
    ) -> Result<ControlFlow<i32>> {
        let repo = self.as_ptr()?;
        let rt = self.runtime();
        let glob = encoding::to_c_string(glob)?;
        let flags = c_uint::try_from(kind.to_ffi())
            .map_err(|_| Error::InvalidArgument(format!("cannot list {kind:?} references")))?;
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_reference_foreach_glob, |f| unsafe {
                f(repo, glob.as_ptr(), flags, Some(name_cb), payload)
            })
        })
    }

    /// Names of every reference matching `glob`.
    pub fn references(&self, glob: &str) -> Result<Vec<String>> {
        callback::collect(|visit| self.for_each_reference(glob, ReferenceType::ListAll, visit))
    }
}

impl Reference {
    /// Full name, e.g. `refs/heads/main`.
    pub fn name(&self) -> Result<String> {
        let name = self.call(&exports::git_reference_name, |f, r| unsafe { f(r) })?;
        unsafe { encoding::borrowed_str_required(name) }
    }

    /// Target of a direct reference; `None` for a symbolic one.
    pub fn target(&self) -> Result<Option<Oid>> {
        let id = self.call(&exports::git_reference_target, |f, r| unsafe { f(r) })?;
        Ok(unsafe { Oid::from_raw(id) })
    }

    /// Target name of a symbolic reference; `None` for a direct one.
    pub fn symbolic_target(&self) -> Result<Option<String>> {
        let name = self.call(&exports::git_reference_symbolic_target, |f, r| unsafe { f(r) })?;
        unsafe { encoding::borrowed_str(name) }
    }

    /// Direct or symbolic.
    pub fn reference_type(&self) -> Result<ReferenceType> {
        let raw = self.call(&exports::git_reference_type, |f, r| unsafe { f(r) })?;
        ReferenceType::from_ffi(raw)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown reference type {raw}")))
    }

    /// Follow symbolic references down to a direct one.
    pub fn resolve(&self) -> Result<Reference> {
        let reference = self.as_ptr()?;
        Handle::create(self.runtime(), &exports::git_reference_resolve, |f, out| unsafe {
            f(out, reference)
        })
    }

    /// Rename in place.
    pub fn rename(&self, new_name: &str, force: bool) -> Result<()> {
        let new_name = encoding::to_c_string(new_name)?;
        self.call_checked(&exports::git_reference_rename, |f, r| unsafe {
            f(r, new_name.as_ptr(), c_int::from(force))
        })
        .map(drop)
    }

    /// Point a direct reference at `id`.
    pub fn set_target(&self, id: &Oid) -> Result<()> {
        self.call_checked(&exports::git_reference_set_target, |f, r| unsafe { f(r, id.raw()) })
            .map(drop)
    }

    /// Point a symbolic reference at another reference name.
    pub fn set_symbolic_target(&self, target: &str) -> Result<()> {
        let target = encoding::to_c_string(target)?;
        self.call_checked(&exports::git_reference_symbolic_set_target, |f, r| unsafe {
            f(r, target.as_ptr())
        })
        .map(drop)
    }

    /// Delete the reference from the repository. The handle is released on
    /// success.
    pub fn delete(&mut self) -> Result<()> {
        self.consume(&exports::git_reference_delete)
    }
}

unsafe extern "system" fn name_cb(refname: *const c_char, payload: *mut c_void) -> c_int {
    unsafe { callback::deliver(payload, || encoding::borrowed_str_required(refname)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;
    use std::path::Path;

    fn id(byte: u8) -> Oid {
        Oid::from_bytes([byte; 20])
    }

    #[test]
    fn create_lookup_and_resolve() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let repo = Repository::init_in(rt, Path::new("/stub/reference-resolve"), false).unwrap();
        let main = repo.create_reference("refs/heads/main", &id(1), false).unwrap();
        assert_eq!(main.reference_type().unwrap(), ReferenceType::Direct);
        let head = repo
            .create_symbolic_reference("HEAD", "refs/heads/main", true)
            .unwrap();
        assert_eq!(head.symbolic_target().unwrap().as_deref(), Some("refs/heads/main"));
        assert_eq!(head.target().unwrap(), None);
        let resolved = head.resolve().unwrap();
        assert_eq!(resolved.name().unwrap(), "refs/heads/main");
        assert_eq!(resolved.target().unwrap(), Some(id(1)));
        assert_eq!(rt.live_handles(), 4);
    }

    #[test]
    fn duplicate_without_force_is_exists() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let repo = Repository::init_in(rt, Path::new("/stub/reference-exists"), false).unwrap();
        repo.create_reference("refs/tags/v1", &id(2), false).unwrap();
        let err = repo.create_reference("refs/tags/v1", &id(3), false).unwrap_err();
        assert_eq!(err.code(), Some(crate::ErrorCode::Exists));
        repo.create_reference("refs/tags/v1", &id(3), true).unwrap();
    }

    #[test]
    fn glob_enumeration_and_delete() {
        let rt = stub_runtime(ResolvePolicy::PerCall);
        let repo = Repository::init_in(rt, Path::new("/stub/reference-glob"), false).unwrap();
        for name in ["refs/heads/a", "refs/heads/b", "refs/tags/t"] {
            repo.create_reference(name, &id(4), false).unwrap();
        }
        assert_eq!(repo.references("refs/heads/*").unwrap(), ["refs/heads/a", "refs/heads/b"]);
        let mut b = repo.find_reference("refs/heads/b").unwrap().unwrap();
        b.delete().unwrap();
        assert!(b.is_released());
        assert!(repo.find_reference("refs/heads/b").unwrap().is_none());
        assert_eq!(repo.references("refs/heads/*").unwrap(), ["refs/heads/a"]);
    }

    #[test]
    fn retarget_and_rename_in_place() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let repo = Repository::init_in(rt, Path::new("/stub/reference-retarget"), false).unwrap();
        let r = repo.create_reference("refs/heads/old", &id(5), false).unwrap();
        r.set_target(&id(6)).unwrap();
        r.rename("refs/heads/new", false).unwrap();
        assert_eq!(r.name().unwrap(), "refs/heads/new");
        let found = repo.find_reference("refs/heads/new").unwrap().unwrap();
        assert_eq!(found.target().unwrap(), Some(id(6)));
        assert!(repo.find_reference("refs/heads/old").unwrap().is_none());
    }

    #[test]
    fn name_validation() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        assert!(is_valid_name_in(rt, "refs/heads/main").unwrap());
        assert!(is_valid_name_in(rt, "HEAD").unwrap());
        assert!(!is_valid_name_in(rt, "refs/heads/with space").unwrap());
        assert!(!is_valid_name_in(rt, "refs/heads/..").unwrap());
    }
}
