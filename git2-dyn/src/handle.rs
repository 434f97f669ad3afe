#![allow(unsafe_code)]
//! Owned and borrowed references to native resources.
//!
//! [`Handle<K>`] owns one native object of kind `K`: it frees it exactly once
//! through the kind's free export and keeps the library alive meanwhile.
//! [`Borrowed<'a, K>`] is a view into memory owned by another object; it is
//! never freed and cannot outlive its owner.

use std::any::Any;
use std::ffi::c_int;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use git2_dyn_sys as sys;
use tracing::{error, trace};

use crate::error::{Error, Result};
use crate::lifetime::LifetimeToken;
use crate::resolver::FunctionBinding;
use crate::runtime::Runtime;

/// Tag naming the kind of native resource behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `git_repository`.
    Repository,
    /// `git_reference`.
    Reference,
    /// `git_object` (commit, tree, blob or tag).
    Object,
    /// `git_index`.
    Index,
    /// `git_index_entry`.
    IndexEntry,
    /// `git_config`.
    Config,
    /// `git_config_entry`.
    ConfigEntry,
    /// `git_remote`.
    Remote,
    /// `git_push`.
    Push,
    /// `git_treebuilder`.
    TreeBuilder,
    /// `git_revwalk`.
    RevWalk,
    /// `git_diff_list`.
    DiffList,
    /// `git_note`.
    Note,
    /// `git_signature`.
    Signature,
    /// `git_odb`.
    Odb,
    /// `git_oid`.
    Oid,
    /// `git_tree_entry`.
    TreeEntry,
    /// `git_refspec`.
    Refspec,
    /// `git_cred`.
    Credential,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A kind of native resource.
pub trait Resource {
    /// Tag for diagnostics.
    const KIND: ResourceKind;
    /// Native pointee type.
    type Raw;
}

/// A resource the binding can own and must free.
pub trait Owned: Resource {
    /// Export that frees one instance.
    const FREE: FunctionBinding<unsafe extern "system" fn(*mut Self::Raw)>;
}

/// Marker types naming each resource kind.
pub mod kind {
    use super::{Owned, Resource, ResourceKind};
    use crate::exports;
    use crate::resolver::FunctionBinding;
    use git2_dyn_sys as sys;

    macro_rules! resources {
        ($($name:ident => $raw:ty $(, free $free:ident)?;)*) => {
            $(
                #[doc = concat!("`", stringify!($raw), "`.")]
                #[derive(Debug)]
                pub enum $name {}

                impl Resource for $name {
                    const KIND: ResourceKind = ResourceKind::$name;
                    type Raw = $raw;
                }

                $(
                    impl Owned for $name {
                        const FREE: FunctionBinding<unsafe extern "system" fn(*mut $raw)> = exports::$free;
                    }
                )?
            )*
        };
    }

    resources! {
        Repository => sys::git_repository, free git_repository_free;
        Reference => sys::git_reference, free git_reference_free;
        Object => sys::git_object, free git_object_free;
        Index => sys::git_index, free git_index_free;
        Config => sys::git_config, free git_config_free;
        Remote => sys::git_remote, free git_remote_free;
        Push => sys::git_push, free git_push_free;
        TreeBuilder => sys::git_treebuilder, free git_treebuilder_free;
        RevWalk => sys::git_revwalk, free git_revwalk_free;
        DiffList => sys::git_diff_list, free git_diff_list_free;
        Note => sys::git_note, free git_note_free;
        Signature => sys::git_signature, free git_signature_free;
        Odb => sys::git_odb, free git_odb_free;
        TreeEntry => sys::git_tree_entry, free git_tree_entry_free;
        IndexEntry => sys::git_index_entry;
        ConfigEntry => sys::git_config_entry;
        Oid => sys::git_oid;
        Refspec => sys::git_refspec;
    }
}

/// RAII owner of one native object. Frees it on [`release`](Self::release)
/// or drop, whichever comes first.
pub struct Handle<K: Owned> {
    ptr: *mut K::Raw,
    rt: &'static Runtime,
    token: Option<LifetimeToken>,
    attached: Vec<Box<dyn Any + Send>>,
}

// Native objects are not tied to the creating thread; the library requires
// only that one object is not used concurrently, which `&mut`/`&` enforce
// together with `!Sync`.
unsafe impl<K: Owned> Send for Handle<K> {}

impl<K: Owned> Handle<K> {
    /// Wrap a pointer returned by a constructor. The token must have been
    /// acquired before the constructor ran.
    pub(crate) fn from_raw(token: LifetimeToken, ptr: *mut K::Raw) -> Result<Self> {
        if ptr.is_null() {
            return Err(Error::NullPointer);
        }
        trace!(kind = %K::KIND, "handle acquired");
        Ok(Self {
            ptr,
            rt: token.runtime(),
            token: Some(token),
            attached: Vec::new(),
        })
    }

    /// Run a constructor export with an out-pointer and take ownership of the
    /// result.
    pub(crate) fn create<F: Copy>(
        rt: &'static Runtime,
        binding: &FunctionBinding<F>,
        call: impl FnOnce(F, *mut *mut K::Raw) -> c_int,
    ) -> Result<Self> {
        let token = rt.token()?;
        let mut out = ptr::null_mut();
        let rc = rt.call(binding, |f| call(f, &raw mut out))?;
        rt.check(rc)?;
        Self::from_raw(token, out)
    }

    /// Like [`create`](Self::create), mapping `GIT_ENOTFOUND` to `None`.
    pub(crate) fn create_optional<F: Copy>(
        rt: &'static Runtime,
        binding: &FunctionBinding<F>,
        call: impl FnOnce(F, *mut *mut K::Raw) -> c_int,
    ) -> Result<Option<Self>> {
        match Self::create(rt, binding, call) {
            Err(e) if e.is_not_found() => Ok(None),
            other => other.map(Some),
        }
    }

    /// Raw pointer for native calls. Fails once released.
    pub(crate) fn as_ptr(&self) -> Result<*mut K::Raw> {
        if self.ptr.is_null() {
            Err(Error::Released { kind: K::KIND })
        } else {
            Ok(self.ptr)
        }
    }

    /// The runtime this handle belongs to.
    pub(crate) const fn runtime(&self) -> &'static Runtime {
        self.rt
    }

    /// Keep `value` alive until this handle is released.
    pub(crate) fn attach(&mut self, value: Box<dyn Any + Send>) {
        self.attached.push(value);
    }

    /// Invoke `binding` with this handle's pointer.
    pub(crate) fn call<F: Copy, R>(
        &self,
        binding: &FunctionBinding<F>,
        call: impl FnOnce(F, *mut K::Raw) -> R,
    ) -> Result<R> {
        let ptr = self.as_ptr()?;
        self.rt.call(binding, |f| call(f, ptr))
    }

    /// Invoke `binding` with this handle's pointer and check the return code.
    pub(crate) fn call_checked<F: Copy>(
        &self,
        binding: &FunctionBinding<F>,
        call: impl FnOnce(F, *mut K::Raw) -> c_int,
    ) -> Result<c_int> {
        let rc = self.call(binding, call)?;
        self.rt.check(rc)
    }

    /// Hand the object to a native call that frees it on success.
    ///
    /// On failure the handle keeps ownership.
    pub(crate) fn consume(
        &mut self,
        binding: &FunctionBinding<unsafe extern "system" fn(*mut K::Raw) -> c_int>,
    ) -> Result<()> {
        self.call_checked(binding, |f, p| unsafe { f(p) })?;
        self.ptr = ptr::null_mut();
        self.attached.clear();
        self.token.take();
        Ok(())
    }

    /// Free the native object now. Later calls are no-ops.
    ///
    /// The lifetime token is returned only after the free export has run, so
    /// shutdown cannot overtake the release.
    pub fn release(&mut self) -> Result<()> {
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        if ptr.is_null() {
            return Ok(());
        }
        let freed = self.rt.call(&K::FREE, |free| unsafe { free(ptr) });
        self.attached.clear();
        self.token.take();
        trace!(kind = %K::KIND, "handle released");
        freed
    }

    /// Whether the native object has been freed.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.ptr.is_null()
    }

    /// Resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        K::KIND
    }
}

impl<K: Owned> Drop for Handle<K> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!(kind = %K::KIND, error = %e, "native release failed; object leaked");
        }
    }
}

impl<K: Owned> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::KIND)
            .field("ptr", &self.ptr)
            .finish()
    }
}

/// A non-owning view into memory owned by another native object.
pub struct Borrowed<'a, K: Resource> {
    ptr: NonNull<K::Raw>,
    rt: &'static Runtime,
    _owner: PhantomData<&'a K::Raw>,
}

impl<K: Resource> Borrowed<'_, K> {
    /// View `ptr`, which must stay valid for the owner's borrow.
    pub(crate) fn new(rt: &'static Runtime, ptr: *const K::Raw) -> Option<Self> {
        NonNull::new(ptr.cast_mut()).map(|ptr| Self {
            ptr,
            rt,
            _owner: PhantomData,
        })
    }

    pub(crate) const fn as_ptr(&self) -> *const K::Raw {
        self.ptr.as_ptr().cast_const()
    }

    pub(crate) const fn runtime(&self) -> &'static Runtime {
        self.rt
    }

    /// Resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        K::KIND
    }
}

impl<K: Resource> fmt::Debug for Borrowed<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Borrowed")
            .field("kind", &K::KIND)
            .field("ptr", &self.ptr)
            .finish()
    }
}

impl Borrowed<'_, kind::Oid> {
    /// Copy the id out.
    #[must_use]
    pub fn to_oid(&self) -> crate::Oid {
        crate::Oid(unsafe { *self.as_ptr() })
    }
}

/// Read a borrowed signature into an owned value.
///
/// # Safety
/// `sig` must point at a live `git_signature`.
pub(crate) unsafe fn read_signature(sig: *const sys::git_signature) -> Result<crate::SignatureInfo> {
    let sig = unsafe { sig.as_ref() }.ok_or(Error::NullPointer)?;
    Ok(crate::SignatureInfo {
        name: unsafe { crate::encoding::borrowed_str_required(sig.name) }?,
        email: unsafe { crate::encoding::borrowed_str_required(sig.email) }?,
        when: crate::Time {
            seconds: sig.when.time,
            offset_minutes: sig.when.offset,
        },
    })
}

/// A borrowed signature owned by a commit or tag.
pub type SignatureRef<'a> = Borrowed<'a, kind::Signature>;

impl SignatureRef<'_> {
    /// Copy the signature out.
    pub fn to_info(&self) -> Result<crate::SignatureInfo> {
        unsafe { read_signature(self.as_ptr()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;

    fn open_stub_config(rt: &'static Runtime) -> Handle<kind::Config> {
        Handle::create(rt, &exports::git_config_new, |f, out| unsafe { f(out) }).unwrap()
    }

    #[test]
    fn release_is_idempotent_and_frees_once() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let before = git2_dyn_stub::frees("git_config_free");
        let mut h = open_stub_config(rt);
        assert_eq!(rt.live_handles(), 1);
        h.release().unwrap();
        h.release().unwrap();
        drop(h);
        assert_eq!(rt.live_handles(), 0);
        assert!(git2_dyn_stub::frees("git_config_free") >= before + 1);
    }

    #[test]
    fn released_handle_reports_its_kind() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let mut h = open_stub_config(rt);
        h.release().unwrap();
        assert!(h.is_released());
        assert!(matches!(
            h.as_ptr(),
            Err(Error::Released { kind: ResourceKind::Config })
        ));
    }

    #[test]
    fn failed_constructor_returns_its_token() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let path = crate::encoding::to_c_string("/definitely/not/a/stub/repo").unwrap();
        let err = Handle::<kind::Repository>::create(rt, &exports::git_repository_open, |f, out| unsafe {
            f(out, path.as_ptr())
        })
        .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(rt.live_handles(), 0);
    }

    #[test]
    fn borrowed_null_is_none() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        assert!(Borrowed::<kind::Oid>::new(rt, ptr::null()).is_none());
    }

    #[test]
    fn attached_values_drop_with_release() {
        use std::sync::Arc;
        let rt = stub_runtime(ResolvePolicy::Cached);
        let marker = Arc::new(());
        let mut h = open_stub_config(rt);
        h.attach(Box::new(Arc::clone(&marker)));
        assert_eq!(Arc::strong_count(&marker), 2);
        h.release().unwrap();
        assert_eq!(Arc::strong_count(&marker), 1);
    }
}
