#![allow(unsafe_code)]
//! Remotes: configuration, connection, fetch and the callbacks the library
//! invokes while talking to the server.
//!
//! Callbacks registered with [`Remote::set_cred_acquire`] and
//! [`Remote::set_callbacks`] may be invoked by any later call on the remote,
//! so their context is owned by the remote handle and dropped with it.

use std::ffi::{c_char, c_int, c_uint, c_void};
use std::ops::ControlFlow;
use std::ptr;

use git2_dyn_sys as sys;
use tracing::warn;

use crate::callback;
use crate::credential::Credential;
use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Borrowed, Handle, kind};
use crate::types::{AutotagOption, CompletionType, CredentialTypes, Direction, Oid, TransferProgress, Unimplemented};
use crate::Repository;

/// A configured remote.
pub type Remote = Handle<kind::Remote>;

/// A fetch refspec owned by a [`Remote`].
pub type Refspec<'a> = Borrowed<'a, kind::Refspec>;

/// A reference advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHead {
    /// Whether the object is available locally.
    pub local: bool,
    /// Advertised object id.
    pub id: Oid,
    /// Local object id, when `local`.
    pub local_id: Oid,
    /// Reference name.
    pub name: String,
}

/// Supplies credentials when the server asks for them.
pub type CredentialProvider = dyn FnMut(&str, CredentialTypes) -> Result<Credential> + Send;

/// Notifications during network operations. Unset fields are not registered.
#[derive(Default)]
pub struct RemoteCallbacks {
    /// Textual progress sent by the server (`remote: ...` lines).
    pub progress: Option<Box<dyn FnMut(&str) + Send>>,
    /// A stage finished. A negative return aborts the operation.
    pub completion: Option<Box<dyn FnMut(CompletionType) -> i32 + Send>>,
    /// A reference was updated from `old` to `new`. A negative return aborts.
    pub update_tips: Option<Box<dyn FnMut(&str, Oid, Oid) -> i32 + Send>>,
}

impl std::fmt::Debug for RemoteCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCallbacks")
            .field("progress", &self.progress.is_some())
            .field("completion", &self.completion.is_some())
            .field("update_tips", &self.update_tips.is_some())
            .finish()
    }
}

struct CallbackContext {
    callbacks: RemoteCallbacks,
    // The library may keep a pointer to the table it was given.
    raw: sys::git_remote_callbacks,
}

// `raw.payload` points back into this allocation; the callbacks are `Send`.
unsafe impl Send for CallbackContext {}

/// Whether `name` is a valid remote name.
///
/// The export is not bound; this always reports `true`.
pub fn is_valid_name(_name: &str) -> Unimplemented<bool> {
    Unimplemented::stand_in("git_remote_is_valid_name", true)
}

impl Repository {
    /// Add a remote named `name` fetching from `url`, and save it to the
    /// repository configuration.
    pub fn create_remote(&self, name: &str, url: &str) -> Result<Remote> {
        let repo = self.as_ptr()?;
        let name = encoding::to_c_string(name)?;
        let url = encoding::to_c_string(url)?;
        Handle::create(self.runtime(), &exports::git_remote_create, |f, out| unsafe {
            f(out, repo, name.as_ptr(), url.as_ptr())
        })
    }

    /// Load the configured remote `name`. `None` if there is none.
    pub fn find_remote(&self, name: &str) -> Result<Option<Remote>> {
        let repo = self.as_ptr()?;
        let name = encoding::to_c_string(name)?;
        Handle::create_optional(self.runtime(), &exports::git_remote_load, |f, out| unsafe {
            f(out, repo, name.as_ptr())
        })
    }
}

impl Remote {
    /// Remote name. `None` for an in-memory remote.
    pub fn name(&self) -> Result<Option<String>> {
        let name = self.call(&exports::git_remote_name, |f, r| unsafe { f(r) })?;
        unsafe { encoding::borrowed_str(name) }
    }

    /// Fetch URL.
    pub fn url(&self) -> Result<String> {
        let url = self.call(&exports::git_remote_url, |f, r| unsafe { f(r) })?;
        unsafe { encoding::borrowed_str_required(url) }
    }

    /// The fetch refspec, if one is configured.
    pub fn fetchspec(&self) -> Result<Option<Refspec<'_>>> {
        let spec = self.call(&exports::git_remote_fetchspec, |f, r| unsafe { f(r) })?;
        Ok(Borrowed::new(self.runtime(), spec))
    }

    /// Replace the fetch refspec.
    pub fn set_fetchspec(&self, spec: &str) -> Result<()> {
        let spec = encoding::to_c_string(spec)?;
        self.call_checked(&exports::git_remote_set_fetchspec, |f, r| unsafe { f(r, spec.as_ptr()) })
            .map(drop)
    }

    /// Tag following for the next fetch.
    pub fn set_autotag(&self, value: AutotagOption) -> Result<()> {
        self.call(&exports::git_remote_set_autotag, |f, r| unsafe { f(r, value.to_ffi()) })
    }

    /// Write the remote's settings to the repository configuration.
    pub fn save(&self) -> Result<()> {
        self.call_checked(&exports::git_remote_save, |f, r| unsafe { f(r) })
            .map(drop)
    }

    /// Open a connection in `direction`.
    pub fn connect(&self, direction: Direction) -> Result<()> {
        self.call_checked(&exports::git_remote_connect, |f, r| unsafe { f(r, direction.to_ffi()) })
            .map(drop)
    }

    /// Close the connection.
    pub fn disconnect(&self) -> Result<()> {
        self.call(&exports::git_remote_disconnect, |f, r| unsafe { f(r) })
    }

    /// Visit the references the server advertised. Requires a connection.
    pub fn ls(&self, visitor: impl FnMut(RemoteHead) -> ControlFlow<i32>) -> Result<ControlFlow<i32>> {
        let remote = self.as_ptr()?;
        let rt = self.runtime();
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_remote_ls, |f| unsafe { f(remote, Some(head_cb), payload) })
        })
    }

    /// Download the pack for the configured fetchspec, reporting transfer
    /// progress as it arrives.
    pub fn download(&self, mut progress: impl FnMut(TransferProgress)) -> Result<()> {
        let mut sink: &mut dyn FnMut(TransferProgress) = &mut progress;
        let payload = (&raw mut sink).cast::<c_void>();
        self.call_checked(&exports::git_remote_download, |f, r| unsafe {
            f(r, Some(transfer_cb), payload)
        })
        .map(drop)
    }

    /// Update the local remote-tracking references after a download.
    pub fn update_tips(&self) -> Result<()> {
        self.call_checked(&exports::git_remote_update_tips, |f, r| unsafe { f(r) })
            .map(drop)
    }

    /// Register the provider asked for credentials during `connect`.
    pub fn set_cred_acquire(
        &mut self,
        provider: impl FnMut(&str, CredentialTypes) -> Result<Credential> + Send + 'static,
    ) -> Result<()> {
        let remote = self.as_ptr()?;
        let mut ctx: Box<Box<CredentialProvider>> = Box::new(Box::new(provider));
        let payload = (&raw mut *ctx).cast::<c_void>();
        self.runtime()
            .call(&exports::git_remote_set_cred_acquire_cb, |f| unsafe {
                f(remote, Some(cred_acquire_cb), payload);
            })?;
        self.attach(ctx);
        Ok(())
    }

    /// Register progress, completion and update-tips notifications.
    pub fn set_callbacks(&mut self, callbacks: RemoteCallbacks) -> Result<()> {
        let mut ctx = Box::new(CallbackContext {
            raw: sys::git_remote_callbacks {
                version: sys::GIT_REMOTE_CALLBACKS_VERSION,
                progress: callbacks.progress.as_ref().map(|_| progress_cb as sys::git_remote_progress_cb),
                completion: callbacks
                    .completion
                    .as_ref()
                    .map(|_| completion_cb as sys::git_remote_completion_cb),
                update_tips: callbacks
                    .update_tips
                    .as_ref()
                    .map(|_| update_tips_cb as sys::git_remote_update_tips_cb),
                payload: ptr::null_mut(),
            },
            callbacks,
        });
        ctx.raw.payload = (&raw mut *ctx).cast::<c_void>();
        let table = &raw const ctx.raw;
        self.call_checked(&exports::git_remote_set_callbacks, |f, r| unsafe { f(r, table) })?;
        self.attach(ctx);
        Ok(())
    }
}

impl Refspec<'_> {
    /// Map a remote-tracking name back to the remote's name.
    ///
    /// The export is not bound; this returns success with no output.
    pub fn rtransform(&self, _name: &str) -> Unimplemented<i32> {
        Unimplemented::stand_in("git_refspec_rtransform", 1)
    }
}

unsafe extern "system" fn head_cb(head: *mut sys::git_remote_head, payload: *mut c_void) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            let head = head.as_ref().ok_or(Error::NullPointer)?;
            Ok(RemoteHead {
                local: head.local != 0,
                id: Oid(head.oid),
                local_id: Oid(head.loid),
                name: encoding::borrowed_str_required(head.name)?,
            })
        })
    }
}

unsafe extern "system" fn transfer_cb(stats: *const sys::git_transfer_progress, payload: *mut c_void) {
    let (Some(sink), Some(stats)) = (
        unsafe { payload.cast::<&mut dyn FnMut(TransferProgress)>().as_mut() },
        unsafe { stats.as_ref() },
    ) else {
        return;
    };
    callback::guarded("transfer progress", (), || sink(TransferProgress::from(stats)));
}

unsafe extern "system" fn cred_acquire_cb(
    cred: *mut *mut sys::git_cred,
    url: *const c_char,
    allowed_types: c_uint,
    payload: *mut c_void,
) -> c_int {
    let Some(provider) = (unsafe { payload.cast::<Box<CredentialProvider>>().as_mut() }) else {
        return sys::GIT_EUSER;
    };
    if cred.is_null() {
        return sys::GIT_EUSER;
    }
    callback::guarded("credential acquire", sys::GIT_EUSER, || {
        let url = match unsafe { encoding::borrowed_str(url) } {
            Ok(url) => url.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "credential request with undecodable url");
                return sys::GIT_EUSER;
            }
        };
        match provider(url.as_str(), CredentialTypes::from_bits(allowed_types)) {
            Ok(credential) => {
                unsafe { *cred = credential.into_raw() };
                sys::GIT_OK
            }
            Err(e) => {
                warn!(url = %url, error = %e, "credential provider failed");
                sys::GIT_EUSER
            }
        }
    })
}

unsafe fn context<'a>(data: *mut c_void) -> Option<&'a mut RemoteCallbacks> {
    unsafe { data.cast::<CallbackContext>().as_mut() }.map(|ctx| &mut ctx.callbacks)
}

unsafe extern "system" fn progress_cb(text: *const c_char, len: c_int, data: *mut c_void) {
    let Some(callbacks) = (unsafe { context(data) }) else {
        return;
    };
    let Some(progress) = callbacks.progress.as_mut() else {
        return;
    };
    let bytes = if text.is_null() || len <= 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(text.cast::<u8>(), len as usize) }
    };
    let text = String::from_utf8_lossy(bytes);
    callback::guarded("remote progress", (), || progress(&*text));
}

unsafe extern "system" fn completion_cb(completion_type: c_int, data: *mut c_void) -> c_int {
    let Some(completion) = (unsafe { context(data) }).and_then(|c| c.completion.as_mut()) else {
        return 0;
    };
    let Some(kind) = CompletionType::from_ffi(completion_type) else {
        warn!(completion_type, "unknown completion type");
        return 0;
    };
    callback::guarded("remote completion", sys::GIT_EUSER, || completion(kind))
}

unsafe extern "system" fn update_tips_cb(
    refname: *const c_char,
    old_id: *const sys::git_oid,
    new_id: *const sys::git_oid,
    data: *mut c_void,
) -> c_int {
    let Some(update_tips) = (unsafe { context(data) }).and_then(|c| c.update_tips.as_mut()) else {
        return 0;
    };
    let name = match unsafe { encoding::borrowed_str_required(refname) } {
        Ok(name) => name,
        Err(e) => {
            warn!(error = %e, "update-tips callback with undecodable name");
            return sys::GIT_EUSER;
        }
    };
    let old = unsafe { Oid::from_raw(old_id) }.unwrap_or_default();
    let new = unsafe { Oid::from_raw(new_id) }.unwrap_or_default();
    callback::guarded("remote update tips", sys::GIT_EUSER, || update_tips(name.as_str(), old, new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn context_for(callbacks: RemoteCallbacks) -> Box<CallbackContext> {
        let mut ctx = Box::new(CallbackContext {
            raw: sys::git_remote_callbacks {
                version: sys::GIT_REMOTE_CALLBACKS_VERSION,
                progress: None,
                completion: None,
                update_tips: None,
                payload: ptr::null_mut(),
            },
            callbacks,
        });
        ctx.raw.payload = (&raw mut *ctx).cast();
        ctx
    }

    #[test]
    fn registered_callbacks_receive_decoded_arguments() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (p, c, u) = (Arc::clone(&seen), Arc::clone(&seen), Arc::clone(&seen));
        let ctx = context_for(RemoteCallbacks {
            progress: Some(Box::new(move |text| p.lock().unwrap().push(format!("progress {text}")))),
            completion: Some(Box::new(move |kind| {
                c.lock().unwrap().push(format!("completion {kind:?}"));
                0
            })),
            update_tips: Some(Box::new(move |name, old, new| {
                u.lock().unwrap().push(format!("tips {name} {} {}", old.is_zero(), new.is_zero()));
                -1
            })),
        });
        let data = ctx.raw.payload;
        let text = b"Counting objects";
        let name = std::ffi::CString::new("refs/heads/main").unwrap();
        let new = sys::git_oid { id: [1; 20] };
        unsafe {
            progress_cb(text.as_ptr().cast(), 8, data);
            assert_eq!(completion_cb(sys::GIT_REMOTE_COMPLETION_DOWNLOAD, data), 0);
            assert_eq!(update_tips_cb(name.as_ptr(), ptr::null(), &raw const new, data), -1);
        }
        assert_eq!(
            *seen.lock().unwrap(),
            ["progress Counting", "completion Download", "tips refs/heads/main true false"]
        );
    }

    #[test]
    fn set_callbacks_on_a_released_remote_is_refused() {
        use crate::lifetime::LifetimeToken;
        use crate::resolver::ResolvePolicy;
        use crate::runtime::testing::stub_runtime;

        let rt = stub_runtime(ResolvePolicy::Cached);
        let token = LifetimeToken::acquire(rt).unwrap();
        let mut remote = Remote::from_raw(token, ptr::NonNull::<sys::git_remote>::dangling().as_ptr()).unwrap();
        // The stub has no git_remote_free; the handle is released regardless.
        assert!(remote.release().is_err());
        assert_eq!(rt.live_handles(), 0);

        let err = remote.set_callbacks(RemoteCallbacks::default()).unwrap_err();
        assert!(matches!(err, Error::Released { kind: crate::ResourceKind::Remote }));
    }

    #[test]
    fn panicking_callback_returns_fallback() {
        let ctx = context_for(RemoteCallbacks {
            completion: Some(Box::new(|_| panic!("server went away"))),
            ..RemoteCallbacks::default()
        });
        let rc = unsafe { completion_cb(sys::GIT_REMOTE_COMPLETION_ERROR, ctx.raw.payload) };
        assert_eq!(rc, sys::GIT_EUSER);
    }

    #[test]
    fn transfer_progress_reaches_the_sink() {
        let mut received = Vec::new();
        let mut progress = |p: TransferProgress| received.push(p.received_objects);
        let mut sink: &mut dyn FnMut(TransferProgress) = &mut progress;
        let payload = (&raw mut sink).cast::<c_void>();
        for n in 1..=3 {
            let stats = sys::git_transfer_progress {
                total_objects: 3,
                indexed_objects: 0,
                received_objects: n,
                received_bytes: 100,
            };
            unsafe { transfer_cb(&raw const stats, payload) };
        }
        assert_eq!(received, [1, 2, 3]);
    }
}
