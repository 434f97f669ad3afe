#![allow(unsafe_code)]
//! Credentials handed to the library when a remote asks for them.

use std::ptr;

use git2_dyn_sys as sys;
use tracing::error;

use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::lifetime::LifetimeToken;
use crate::runtime::Runtime;

/// A native credential object.
///
/// A credential carries its own free function; it is freed on drop unless
/// ownership passes to the library through a credential-acquire callback.
pub struct Credential {
    ptr: *mut sys::git_cred,
    token: Option<LifetimeToken>,
}

// See `Handle`: native objects are not tied to a thread.
unsafe impl Send for Credential {}

impl Credential {
    /// Plain-text user name and password.
    pub fn userpass_plaintext(username: &str, password: &str) -> Result<Self> {
        Self::userpass_plaintext_in(Runtime::global(), username, password)
    }

    pub(crate) fn userpass_plaintext_in(rt: &'static Runtime, username: &str, password: &str) -> Result<Self> {
        let token = rt.token()?;
        let username = encoding::to_c_string(username)?;
        let password = encoding::to_c_string(password)?;
        let mut out = ptr::null_mut();
        let rc = rt.call(&exports::git_cred_userpass_plaintext_new, |f| unsafe {
            f(&raw mut out, username.as_ptr(), password.as_ptr())
        })?;
        rt.check(rc)?;
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        Ok(Self {
            ptr: out,
            token: Some(token),
        })
    }

    /// Raw credential type bits.
    #[must_use]
    pub fn credential_type(&self) -> u32 {
        unsafe { (*self.ptr).credtype as u32 }
    }

    /// Give the native object to the library, which frees it. The remote
    /// that asked for it keeps the library alive meanwhile.
    pub(crate) fn into_raw(mut self) -> *mut sys::git_cred {
        self.token.take();
        std::mem::replace(&mut self.ptr, ptr::null_mut())
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        match unsafe { (*self.ptr).free } {
            Some(free) => unsafe { free(self.ptr) },
            None => error!("credential has no free function; leaked"),
        }
        self.token.take();
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("credtype", &self.credential_type())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;

    #[test]
    fn plaintext_credential_frees_itself() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let before = git2_dyn_stub::frees("git_cred_free");
        let cred = Credential::userpass_plaintext_in(rt, "ada", "s3cret").unwrap();
        assert_eq!(cred.credential_type(), sys::GIT_CREDTYPE_USERPASS_PLAINTEXT);
        assert_eq!(rt.live_handles(), 1);
        drop(cred);
        assert_eq!(rt.live_handles(), 0);
        assert!(git2_dyn_stub::frees("git_cred_free") > before);
    }
}
