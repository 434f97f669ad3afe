//! Signatures and plain-text credentials.

use std::ffi::{CString, c_char, c_int};

use git2_dyn_sys as sys;

use crate::ffi::{self, arg, fail, owned_c, write_out};

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_signature_new(
    out: *mut *mut sys::git_signature,
    name: *const c_char,
    email: *const c_char,
    time: sys::git_time_t,
    offset: c_int,
) -> c_int {
    let (name, email) = match (unsafe { arg(name, "name") }, unsafe { arg(email, "email") }) {
        (Ok(n), Ok(e)) => (n.trim(), e.trim()),
        (Err(rc), _) | (_, Err(rc)) => return rc,
    };
    if name.is_empty() || email.is_empty() {
        return fail(
            sys::GIT_ERROR,
            sys::GITERR_INVALID,
            "failed to parse signature - Signature cannot have an empty name or email",
        );
    }
    if name.contains(['<', '>']) || email.contains(['<', '>']) {
        return fail(
            sys::GIT_ERROR,
            sys::GITERR_INVALID,
            "failed to parse signature - Neither `name` nor `email` should contain angle brackets chars",
        );
    }
    let sig = sys::git_signature {
        name: owned_c(name).into_raw(),
        email: owned_c(email).into_raw(),
        when: sys::git_time { time, offset },
    };
    unsafe { write_out(out, sig) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_signature_free(sig: *mut sys::git_signature) {
    if sig.is_null() {
        return;
    }
    let sig = unsafe { Box::from_raw(sig) };
    for s in [sig.name, sig.email] {
        if !s.is_null() {
            drop(unsafe { CString::from_raw(s) });
        }
    }
}

/// A user name and password behind the common credential header.
#[repr(C)]
struct UserPass {
    parent: sys::git_cred,
    _username: CString,
    _password: CString,
}

unsafe extern "system" fn userpass_free(cred: *mut sys::git_cred) {
    ffi::count_free("git_cred_free");
    if !cred.is_null() {
        drop(unsafe { Box::from_raw(cred.cast::<UserPass>()) });
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_cred_userpass_plaintext_new(
    out: *mut *mut sys::git_cred,
    username: *const c_char,
    password: *const c_char,
) -> c_int {
    let (user, pass) = match (unsafe { arg(username, "username") }, unsafe { arg(password, "password") }) {
        (Ok(u), Ok(p)) => (u, p),
        (Err(rc), _) | (_, Err(rc)) => return rc,
    };
    let cred = UserPass {
        parent: sys::git_cred {
            credtype: c_int::try_from(sys::GIT_CREDTYPE_USERPASS_PLAINTEXT).unwrap_or(1),
            free: Some(userpass_free),
        },
        _username: owned_c(user),
        _password: owned_c(pass),
    };
    unsafe { write_out(out, cred) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn signature_owns_its_strings() {
        let name = owned_c("  Ada  ");
        let email = owned_c("ada@example.com");
        let mut sig = ptr::null_mut();
        let rc = unsafe { git_signature_new(&raw mut sig, name.as_ptr(), email.as_ptr(), 10, 60) };
        assert_eq!(rc, 0);
        let s = unsafe { &*sig };
        assert_eq!(unsafe { ffi::c_str(s.name) }, Some("Ada"));
        assert_eq!(s.when.offset, 60);
        unsafe { git_signature_free(sig) };
    }

    #[test]
    fn angle_brackets_are_rejected() {
        let name = owned_c("Ada <x>");
        let email = owned_c("ada@example.com");
        let mut sig = ptr::null_mut();
        let rc = unsafe { git_signature_new(&raw mut sig, name.as_ptr(), email.as_ptr(), 0, 0) };
        assert_eq!(rc, sys::GIT_ERROR);
        assert!(sig.is_null());
    }
}
