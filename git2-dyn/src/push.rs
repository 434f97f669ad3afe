#![allow(unsafe_code)]
//! Pushing to a remote.

use std::ffi::{c_char, c_int, c_void};
use std::ops::ControlFlow;

use crate::callback;
use crate::encoding;
use crate::error::Result;
use crate::exports;
use crate::handle::{Handle, kind};
use crate::Remote;

/// A push in preparation or finished.
pub type Push = Handle<kind::Push>;

/// Outcome for one pushed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushStatus {
    /// Remote reference name.
    pub reference: String,
    /// `None` on success, the server's message otherwise.
    pub message: Option<String>,
}

impl Remote {
    /// Start a push over this (connected) remote.
    pub fn push(&self) -> Result<Push> {
        let remote = self.as_ptr()?;
        Handle::create(self.runtime(), &exports::git_push_new, |f, out| unsafe {
            f(out, remote)
        })
    }
}

impl Push {
    /// Add a refspec such as `refs/heads/main:refs/heads/main`.
    pub fn add_refspec(&self, refspec: &str) -> Result<()> {
        let refspec = encoding::to_c_string(refspec)?;
        self.call_checked(&exports::git_push_add_refspec, |f, push| unsafe {
            f(push, refspec.as_ptr())
        })
        .map(drop)
    }

    /// Send the pack and update the remote references.
    pub fn finish(&self) -> Result<()> {
        self.call_checked(&exports::git_push_finish, |f, push| unsafe { f(push) })
            .map(drop)
    }

    /// Whether the remote unpacked the pack successfully.
    pub fn unpack_ok(&self) -> Result<bool> {
        self.call(&exports::git_push_unpack_ok, |f, push| unsafe { f(push) })
            .map(|rc| rc != 0)
    }

    /// Update local remote-tracking references after a push.
    pub fn update_tips(&self) -> Result<()> {
        self.call_checked(&exports::git_push_update_tips, |f, push| unsafe { f(push) })
            .map(drop)
    }

    /// Visit the per-reference result of a finished push.
    pub fn for_each_status(&self, visitor: impl FnMut(PushStatus) -> ControlFlow<i32>) -> Result<ControlFlow<i32>> {
        let push = self.as_ptr()?;
        let rt = self.runtime();
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_push_status_foreach, |f| unsafe {
                f(push, Some(status_cb), payload)
            })
        })
    }

    /// Every per-reference result.
    pub fn statuses(&self) -> Result<Vec<PushStatus>> {
        callback::collect(|visit| self.for_each_status(visit))
    }
}

unsafe extern "system" fn status_cb(refname: *const c_char, msg: *const c_char, data: *mut c_void) -> c_int {
    unsafe {
        callback::deliver(data, || {
            Ok(PushStatus {
                reference: encoding::borrowed_str_required(refname)?,
                message: encoding::borrowed_str(msg)?,
            })
        })
    }
}
