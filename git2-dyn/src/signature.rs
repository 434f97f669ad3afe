#![allow(unsafe_code)]
//! Owned signatures for creating commits, tags and notes.

use crate::encoding;
use crate::error::Result;
use crate::exports;
use crate::handle::{Handle, kind, read_signature};
use crate::runtime::Runtime;
use crate::types::{SignatureInfo, Time};

/// A native signature allocated by the library.
pub type Signature = Handle<kind::Signature>;

impl Signature {
    /// New signature for `name <email>` at `when`.
    pub fn new(name: &str, email: &str, when: Time) -> Result<Self> {
        Self::new_in(Runtime::global(), name, email, when)
    }

    pub(crate) fn new_in(rt: &'static Runtime, name: &str, email: &str, when: Time) -> Result<Self> {
        let name = encoding::to_c_string(name)?;
        let email = encoding::to_c_string(email)?;
        Handle::create(rt, &exports::git_signature_new, |f, out| unsafe {
            f(out, name.as_ptr(), email.as_ptr(), when.seconds, when.offset_minutes)
        })
    }

    /// Copy the signature out.
    pub fn info(&self) -> Result<SignatureInfo> {
        unsafe { read_signature(self.as_ptr()?) }
    }
}
