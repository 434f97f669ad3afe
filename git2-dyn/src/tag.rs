#![allow(unsafe_code)]
//! Annotated and lightweight tags.

use std::ffi::c_int;

use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Borrowed, SignatureRef};
use crate::object::object_type;
use crate::types::{ObjectType, Oid};
use crate::{Object, Repository, Signature};

impl Repository {
    /// Create an annotated tag `refs/tags/<name>` on `target`.
    pub fn create_tag(
        &self,
        name: &str,
        target: &Object,
        tagger: &Signature,
        message: &str,
        force: bool,
    ) -> Result<Oid> {
        let name = encoding::to_c_string(name)?;
        let message = encoding::to_c_string(message)?;
        let target = target.as_ptr()?;
        let tagger = tagger.as_ptr()?;
        let mut id = Oid::default();
        self.call_checked(&exports::git_tag_create, |f, repo| unsafe {
            f(
                &raw mut id.0,
                repo,
                name.as_ptr(),
                target,
                tagger,
                message.as_ptr(),
                c_int::from(force),
            )
        })?;
        Ok(id)
    }

    /// Create a lightweight tag: a reference straight to `target`.
    pub fn create_lightweight_tag(&self, name: &str, target: &Object, force: bool) -> Result<Oid> {
        let name = encoding::to_c_string(name)?;
        let target = target.as_ptr()?;
        let mut id = Oid::default();
        self.call_checked(&exports::git_tag_create_lightweight, |f, repo| unsafe {
            f(&raw mut id.0, repo, name.as_ptr(), target, c_int::from(force))
        })?;
        Ok(id)
    }

    /// Delete the tag reference `refs/tags/<name>`.
    pub fn delete_tag(&self, name: &str) -> Result<()> {
        let name = encoding::to_c_string(name)?;
        self.call_checked(&exports::git_tag_delete, |f, repo| unsafe { f(repo, name.as_ptr()) })
            .map(drop)
    }
}

impl Object {
    /// Short name of an annotated tag.
    pub fn tag_name(&self) -> Result<String> {
        let name = self.call(&exports::git_tag_name, |f, tag| unsafe { f(tag) })?;
        unsafe { encoding::borrowed_str_required(name) }
    }

    /// Message of an annotated tag.
    pub fn tag_message(&self) -> Result<String> {
        let msg = self.call(&exports::git_tag_message, |f, tag| unsafe { f(tag) })?;
        unsafe { encoding::borrowed_str(msg) }.map(Option::unwrap_or_default)
    }

    /// Tagger, if the tag records one.
    pub fn tagger(&self) -> Result<Option<SignatureRef<'_>>> {
        let sig = self.call(&exports::git_tag_tagger, |f, tag| unsafe { f(tag) })?;
        Ok(Borrowed::new(self.runtime(), sig))
    }

    /// Id of the tagged object.
    pub fn tag_target_id(&self) -> Result<Oid> {
        let id = self.call(&exports::git_tag_target_id, |f, tag| unsafe { f(tag) })?;
        unsafe { Oid::from_raw(id) }.ok_or(Error::NullPointer)
    }

    /// Type of the tagged object.
    pub fn tag_target_type(&self) -> Result<ObjectType> {
        let raw = self.call(&exports::git_tag_target_type, |f, tag| unsafe { f(tag) })?;
        object_type(raw)
    }
}
