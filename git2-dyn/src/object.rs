#![allow(unsafe_code)]
//! Generic objects: lookup, peel and identity.
//!
//! Commits, trees, blobs and tags are all [`Object`]s; the type-specific
//! accessors live in their own modules and fail natively when called on the
//! wrong type.

use std::ffi::c_int;

use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Borrowed, Handle, kind};
use crate::types::{ObjectType, Oid};
use crate::Repository;

/// An object loaded from the object database.
pub type Object = Handle<kind::Object>;

pub(crate) fn object_type(raw: c_int) -> Result<ObjectType> {
    ObjectType::from_ffi(raw).ok_or_else(|| Error::InvalidArgument(format!("unknown object type {raw}")))
}

impl Repository {
    /// Load the object `id`, which must be of type `kind` unless `kind` is
    /// [`ObjectType::Any`]. `None` if there is no such object.
    pub fn find_object(&self, id: &Oid, kind: ObjectType) -> Result<Option<Object>> {
        let repo = self.as_ptr()?;
        Handle::create_optional(self.runtime(), &exports::git_object_lookup, |f, out| unsafe {
            f(out, repo, id.raw(), kind.to_ffi())
        })
    }
}

impl Object {
    /// Id of this object. Borrowed from the object.
    pub fn id(&self) -> Result<Borrowed<'_, kind::Oid>> {
        let id = self.call(&exports::git_object_id, |f, obj| unsafe { f(obj) })?;
        Borrowed::new(self.runtime(), id).ok_or(Error::NullPointer)
    }

    /// Commit, tree, blob or tag.
    pub fn object_type(&self) -> Result<ObjectType> {
        let raw = self.call(&exports::git_object_type, |f, obj| unsafe { f(obj) })?;
        object_type(raw)
    }

    /// Follow tags and commits until an object of type `target` is reached.
    pub fn peel(&self, target: ObjectType) -> Result<Object> {
        let obj = self.as_ptr()?;
        Handle::create(self.runtime(), &exports::git_object_peel, |f, out| unsafe {
            f(out, obj, target.to_ffi())
        })
    }
}
