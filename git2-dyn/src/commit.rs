#![allow(unsafe_code)]
//! Commit accessors and commit creation.

use std::ffi::{c_int, c_uint};

use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Borrowed, SignatureRef};
use crate::types::Oid;
use crate::{Object, Repository, Signature};

/// Everything needed to write a commit except the objects themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitMessage<'a> {
    /// Reference to move to the new commit, e.g. `"HEAD"`.
    pub update_ref: Option<&'a str>,
    /// Encoding recorded in the commit header. `None` means UTF-8.
    pub encoding: Option<&'a str>,
    /// Full message.
    pub message: &'a str,
}

impl Object {
    /// Author of a commit. Borrowed from the commit.
    pub fn author(&self) -> Result<SignatureRef<'_>> {
        let sig = self.call(&exports::git_commit_author, |f, c| unsafe { f(c) })?;
        Borrowed::new(self.runtime(), sig).ok_or(Error::NullPointer)
    }

    /// Committer of a commit. Borrowed from the commit.
    pub fn committer(&self) -> Result<SignatureRef<'_>> {
        let sig = self.call(&exports::git_commit_committer, |f, c| unsafe { f(c) })?;
        Borrowed::new(self.runtime(), sig).ok_or(Error::NullPointer)
    }

    /// Full commit message.
    pub fn message(&self) -> Result<String> {
        let msg = self.call(&exports::git_commit_message, |f, c| unsafe { f(c) })?;
        unsafe { encoding::borrowed_str(msg) }.map(Option::unwrap_or_default)
    }

    /// Encoding named in the commit header, if any.
    pub fn message_encoding(&self) -> Result<Option<String>> {
        let enc = self.call(&exports::git_commit_message_encoding, |f, c| unsafe { f(c) })?;
        unsafe { encoding::borrowed_str(enc) }
    }

    /// Number of parents.
    pub fn parent_count(&self) -> Result<usize> {
        let n = self.call(&exports::git_commit_parentcount, |f, c| unsafe { f(c) })?;
        Ok(n as usize)
    }

    /// Id of parent `n`, `None` if out of range.
    pub fn parent_id(&self, n: usize) -> Result<Option<Oid>> {
        let Ok(n) = c_uint::try_from(n) else {
            return Ok(None);
        };
        let id = self.call(&exports::git_commit_parent_id, |f, c| unsafe { f(c, n) })?;
        Ok(unsafe { Oid::from_raw(id) })
    }

    /// Id of the commit's tree.
    pub fn tree_id(&self) -> Result<Oid> {
        let id = self.call(&exports::git_commit_tree_id, |f, c| unsafe { f(c) })?;
        unsafe { Oid::from_raw(id) }.ok_or(Error::NullPointer)
    }
}

impl Repository {
    /// Write a commit of `tree` with the given parents.
    pub fn create_commit(
        &self,
        message: &CommitMessage<'_>,
        author: &Signature,
        committer: &Signature,
        tree: &Object,
        parents: &[&Object],
    ) -> Result<Oid> {
        let update_ref = encoding::optional_c_string(message.update_ref)?;
        let msg_encoding = encoding::optional_c_string(message.encoding)?;
        let text = encoding::to_c_string(message.message)?;
        let author = author.as_ptr()?;
        let committer = committer.as_ptr()?;
        let tree = tree.as_ptr()?;
        let parents = parents
            .iter()
            .map(|p| p.as_ptr())
            .collect::<Result<Vec<_>>>()?;
        let parent_count = c_int::try_from(parents.len())
            .map_err(|_| Error::InvalidArgument(format!("{} parents", parents.len())))?;
        let mut id = Oid::default();
        self.call_checked(&exports::git_commit_create, |f, repo| unsafe {
            f(
                &raw mut id.0,
                repo,
                encoding::c_str_ptr(&update_ref),
                author,
                committer,
                encoding::c_str_ptr(&msg_encoding),
                text.as_ptr(),
                tree,
                parent_count,
                parents.as_ptr(),
            )
        })?;
        Ok(id)
    }
}
