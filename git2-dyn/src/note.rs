#![allow(unsafe_code)]
//! Notes attached to objects.

use std::ffi::{c_int, c_void};
use std::ops::ControlFlow;
use std::ptr;

use git2_dyn_sys as sys;

use crate::callback;
use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Borrowed, Handle, kind};
use crate::types::Oid;
use crate::{Repository, Signature};

/// A note read from a notes reference.
pub type Note = Handle<kind::Note>;

/// A note found while enumerating a notes reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEntry {
    /// Blob holding the note text.
    pub blob_id: Oid,
    /// Object the note annotates.
    pub annotated_id: Oid,
}

impl Repository {
    /// Attach `message` to `target` under `notes_ref` (the default notes
    /// reference when `None`). Returns the note blob id.
    pub fn create_note(
        &self,
        notes_ref: Option<&str>,
        author: &Signature,
        committer: &Signature,
        target: &Oid,
        message: &str,
        force: bool,
    ) -> Result<Oid> {
        let notes_ref = encoding::optional_c_string(notes_ref)?;
        let message = encoding::to_c_string(message)?;
        let author = author.as_ptr()?;
        let committer = committer.as_ptr()?;
        let mut id = Oid::default();
        self.call_checked(&exports::git_note_create, |f, repo| unsafe {
            f(
                &raw mut id.0,
                repo,
                author,
                committer,
                encoding::c_str_ptr(&notes_ref),
                target.raw(),
                message.as_ptr(),
                c_int::from(force),
            )
        })?;
        Ok(id)
    }

    /// The note on `target`, `None` if it has none.
    pub fn read_note(&self, notes_ref: Option<&str>, target: &Oid) -> Result<Option<Note>> {
        let repo = self.as_ptr()?;
        let notes_ref = encoding::optional_c_string(notes_ref)?;
        Handle::create_optional(self.runtime(), &exports::git_note_read, |f, out| unsafe {
            f(out, repo, encoding::c_str_ptr(&notes_ref), target.raw())
        })
    }

    /// Delete the note on `target`.
    pub fn remove_note(
        &self,
        notes_ref: Option<&str>,
        author: &Signature,
        committer: &Signature,
        target: &Oid,
    ) -> Result<()> {
        let notes_ref = encoding::optional_c_string(notes_ref)?;
        let author = author.as_ptr()?;
        let committer = committer.as_ptr()?;
        self.call_checked(&exports::git_note_remove, |f, repo| unsafe {
            f(repo, encoding::c_str_ptr(&notes_ref), author, committer, target.raw())
        })
        .map(drop)
    }

    /// Name of the default notes reference (`refs/notes/commits` unless
    /// configured otherwise).
    pub fn note_default_ref(&self) -> Result<String> {
        let mut name = ptr::null();
        self.call_checked(&exports::git_note_default_ref, |f, repo| unsafe {
            f(&raw mut name, repo)
        })?;
        unsafe { encoding::borrowed_str_required(name) }
    }

    /// Visit every note under `notes_ref`.
    pub fn for_each_note(
        &self,
        notes_ref: Option<&str>,
        visitor: impl FnMut(NoteEntry) -> ControlFlow<i32>,
    ) -> Result<ControlFlow<i32>> {
        let repo = self.as_ptr()?;
        let rt = self.runtime();
        let notes_ref = encoding::optional_c_string(notes_ref)?;
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_note_foreach, |f| unsafe {
                f(repo, encoding::c_str_ptr(&notes_ref), Some(note_cb), payload)
            })
        })
    }
}

impl Note {
    /// Note text.
    pub fn message(&self) -> Result<String> {
        let msg = self.call(&exports::git_note_message, |f, note| unsafe { f(note) })?;
        unsafe { encoding::borrowed_str_required(msg) }
    }

    /// Id of the blob holding the note. Borrowed from the note.
    pub fn id(&self) -> Result<Borrowed<'_, kind::Oid>> {
        let id = self.call(&exports::git_note_oid, |f, note| unsafe { f(note) })?;
        Borrowed::new(self.runtime(), id).ok_or(Error::NullPointer)
    }
}

unsafe extern "system" fn note_cb(blob_id: *const sys::git_oid, annotated_id: *const sys::git_oid, payload: *mut c_void) -> c_int {
    unsafe {
        callback::deliver(payload, || {
            Ok(NoteEntry {
                blob_id: Oid::from_raw(blob_id).ok_or(Error::NullPointer)?,
                annotated_id: Oid::from_raw(annotated_id).ok_or(Error::NullPointer)?,
            })
        })
    }
}
