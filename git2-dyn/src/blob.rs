#![allow(unsafe_code)]
//! Blob creation and content access.

use std::any::Any;
use std::ffi::{c_char, c_int, c_void};
use std::io::{self, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::slice;

use git2_dyn_sys as sys;

use crate::encoding;
use crate::error::{Error, Result};
use crate::exports;
use crate::types::Oid;
use crate::{Object, Repository};

impl Repository {
    /// Write the file at `path` (anywhere on disk) into the object database.
    pub fn blob_from_disk(&self, path: impl AsRef<Path>) -> Result<Oid> {
        let path = encoding::path_to_c(path.as_ref())?;
        let mut id = Oid::default();
        self.call_checked(&exports::git_blob_create_fromdisk, |f, repo| unsafe {
            f(&raw mut id.0, repo, path.as_ptr())
        })?;
        Ok(id)
    }

    /// Write a file from the working directory into the object database.
    pub fn blob_from_workdir(&self, relative_path: impl AsRef<Path>) -> Result<Oid> {
        let path = encoding::path_to_c(relative_path.as_ref())?;
        let mut id = Oid::default();
        self.call_checked(&exports::git_blob_create_fromworkdir, |f, repo| unsafe {
            f(&raw mut id.0, repo, path.as_ptr())
        })?;
        Ok(id)
    }

    /// Write a blob whose content the library pulls from `source` in chunks.
    ///
    /// `hint_path` selects filters (line endings) as if the content lived there.
    pub fn blob_from_chunks(&self, hint_path: Option<&Path>, source: &mut dyn Read) -> Result<Oid> {
        let hint = hint_path.map(encoding::path_to_c).transpose()?;
        let mut chunks = ChunkSource {
            source,
            failure: None,
        };
        let payload = (&raw mut chunks).cast::<c_void>();
        let mut id = Oid::default();
        let rc = self.call(&exports::git_blob_create_fromchunks, |f, repo| unsafe {
            f(
                &raw mut id.0,
                repo,
                encoding::c_str_ptr(&hint),
                Some(chunk_cb),
                payload,
            )
        })?;
        match chunks.failure {
            Some(ChunkFailure::Io(e)) => Err(Error::Callback(format!("reading blob content: {e}"))),
            Some(ChunkFailure::Panicked(payload)) => panic::resume_unwind(payload),
            None => self.runtime().check(rc).map(|_| id),
        }
    }
}

enum ChunkFailure {
    Io(io::Error),
    Panicked(Box<dyn Any + Send>),
}

struct ChunkSource<'r> {
    source: &'r mut dyn Read,
    failure: Option<ChunkFailure>,
}

impl ChunkSource<'_> {
    fn fill(&mut self, buf: &mut [u8]) -> c_int {
        loop {
            match self.source.read(buf) {
                Ok(n) => return c_int::try_from(n).unwrap_or(c_int::MAX),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.failure = Some(ChunkFailure::Io(e));
                    return sys::GIT_EUSER;
                }
            }
        }
    }
}

unsafe extern "system" fn chunk_cb(content: *mut c_char, max_length: usize, payload: *mut c_void) -> c_int {
    let Some(chunks) = (unsafe { payload.cast::<ChunkSource<'_>>().as_mut() }) else {
        return sys::GIT_EUSER;
    };
    if chunks.failure.is_some() || content.is_null() {
        return sys::GIT_EUSER;
    }
    // Never report more than fits in the return value.
    let len = max_length.min(c_int::MAX as usize);
    let buf = unsafe { slice::from_raw_parts_mut(content.cast::<u8>(), len) };
    match panic::catch_unwind(AssertUnwindSafe(|| chunks.fill(buf))) {
        Ok(n) => n,
        Err(payload) => {
            chunks.failure = Some(ChunkFailure::Panicked(payload));
            sys::GIT_EUSER
        }
    }
}

impl Object {
    /// Raw content of a blob, copied out.
    pub fn blob_content(&self) -> Result<Vec<u8>> {
        let size = self.blob_size()?;
        let data = self.call(&exports::git_blob_rawcontent, |f, blob| unsafe { f(blob) })?;
        if size == 0 {
            return Ok(Vec::new());
        }
        if data.is_null() {
            return Err(Error::NullPointer);
        }
        let len = usize::try_from(size)
            .map_err(|_| Error::InvalidArgument(format!("blob size {size} out of range")))?;
        Ok(unsafe { slice::from_raw_parts(data.cast::<u8>(), len) }.to_vec())
    }

    /// Size of a blob in bytes.
    pub fn blob_size(&self) -> Result<u64> {
        let size = self.call(&exports::git_blob_rawsize, |f, blob| unsafe { f(blob) })?;
        u64::try_from(size).map_err(|_| self.runtime().native_error(sys::GIT_ERROR))
    }

    /// Whether the library's heuristic considers the blob binary.
    pub fn blob_is_binary(&self) -> Result<bool> {
        self.call(&exports::git_blob_is_binary, |f, blob| unsafe { f(blob) })
            .map(|rc| rc != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drives the chunk callback the way the native side does.
    fn pull_all(source: &mut dyn Read, chunk: usize) -> (Vec<u8>, c_int, Option<ChunkFailure>) {
        let mut chunks = ChunkSource {
            source,
            failure: None,
        };
        let payload = (&raw mut chunks).cast::<c_void>();
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = unsafe { chunk_cb(buf.as_mut_ptr().cast(), buf.len(), payload) };
            if n <= 0 {
                return (out, n, chunks.failure);
            }
            out.extend_from_slice(&buf[..usize::try_from(n).unwrap()]);
        }
    }

    #[test]
    fn chunks_reassemble_the_source() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let (out, rc, failure) = pull_all(&mut data.as_slice(), 64);
        assert_eq!(out, data);
        assert_eq!(rc, 0);
        assert!(failure.is_none());
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn read_error_stops_the_pull() {
        let (out, rc, failure) = pull_all(&mut Broken, 16);
        assert!(out.is_empty());
        assert_eq!(rc, sys::GIT_EUSER);
        assert!(matches!(failure, Some(ChunkFailure::Io(_))));
    }
}
