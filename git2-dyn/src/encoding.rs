#![allow(unsafe_code)]
//! Conversion between Rust strings / paths and the native encoding.
//!
//! The library speaks NUL-terminated UTF-8. Text crossing the boundary is
//! copied in both directions; nothing returned from here borrows native
//! memory. Output comes in three shapes:
//!
//! - **borrowed**: a pointer into memory owned by another native object,
//!   copied out immediately ([`borrowed_str`]);
//! - **filled**: a caller-allocated [`FillBuffer`] the library writes into;
//! - **native-owned**: a `git_buf` the library allocates, released through
//!   the `git_buf_free` export after copying ([`Runtime::take_buf`]).

use std::ffi::{CStr, CString, c_char};
use std::path::{Path, PathBuf};
use std::ptr;

use git2_dyn_sys as sys;

use crate::error::{Error, Result};
use crate::exports;
use crate::runtime::Runtime;

/// Encode text for the native side: UTF-8 bytes plus a terminating NUL.
///
/// Fails with [`Error::InteriorNul`] if `s` contains a NUL byte.
pub fn encode(s: &str) -> Result<Vec<u8>> {
    Ok(to_c_string(s)?.into_bytes_with_nul())
}

/// Decode native bytes (without terminator) into a `String`.
///
/// Rejects embedded NUL bytes and invalid UTF-8.
pub fn decode(bytes: &[u8]) -> Result<String> {
    if bytes.contains(&0) {
        return Err(Error::InteriorNul);
    }
    std::str::from_utf8(bytes)
        .map(String::from)
        .map_err(|_| Error::InvalidUtf8)
}

/// Convert `&str` to `CString` for a native call.
pub(crate) fn to_c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InteriorNul)
}

/// Convert an optional `&str`; `None` stays `None` and is passed as null.
pub(crate) fn optional_c_string(s: Option<&str>) -> Result<Option<CString>> {
    s.map(to_c_string).transpose()
}

/// Pointer for an optional `CString`, null when absent.
#[inline]
pub(crate) fn c_str_ptr(s: &Option<CString>) -> *const c_char {
    s.as_ref().map_or(ptr::null(), |c| c.as_ptr())
}

/// Encode a filesystem path.
///
/// On unix the OS bytes are passed through. On Windows the path must be valid
/// Unicode and separators are normalized to `/`.
pub(crate) fn path_to_c(path: &Path) -> Result<CString> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        CString::new(path.as_os_str().as_bytes()).map_err(|_| Error::InteriorNul)
    }
    #[cfg(not(unix))]
    {
        let s = path
            .to_str()
            .ok_or_else(|| Error::InvalidArgument(format!("path is not valid Unicode: {path:?}")))?;
        to_c_string(&s.replace('\\', "/"))
    }
}

/// Decode a native path (without terminator).
pub(crate) fn path_from_bytes(bytes: &[u8]) -> Result<PathBuf> {
    if bytes.contains(&0) {
        return Err(Error::InteriorNul);
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Ok(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
    }
    #[cfg(not(unix))]
    {
        decode(bytes).map(PathBuf::from)
    }
}

/// Copy a **borrowed** native string. `None` for null. Does NOT free anything.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string that stays valid
/// for the duration of this call.
pub(crate) unsafe fn borrowed_str(ptr: *const c_char) -> Result<Option<String>> {
    if ptr.is_null() {
        return Ok(None);
    }
    decode(unsafe { CStr::from_ptr(ptr) }.to_bytes()).map(Some)
}

/// Like [`borrowed_str`], but null is an error.
///
/// # Safety
/// See [`borrowed_str`].
pub(crate) unsafe fn borrowed_str_required(ptr: *const c_char) -> Result<String> {
    unsafe { borrowed_str(ptr) }?.ok_or(Error::NullPointer)
}

/// Copy a borrowed native path. `None` for null.
///
/// # Safety
/// See [`borrowed_str`].
pub(crate) unsafe fn borrowed_path(ptr: *const c_char) -> Result<Option<PathBuf>> {
    if ptr.is_null() {
        return Ok(None);
    }
    path_from_bytes(unsafe { CStr::from_ptr(ptr) }.to_bytes()).map(Some)
}

/// Copy `len` bytes of borrowed, unterminated native text.
///
/// # Safety
/// `ptr` must be null (with `len == 0`) or valid for `len` bytes.
pub(crate) unsafe fn borrowed_text(ptr: *const c_char, len: usize) -> Result<String> {
    if ptr.is_null() || len == 0 {
        return Ok(String::new());
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };
    decode(bytes)
}

/// Caller-allocated buffer the native side writes a NUL-terminated string into.
#[derive(Debug)]
pub struct FillBuffer {
    bytes: Vec<u8>,
}

impl FillBuffer {
    /// Zeroed buffer of `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
        }
    }

    /// Buffer sized for the longest path the library produces.
    #[must_use]
    pub fn for_path() -> Self {
        Self::with_capacity(sys::GIT_PATH_MAX)
    }

    /// Capacity in bytes, including room for the terminator.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut c_char {
        self.bytes.as_mut_ptr().cast()
    }

    fn filled(&self) -> Result<&[u8]> {
        let end = self
            .bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or(Error::BufferTooSmall {
                capacity: self.capacity(),
            })?;
        Ok(&self.bytes[..end])
    }

    /// Text up to the first NUL.
    pub fn read_string(&self) -> Result<String> {
        decode(self.filled()?)
    }

    /// Path up to the first NUL.
    pub fn read_path(&self) -> Result<PathBuf> {
        path_from_bytes(self.filled()?)
    }
}

impl Runtime {
    /// Copy a native-owned `git_buf` and release it through `git_buf_free`.
    ///
    /// The buffer is released even when decoding fails.
    pub(crate) fn take_buf(&self, buf: &mut sys::git_buf) -> Result<String> {
        let text = if buf.ptr.is_null() {
            Ok(String::new())
        } else {
            unsafe { borrowed_text(buf.ptr, buf.size) }
        };
        self.call(&exports::git_buf_free, |f| unsafe { f(buf) })?;
        text
    }
}

/// An empty `git_buf` for the native side to allocate into.
pub(crate) const fn empty_buf() -> sys::git_buf {
    sys::git_buf {
        ptr: ptr::null_mut(),
        asize: 0,
        size: 0,
    }
}

/// Owned `git_strarray` view over a list of strings. The array borrows `self`.
#[derive(Debug)]
pub(crate) struct StrArray {
    strings: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

impl StrArray {
    pub(crate) fn new<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        let strings = items
            .iter()
            .map(|s| to_c_string(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let ptrs = strings.iter().map(|s| s.as_ptr().cast_mut()).collect();
        Ok(Self { strings, ptrs })
    }

    pub(crate) fn raw(&mut self) -> sys::git_strarray {
        debug_assert_eq!(self.strings.len(), self.ptrs.len());
        if self.ptrs.is_empty() {
            return sys::git_strarray {
                strings: ptr::null_mut(),
                count: 0,
            };
        }
        sys::git_strarray {
            strings: self.ptrs.as_mut_ptr(),
            count: self.ptrs.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_appends_terminator() {
        assert_eq!(encode("héllo").unwrap(), "héllo\0".as_bytes());
        assert_eq!(encode("").unwrap(), b"\0");
    }

    #[test]
    fn nul_is_rejected_both_ways() {
        assert!(matches!(encode("a\0b"), Err(Error::InteriorNul)));
        assert!(matches!(decode(b"a\0b"), Err(Error::InteriorNul)));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert!(matches!(decode(&[0xff, 0xfe]), Err(Error::InvalidUtf8)));
    }

    #[test]
    fn borrowed_null_is_none() {
        assert!(unsafe { borrowed_str(ptr::null()) }.unwrap().is_none());
        assert!(matches!(
            unsafe { borrowed_str_required(ptr::null()) },
            Err(Error::NullPointer)
        ));
    }

    #[test]
    fn fill_buffer_without_terminator_is_too_small() {
        let mut buf = FillBuffer::with_capacity(4);
        unsafe { ptr::copy_nonoverlapping(b"abcd".as_ptr(), buf.as_mut_ptr().cast(), 4) };
        assert!(matches!(
            buf.read_string(),
            Err(Error::BufferTooSmall { capacity: 4 })
        ));
    }

    #[test]
    fn fill_buffer_reads_up_to_nul() {
        let mut buf = FillBuffer::with_capacity(8);
        unsafe { ptr::copy_nonoverlapping(b"ab\0cd".as_ptr(), buf.as_mut_ptr().cast(), 5) };
        assert_eq!(buf.read_string().unwrap(), "ab");
        assert_eq!(buf.read_path().unwrap(), PathBuf::from("ab"));
    }

    #[test]
    fn str_array_points_at_owned_strings() {
        let mut arr = StrArray::new(&["a", "bc"]).unwrap();
        let raw = arr.raw();
        assert_eq!(raw.count, 2);
        let second = unsafe { CStr::from_ptr(*raw.strings.add(1)) };
        assert_eq!(second.to_str().unwrap(), "bc");
        assert!(StrArray::new::<&str>(&[]).unwrap().raw().strings.is_null());
    }

    #[cfg(unix)]
    #[test]
    fn unix_paths_pass_os_bytes_through() {
        use std::os::unix::ffi::OsStrExt;
        let path = Path::new(std::ffi::OsStr::from_bytes(b"dir/\xffname"));
        let c = path_to_c(path).unwrap();
        assert_eq!(c.as_bytes(), b"dir/\xffname");
        assert_eq!(path_from_bytes(c.as_bytes()).unwrap(), path);
    }

    proptest! {
        #[test]
        fn text_without_nul_round_trips(s in "[^\u{0}]*") {
            let bytes = encode(&s).unwrap();
            prop_assert_eq!(bytes.last(), Some(&0));
            prop_assert_eq!(decode(&bytes[..bytes.len() - 1]).unwrap(), s);
        }

        #[test]
        fn text_with_nul_is_rejected(a in ".*", b in ".*") {
            let s = format!("{a}\0{b}");
            prop_assert!(encode(&s).is_err());
        }
    }
}
