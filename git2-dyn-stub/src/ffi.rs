//! Core infrastructure: error channel, free counters, string and buffer helpers.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_int};
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use git2_dyn_sys as sys;

// ---------------------------------------------------------------------------
// Thread-local error
// ---------------------------------------------------------------------------

struct LastError {
    // Owns the text `raw.message` points into.
    _message: CString,
    raw: sys::git_error,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<Box<LastError>>> = const { RefCell::new(None) };
}

/// Record an error for `giterr_last`.
pub(crate) fn set_error(class: c_int, message: impl Into<String>) {
    let mut text = message.into();
    text.retain(|c| c != '\0');
    let message = CString::new(text).unwrap_or_default();
    let raw = sys::git_error {
        message: message.as_ptr().cast_mut(),
        klass: class,
    };
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = Some(Box::new(LastError {
            _message: message,
            raw,
        }));
    });
}

/// Record an error and return `code`.
pub(crate) fn fail(code: c_int, class: c_int, message: impl Into<String>) -> c_int {
    set_error(class, message);
    code
}

#[unsafe(no_mangle)]
pub extern "system" fn giterr_last() -> *const sys::git_error {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |e| &raw const e.raw)
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn giterr_set_str(error_class: c_int, string: *const c_char) {
    let text = unsafe { c_str_lossy(string) };
    set_error(error_class, text);
}

#[unsafe(no_mangle)]
pub extern "system" fn giterr_set_oom() {
    set_error(sys::GITERR_NOMEMORY, "Out of memory");
}

// ---------------------------------------------------------------------------
// Library lifetime
// ---------------------------------------------------------------------------

static THREADS: Mutex<usize> = Mutex::new(0);

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[unsafe(no_mangle)]
pub extern "system" fn git_threads_init() -> c_int {
    *lock(&THREADS) += 1;
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub extern "system" fn git_threads_shutdown() {
    let mut n = lock(&THREADS);
    *n = n.saturating_sub(1);
}

// ---------------------------------------------------------------------------
// Free counters
// ---------------------------------------------------------------------------

static FREES: Mutex<Option<HashMap<&'static str, usize>>> = Mutex::new(None);

pub(crate) fn count_free(export: &'static str) {
    *lock(&FREES).get_or_insert_with(HashMap::new).entry(export).or_default() += 1;
}

/// How many times the free export `export` has run in this process.
#[must_use]
pub fn frees(export: &str) -> usize {
    lock(&FREES)
        .as_ref()
        .and_then(|m| m.get(export).copied())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// String helpers
// ---------------------------------------------------------------------------

/// Borrowed C string as UTF-8. `None` for null or invalid text.
pub(crate) unsafe fn c_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

pub(crate) unsafe fn c_str_lossy(s: *const c_char) -> String {
    if s.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned()
}

/// A required string argument, or `GIT_ERROR` with an invalid-argument error.
pub(crate) unsafe fn arg<'a>(s: *const c_char, what: &str) -> Result<&'a str, c_int> {
    unsafe { c_str(s) }.ok_or_else(|| fail(sys::GIT_ERROR, sys::GITERR_INVALID, format!("invalid {what}")))
}

pub(crate) fn owned_c(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

/// Copy `text` plus a terminator into a caller buffer of `size` bytes.
///
/// A null buffer returns the size needed; a short one fails with `GIT_EBUFS`.
/// Returns the bytes written, terminator included.
pub(crate) unsafe fn fill(out: *mut c_char, size: usize, text: &str, class: c_int) -> c_int {
    let needed = text.len() + 1;
    let Ok(needed_rc) = c_int::try_from(needed) else {
        return fail(sys::GIT_ERROR, class, "output too large");
    };
    if out.is_null() {
        return needed_rc;
    }
    if size < needed {
        return fail(
            sys::GIT_EBUFS,
            class,
            format!("buffer of {size} bytes is too small for {needed}"),
        );
    }
    unsafe {
        ptr::copy_nonoverlapping(text.as_ptr(), out.cast::<u8>(), text.len());
        *out.add(text.len()) = 0;
    }
    needed_rc
}

// ---------------------------------------------------------------------------
// Handle helpers
// ---------------------------------------------------------------------------

/// Box `val` and store it in an out-parameter as the opaque type `R`.
pub(crate) unsafe fn write_out<T, R>(out: *mut *mut R, val: T) -> c_int {
    if out.is_null() {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null output pointer");
    }
    unsafe { *out = Box::into_raw(Box::new(val)).cast::<R>() };
    sys::GIT_OK
}

/// View an opaque pointer as the stub type behind it.
pub(crate) unsafe fn view<'a, T, R>(ptr: *mut R) -> Option<&'a mut T> {
    unsafe { ptr.cast::<T>().as_mut() }
}

/// Free a value boxed by [`write_out`].
pub(crate) unsafe fn free_boxed<T, R>(ptr: *mut R) {
    if !ptr.is_null() {
        drop(unsafe { Box::from_raw(ptr.cast::<T>()) });
    }
}

// ---------------------------------------------------------------------------
// Native buffers
// ---------------------------------------------------------------------------

/// Allocate `text` into `buf` the way the library fills a `git_buf`.
pub(crate) unsafe fn set_buf(buf: *mut sys::git_buf, text: &str) -> c_int {
    let Some(buf) = (unsafe { buf.as_mut() }) else {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null buffer");
    };
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    let bytes = bytes.into_boxed_slice();
    buf.asize = bytes.len();
    buf.size = text.len();
    buf.ptr = Box::into_raw(bytes).cast::<c_char>();
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_buf_free(buffer: *mut sys::git_buf) {
    count_free("git_buf_free");
    let Some(buf) = (unsafe { buffer.as_mut() }) else {
        return;
    };
    if !buf.ptr.is_null() {
        let slice = ptr::slice_from_raw_parts_mut(buf.ptr.cast::<u8>(), buf.asize);
        drop(unsafe { Box::from_raw(slice) });
    }
    buf.ptr = ptr::null_mut();
    buf.asize = 0;
    buf.size = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_channel_is_per_thread() {
        set_error(sys::GITERR_CONFIG, "bad value");
        let last = unsafe { &*giterr_last() };
        assert_eq!(last.klass, sys::GITERR_CONFIG);
        assert_eq!(unsafe { c_str(last.message) }, Some("bad value"));
        std::thread::spawn(|| assert!(giterr_last().is_null()))
            .join()
            .unwrap();
    }

    #[test]
    fn fill_sizes_then_rejects_short_buffers() {
        assert_eq!(unsafe { fill(ptr::null_mut(), 0, "abc", 0) }, 4);
        let mut small = [0 as c_char; 3];
        assert_eq!(unsafe { fill(small.as_mut_ptr(), 3, "abc", 0) }, sys::GIT_EBUFS);
        let mut exact = [1 as c_char; 4];
        assert_eq!(unsafe { fill(exact.as_mut_ptr(), 4, "abc", 0) }, 4);
        assert_eq!(exact[3], 0);
    }

    #[test]
    fn buffers_are_freed_once_and_counted() {
        let before = frees("git_buf_free");
        let mut buf = sys::git_buf {
            ptr: ptr::null_mut(),
            asize: 0,
            size: 0,
        };
        unsafe { set_buf(&raw mut buf, "refs/heads/x") };
        assert_eq!(buf.size, 12);
        unsafe { git_buf_free(&raw mut buf) };
        assert!(buf.ptr.is_null());
        assert!(frees("git_buf_free") > before);
    }
}
