#![allow(unsafe_code)]
//! Unified error type and the native error channel.

use std::ffi::{CStr, c_int};

use git2_dyn_sys as sys;

use crate::encoding;
use crate::exports;
use crate::handle::ResourceKind;
use crate::runtime::Runtime;
use crate::types::{ErrorClass, ErrorCode};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the binding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A native call returned a negative code.
    #[error("libgit2 error {code} (class {class}): {message}")]
    Native {
        /// Raw return code.
        code: i32,
        /// Raw error class recorded by the library, `0` if none.
        class: i32,
        /// Message recorded by the library.
        message: String,
    },

    /// The native module could not be loaded.
    #[error("failed to load {path}: {reason}")]
    LibraryLoad {
        /// Module that was attempted.
        path: String,
        /// Loader diagnostic.
        reason: String,
    },

    /// The module is loaded but lacks the export.
    #[error("export `{symbol}` not found in native module")]
    SymbolNotFound {
        /// Name looked up, after decoration.
        symbol: String,
    },

    /// A returned pointer was unexpectedly null.
    #[error("unexpected null pointer from native call")]
    NullPointer,

    /// A native string contained invalid UTF-8.
    #[error("invalid UTF-8 in native string")]
    InvalidUtf8,

    /// A string passed in or read back contained a NUL byte.
    #[error("string contains an interior NUL byte")]
    InteriorNul,

    /// A fill buffer held no terminator within its capacity.
    #[error("native output does not fit in {capacity} bytes")]
    BufferTooSmall {
        /// Capacity handed to the native call.
        capacity: usize,
    },

    /// The handle was already released.
    #[error("{kind} handle used after release")]
    Released {
        /// Resource kind of the handle.
        kind: ResourceKind,
    },

    /// Shutdown refused because handles are still live or calls are in flight.
    #[error("cannot shut down: {live} native handle(s) still live, {calls} call(s) in flight")]
    ShutdownBusy {
        /// Live handle count at the time of the request.
        live: usize,
        /// Native calls in progress at the time of the request.
        calls: usize,
    },

    /// [`init`](crate::init) was called after the runtime already existed.
    #[error("runtime already initialized")]
    AlreadyInitialized,

    /// An argument was invalid.
    #[error("{0}")]
    InvalidArgument(String),

    /// A callback could not hand its item to the caller.
    #[error("callback: {0}")]
    Callback(String),
}

impl Error {
    /// Native return code, when this error came from a native call.
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Native { code, .. } => ErrorCode::from_ffi(*code),
            _ => None,
        }
    }

    /// Native error class, when known.
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Native { class, .. } => ErrorClass::from_ffi(*class),
            _ => None,
        }
    }

    /// Whether this is a native "not found" result.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }
}

/// The most recent error recorded by the native library on this thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Raw error class.
    pub class: i32,
    /// Message text.
    pub message: String,
}

impl ErrorRecord {
    /// Error class, if it is a known one.
    #[must_use]
    pub fn class(&self) -> Option<ErrorClass> {
        ErrorClass::from_ffi(self.class)
    }
}

impl Runtime {
    /// Read the last native error on this thread. `None` if nothing is recorded.
    pub fn last_error(&self) -> Result<Option<ErrorRecord>> {
        let ptr = self.call(&exports::giterr_last, |f| unsafe { f() })?;
        if ptr.is_null() {
            return Ok(None);
        }
        let raw = unsafe { &*ptr };
        let message = if raw.message.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(raw.message) }
                .to_string_lossy()
                .into_owned()
        };
        Ok(Some(ErrorRecord {
            class: raw.klass,
            message,
        }))
    }

    /// Record an error message in the native channel.
    pub fn set_error(&self, class: ErrorClass, message: &str) -> Result<()> {
        let message = encoding::to_c_string(message)?;
        self.call(&exports::giterr_set_str, |f| unsafe {
            f(class.to_ffi(), message.as_ptr());
        })
    }

    /// Record an out-of-memory condition in the native channel.
    pub fn set_oom(&self) -> Result<()> {
        self.call(&exports::giterr_set_oom, |f| unsafe { f() })
    }

    /// Build the error for a failed return code from the native channel.
    pub(crate) fn native_error(&self, code: c_int) -> Error {
        match self.last_error() {
            Ok(Some(record)) => Error::Native {
                code,
                class: record.class,
                message: record.message,
            },
            Ok(None) => Error::Native {
                code,
                class: 0,
                message: "no error message recorded".into(),
            },
            Err(e) => e,
        }
    }

    /// Check a native return code. Negative = failure.
    #[inline]
    pub(crate) fn check(&self, rc: c_int) -> Result<c_int> {
        if rc < sys::GIT_OK {
            Err(self.native_error(rc))
        } else {
            Ok(rc)
        }
    }

    /// Like [`check`](Self::check), mapping `GIT_ENOTFOUND` to `None`.
    pub(crate) fn check_found(&self, rc: c_int) -> Result<Option<c_int>> {
        if rc == sys::GIT_ENOTFOUND {
            Ok(None)
        } else {
            self.check(rc).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;

    #[test]
    fn recorded_error_reaches_failed_calls() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        rt.set_error(ErrorClass::Config, "section missing").unwrap();
        let record = rt.last_error().unwrap().unwrap();
        assert_eq!(record.class(), Some(ErrorClass::Config));
        assert_eq!(record.message, "section missing");
        let err = rt.check(sys::GIT_EEXISTS).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Exists));
        assert!(err.to_string().contains("section missing"));
    }

    #[test]
    fn out_of_memory_has_its_own_class() {
        let rt = stub_runtime(ResolvePolicy::PerCall);
        rt.set_oom().unwrap();
        let record = rt.last_error().unwrap().unwrap();
        assert_eq!(record.class(), Some(ErrorClass::NoMemory));
    }

    #[test]
    fn not_found_is_optional() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        assert_eq!(rt.check_found(sys::GIT_ENOTFOUND).unwrap(), None);
        assert_eq!(rt.check_found(3).unwrap(), Some(3));
    }
}
