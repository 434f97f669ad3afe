#![allow(unsafe_code)]
//! Bridge between native enumeration callbacks and Rust visitors.
//!
//! A native `foreach` export takes a C function pointer plus an opaque
//! payload. [`enumerate`] puts a [`Bridge`] on the stack, passes its address
//! as the payload and drives the call; a per-export trampoline turns the raw
//! arguments into a typed item and calls [`deliver`]. The bridge lives exactly
//! as long as the native call.
//!
//! Visitors return [`ControlFlow`]: `Break(code)` stops the enumeration and
//! `code` becomes the native callback's return value. A panicking visitor or
//! an undecodable item also stops it (with `GIT_EUSER`); the panic resumes on
//! the calling thread after the native call has unwound.

use std::any::Any;
use std::ffi::{c_int, c_void};
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};

use git2_dyn_sys as sys;
use tracing::error;

use crate::error::{Error, Result};
use crate::runtime::Runtime;

enum Interrupt {
    Visitor(c_int),
    Failed(Error),
    Panicked(Box<dyn Any + Send>),
}

/// Per-call state shared with a trampoline through the payload pointer.
pub(crate) struct Bridge<'v, T> {
    visitor: &'v mut dyn FnMut(T) -> ControlFlow<i32>,
    interrupt: Option<Interrupt>,
}

impl<T> Bridge<'_, T> {
    fn stopped_with(&self) -> Option<c_int> {
        match self.interrupt {
            None => None,
            Some(Interrupt::Visitor(code)) => Some(code),
            Some(_) => Some(sys::GIT_EUSER),
        }
    }

    fn offer(&mut self, decode: impl FnOnce() -> Result<T>) -> c_int {
        if let Some(code) = self.stopped_with() {
            return code;
        }
        let item = match decode() {
            Ok(item) => item,
            Err(e) => {
                self.interrupt = Some(Interrupt::Failed(e));
                return sys::GIT_EUSER;
            }
        };
        match panic::catch_unwind(AssertUnwindSafe(|| (self.visitor)(item))) {
            Ok(ControlFlow::Continue(())) => 0,
            Ok(ControlFlow::Break(code)) => {
                let code = if code == 0 { sys::GIT_EUSER } else { code };
                self.interrupt = Some(Interrupt::Visitor(code));
                code
            }
            Err(payload) => {
                self.interrupt = Some(Interrupt::Panicked(payload));
                sys::GIT_EUSER
            }
        }
    }

    fn finish(self, rt: &Runtime, rc: c_int) -> Result<ControlFlow<i32>> {
        match self.interrupt {
            Some(Interrupt::Visitor(code)) => Ok(ControlFlow::Break(code)),
            Some(Interrupt::Failed(e)) => Err(e),
            Some(Interrupt::Panicked(payload)) => panic::resume_unwind(payload),
            None => rt.check(rc).map(|_| ControlFlow::Continue(())),
        }
    }
}

/// Run a native enumeration, delivering each item to `visitor`.
///
/// `start` receives the payload pointer to hand to the export together with
/// the matching trampoline.
pub(crate) fn enumerate<T>(
    rt: &Runtime,
    mut visitor: impl FnMut(T) -> ControlFlow<i32>,
    start: impl FnOnce(*mut c_void) -> Result<c_int>,
) -> Result<ControlFlow<i32>> {
    let mut bridge = Bridge {
        visitor: &mut visitor,
        interrupt: None,
    };
    let rc = start((&raw mut bridge).cast::<c_void>())?;
    bridge.finish(rt, rc)
}

/// Hand one item to the bridge behind `payload`. Called from trampolines.
///
/// # Safety
/// `payload` must be the pointer [`enumerate`] passed to the native call for
/// a bridge of item type `T`, and that call must still be running.
pub(crate) unsafe fn deliver<T>(payload: *mut c_void, decode: impl FnOnce() -> Result<T>) -> c_int {
    let Some(bridge) = (unsafe { payload.cast::<Bridge<'_, T>>().as_mut() }) else {
        error!("callback invoked without a payload");
        return sys::GIT_EUSER;
    };
    match panic::catch_unwind(AssertUnwindSafe(|| bridge.offer(decode))) {
        Ok(rc) => rc,
        Err(payload) => {
            bridge.interrupt = Some(Interrupt::Panicked(payload));
            sys::GIT_EUSER
        }
    }
}

/// Collect every item of an enumeration.
pub(crate) fn collect<T>(
    run: impl FnOnce(&mut dyn FnMut(T) -> ControlFlow<i32>) -> Result<ControlFlow<i32>>,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    run(&mut |item| {
        items.push(item);
        ControlFlow::Continue(())
    })?;
    Ok(items)
}

/// Run `f` for a callback registered for longer than one call; a panic is
/// logged and turned into `fallback` since there is no caller to resume it on.
pub(crate) fn guarded<R>(what: &str, fallback: R, f: impl FnOnce() -> R) -> R {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string panic");
        error!(callback = what, panic = msg, "callback panicked");
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;

    /// Simulates a native foreach over `0..n` that honors the callback result.
    fn native_foreach(n: i32, payload: *mut c_void) -> c_int {
        for i in 0..n {
            let rc = unsafe { deliver::<i32>(payload, || Ok(i)) };
            if rc != 0 {
                return rc;
            }
        }
        0
    }

    #[test]
    fn visits_everything_when_not_stopped() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let mut seen = Vec::new();
        let flow = enumerate(
            rt,
            |i: i32| {
                seen.push(i);
                ControlFlow::Continue(())
            },
            |payload| Ok(native_foreach(5, payload)),
        )
        .unwrap();
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(seen, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn abort_at_k_stops_and_propagates_code() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        for k in 0..4 {
            let mut seen = 0;
            let flow = enumerate(
                rt,
                |i: i32| {
                    seen += 1;
                    if i == k { ControlFlow::Break(42) } else { ControlFlow::Continue(()) }
                },
                |payload| Ok(native_foreach(10, payload)),
            )
            .unwrap();
            assert_eq!(flow, ControlFlow::Break(42));
            assert_eq!(seen, k + 1);
        }
    }

    #[test]
    fn break_zero_still_stops() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let mut seen = 0;
        let flow = enumerate(
            rt,
            |_: i32| {
                seen += 1;
                ControlFlow::Break(0)
            },
            |payload| Ok(native_foreach(3, payload)),
        )
        .unwrap();
        assert_eq!(flow, ControlFlow::Break(sys::GIT_EUSER));
        assert_eq!(seen, 1);
    }

    #[test]
    fn nothing_is_delivered_after_abort_even_if_native_continues() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let mut seen = 0;
        let _ = enumerate(
            rt,
            |_: i32| {
                seen += 1;
                ControlFlow::Break(1)
            },
            |payload| {
                for i in 0..3 {
                    unsafe { deliver::<i32>(payload, || Ok(i)) };
                }
                Ok(0)
            },
        );
        assert_eq!(seen, 1);
    }

    #[test]
    fn decode_failure_surfaces_as_error() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let err = enumerate(
            rt,
            |_: i32| ControlFlow::Continue(()),
            |payload| Ok(unsafe { deliver::<i32>(payload, || Err(Error::InvalidUtf8)) }),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8));
    }

    #[test]
    fn visitor_panic_resumes_after_native_call() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let mut native_returned = false;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            enumerate(
                rt,
                |_: i32| -> ControlFlow<i32> { panic!("boom") },
                |payload| {
                    let rc = native_foreach(3, payload);
                    native_returned = true;
                    Ok(rc)
                },
            )
        }));
        assert!(result.is_err());
        assert!(native_returned);
    }

    #[test]
    fn guarded_swallows_panics() {
        assert_eq!(guarded("test", -1, || 7), 7);
        assert_eq!(guarded("test", -1, || -> i32 { panic!("nope") }), -1);
    }
}
