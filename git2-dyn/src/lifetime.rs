#![allow(unsafe_code)]
//! Native library lifetime: one-time initialization, live-handle accounting
//! and deferred shutdown.
//!
//! The handle state is a single atomic word: the top bit records whether
//! `git_threads_init` has run, the next marks a shutdown in progress, the rest
//! counts live owned handles. A handle takes its [`LifetimeToken`] *before* the
//! native constructor runs, so the library can never be torn down between
//! construction and registration. Unowned calls hold a [`CallGuard`] for the
//! duration of the native call; shutdown refuses rather than waits while any
//! are in flight, and the last one out completes a requested shutdown.
//! Transitions that call into the library serialize on one mutex; acquiring
//! and releasing tokens on an initialized library never blocks.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use git2_dyn_sys as sys;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::exports;
use crate::resolver::Resolver;
use crate::runtime::Runtime;

const INITIALIZED: usize = 1 << (usize::BITS - 1);
const SHUTTING_DOWN: usize = 1 << (usize::BITS - 2);
const COUNT: usize = !(INITIALIZED | SHUTTING_DOWN);

const fn usable(s: usize) -> bool {
    s & (INITIALIZED | SHUTTING_DOWN) == INITIALIZED
}

/// Observable state of the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// `git_threads_init` has not run (or shutdown completed).
    Uninitialized,
    /// Initialized, with this many live owned handles.
    Initialized {
        /// Live owned handles.
        live: usize,
    },
}

pub(crate) struct Lifetime {
    state: AtomicUsize,
    calls: AtomicUsize,
    transition: Mutex<()>,
    shutdown_requested: AtomicBool,
    inits: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("phase", &self.phase())
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .field("shutdown_requested", &self.shutdown_requested.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Lifetime {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            transition: Mutex::new(()),
            shutdown_requested: AtomicBool::new(false),
            inits: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// A shutdown in progress still reads as initialized.
    pub(crate) fn phase(&self) -> Phase {
        let s = self.state.load(Ordering::SeqCst);
        if s & INITIALIZED == 0 {
            Phase::Uninitialized
        } else {
            Phase::Initialized { live: s & COUNT }
        }
    }

    pub(crate) fn live(&self) -> usize {
        self.state.load(Ordering::SeqCst) & COUNT
    }

    /// How many times the library was initialized and shut down.
    pub(crate) fn transitions(&self) -> (usize, usize) {
        (
            self.inits.load(Ordering::SeqCst),
            self.shutdowns.load(Ordering::SeqCst),
        )
    }

    /// Run `git_threads_init` if it has not run yet. Waits out a shutdown in
    /// progress.
    pub(crate) fn ensure_initialized(&self, resolver: &Resolver) -> Result<()> {
        if usable(self.state.load(Ordering::SeqCst)) {
            return Ok(());
        }
        let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
        // Shutdown holds the lock for as long as its bit is set.
        if self.state.load(Ordering::SeqCst) & INITIALIZED != 0 {
            return Ok(());
        }
        let rc = resolver.invoke(&exports::git_threads_init, |f| unsafe { f() })?;
        if rc < sys::GIT_OK {
            error!(rc, "git_threads_init failed");
            return Err(Error::Native {
                code: rc,
                class: sys::GITERR_THREAD,
                message: "git_threads_init failed".into(),
            });
        }
        self.inits.fetch_add(1, Ordering::SeqCst);
        self.state.store(INITIALIZED, Ordering::SeqCst);
        info!(module = %resolver.describe(), "native library initialized");
        Ok(())
    }

    /// Count one more live handle, initializing first if needed.
    pub(crate) fn acquire(&self, resolver: &Resolver) -> Result<()> {
        loop {
            let s = self.state.load(Ordering::SeqCst);
            if !usable(s) {
                self.ensure_initialized(resolver)?;
                continue;
            }
            if self
                .state
                .compare_exchange_weak(s, s + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    /// Count one fewer live handle. The last release after a shutdown request
    /// performs the shutdown.
    pub(crate) fn release(&self, resolver: &Resolver) {
        let prev = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                (s & COUNT != 0).then(|| s - 1)
            });
        match prev {
            Ok(prev) if prev & COUNT == 1 => {
                self.complete_requested_shutdown(resolver, "last handle released");
            }
            Ok(_) => {}
            Err(_) => error!("lifetime token released with no live handles"),
        }
    }

    /// Register a native call in flight, initializing first if needed.
    pub(crate) fn enter<'a>(&'a self, resolver: &'a Resolver) -> Result<CallGuard<'a>> {
        loop {
            // Announce before checking; shutdown sets its bit before counting.
            self.calls.fetch_add(1, Ordering::SeqCst);
            let guard = CallGuard { lifetime: self, resolver };
            if usable(self.state.load(Ordering::SeqCst)) {
                return Ok(guard);
            }
            drop(guard);
            self.ensure_initialized(resolver)?;
        }
    }

    fn exit(&self, resolver: &Resolver) {
        if self.calls.fetch_sub(1, Ordering::SeqCst) == 1 && self.live() == 0 {
            self.complete_requested_shutdown(resolver, "last call returned");
        }
    }

    fn complete_requested_shutdown(&self, resolver: &Resolver, trigger: &'static str) {
        if !self.shutdown_requested.load(Ordering::SeqCst) {
            return;
        }
        debug!(trigger, "completing deferred shutdown");
        if let Err(e) = self.try_shutdown(resolver) {
            debug!(error = %e, "deferred shutdown skipped");
        }
    }

    /// Shut down now if no handle is live and no call is in flight.
    ///
    /// The state reads initialized until `git_threads_shutdown` returns; a
    /// failed shutdown leaves the library initialized.
    pub(crate) fn try_shutdown(&self, resolver: &Resolver) -> Result<()> {
        let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(s) = self.state.compare_exchange(
            INITIALIZED,
            INITIALIZED | SHUTTING_DOWN,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            if s & INITIALIZED == 0 {
                self.shutdown_requested.store(false, Ordering::SeqCst);
                return Ok(());
            }
            return Err(Error::ShutdownBusy {
                live: s & COUNT,
                calls: self.calls.load(Ordering::SeqCst),
            });
        }
        let calls = self.calls.load(Ordering::SeqCst);
        if calls != 0 {
            self.state.store(INITIALIZED, Ordering::SeqCst);
            return Err(Error::ShutdownBusy { live: 0, calls });
        }
        self.shutdown_requested.store(false, Ordering::SeqCst);
        if let Err(e) = resolver.invoke(&exports::git_threads_shutdown, |f| unsafe { f() }) {
            self.state.store(INITIALIZED, Ordering::SeqCst);
            error!(error = %e, "git_threads_shutdown could not be called; library stays initialized");
            return Err(e);
        }
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.state.store(0, Ordering::SeqCst);
        info!("native library shut down");
        Ok(())
    }

    /// Shut down now, or as soon as the last live handle or call is done.
    pub(crate) fn request_shutdown(&self, resolver: &Resolver) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        match self.try_shutdown(resolver) {
            Ok(()) => {}
            Err(Error::ShutdownBusy { live, calls }) => {
                warn!(live, calls, "library still in use; shutdown deferred until it is released");
            }
            Err(e) => error!(error = %e, "native shutdown failed"),
        }
    }
}

/// One native call in flight. Dropping it unregisters the call.
pub(crate) struct CallGuard<'a> {
    lifetime: &'a Lifetime,
    resolver: &'a Resolver,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.lifetime.exit(self.resolver);
    }
}

/// Proof that one live handle is registered. Dropping it unregisters.
pub(crate) struct LifetimeToken {
    rt: &'static Runtime,
}

impl LifetimeToken {
    pub(crate) fn acquire(rt: &'static Runtime) -> Result<Self> {
        rt.lifetime.acquire(&rt.resolver)?;
        Ok(Self { rt })
    }

    pub(crate) const fn runtime(&self) -> &'static Runtime {
        self.rt
    }
}

impl Drop for LifetimeToken {
    fn drop(&mut self) {
        self.rt.lifetime.release(&self.rt.resolver);
    }
}

impl fmt::Debug for LifetimeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeToken").finish_non_exhaustive()
    }
}

/// Returned by [`init`](crate::init). Dropping it requests shutdown; if
/// handles are still live, the last one released completes it.
#[must_use = "dropping the guard requests native shutdown"]
pub struct LibraryGuard {
    pub(crate) rt: &'static Runtime,
}

impl LibraryGuard {
    /// The runtime this guard belongs to.
    #[must_use]
    pub const fn runtime(&self) -> &'static Runtime {
        self.rt
    }
}

impl Drop for LibraryGuard {
    fn drop(&mut self) {
        self.rt.lifetime.request_shutdown(&self.rt.resolver);
    }
}

impl fmt::Debug for LibraryGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryGuard")
            .field("phase", &self.rt.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{counting_runtime, inits_and_shutdowns, stub_runtime_without};
    use proptest::prelude::*;

    #[test]
    fn first_token_initializes_once() {
        let rt = counting_runtime();
        assert_eq!(rt.phase(), Phase::Uninitialized);
        let a = LifetimeToken::acquire(rt).unwrap();
        let b = LifetimeToken::acquire(rt).unwrap();
        assert_eq!(rt.phase(), Phase::Initialized { live: 2 });
        assert_eq!(inits_and_shutdowns(rt), (1, 0));
        drop((a, b));
        assert_eq!(rt.live_handles(), 0);
    }

    #[test]
    fn shutdown_refused_while_live() {
        let rt = counting_runtime();
        let token = LifetimeToken::acquire(rt).unwrap();
        assert!(matches!(rt.shutdown(), Err(Error::ShutdownBusy { live: 1, .. })));
        drop(token);
        rt.shutdown().unwrap();
        assert_eq!(rt.phase(), Phase::Uninitialized);
        assert_eq!(inits_and_shutdowns(rt), (1, 1));
    }

    #[test]
    fn shutdown_when_uninitialized_is_a_no_op() {
        let rt = counting_runtime();
        rt.shutdown().unwrap();
        assert_eq!(inits_and_shutdowns(rt), (0, 0));
    }

    #[test]
    fn requested_shutdown_completes_on_last_release() {
        let rt = counting_runtime();
        let a = LifetimeToken::acquire(rt).unwrap();
        let b = LifetimeToken::acquire(rt).unwrap();
        drop(LibraryGuard { rt });
        assert_eq!(rt.phase(), Phase::Initialized { live: 2 });
        drop(a);
        assert_eq!(inits_and_shutdowns(rt), (1, 0));
        drop(b);
        assert_eq!(rt.phase(), Phase::Uninitialized);
        assert_eq!(inits_and_shutdowns(rt), (1, 1));
    }

    #[test]
    fn request_on_an_uninitialized_library_does_not_linger() {
        let rt = counting_runtime();
        drop(LibraryGuard { rt });
        rt.call(&exports::giterr_last, |_| ()).unwrap();
        assert_eq!(rt.phase(), Phase::Initialized { live: 0 });
        assert_eq!(inits_and_shutdowns(rt), (1, 0));
    }

    #[test]
    fn library_reinitializes_after_shutdown() {
        let rt = counting_runtime();
        drop(LifetimeToken::acquire(rt).unwrap());
        rt.shutdown().unwrap();
        let token = LifetimeToken::acquire(rt).unwrap();
        assert_eq!(inits_and_shutdowns(rt), (2, 1));
        drop(token);
    }

    #[test]
    fn failed_shutdown_keeps_the_library_initialized() {
        let rt = stub_runtime_without(&["git_threads_shutdown"]);
        drop(LifetimeToken::acquire(rt).unwrap());
        let err = rt.shutdown().unwrap_err();
        assert!(matches!(err, Error::SymbolNotFound { ref symbol } if symbol == "git_threads_shutdown"));
        assert_eq!(rt.phase(), Phase::Initialized { live: 0 });

        let token = LifetimeToken::acquire(rt).unwrap();
        assert_eq!(rt.phase(), Phase::Initialized { live: 1 });
        assert_eq!(inits_and_shutdowns(rt), (1, 0));
        drop(token);
    }

    #[test]
    fn failed_deferred_shutdown_is_not_retried_on_every_release() {
        let rt = stub_runtime_without(&["git_threads_shutdown"]);
        let token = LifetimeToken::acquire(rt).unwrap();
        drop(LibraryGuard { rt });
        drop(token);
        assert_eq!(rt.phase(), Phase::Initialized { live: 0 });
        assert!(!rt.lifetime.shutdown_requested.load(Ordering::SeqCst));
        drop(LifetimeToken::acquire(rt).unwrap());
        assert_eq!(inits_and_shutdowns(rt), (1, 0));
    }

    #[test]
    fn shutdown_refused_while_a_call_is_in_flight() {
        let rt = counting_runtime();
        let inside = rt
            .call(&exports::giterr_last, |_| rt.shutdown())
            .unwrap();
        assert!(matches!(inside, Err(Error::ShutdownBusy { live: 0, calls: 1 })));
        assert_eq!(rt.phase(), Phase::Initialized { live: 0 });
        rt.shutdown().unwrap();
        assert_eq!(inits_and_shutdowns(rt), (1, 1));
    }

    #[test]
    fn requested_shutdown_completes_when_the_last_call_returns() {
        let rt = counting_runtime();
        rt.call(&exports::giterr_last, |_| {
            drop(LibraryGuard { rt });
            assert_eq!(rt.phase(), Phase::Initialized { live: 0 });
        })
        .unwrap();
        assert_eq!(rt.phase(), Phase::Uninitialized);
        assert_eq!(inits_and_shutdowns(rt), (1, 1));
    }

    #[test]
    fn calls_racing_shutdown_never_run_uninitialized() {
        let rt = counting_runtime();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let phase = rt.call(&exports::giterr_last, |_| rt.phase()).unwrap();
                        assert!(matches!(phase, Phase::Initialized { .. }));
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..200 {
                    let _ = rt.shutdown();
                }
            });
        });
        let (inits, shutdowns) = inits_and_shutdowns(rt);
        assert!(inits == shutdowns || inits == shutdowns + 1);
    }

    #[test]
    fn concurrent_tokens_balance() {
        let rt = counting_runtime();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let t = LifetimeToken::acquire(rt).unwrap();
                        drop(t);
                    }
                });
            }
        });
        assert_eq!(rt.phase(), Phase::Initialized { live: 0 });
        assert_eq!(inits_and_shutdowns(rt), (1, 0));
    }

    proptest! {
        #[test]
        fn live_count_tracks_outstanding_tokens(ops in proptest::collection::vec(any::<(bool, u8)>(), 1..64)) {
            let rt = counting_runtime();
            let mut held = Vec::new();
            for (acquire, pick) in ops {
                if acquire || held.is_empty() {
                    held.push(LifetimeToken::acquire(rt).unwrap());
                } else {
                    let idx = usize::from(pick) % held.len();
                    drop(held.swap_remove(idx));
                }
                prop_assert_eq!(rt.live_handles(), held.len());
                if !held.is_empty() {
                    prop_assert!(rt.shutdown().is_err());
                }
            }
            drop(held);
            prop_assert!(rt.shutdown().is_ok());
            prop_assert_eq!(rt.phase(), Phase::Uninitialized);
        }
    }
}
