//! Shared setup: the process-wide runtime over the in-process stub library.

use std::sync::OnceLock;

use git2_dyn::{CallingConvention, Config, ExportTable, LibraryGuard, ResolvePolicy, Runtime};

/// Install the stub-backed global runtime once per test binary.
pub fn runtime() -> &'static Runtime {
    static GUARD: OnceLock<LibraryGuard> = OnceLock::new();
    GUARD
        .get_or_init(|| {
            git2_dyn::init(
                Config::default()
                    .loader(ExportTable::new(git2_dyn_stub::exports()))
                    .convention(CallingConvention::Cdecl)
                    .policy(ResolvePolicy::Cached),
            )
            .expect("global runtime installed twice")
        })
        .runtime()
}
