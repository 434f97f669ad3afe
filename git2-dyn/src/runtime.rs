//! The process-wide runtime: resolver plus lifetime manager.

use std::sync::OnceLock;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lifetime::{Lifetime, LibraryGuard, LifetimeToken, Phase};
use crate::resolver::{Export, FunctionBinding, Resolver};

static GLOBAL: OnceLock<Runtime> = OnceLock::new();

/// Install the process-wide runtime.
///
/// Fails with [`Error::InvalidArgument`] if `config.convention` is not the
/// one the bindings were compiled for, and with [`Error::AlreadyInitialized`]
/// if a runtime already exists, including one installed implicitly by
/// [`Runtime::global`]. Dropping the returned guard shuts the native library
/// down once no handle is live.
pub fn init(config: Config) -> Result<LibraryGuard> {
    config.convention.ensure_compiled()?;
    let mut installed = false;
    let rt = GLOBAL.get_or_init(|| {
        installed = true;
        Runtime::new(config)
    });
    if installed {
        Ok(LibraryGuard { rt })
    } else {
        Err(Error::AlreadyInitialized)
    }
}

/// Resolver and lifetime state shared by every handle.
#[derive(Debug)]
pub struct Runtime {
    pub(crate) resolver: Resolver,
    pub(crate) lifetime: Lifetime,
}

impl Runtime {
    pub(crate) fn new(config: Config) -> Self {
        let (loader, convention, policy) = config.into_loader();
        Self {
            resolver: Resolver::new(loader, convention, policy),
            lifetime: Lifetime::new(),
        }
    }

    /// The process-wide runtime, installing one from [`Config::from_env`] if
    /// [`init`] was never called.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| Self::new(Config::from_env()))
    }

    /// The symbol resolver.
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Current lifetime phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lifetime.phase()
    }

    /// Number of owned handles not yet released.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.lifetime.live()
    }

    /// Shut the native library down now.
    ///
    /// Fails with [`Error::ShutdownBusy`] while handles are live or calls are
    /// in flight. A no-op if the library is not initialized. If
    /// `git_threads_shutdown` cannot be called the library stays initialized.
    pub fn shutdown(&self) -> Result<()> {
        self.lifetime.try_shutdown(&self.resolver)
    }

    /// Exports the loaded module does not provide.
    pub fn missing_exports(&self) -> Result<Vec<Export>> {
        self.resolver.check_all()
    }

    /// Invoke a native export, initializing the library first if needed.
    ///
    /// The call is registered as in flight until it returns, so a concurrent
    /// shutdown is refused (or deferred) rather than tearing the library down
    /// underneath it.
    pub(crate) fn call<F: Copy, R>(
        &self,
        binding: &FunctionBinding<F>,
        call: impl FnOnce(F) -> R,
    ) -> Result<R> {
        let _in_flight = self.lifetime.enter(&self.resolver)?;
        self.resolver.invoke(binding, call)
    }

    /// Register one more live handle.
    pub(crate) fn token(&'static self) -> Result<LifetimeToken> {
        LifetimeToken::acquire(self)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Isolated runtimes over the in-process stub library.

    use super::*;
    use crate::resolver::{CallingConvention, ExportTable, ResolvePolicy};

    pub(crate) fn stub_table() -> ExportTable {
        ExportTable::new(git2_dyn_stub::exports())
    }

    /// A private runtime over the stub. Leaked so handles can hold `&'static`.
    pub(crate) fn stub_runtime(policy: ResolvePolicy) -> &'static Runtime {
        runtime_over(stub_table(), policy)
    }

    /// The stub with the named exports removed.
    pub(crate) fn stub_runtime_without(missing: &[&str]) -> &'static Runtime {
        let table = ExportTable::new(
            git2_dyn_stub::exports()
                .into_iter()
                .filter(|(name, _)| !missing.contains(name)),
        );
        runtime_over(table, ResolvePolicy::Cached)
    }

    fn runtime_over(table: ExportTable, policy: ResolvePolicy) -> &'static Runtime {
        Box::leak(Box::new(Runtime::new(
            Config::default()
                .convention(CallingConvention::Cdecl)
                .policy(policy)
                .loader(table),
        )))
    }

    pub(crate) fn counting_runtime() -> &'static Runtime {
        stub_runtime(ResolvePolicy::Cached)
    }

    pub(crate) fn inits_and_shutdowns(rt: &Runtime) -> (usize, usize) {
        rt.lifetime.transitions()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::resolver::{CallingConvention, ExportTable, ResolvePolicy};

    #[test]
    fn init_rejects_a_foreign_convention() {
        let foreign = match CallingConvention::platform() {
            CallingConvention::Cdecl => CallingConvention::Stdcall,
            CallingConvention::Stdcall => CallingConvention::Cdecl,
        };
        let table = ExportTable::default();
        let err = init(Config::default().convention(foreign).loader(table.clone())).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(table.loads(), 0);
    }

    #[test]
    fn first_call_initializes() {
        let rt = stub_runtime(ResolvePolicy::PerCall);
        rt.last_error().unwrap();
        assert!(matches!(rt.phase(), Phase::Initialized { live: 0 }));
        assert_eq!(inits_and_shutdowns(rt), (1, 0));
    }

    #[test]
    fn stub_provides_every_export_it_claims() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let missing = rt.missing_exports().unwrap();
        assert!(missing.len() < crate::exports::ALL.len());
        assert!(!missing.iter().any(|e| e.name() == "git_repository_open"));
    }
}
