#![allow(unsafe_code)]
//! Dynamic symbol resolution.
//!
//! Every native call goes through a [`Resolver`]: it asks a [`Loader`] for the
//! module, looks the export up by its (possibly decorated) name and hands the
//! typed function pointer to the caller. Under [`ResolvePolicy::PerCall`] the
//! module is loaded for each invocation and released as soon as the call
//! returns, on success and failure alike. [`ResolvePolicy::Cached`] keeps the
//! module loaded and memoizes addresses; the cache lock is never held across
//! an invocation.

use std::collections::HashMap;
use std::ffi::{CString, c_void};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Export naming convention of the native module.
///
/// Bindings and callbacks are compiled as `extern "system"`, which is stdcall
/// on 32-bit Windows and the C convention everywhere else. Only the naming
/// that matches that ABI is accepted; see [`CallingConvention::ensure_compiled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    /// Undecorated names.
    Cdecl,
    /// `_name@N`, where `N` is the byte width of the arguments on a 32-bit stack.
    Stdcall,
}

impl CallingConvention {
    /// The convention the platform's build of the library uses.
    #[must_use]
    pub const fn platform() -> Self {
        if cfg!(all(windows, target_arch = "x86")) {
            Self::Stdcall
        } else {
            Self::Cdecl
        }
    }

    /// Reject a convention whose call ABI differs from the one the bindings
    /// were compiled with.
    pub fn ensure_compiled(self) -> Result<Self> {
        let compiled = Self::platform();
        if self == compiled {
            Ok(self)
        } else {
            Err(Error::InvalidArgument(format!(
                "calling convention {self} does not match the compiled ABI ({compiled})"
            )))
        }
    }

    /// Name to look up for `export` under this convention.
    #[must_use]
    pub fn symbol_name(self, export: &Export) -> String {
        match self {
            Self::Cdecl => export.name.to_owned(),
            Self::Stdcall => format!("_{}@{}", export.name, export.arg_bytes),
        }
    }
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cdecl => "cdecl",
            Self::Stdcall => "stdcall",
        })
    }
}

impl std::str::FromStr for CallingConvention {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cdecl" => Ok(Self::Cdecl),
            "stdcall" => Ok(Self::Stdcall),
            other => Err(Error::InvalidArgument(format!(
                "unknown calling convention {other:?} (expected cdecl or stdcall)"
            ))),
        }
    }
}

/// When the module is loaded and how long it stays loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolvePolicy {
    /// Load, resolve, invoke and release the module on every call.
    PerCall,
    /// Load once and memoize every resolved address.
    #[default]
    Cached,
}

impl std::str::FromStr for ResolvePolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "per-call" | "percall" => Ok(Self::PerCall),
            "cached" => Ok(Self::Cached),
            other => Err(Error::InvalidArgument(format!(
                "unknown resolve policy {other:?} (expected per-call or cached)"
            ))),
        }
    }
}

/// Name and stack width of one native export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Export {
    name: &'static str,
    arg_bytes: usize,
}

impl Export {
    /// Undecorated export name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Sum of the 32-bit stack widths of the arguments.
    #[must_use]
    pub const fn arg_bytes(&self) -> usize {
        self.arg_bytes
    }
}

/// An [`Export`] bound to the Rust function-pointer type `F` it is called as.
pub struct FunctionBinding<F> {
    export: Export,
    _sig: PhantomData<F>,
}

impl<F> FunctionBinding<F> {
    /// Declare a binding.
    #[must_use]
    pub const fn new(name: &'static str, arg_bytes: usize) -> Self {
        Self {
            export: Export { name, arg_bytes },
            _sig: PhantomData,
        }
    }

    /// Untyped descriptor.
    #[must_use]
    pub const fn export(&self) -> Export {
        self.export
    }

    /// Undecorated export name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.export.name
    }
}

impl<F> fmt::Debug for FunctionBinding<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionBinding").field(&self.export).finish()
    }
}

/// A loaded native module.
pub trait Module: Send + Sync {
    /// Address of the export `name`, if present.
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>>;
}

/// Something that can produce a [`Module`].
pub trait Loader: Send + Sync + fmt::Debug {
    /// Load (or reference) the module. Dropping the result releases it.
    fn load(&self) -> Result<Box<dyn Module>>;

    /// Human-readable origin, for diagnostics.
    fn describe(&self) -> String;
}

/// Loads a shared library from disk via `libloading`.
#[derive(Debug, Clone)]
pub struct DynamicLoader {
    path: PathBuf,
}

impl DynamicLoader {
    /// Loader for the library at `path` (or a bare name searched for on the
    /// platform's library path).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Library path or name.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Platform default library name.
    #[must_use]
    pub const fn default_name() -> &'static str {
        if cfg!(windows) {
            "git2.dll"
        } else if cfg!(target_os = "macos") {
            "libgit2.dylib"
        } else {
            "libgit2.so"
        }
    }
}

struct SharedLibrary(libloading::Library);

impl Module for SharedLibrary {
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        let name = CString::new(name).ok()?;
        let sym = unsafe { self.0.get::<*mut c_void>(name.as_bytes_with_nul()) }.ok()?;
        NonNull::new(*sym)
    }
}

impl Loader for DynamicLoader {
    fn load(&self) -> Result<Box<dyn Module>> {
        let lib = unsafe { libloading::Library::new(&self.path) }.map_err(|e| {
            Error::LibraryLoad {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Box::new(SharedLibrary(lib)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An in-process table of named addresses standing in for a loaded module.
///
/// Counts how often it is "loaded" and how many loaded instances are still
/// alive, so callers can observe module release.
#[derive(Clone, Default)]
pub struct ExportTable {
    entries: Arc<HashMap<String, usize>>,
    loads: Arc<AtomicUsize>,
    open: Arc<AtomicUsize>,
}

impl ExportTable {
    /// Table over `(name, address)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, *const c_void)>,
        S: Into<String>,
    {
        Self {
            entries: Arc::new(
                entries
                    .into_iter()
                    .map(|(name, addr)| (name.into(), addr as usize))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Number of exports in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times the table has been loaded.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of loaded instances not yet released.
    #[must_use]
    pub fn open_modules(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ExportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportTable")
            .field("exports", &self.entries.len())
            .field("loads", &self.loads())
            .field("open", &self.open_modules())
            .finish()
    }
}

struct TableModule {
    entries: Arc<HashMap<String, usize>>,
    open: Arc<AtomicUsize>,
}

impl Module for TableModule {
    fn symbol(&self, name: &str) -> Option<NonNull<c_void>> {
        self.entries
            .get(name)
            .and_then(|addr| NonNull::new(*addr as *mut c_void))
    }
}

impl Drop for TableModule {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Loader for ExportTable {
    fn load(&self) -> Result<Box<dyn Module>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TableModule {
            entries: Arc::clone(&self.entries),
            open: Arc::clone(&self.open),
        }))
    }

    fn describe(&self) -> String {
        format!("in-process export table ({} exports)", self.entries.len())
    }
}

#[derive(Default)]
struct Cache {
    module: Option<Box<dyn Module>>,
    addresses: HashMap<&'static str, usize>,
}

/// Resolves exports and invokes them under a [`ResolvePolicy`].
pub struct Resolver {
    loader: Box<dyn Loader>,
    convention: CallingConvention,
    policy: ResolvePolicy,
    cache: RwLock<Cache>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("loader", &self.loader)
            .field("convention", &self.convention)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Resolver over `loader`. Nothing is loaded until the first call.
    pub fn new(
        loader: Box<dyn Loader>,
        convention: CallingConvention,
        policy: ResolvePolicy,
    ) -> Self {
        Self {
            loader,
            convention,
            policy,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// Naming convention in use.
    #[must_use]
    pub const fn convention(&self) -> CallingConvention {
        self.convention
    }

    /// Policy in use.
    #[must_use]
    pub const fn policy(&self) -> ResolvePolicy {
        self.policy
    }

    /// Loader diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        self.loader.describe()
    }

    fn lookup(&self, module: &dyn Module, export: &Export) -> Result<NonNull<c_void>> {
        let symbol = self.convention.symbol_name(export);
        module.symbol(&symbol).ok_or_else(|| {
            debug!(%symbol, "export not found");
            Error::SymbolNotFound { symbol }
        })
    }

    fn cached_address(&self, export: &Export) -> Result<NonNull<c_void>> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(addr) = cache.addresses.get(export.name) {
                return NonNull::new(*addr as *mut c_void).ok_or(Error::NullPointer);
            }
        }
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.module.is_none() {
            debug!(module = %self.loader.describe(), "loading native module");
            cache.module = Some(self.loader.load()?);
        }
        let module = cache.module.as_deref().ok_or(Error::NullPointer)?;
        let addr = self.lookup(module, export)?;
        cache.addresses.insert(export.name, addr.as_ptr() as usize);
        Ok(addr)
    }

    /// Resolve `binding` and run `call` with the typed function pointer.
    ///
    /// Under [`ResolvePolicy::PerCall`] the module stays loaded exactly for
    /// the duration of `call`.
    pub(crate) fn invoke<F: Copy, R>(
        &self,
        binding: &FunctionBinding<F>,
        call: impl FnOnce(F) -> R,
    ) -> Result<R> {
        trace!(export = binding.name(), "invoke");
        match self.policy {
            ResolvePolicy::PerCall => {
                let module = self.loader.load()?;
                let addr = self.lookup(module.as_ref(), &binding.export)?;
                let out = call(unsafe { function_at::<F>(addr) });
                drop(module);
                Ok(out)
            }
            ResolvePolicy::Cached => {
                let addr = self.cached_address(&binding.export)?;
                Ok(call(unsafe { function_at::<F>(addr) }))
            }
        }
    }

    /// Whether `export` can be resolved.
    pub fn resolve(&self, export: &Export) -> Result<()> {
        match self.policy {
            ResolvePolicy::PerCall => {
                let module = self.loader.load()?;
                self.lookup(module.as_ref(), export).map(drop)
            }
            ResolvePolicy::Cached => self.cached_address(export).map(drop),
        }
    }

    /// Resolve every export the binding declares and return the ones missing.
    ///
    /// Fails only if the module itself cannot be loaded.
    pub fn check_all(&self) -> Result<Vec<Export>> {
        let module = self.loader.load()?;
        Ok(crate::exports::ALL
            .iter()
            .filter(|export| self.lookup(module.as_ref(), export).is_err())
            .copied()
            .collect())
    }
}

/// Reinterpret an export address as the function-pointer type `F`.
///
/// # Safety
/// `addr` must be the entry point of a function whose ABI matches `F`.
unsafe fn function_at<F: Copy>(addr: NonNull<c_void>) -> F {
    const {
        assert!(size_of::<F>() == size_of::<*mut c_void>());
    }
    let raw = addr.as_ptr();
    unsafe { std::mem::transmute_copy::<*mut c_void, F>(&raw) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_int;

    unsafe extern "system" fn forty_two() -> c_int {
        42
    }

    unsafe extern "system" fn add(a: c_int, b: c_int) -> c_int {
        a + b
    }

    type Nullary = unsafe extern "system" fn() -> c_int;
    type Binary = unsafe extern "system" fn(c_int, c_int) -> c_int;

    const FORTY_TWO: FunctionBinding<Nullary> = FunctionBinding::new("forty_two", 0);
    const ADD: FunctionBinding<Binary> = FunctionBinding::new("add", 8);
    const MISSING: FunctionBinding<Nullary> = FunctionBinding::new("missing", 0);

    fn table() -> ExportTable {
        ExportTable::new([
            ("forty_two", forty_two as Nullary as *const c_void),
            ("add", add as Binary as *const c_void),
            ("_add@8", add as Binary as *const c_void),
        ])
    }

    #[test]
    fn stdcall_names_are_decorated() {
        let export = ADD.export();
        assert_eq!(CallingConvention::Cdecl.symbol_name(&export), "add");
        assert_eq!(CallingConvention::Stdcall.symbol_name(&export), "_add@8");
    }

    #[test]
    fn per_call_releases_module_after_each_call() {
        let table = table();
        let resolver = Resolver::new(
            Box::new(table.clone()),
            CallingConvention::Cdecl,
            ResolvePolicy::PerCall,
        );
        let v = resolver.invoke(&ADD, |f| unsafe { f(2, 3) }).unwrap();
        assert_eq!(v, 5);
        resolver.invoke(&FORTY_TWO, |f| unsafe { f() }).unwrap();
        assert_eq!(table.loads(), 2);
        assert_eq!(table.open_modules(), 0);
    }

    #[test]
    fn per_call_module_is_loaded_during_invocation() {
        let table = table();
        let resolver = Resolver::new(
            Box::new(table.clone()),
            CallingConvention::Cdecl,
            ResolvePolicy::PerCall,
        );
        let open_inside = resolver.invoke(&FORTY_TWO, |_| table.open_modules()).unwrap();
        assert_eq!(open_inside, 1);
    }

    #[test]
    fn missing_export_is_reported_and_module_released() {
        let table = table();
        let resolver = Resolver::new(
            Box::new(table.clone()),
            CallingConvention::Cdecl,
            ResolvePolicy::PerCall,
        );
        let err = resolver.invoke(&MISSING, |f| unsafe { f() }).unwrap_err();
        assert!(matches!(err, Error::SymbolNotFound { ref symbol } if symbol == "missing"));
        assert_eq!(table.open_modules(), 0);
    }

    #[test]
    fn only_the_compiled_convention_is_accepted() {
        let compiled = CallingConvention::platform();
        assert_eq!(compiled.ensure_compiled().unwrap(), compiled);
        let other = match compiled {
            CallingConvention::Cdecl => CallingConvention::Stdcall,
            CallingConvention::Stdcall => CallingConvention::Cdecl,
        };
        let err = other.ensure_compiled().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("compiled ABI")));
    }

    #[test]
    fn cached_loads_once() {
        let table = table();
        let resolver = Resolver::new(
            Box::new(table.clone()),
            CallingConvention::Stdcall,
            ResolvePolicy::Cached,
        );
        for _ in 0..3 {
            assert_eq!(resolver.invoke(&ADD, |f| unsafe { f(1, 1) }).unwrap(), 2);
        }
        assert_eq!(table.loads(), 1);
        assert_eq!(table.open_modules(), 1);
    }

    #[test]
    fn unloadable_module_is_a_load_error() {
        let resolver = Resolver::new(
            Box::new(DynamicLoader::new("/nonexistent/libgit2-missing.so")),
            CallingConvention::Cdecl,
            ResolvePolicy::PerCall,
        );
        let err = resolver.invoke(&FORTY_TWO, |f| unsafe { f() }).unwrap_err();
        assert!(matches!(err, Error::LibraryLoad { .. }));
    }

    #[test]
    fn policy_and_convention_parse() {
        assert_eq!("per-call".parse::<ResolvePolicy>().unwrap(), ResolvePolicy::PerCall);
        assert_eq!("Cached".parse::<ResolvePolicy>().unwrap(), ResolvePolicy::Cached);
        assert_eq!("stdcall".parse::<CallingConvention>().unwrap(), CallingConvention::Stdcall);
        assert!("fastcall".parse::<CallingConvention>().is_err());
    }
}
