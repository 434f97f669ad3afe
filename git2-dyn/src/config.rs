//! Runtime configuration: which module to load and how to resolve it.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::resolver::{CallingConvention, DynamicLoader, Loader, ResolvePolicy};

/// Environment variable naming the native module.
pub const ENV_LIBRARY: &str = "GIT2_DYN_LIBRARY";
/// Environment variable selecting the export naming convention.
pub const ENV_CONVENTION: &str = "GIT2_DYN_CONVENTION";
/// Environment variable selecting the resolve policy.
pub const ENV_RESOLVE: &str = "GIT2_DYN_RESOLVE";

/// How the runtime finds and calls the native library.
pub struct Config {
    /// Path or bare name of the native module.
    pub library: PathBuf,
    /// Export naming convention.
    pub convention: CallingConvention,
    /// Module / symbol caching policy.
    pub policy: ResolvePolicy,
    loader: Option<Box<dyn Loader>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library: PathBuf::from(DynamicLoader::default_name()),
            convention: CallingConvention::platform(),
            policy: ResolvePolicy::default(),
            loader: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("library", &self.library)
            .field("convention", &self.convention)
            .field("policy", &self.policy)
            .field("loader", &self.loader)
            .finish()
    }
}

impl Config {
    /// Defaults overridden by `GIT2_DYN_*` environment variables.
    ///
    /// Unparseable values, and a convention other than the compiled one, are
    /// logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var_os(name))
    }

    fn from_vars(var: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut config = Self::default();
        let text = |name| var(name).and_then(|v| v.into_string().ok());
        if let Some(path) = var(ENV_LIBRARY).filter(|v| !v.is_empty()) {
            config.library = PathBuf::from(path);
        }
        if let Some(v) = text(ENV_CONVENTION) {
            match v.parse::<CallingConvention>().and_then(CallingConvention::ensure_compiled) {
                Ok(c) => config.convention = c,
                Err(e) => warn!(var = ENV_CONVENTION, error = %e, "ignoring"),
            }
        }
        if let Some(v) = text(ENV_RESOLVE) {
            match v.parse() {
                Ok(p) => config.policy = p,
                Err(e) => warn!(var = ENV_RESOLVE, error = %e, "ignoring"),
            }
        }
        config
    }

    /// Set the module path or name.
    #[must_use]
    pub fn library(mut self, path: impl Into<PathBuf>) -> Self {
        self.library = path.into();
        self
    }

    /// Set the naming convention.
    #[must_use]
    pub fn convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Set the resolve policy.
    #[must_use]
    pub fn policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a custom loader instead of loading `library` from disk.
    #[must_use]
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub(crate) fn into_loader(self) -> (Box<dyn Loader>, CallingConvention, ResolvePolicy) {
        let loader = self
            .loader
            .unwrap_or_else(|| Box::new(DynamicLoader::new(self.library)));
        (loader, self.convention, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ExportTable;

    #[test]
    fn defaults_follow_platform() {
        let c = Config::default();
        assert_eq!(c.policy, ResolvePolicy::Cached);
        assert_eq!(c.convention, CallingConvention::platform());
        assert_eq!(c.library, PathBuf::from(DynamicLoader::default_name()));
    }

    #[test]
    fn builder_overrides() {
        let c = Config::default()
            .library("/opt/lib/libgit2.so.0")
            .convention(CallingConvention::Stdcall)
            .policy(ResolvePolicy::PerCall);
        assert_eq!(c.library, PathBuf::from("/opt/lib/libgit2.so.0"));
        let (loader, convention, policy) = c.into_loader();
        assert_eq!(loader.describe(), "/opt/lib/libgit2.so.0");
        assert_eq!(convention, CallingConvention::Stdcall);
        assert_eq!(policy, ResolvePolicy::PerCall);
    }

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<OsString> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| OsString::from(v))
        }
    }

    #[test]
    fn env_overrides_apply() {
        let c = Config::from_vars(vars(&[
            (ENV_LIBRARY, "/opt/libgit2.so"),
            (ENV_RESOLVE, "per-call"),
            (ENV_CONVENTION, &CallingConvention::platform().to_string()),
        ]));
        assert_eq!(c.library, PathBuf::from("/opt/libgit2.so"));
        assert_eq!(c.policy, ResolvePolicy::PerCall);
        assert_eq!(c.convention, CallingConvention::platform());
    }

    #[test]
    fn env_convention_not_matching_the_compiled_abi_is_ignored() {
        let foreign = match CallingConvention::platform() {
            CallingConvention::Cdecl => "stdcall",
            CallingConvention::Stdcall => "cdecl",
        };
        let c = Config::from_vars(vars(&[(ENV_CONVENTION, foreign), (ENV_RESOLVE, "sometimes")]));
        assert_eq!(c.convention, CallingConvention::platform());
        assert_eq!(c.policy, ResolvePolicy::Cached);
    }

    #[test]
    fn custom_loader_wins_over_library() {
        let (loader, ..) = Config::default().loader(ExportTable::default()).into_loader();
        assert!(loader.describe().starts_with("in-process"));
    }
}
