//! CLI argument definitions and subcommand routing.

pub mod inspect;
pub mod repo;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use git2_dyn::{BranchType, CallingConvention, Config, ResolvePolicy};

/// Exercise libgit2 through runtime-resolved bindings.
///
/// The native module is loaded by name or path and every export is looked up
/// when first called.
#[derive(Parser)]
#[command(name = "git2-dyn", version, about)]
pub struct Cli {
    /// Path or bare name of the native module (default: platform name, or
    /// `GIT2_DYN_LIBRARY`).
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    /// Export naming convention: stdcall (`_name@N`) or cdecl. Must match the
    /// ABI the binary was built for (stdcall only on 32-bit Windows).
    #[arg(long, global = true, value_parser = parse_convention)]
    pub convention: Option<CallingConvention>,

    /// Symbol resolution: per-call or cached.
    #[arg(long = "resolve", global = true, value_parser = parse_policy)]
    pub policy: Option<ResolvePolicy>,

    /// Log filter, e.g. `debug` or `git2_dyn=trace` (overrides `RUST_LOG`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Runtime configuration: environment first, then flags on top.
    pub fn runtime_config(&self) -> Config {
        let mut config = Config::from_env();
        if let Some(path) = &self.library {
            config = config.library(path);
        }
        if let Some(convention) = self.convention {
            config = config.convention(convention);
        }
        if let Some(policy) = self.policy {
            config = config.policy(policy);
        }
        config
    }
}

/// One-shot operations (run and exit).
#[derive(Subcommand)]
pub enum Command {
    /// Resolve every declared export and list the missing ones.
    Check,
    /// Print the symbol name looked up for every export.
    Symbols,
    /// List branches of a repository.
    #[command(alias = "br")]
    Branches {
        /// Repository path.
        repo: PathBuf,
        /// Only local branches.
        #[arg(long, conflicts_with = "remote")]
        local: bool,
        /// Only remote-tracking branches.
        #[arg(long)]
        remote: bool,
    },
    /// Show working-tree status.
    #[command(alias = "st")]
    Status {
        /// Repository path.
        repo: PathBuf,
    },
    /// List configuration entries of a repository or the global file.
    Config {
        /// Repository whose local configuration to read.
        #[arg(required_unless_present = "global", conflicts_with = "global")]
        repo: Option<PathBuf>,
        /// Read the global configuration file instead.
        #[arg(long)]
        global: bool,
    },
    /// Find the repository containing a path.
    Discover {
        /// Where to start searching.
        path: PathBuf,
        /// Continue across filesystem boundaries.
        #[arg(long)]
        across_fs: bool,
        /// Directories at which to stop searching.
        #[arg(long = "ceiling")]
        ceilings: Vec<PathBuf>,
    },
}

/// Branch kind selected by `--local` / `--remote`.
pub const fn branch_kind(local: bool, remote: bool) -> BranchType {
    match (local, remote) {
        (true, false) => BranchType::Local,
        (false, true) => BranchType::Remote,
        _ => BranchType::All,
    }
}

fn parse_convention(s: &str) -> Result<CallingConvention, String> {
    s.parse().map_err(|e: git2_dyn::Error| e.to_string())
}

fn parse_policy(s: &str) -> Result<ResolvePolicy, String> {
    s.parse().map_err(|e: git2_dyn::Error| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "git2-dyn",
            "status",
            "/tmp/repo",
            "--convention",
            "stdcall",
            "--resolve",
            "per-call",
            "--json",
        ])
        .expect("parse");
        assert_eq!(cli.convention, Some(CallingConvention::Stdcall));
        assert_eq!(cli.policy, Some(ResolvePolicy::PerCall));
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Status { .. }));
    }

    #[test]
    fn bad_policy_is_rejected() {
        assert!(Cli::try_parse_from(["git2-dyn", "--resolve", "sometimes", "check"]).is_err());
    }

    #[test]
    fn config_needs_repo_or_global() {
        assert!(Cli::try_parse_from(["git2-dyn", "config"]).is_err());
        assert!(Cli::try_parse_from(["git2-dyn", "config", "--global"]).is_ok());
        assert!(Cli::try_parse_from(["git2-dyn", "config", "r", "--global"]).is_err());
    }

    #[test]
    fn branch_flags_select_kind() {
        assert_eq!(branch_kind(false, false), BranchType::All);
        assert_eq!(branch_kind(true, false), BranchType::Local);
        assert_eq!(branch_kind(false, true), BranchType::Remote);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from(["git2-dyn", "--library", "/opt/libgit2.so", "symbols"]).expect("parse");
        let config = cli.runtime_config();
        assert_eq!(config.library, PathBuf::from("/opt/libgit2.so"));
    }
}
