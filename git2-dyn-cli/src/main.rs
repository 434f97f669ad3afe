//! git2-dyn: command-line front end over the runtime-resolved libgit2 binding.
//!
//! Every command loads the native module named by `--library` (or
//! `GIT2_DYN_LIBRARY`), resolves exports on demand and prints text or JSON.

#![allow(
    missing_docs,
    missing_debug_implementations,
    clippy::print_stderr,
    clippy::print_stdout
)]

mod cmd;
mod output;

use std::io::{self, Write as _};
use std::process;

use clap::Parser;
use git2_dyn::Runtime;
use tracing_subscriber::EnvFilter;

use crate::cmd::{Cli, Command, branch_kind, inspect, repo};
use crate::output::Report;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    match run(&cli) {
        Ok(report) => {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(report.render(cli.json).as_bytes());
            if !report.success {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("fatal: {e}");
            process::exit(1);
        }
    }
}

/// Log to stderr; `--log-level` wins over `RUST_LOG`, default `warn`.
fn init_logging(level: Option<&str>) {
    let filter = level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> git2_dyn::Result<Report> {
    let _guard = git2_dyn::init(cli.runtime_config())?;
    execute(&cli.command)
}

/// Dispatch one command against the installed global runtime.
fn execute(command: &Command) -> git2_dyn::Result<Report> {
    match command {
        Command::Check => inspect::check(Runtime::global()),
        Command::Symbols => Ok(inspect::symbols(Runtime::global())),
        Command::Branches { repo, local, remote } => repo::branches(repo, branch_kind(*local, *remote)),
        Command::Status { repo } => repo::status(repo),
        Command::Config { repo, global } => repo::config(repo.as_deref(), *global),
        Command::Discover {
            path,
            across_fs,
            ceilings,
        } => repo::discover(path, *across_fs, ceilings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::OnceLock;

    use git2_dyn::{CallingConvention, Config, ExportTable, LibraryGuard, Repository};
    use git2_dyn_sys as sys;

    fn stub_runtime() {
        static GUARD: OnceLock<LibraryGuard> = OnceLock::new();
        GUARD.get_or_init(|| {
            git2_dyn::init(
                Config::default()
                    .loader(ExportTable::new(git2_dyn_stub::exports()))
                    .convention(CallingConvention::Cdecl),
            )
            .expect("install stub runtime")
        });
    }

    #[test]
    fn foreign_convention_fails_before_loading() {
        let foreign = match CallingConvention::platform() {
            CallingConvention::Cdecl => "stdcall",
            CallingConvention::Stdcall => "cdecl",
        };
        let cli = Cli::try_parse_from(["git2-dyn", "--convention", foreign, "--library", "/nonexistent/libgit2.so", "check"])
            .expect("parse");
        let err = run(&cli).expect_err("convention mismatch");
        assert!(matches!(err, git2_dyn::Error::InvalidArgument(_)));
    }

    #[test]
    fn check_reports_missing_exports() {
        stub_runtime();
        let report = execute(&Command::Check).expect("check");
        assert!(!report.success);
        let missing = report.json()["missing"].as_array().expect("array");
        assert!(missing.iter().any(|m| m == "git_commit_create"));
        assert!(!missing.iter().any(|m| m == "git_repository_open"));
    }

    #[test]
    fn symbols_cover_every_export() {
        stub_runtime();
        let report = execute(&Command::Symbols).expect("symbols");
        let rows = report.json().as_array().expect("array");
        assert_eq!(rows.len(), git2_dyn::exports::ALL.len());
        assert!(report.render(false).contains("git_threads_init"));
    }

    #[test]
    fn branches_and_status_of_a_seeded_repository() {
        stub_runtime();
        let root = "/cli/seeded";
        git2_dyn_stub::seed_branch(root, "main", sys::GIT_BRANCH_LOCAL);
        git2_dyn_stub::seed_branch(root, "origin/main", sys::GIT_BRANCH_REMOTE);
        git2_dyn_stub::seed_status(root, "README.md", sys::GIT_STATUS_WT_MODIFIED);

        let local = execute(&Command::Branches {
            repo: root.into(),
            local: true,
            remote: false,
        })
        .expect("branches");
        assert_eq!(local.render(false), "  main\n");

        let all = execute(&Command::Branches {
            repo: root.into(),
            local: false,
            remote: false,
        })
        .expect("branches");
        assert_eq!(all.json().as_array().map(Vec::len), Some(2));

        let status = execute(&Command::Status { repo: root.into() }).expect("status");
        assert_eq!(status.render(false), " M README.md\n");
    }

    #[test]
    fn config_reads_the_repository_file() {
        stub_runtime();
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Repository::init(dir.path(), false).expect("init");
        let git_dir = repo.path().expect("path");
        fs::create_dir_all(&git_dir).expect("mkdir");
        fs::write(git_dir.join("config"), "[core]\n\tbare = false\n[user]\n\tname = Ada\n").expect("write");

        let report = execute(&Command::Config {
            repo: Some(dir.path().to_path_buf()),
            global: false,
        })
        .expect("config");
        let text = report.render(false);
        assert!(text.contains("core.bare=false"));
        assert!(text.contains("user.name=Ada"));
        assert_eq!(report.json()[0]["level"], "local");
    }

    #[test]
    fn discover_without_repository_fails_softly() {
        stub_runtime();
        let report = execute(&Command::Discover {
            path: "/nowhere/at/all".into(),
            across_fs: false,
            ceilings: Vec::new(),
        })
        .expect("discover");
        assert!(!report.success);
    }

    #[test]
    fn opening_an_unknown_repository_is_an_error() {
        stub_runtime();
        let err = execute(&Command::Status {
            repo: "/cli/never-created".into(),
        })
        .err()
        .expect("error");
        assert!(err.is_not_found());
    }
}
