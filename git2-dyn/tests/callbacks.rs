//! Enumerations and caller-sized buffers through the public API.

mod common;

use std::fs;
use std::ops::ControlFlow;
use std::panic;

use git2_dyn::encoding::FillBuffer;
use git2_dyn::{BranchType, ConfigLevel, ErrorCode, GitConfig, Oid, Repository, Signature, Time};
use git2_dyn_sys as sys;

fn seeded(root: &str) -> Repository {
    let repo = Repository::init(root, false).expect("init");
    for name in ["alpha", "beta", "gamma"] {
        git2_dyn_stub::seed_branch(root, name, sys::GIT_BRANCH_LOCAL);
    }
    repo
}

#[test]
fn visitor_abort_stops_after_second_item() {
    common::runtime();
    let repo = seeded("/it/cb/abort");
    let mut calls = 0;
    let flow = repo
        .for_each_branch(BranchType::Local, |_| {
            calls += 1;
            if calls == 2 { ControlFlow::Break(42) } else { ControlFlow::Continue(()) }
        })
        .expect("enumerate");
    assert_eq!(calls, 2);
    assert_eq!(flow, ControlFlow::Break(42));
}

#[test]
fn full_enumeration_continues() {
    common::runtime();
    let repo = seeded("/it/cb/full");
    let names: Vec<_> = repo
        .branches(BranchType::Local)
        .expect("branches")
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, ["alpha", "beta", "gamma"]);
}

#[test]
fn visitor_panic_resumes_after_the_native_call() {
    common::runtime();
    let repo = seeded("/it/cb/panic");
    let mut seen = Vec::new();
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        repo.for_each_branch(BranchType::Local, |b| {
            assert_ne!(b.name, "beta", "visitor refuses beta");
            seen.push(b.name);
            ControlFlow::Continue(())
        })
    }));
    assert!(result.is_err());
    assert_eq!(seen, ["alpha"]);
    assert_eq!(repo.branches(BranchType::Local).expect("after panic").len(), 3);
}

#[test]
fn reference_glob_in_sorted_order() {
    common::runtime();
    let repo = Repository::init("/it/cb/refs", true).expect("init");
    let id = Oid::from_bytes([1; 20]);
    for name in ["refs/tags/v2", "refs/heads/main", "refs/tags/v1"] {
        repo.create_reference(name, &id, false).expect("create");
    }
    assert_eq!(repo.references("refs/tags/*").expect("glob"), ["refs/tags/v1", "refs/tags/v2"]);
    assert!(matches!(
        repo.create_reference("refs/tags/v1", &id, false),
        Err(e) if e.code() == Some(ErrorCode::Exists)
    ));
}

#[test]
fn short_buffer_reports_size_failure() {
    common::runtime();
    let repo = seeded("/it/cb/short");
    let err = repo
        .branch_tracking_name_into("refs/heads/alpha", FillBuffer::with_capacity(4))
        .expect_err("four bytes cannot hold the name");
    assert_eq!(err.code(), Some(ErrorCode::BufferTooShort));

    let fitted = repo
        .branch_tracking_name("refs/heads/alpha")
        .expect("sized")
        .expect("tracked");
    assert_eq!(fitted, "refs/remotes/origin/alpha");

    let err = git2_dyn::prettify_message_with_capacity("subject line\n", false, 5).expect_err("too small");
    assert_eq!(err.code(), Some(ErrorCode::BufferTooShort));
    assert_eq!(
        git2_dyn::prettify_message("subject line  \n\n\n\nbody", false).expect("prettify"),
        "subject line\n\nbody\n"
    );
}

#[test]
fn discover_finds_enclosing_repository() {
    common::runtime();
    let _repo = Repository::init("/it/cb/discover", false).expect("init");
    let found = Repository::discover("/it/cb/discover/src/deep", false, &[])
        .expect("discover")
        .expect("found");
    assert_eq!(found.to_str(), Some("/it/cb/discover/.git/"));
    let err = Repository::discover_with_capacity("/it/cb/discover/src", false, &[], 8).expect_err("too small");
    assert_eq!(err.code(), Some(ErrorCode::BufferTooShort));
}

#[test]
fn config_file_levels_and_enumeration() {
    common::runtime();
    let dir = tempfile::tempdir().expect("tempdir");
    let global = dir.path().join("global");
    let local = dir.path().join("local");
    fs::write(&global, "[user]\n\tname = Global\n\temail = g@example.com\n").expect("write");
    fs::write(&local, "[user]\n\tname = Local\n[core]\n\tcompression = 2k\n").expect("write");

    let cfg = GitConfig::new().expect("config");
    cfg.add_file_ondisk(&global, ConfigLevel::Global, false).expect("global");
    cfg.add_file_ondisk(&local, ConfigLevel::Local, false).expect("local");

    assert_eq!(cfg.get_string("user.name").expect("get").as_deref(), Some("Local"));
    assert_eq!(cfg.get_string("user.email").expect("get").as_deref(), Some("g@example.com"));
    assert_eq!(cfg.get_i32("core.compression").expect("int"), Some(2048));
    assert_eq!(cfg.get_string("user.missing").expect("get"), None);

    let mut seen = Vec::new();
    let flow = cfg
        .for_each(|entry| {
            seen.push(entry.name);
            if seen.len() == 2 { ControlFlow::Break(1) } else { ControlFlow::Continue(()) }
        })
        .expect("foreach");
    assert_eq!(flow, ControlFlow::Break(1));
    assert_eq!(seen.len(), 2);

    let only_global = cfg.open_level(ConfigLevel::Global).expect("level");
    assert_eq!(only_global.get_string("user.name").expect("get").as_deref(), Some("Global"));
}

#[test]
fn signature_round_trip() {
    common::runtime();
    let when = Time {
        seconds: 1_700_000_000,
        offset_minutes: -300,
    };
    let sig = Signature::new("Ada Lovelace", "ada@example.com", when).expect("signature");
    let info = sig.info().expect("info");
    assert_eq!(info.name, "Ada Lovelace");
    assert_eq!(info.when, when);
    assert!(Signature::new("", "ada@example.com", when).is_err());
}
