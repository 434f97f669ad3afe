//! Independent handles used from several threads at once.

mod common;

use std::sync::Barrier;
use std::thread;

use git2_dyn::{Oid, ReferenceType, Repository};

#[test]
fn threads_open_independent_repositories() {
    common::runtime();
    let barrier = Barrier::new(4);
    thread::scope(|s| {
        for n in 0..4u8 {
            let barrier = &barrier;
            s.spawn(move || {
                let root = format!("/it/threads/{n}");
                let repo = Repository::init(&root, n % 2 == 0).expect("init");
                barrier.wait();
                let id = Oid::from_bytes([n; 20]);
                let reference = repo
                    .create_reference("refs/heads/main", &id, false)
                    .expect("create reference");
                assert_eq!(reference.target().expect("target"), Some(id));
                assert_eq!(repo.is_bare().expect("is_bare"), n % 2 == 0);
            });
        }
    });
}

#[test]
fn releasing_one_handle_leaves_the_other_usable() {
    common::runtime();
    let first = Repository::init("/it/pair/a", false).expect("init a");
    let mut second = Repository::init("/it/pair/b", false).expect("init b");
    let id = Oid::from_bytes([7; 20]);

    let worker = thread::spawn(move || {
        second.release().expect("release b");
        second.is_released()
    });
    assert!(worker.join().expect("join"));

    let head = first
        .create_symbolic_reference("HEAD", "refs/heads/main", false)
        .expect("symbolic");
    assert_eq!(head.reference_type().expect("type"), ReferenceType::Symbolic);
    first.create_reference("refs/heads/main", &id, false).expect("main");
    assert_eq!(head.resolve().expect("resolve").target().expect("target"), Some(id));
}

#[test]
fn error_records_are_per_thread() {
    let rt = common::runtime();
    let missing = thread::spawn(|| Repository::open("/it/nowhere").err())
        .join()
        .expect("join")
        .expect("open fails");
    assert!(missing.is_not_found());
    // This thread never saw the failure.
    assert_eq!(rt.last_error().expect("last_error"), None);
}
