//! Library lifetime through the global runtime.
//!
//! Kept in its own test binary so no other test holds handles while the live
//! count is asserted.

mod common;

use git2_dyn::{Config, Error, Phase, Repository};

#[test]
fn open_operate_release() {
    let rt = common::runtime();
    assert!(matches!(git2_dyn::init(Config::default()), Err(Error::AlreadyInitialized)));

    let mut repo = Repository::init("/it/lifetime", false).expect("init");
    assert_eq!(rt.phase(), Phase::Initialized { live: 1 });
    assert!(!repo.is_bare().expect("is_bare"));
    assert!(matches!(rt.shutdown(), Err(Error::ShutdownBusy { live: 1, .. })));

    repo.release().expect("release");
    assert!(repo.is_released());
    assert_eq!(rt.live_handles(), 0);
    assert!(matches!(repo.is_bare(), Err(Error::Released { .. })));
    // Released handles stay inert; a second release is a no-op.
    repo.release().expect("second release");
    assert_eq!(rt.phase(), Phase::Initialized { live: 0 });

    rt.shutdown().expect("shutdown");
    assert_eq!(rt.phase(), Phase::Uninitialized);

    // The next call brings the library back up.
    let reopened = Repository::open("/it/lifetime").expect("open");
    assert_eq!(rt.phase(), Phase::Initialized { live: 1 });
    drop(reopened);
    assert_eq!(rt.live_handles(), 0);
}
