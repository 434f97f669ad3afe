//! Unbound exports answer without touching the native library or the
//! process-wide runtime.

use git2_dyn::{CallingConvention, Config, ExportTable, remote};

#[test]
fn remote_name_check_leaves_the_global_runtime_uninstalled() {
    let v = remote::is_valid_name("origin");
    assert_eq!(v.export, "git_remote_is_valid_name");
    assert!(v.value);

    let table = ExportTable::new(git2_dyn_stub::exports());
    let guard = git2_dyn::init(Config::default().loader(table.clone()).convention(CallingConvention::Cdecl))
        .expect("no runtime was installed before init");
    assert_eq!(table.loads(), 0);
    drop(guard);
}
