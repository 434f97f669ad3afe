//! `git2-dyn-stub`: an in-process stand-in for part of the libgit2 C ABI.
//!
//! Every export follows the native calling contract (negative return codes,
//! a per-thread error record, out-parameters, caller-sized buffers and
//! library-owned `git_buf`s) over in-memory state, so the binding can be
//! exercised without a native module. [`exports`] lists the symbol table for
//! an `ExportTable`; built as a `cdylib` the same symbols can be loaded by path.
//!
//! Repositories, branches, references and status entries live in a
//! process-wide registry keyed by repository root. Tests that share a root
//! share state.
#![allow(unsafe_code, clippy::missing_safety_doc, missing_docs)]

mod config;
mod ffi;
mod message;
mod reference;
mod repository;
mod signature;

use std::ffi::c_void;

pub use config::set_global_config_path;
pub use ffi::frees;
pub use repository::{seed_branch, seed_status};

macro_rules! export_table {
    ($($module:ident :: $name:ident),* $(,)?) => {
        /// `(name, address)` for every export this library provides.
        #[must_use]
        pub fn exports() -> Vec<(&'static str, *const c_void)> {
            vec![$((stringify!($name), $module::$name as *const c_void)),*]
        }
    };
}

export_table! {
    ffi::git_threads_init,
    ffi::git_threads_shutdown,
    ffi::giterr_last,
    ffi::giterr_set_str,
    ffi::giterr_set_oom,
    ffi::git_buf_free,
    repository::git_repository_init,
    repository::git_repository_open,
    repository::git_repository_free,
    repository::git_repository_path,
    repository::git_repository_workdir,
    repository::git_repository_is_bare,
    repository::git_repository_is_empty,
    repository::git_repository_state,
    repository::git_repository_discover,
    repository::git_branch_foreach,
    repository::git_branch_tracking_name,
    repository::git_branch_upstream_name,
    repository::git_status_file,
    repository::git_status_foreach,
    reference::git_reference_create,
    reference::git_reference_symbolic_create,
    reference::git_reference_lookup,
    reference::git_reference_free,
    reference::git_reference_name,
    reference::git_reference_target,
    reference::git_reference_symbolic_target,
    reference::git_reference_type,
    reference::git_reference_resolve,
    reference::git_reference_delete,
    reference::git_reference_rename,
    reference::git_reference_set_target,
    reference::git_reference_symbolic_set_target,
    reference::git_reference_foreach_glob,
    reference::git_reference_is_valid_name,
    config::git_config_new,
    config::git_config_free,
    config::git_config_add_file_ondisk,
    config::git_config_open_level,
    config::git_config_get_entry,
    config::git_config_set_bool,
    config::git_config_set_int32,
    config::git_config_set_int64,
    config::git_config_set_string,
    config::git_config_delete_entry,
    config::git_config_foreach,
    config::git_config_parse_bool,
    config::git_config_parse_int32,
    config::git_config_parse_int64,
    config::git_config_find_global,
    config::git_config_find_system,
    config::git_config_find_xdg,
    signature::git_signature_new,
    signature::git_signature_free,
    signature::git_cred_userpass_plaintext_new,
    message::git_message_prettify,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn table_has_unique_non_null_entries() {
        let table = exports();
        let names: HashSet<_> = table.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), table.len());
        assert!(table.iter().all(|(_, addr)| !addr.is_null()));
    }
}
