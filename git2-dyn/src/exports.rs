//! Typed declarations of every native export the binding calls.
//!
//! Each entry becomes a [`FunctionBinding`] constant named after the export.
//! The stack width used for `_name@N` decoration is computed from the
//! argument types, so a signature and its decorated name cannot drift apart.

// Constants mirror the C export names.
#![allow(non_upper_case_globals, clippy::type_complexity)]

use std::ffi::{c_char, c_int, c_uint, c_void};

use git2_dyn_sys::{self as sys, git_off_t, git_time_t, size_t};

use crate::resolver::{Export, FunctionBinding};

/// Byte width an argument occupies on a 32-bit stack.
pub trait AbiWidth {
    /// Width in bytes.
    const WIDTH: usize;
}

macro_rules! abi_width {
    ($width:literal: $($ty:ty),*) => {
        $(impl AbiWidth for $ty { const WIDTH: usize = $width; })*
    };
}

abi_width!(4: i8, u8, i16, u16, i32, u32, usize, isize, f32);
abi_width!(8: i64, u64, f64);

impl<T: ?Sized> AbiWidth for *const T {
    const WIDTH: usize = 4;
}

impl<T: ?Sized> AbiWidth for *mut T {
    const WIDTH: usize = 4;
}

// Nullable function pointers.
impl<T> AbiWidth for Option<T> {
    const WIDTH: usize = 4;
}

macro_rules! exports {
    ($( $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? ; )*) => {
        $(
            pub(crate) const $name: FunctionBinding<unsafe extern "system" fn($($ty),*) $(-> $ret)?> =
                FunctionBinding::new(stringify!($name), 0 $(+ <$ty as AbiWidth>::WIDTH)*);
        )*

        /// Every export the binding resolves, in declaration order.
        pub static ALL: &[Export] = &[$($name.export()),*];
    };
}

exports! {
    // Library lifetime and error channel.
    git_threads_init() -> c_int;
    git_threads_shutdown();
    giterr_last() -> *const sys::git_error;
    giterr_set_str(error_class: c_int, string: *const c_char);
    giterr_set_oom();
    git_buf_free(buffer: *mut sys::git_buf);

    // Blob.
    git_blob_create_fromchunks(
        oid: *mut sys::git_oid,
        repo: *mut sys::git_repository,
        hintpath: *const c_char,
        callback: Option<sys::git_blob_chunk_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_blob_create_fromdisk(oid: *mut sys::git_oid, repo: *mut sys::git_repository, path: *const c_char) -> c_int;
    git_blob_create_fromworkdir(oid: *mut sys::git_oid, repo: *mut sys::git_repository, relative_path: *const c_char) -> c_int;
    git_blob_is_binary(blob: *mut sys::git_object) -> c_int;
    git_blob_rawcontent(blob: *mut sys::git_object) -> *const c_void;
    git_blob_rawsize(blob: *mut sys::git_object) -> git_off_t;

    // Branch.
    git_branch_create(
        out: *mut *mut sys::git_reference,
        repo: *mut sys::git_repository,
        branch_name: *const c_char,
        target: *mut sys::git_object,
        force: c_int,
    ) -> c_int;
    git_branch_delete(branch: *mut sys::git_reference) -> c_int;
    git_branch_foreach(
        repo: *mut sys::git_repository,
        list_flags: c_uint,
        callback: Option<sys::git_branch_foreach_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_branch_move(branch: *mut sys::git_reference, new_branch_name: *const c_char, force: c_int) -> c_int;
    git_branch_tracking_name(
        tracking_branch_name_out: *mut c_char,
        buffer_size: size_t,
        repo: *mut sys::git_repository,
        canonical_branch_name: *const c_char,
    ) -> c_int;
    git_branch_upstream_name(out: *mut sys::git_buf, repo: *mut sys::git_repository, refname: *const c_char) -> c_int;

    // Checkout.
    git_checkout_index(repo: *mut sys::git_repository, index: *mut sys::git_index, opts: *const sys::git_checkout_opts) -> c_int;
    git_checkout_tree(repo: *mut sys::git_repository, treeish: *mut sys::git_object, opts: *const sys::git_checkout_opts) -> c_int;

    // Clone.
    git_clone(
        out: *mut *mut sys::git_repository,
        url: *const c_char,
        local_path: *const c_char,
        options: *const sys::git_clone_options,
    ) -> c_int;

    // Commit.
    git_commit_author(commit: *mut sys::git_object) -> *const sys::git_signature;
    git_commit_committer(commit: *mut sys::git_object) -> *const sys::git_signature;
    git_commit_create(
        id: *mut sys::git_oid,
        repo: *mut sys::git_repository,
        update_ref: *const c_char,
        author: *const sys::git_signature,
        committer: *const sys::git_signature,
        message_encoding: *const c_char,
        message: *const c_char,
        tree: *mut sys::git_object,
        parent_count: c_int,
        parents: *const *mut sys::git_object,
    ) -> c_int;
    git_commit_message(commit: *mut sys::git_object) -> *const c_char;
    git_commit_message_encoding(commit: *mut sys::git_object) -> *const c_char;
    git_commit_parent_id(commit: *mut sys::git_object, n: c_uint) -> *const sys::git_oid;
    git_commit_parentcount(commit: *mut sys::git_object) -> c_uint;
    git_commit_tree_id(commit: *mut sys::git_object) -> *const sys::git_oid;

    // Config.
    git_config_add_file_ondisk(cfg: *mut sys::git_config, path: *const c_char, level: c_uint, force: c_int) -> c_int;
    git_config_delete_entry(cfg: *mut sys::git_config, name: *const c_char) -> c_int;
    git_config_find_global(global_config_path: *mut c_char, length: size_t) -> c_int;
    git_config_find_system(system_config_path: *mut c_char, length: size_t) -> c_int;
    git_config_find_xdg(xdg_config_path: *mut c_char, length: size_t) -> c_int;
    git_config_foreach(
        cfg: *mut sys::git_config,
        callback: Option<sys::git_config_foreach_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_config_free(cfg: *mut sys::git_config);
    git_config_get_entry(out: *mut *const sys::git_config_entry, cfg: *mut sys::git_config, name: *const c_char) -> c_int;
    git_config_new(out: *mut *mut sys::git_config) -> c_int;
    git_config_open_level(out: *mut *mut sys::git_config, parent: *mut sys::git_config, level: c_uint) -> c_int;
    git_config_parse_bool(out: *mut c_int, value: *const c_char) -> c_int;
    git_config_parse_int32(out: *mut i32, value: *const c_char) -> c_int;
    git_config_parse_int64(out: *mut i64, value: *const c_char) -> c_int;
    git_config_set_bool(cfg: *mut sys::git_config, name: *const c_char, value: c_int) -> c_int;
    git_config_set_int32(cfg: *mut sys::git_config, name: *const c_char, value: i32) -> c_int;
    git_config_set_int64(cfg: *mut sys::git_config, name: *const c_char, value: i64) -> c_int;
    git_config_set_string(cfg: *mut sys::git_config, name: *const c_char, value: *const c_char) -> c_int;

    // Credential.
    git_cred_userpass_plaintext_new(out: *mut *mut sys::git_cred, username: *const c_char, password: *const c_char) -> c_int;

    // Diff.
    git_diff_blobs(
        old_blob: *mut sys::git_object,
        new_blob: *mut sys::git_object,
        options: *const sys::git_diff_options,
        file_cb: Option<sys::git_diff_file_cb>,
        hunk_cb: Option<sys::git_diff_hunk_cb>,
        line_cb: Option<sys::git_diff_data_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_diff_index_to_workdir(
        diff: *mut *mut sys::git_diff_list,
        repo: *mut sys::git_repository,
        index: *mut sys::git_index,
        options: *const sys::git_diff_options,
    ) -> c_int;
    git_diff_list_free(diff: *mut sys::git_diff_list);
    git_diff_merge(onto: *mut sys::git_diff_list, from: *const sys::git_diff_list) -> c_int;
    git_diff_print_patch(
        diff: *mut sys::git_diff_list,
        print_cb: Option<sys::git_diff_data_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_diff_tree_to_index(
        diff: *mut *mut sys::git_diff_list,
        repo: *mut sys::git_repository,
        old_tree: *mut sys::git_object,
        index: *mut sys::git_index,
        options: *const sys::git_diff_options,
    ) -> c_int;
    git_diff_tree_to_tree(
        diff: *mut *mut sys::git_diff_list,
        repo: *mut sys::git_repository,
        old_tree: *mut sys::git_object,
        new_tree: *mut sys::git_object,
        options: *const sys::git_diff_options,
    ) -> c_int;
    git_diff_tree_to_workdir(
        diff: *mut *mut sys::git_diff_list,
        repo: *mut sys::git_repository,
        old_tree: *mut sys::git_object,
        options: *const sys::git_diff_options,
    ) -> c_int;

    // Graph, merge, message, ignore.
    git_graph_ahead_behind(
        ahead: *mut size_t,
        behind: *mut size_t,
        repo: *mut sys::git_repository,
        local: *const sys::git_oid,
        upstream: *const sys::git_oid,
    ) -> c_int;
    git_merge_base(
        out: *mut sys::git_oid,
        repo: *mut sys::git_repository,
        one: *const sys::git_oid,
        two: *const sys::git_oid,
    ) -> c_int;
    git_message_prettify(out: *mut c_char, out_size: size_t, message: *const c_char, strip_comments: c_int) -> c_int;
    git_ignore_add_rule(repo: *mut sys::git_repository, rules: *const c_char) -> c_int;
    git_ignore_clear_internal_rules(repo: *mut sys::git_repository) -> c_int;
    git_ignore_path_is_ignored(ignored: *mut c_int, repo: *mut sys::git_repository, path: *const c_char) -> c_int;

    // Index.
    git_index_add(index: *mut sys::git_index, entry: *const sys::git_index_entry) -> c_int;
    git_index_add_bypath(index: *mut sys::git_index, path: *const c_char) -> c_int;
    git_index_conflict_get(
        ancestor_out: *mut *const sys::git_index_entry,
        our_out: *mut *const sys::git_index_entry,
        their_out: *mut *const sys::git_index_entry,
        index: *mut sys::git_index,
        path: *const c_char,
    ) -> c_int;
    git_index_entry_stage(entry: *const sys::git_index_entry) -> c_int;
    git_index_entrycount(index: *mut sys::git_index) -> size_t;
    git_index_find(at_pos: *mut size_t, index: *mut sys::git_index, path: *const c_char) -> c_int;
    git_index_free(index: *mut sys::git_index);
    git_index_get_byindex(index: *mut sys::git_index, n: size_t) -> *const sys::git_index_entry;
    git_index_get_bypath(index: *mut sys::git_index, path: *const c_char, stage: c_int) -> *const sys::git_index_entry;
    git_index_has_conflicts(index: *mut sys::git_index) -> c_int;
    git_index_open(out: *mut *mut sys::git_index, index_path: *const c_char) -> c_int;
    git_index_remove(index: *mut sys::git_index, path: *const c_char, stage: c_int) -> c_int;
    git_index_write(index: *mut sys::git_index) -> c_int;
    git_index_write_tree(out: *mut sys::git_oid, index: *mut sys::git_index) -> c_int;

    // Notes.
    git_note_create(
        out: *mut sys::git_oid,
        repo: *mut sys::git_repository,
        author: *const sys::git_signature,
        committer: *const sys::git_signature,
        notes_ref: *const c_char,
        oid: *const sys::git_oid,
        note: *const c_char,
        force: c_int,
    ) -> c_int;
    git_note_default_ref(out: *mut *const c_char, repo: *mut sys::git_repository) -> c_int;
    git_note_foreach(
        repo: *mut sys::git_repository,
        notes_ref: *const c_char,
        note_cb: Option<sys::git_note_foreach_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_note_free(note: *mut sys::git_note);
    git_note_message(note: *mut sys::git_note) -> *const c_char;
    git_note_oid(note: *mut sys::git_note) -> *const sys::git_oid;
    git_note_read(
        out: *mut *mut sys::git_note,
        repo: *mut sys::git_repository,
        notes_ref: *const c_char,
        oid: *const sys::git_oid,
    ) -> c_int;
    git_note_remove(
        repo: *mut sys::git_repository,
        notes_ref: *const c_char,
        author: *const sys::git_signature,
        committer: *const sys::git_signature,
        oid: *const sys::git_oid,
    ) -> c_int;

    // Object database.
    git_odb_add_backend(odb: *mut sys::git_odb, backend: *mut sys::git_odb_backend, priority: c_int) -> c_int;
    git_odb_backend_malloc(backend: *mut sys::git_odb_backend, len: size_t) -> *mut c_void;
    git_odb_exists(odb: *mut sys::git_odb, id: *const sys::git_oid) -> c_int;
    git_odb_free(odb: *mut sys::git_odb);

    // Object.
    git_object_free(object: *mut sys::git_object);
    git_object_id(obj: *mut sys::git_object) -> *const sys::git_oid;
    git_object_lookup(
        object: *mut *mut sys::git_object,
        repo: *mut sys::git_repository,
        id: *const sys::git_oid,
        kind: c_int,
    ) -> c_int;
    git_object_peel(peeled: *mut *mut sys::git_object, object: *mut sys::git_object, target_type: c_int) -> c_int;
    git_object_type(obj: *mut sys::git_object) -> c_int;

    // Push.
    git_push_add_refspec(push: *mut sys::git_push, refspec: *const c_char) -> c_int;
    git_push_finish(push: *mut sys::git_push) -> c_int;
    git_push_free(push: *mut sys::git_push);
    git_push_new(out: *mut *mut sys::git_push, remote: *mut sys::git_remote) -> c_int;
    git_push_status_foreach(
        push: *mut sys::git_push,
        callback: Option<sys::git_push_status_cb>,
        data: *mut c_void,
    ) -> c_int;
    git_push_unpack_ok(push: *mut sys::git_push) -> c_int;
    git_push_update_tips(push: *mut sys::git_push) -> c_int;

    // Reference.
    git_reference_create(
        out: *mut *mut sys::git_reference,
        repo: *mut sys::git_repository,
        name: *const c_char,
        id: *const sys::git_oid,
        force: c_int,
    ) -> c_int;
    git_reference_delete(reference: *mut sys::git_reference) -> c_int;
    git_reference_foreach_glob(
        repo: *mut sys::git_repository,
        glob: *const c_char,
        list_flags: c_uint,
        callback: Option<sys::git_reference_foreach_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_reference_free(reference: *mut sys::git_reference);
    git_reference_is_valid_name(refname: *const c_char) -> c_int;
    git_reference_lookup(out: *mut *mut sys::git_reference, repo: *mut sys::git_repository, name: *const c_char) -> c_int;
    git_reference_name(reference: *mut sys::git_reference) -> *const c_char;
    git_reference_rename(reference: *mut sys::git_reference, new_name: *const c_char, force: c_int) -> c_int;
    git_reference_resolve(out: *mut *mut sys::git_reference, reference: *mut sys::git_reference) -> c_int;
    git_reference_set_target(reference: *mut sys::git_reference, id: *const sys::git_oid) -> c_int;
    git_reference_symbolic_create(
        out: *mut *mut sys::git_reference,
        repo: *mut sys::git_repository,
        name: *const c_char,
        target: *const c_char,
        force: c_int,
    ) -> c_int;
    git_reference_symbolic_set_target(reference: *mut sys::git_reference, target: *const c_char) -> c_int;
    git_reference_symbolic_target(reference: *mut sys::git_reference) -> *const c_char;
    git_reference_target(reference: *mut sys::git_reference) -> *const sys::git_oid;
    git_reference_type(reference: *mut sys::git_reference) -> c_int;

    // Remote.
    git_remote_connect(remote: *mut sys::git_remote, direction: c_int) -> c_int;
    git_remote_create(
        out: *mut *mut sys::git_remote,
        repo: *mut sys::git_repository,
        name: *const c_char,
        url: *const c_char,
    ) -> c_int;
    git_remote_disconnect(remote: *mut sys::git_remote);
    git_remote_download(
        remote: *mut sys::git_remote,
        progress_cb: Option<sys::git_transfer_progress_callback>,
        payload: *mut c_void,
    ) -> c_int;
    git_remote_fetchspec(remote: *mut sys::git_remote) -> *const sys::git_refspec;
    git_remote_free(remote: *mut sys::git_remote);
    git_remote_load(out: *mut *mut sys::git_remote, repo: *mut sys::git_repository, name: *const c_char) -> c_int;
    git_remote_ls(remote: *mut sys::git_remote, list_cb: Option<sys::git_headlist_cb>, payload: *mut c_void) -> c_int;
    git_remote_name(remote: *mut sys::git_remote) -> *const c_char;
    git_remote_save(remote: *mut sys::git_remote) -> c_int;
    git_remote_set_autotag(remote: *mut sys::git_remote, value: c_int);
    git_remote_set_callbacks(remote: *mut sys::git_remote, callbacks: *const sys::git_remote_callbacks) -> c_int;
    git_remote_set_cred_acquire_cb(
        remote: *mut sys::git_remote,
        cred_acquire_cb: Option<sys::git_cred_acquire_cb>,
        payload: *mut c_void,
    );
    git_remote_set_fetchspec(remote: *mut sys::git_remote, spec: *const c_char) -> c_int;
    git_remote_update_tips(remote: *mut sys::git_remote) -> c_int;
    git_remote_url(remote: *mut sys::git_remote) -> *const c_char;

    // Repository.
    git_repository_discover(
        repository_path: *mut c_char,
        size: size_t,
        start_path: *const c_char,
        across_fs: c_int,
        ceiling_dirs: *const c_char,
    ) -> c_int;
    git_repository_fetchhead_foreach(
        repo: *mut sys::git_repository,
        callback: Option<sys::git_repository_fetchhead_foreach_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_repository_free(repo: *mut sys::git_repository);
    git_repository_head_detached(repo: *mut sys::git_repository) -> c_int;
    git_repository_head_orphan(repo: *mut sys::git_repository) -> c_int;
    git_repository_index(out: *mut *mut sys::git_index, repo: *mut sys::git_repository) -> c_int;
    git_repository_init(out: *mut *mut sys::git_repository, path: *const c_char, is_bare: c_uint) -> c_int;
    git_repository_is_bare(repo: *mut sys::git_repository) -> c_int;
    git_repository_is_empty(repo: *mut sys::git_repository) -> c_int;
    git_repository_merge_cleanup(repo: *mut sys::git_repository) -> c_int;
    git_repository_mergehead_foreach(
        repo: *mut sys::git_repository,
        callback: Option<sys::git_repository_mergehead_foreach_cb>,
        payload: *mut c_void,
    ) -> c_int;
    git_repository_odb(out: *mut *mut sys::git_odb, repo: *mut sys::git_repository) -> c_int;
    git_repository_open(out: *mut *mut sys::git_repository, path: *const c_char) -> c_int;
    git_repository_path(repo: *mut sys::git_repository) -> *const c_char;
    git_repository_set_config(repo: *mut sys::git_repository, config: *mut sys::git_config);
    git_repository_set_index(repo: *mut sys::git_repository, index: *mut sys::git_index);
    git_repository_set_workdir(repo: *mut sys::git_repository, workdir: *const c_char, update_gitlink: c_int) -> c_int;
    git_repository_state(repo: *mut sys::git_repository) -> c_int;
    git_repository_workdir(repo: *mut sys::git_repository) -> *const c_char;

    // Reset, revparse.
    git_reset(repo: *mut sys::git_repository, target: *mut sys::git_object, reset_type: c_int) -> c_int;
    git_revparse_single(out: *mut *mut sys::git_object, repo: *mut sys::git_repository, spec: *const c_char) -> c_int;

    // Revwalk.
    git_revwalk_free(walk: *mut sys::git_revwalk);
    git_revwalk_hide(walk: *mut sys::git_revwalk, oid: *const sys::git_oid) -> c_int;
    git_revwalk_new(out: *mut *mut sys::git_revwalk, repo: *mut sys::git_repository) -> c_int;
    git_revwalk_next(out: *mut sys::git_oid, walk: *mut sys::git_revwalk) -> c_int;
    git_revwalk_push(walk: *mut sys::git_revwalk, oid: *const sys::git_oid) -> c_int;
    git_revwalk_reset(walk: *mut sys::git_revwalk);
    git_revwalk_sorting(walk: *mut sys::git_revwalk, sort_mode: c_uint);

    // Signature.
    git_signature_free(sig: *mut sys::git_signature);
    git_signature_new(
        out: *mut *mut sys::git_signature,
        name: *const c_char,
        email: *const c_char,
        time: git_time_t,
        offset: c_int,
    ) -> c_int;

    // Status.
    git_status_file(status_flags: *mut c_uint, repo: *mut sys::git_repository, path: *const c_char) -> c_int;
    git_status_foreach(
        repo: *mut sys::git_repository,
        callback: Option<sys::git_status_cb>,
        payload: *mut c_void,
    ) -> c_int;

    // Tag.
    git_tag_create(
        oid: *mut sys::git_oid,
        repo: *mut sys::git_repository,
        tag_name: *const c_char,
        target: *mut sys::git_object,
        tagger: *const sys::git_signature,
        message: *const c_char,
        force: c_int,
    ) -> c_int;
    git_tag_create_lightweight(
        oid: *mut sys::git_oid,
        repo: *mut sys::git_repository,
        tag_name: *const c_char,
        target: *mut sys::git_object,
        force: c_int,
    ) -> c_int;
    git_tag_delete(repo: *mut sys::git_repository, tag_name: *const c_char) -> c_int;
    git_tag_message(tag: *mut sys::git_object) -> *const c_char;
    git_tag_name(tag: *mut sys::git_object) -> *const c_char;
    git_tag_tagger(tag: *mut sys::git_object) -> *const sys::git_signature;
    git_tag_target_id(tag: *mut sys::git_object) -> *const sys::git_oid;
    git_tag_target_type(tag: *mut sys::git_object) -> c_int;

    // Tree.
    git_tree_entry_byindex(tree: *mut sys::git_object, idx: size_t) -> *const sys::git_tree_entry;
    git_tree_entry_bypath(out: *mut *mut sys::git_tree_entry, root: *mut sys::git_object, path: *const c_char) -> c_int;
    git_tree_entry_filemode(entry: *const sys::git_tree_entry) -> c_uint;
    git_tree_entry_free(entry: *mut sys::git_tree_entry);
    git_tree_entry_id(entry: *const sys::git_tree_entry) -> *const sys::git_oid;
    git_tree_entry_name(entry: *const sys::git_tree_entry) -> *const c_char;
    git_tree_entry_type(entry: *const sys::git_tree_entry) -> c_int;
    git_tree_entrycount(tree: *mut sys::git_object) -> size_t;

    // Treebuilder.
    git_treebuilder_create(out: *mut *mut sys::git_treebuilder, source: *mut sys::git_object) -> c_int;
    git_treebuilder_free(bld: *mut sys::git_treebuilder);
    git_treebuilder_insert(
        entry_out: *mut *const sys::git_tree_entry,
        bld: *mut sys::git_treebuilder,
        filename: *const c_char,
        id: *const sys::git_oid,
        filemode: c_uint,
    ) -> c_int;
    git_treebuilder_write(oid: *mut sys::git_oid, repo: *mut sys::git_repository, bld: *mut sys::git_treebuilder) -> c_int;
}

/// Look up a declared export by its undecorated name.
#[must_use]
pub fn find(name: &str) -> Option<Export> {
    ALL.iter().find(|e| e.name() == name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::CallingConvention;
    use std::collections::HashSet;

    #[test]
    fn widths_match_published_decorations() {
        let cases = [
            ("git_threads_init", 0),
            ("giterr_set_str", 8),
            ("git_signature_new", 24),
            ("git_config_set_int64", 16),
            ("git_commit_create", 40),
            ("git_note_create", 32),
            ("git_diff_blobs", 28),
            ("git_tree_entry_byindex", 8),
            ("git_index_conflict_get", 20),
            ("git_treebuilder_insert", 20),
            ("git_repository_discover", 20),
        ];
        for (name, bytes) in cases {
            let export = find(name).unwrap();
            assert_eq!(export.arg_bytes(), bytes, "{name}");
        }
    }

    #[test]
    fn stdcall_symbol_for_signature_new() {
        let export = find("git_signature_new").unwrap();
        assert_eq!(
            CallingConvention::Stdcall.symbol_name(&export),
            "_git_signature_new@24"
        );
    }

    #[test]
    fn export_names_are_unique() {
        let names: HashSet<_> = ALL.iter().map(Export::name).collect();
        assert_eq!(names.len(), ALL.len());
        assert!(ALL.len() > 170);
    }
}
