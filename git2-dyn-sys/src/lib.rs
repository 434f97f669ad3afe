//! Raw C-ABI declarations for `libgit2`.
//!
//! Nothing here is linked: the native module is loaded at runtime and every
//! export is resolved by name (see the `git2-dyn` crate). This crate only
//! carries the memory layouts, constants and callback signatures the C header
//! declares, so that resolved function pointers can be typed.
//!
//! Layouts follow the `git_threads_init` era of the library (the same ABI the
//! decorated `_name@N` export tables were produced from).

// sys crate: mirrors C naming and layouts.
#![allow(
    missing_docs,
    non_camel_case_types,
    non_upper_case_globals,
    non_snake_case,
    missing_copy_implementations,
    missing_debug_implementations
)]

use std::ffi::{c_char, c_int, c_uint, c_void};

pub type git_time_t = i64;
pub type git_off_t = i64;
pub type size_t = usize;

pub const GIT_OID_RAWSZ: usize = 20;
pub const GIT_OID_HEXSZ: usize = GIT_OID_RAWSZ * 2;
pub const GIT_PATH_MAX: usize = 4096;

// ---------------------------------------------------------------------------
// Opaque resources
// ---------------------------------------------------------------------------

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _unused: [u8; 0],
            }
        )*
    };
}

opaque!(
    git_repository,
    git_reference,
    git_object,
    git_index,
    git_config,
    git_remote,
    git_push,
    git_treebuilder,
    git_revwalk,
    git_diff_list,
    git_note,
    git_odb,
    git_odb_backend,
    git_tree_entry,
    git_tree,
    git_refspec,
);

// ---------------------------------------------------------------------------
// Plain data
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct git_oid {
    pub id: [u8; GIT_OID_RAWSZ],
}

#[repr(C)]
pub struct git_error {
    pub message: *mut c_char,
    pub klass: c_int,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct git_time {
    pub time: git_time_t,
    pub offset: c_int,
}

#[repr(C)]
pub struct git_signature {
    pub name: *mut c_char,
    pub email: *mut c_char,
    pub when: git_time,
}

#[repr(C)]
pub struct git_config_entry {
    pub name: *const c_char,
    pub value: *const c_char,
    pub level: c_uint,
}

#[repr(C)]
pub struct git_strarray {
    pub strings: *mut *mut c_char,
    pub count: size_t,
}

#[repr(C)]
pub struct git_buf {
    pub ptr: *mut c_char,
    pub asize: size_t,
    pub size: size_t,
}

#[repr(C)]
pub struct git_diff_file {
    pub oid: git_oid,
    pub path: *const c_char,
    pub size: git_off_t,
    pub flags: u32,
    pub mode: u16,
}

#[repr(C)]
pub struct git_diff_delta {
    pub old_file: git_diff_file,
    pub new_file: git_diff_file,
    pub status: c_int,
    pub similarity: u32,
    pub flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct git_diff_range {
    pub old_start: c_int,
    pub old_lines: c_int,
    pub new_start: c_int,
    pub new_lines: c_int,
}

pub const GIT_DIFF_OPTIONS_VERSION: c_uint = 1;

#[repr(C)]
pub struct git_diff_options {
    pub version: c_uint,
    pub flags: u32,
    pub context_lines: u16,
    pub interhunk_lines: u16,
    pub old_prefix: *const c_char,
    pub new_prefix: *const c_char,
    pub pathspec: git_strarray,
    pub max_size: git_off_t,
}

#[repr(C)]
pub struct git_remote_head {
    pub local: c_int,
    pub oid: git_oid,
    pub loid: git_oid,
    pub name: *mut c_char,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct git_index_time {
    pub seconds: git_time_t,
    pub nanoseconds: c_uint,
}

#[repr(C)]
pub struct git_index_entry {
    pub ctime: git_index_time,
    pub mtime: git_index_time,
    pub dev: c_uint,
    pub ino: c_uint,
    pub mode: c_uint,
    pub uid: c_uint,
    pub gid: c_uint,
    pub file_size: git_off_t,
    pub oid: git_oid,
    pub flags: u16,
    pub flags_extended: u16,
    pub path: *mut c_char,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct git_transfer_progress {
    pub total_objects: c_uint,
    pub indexed_objects: c_uint,
    pub received_objects: c_uint,
    pub received_bytes: size_t,
}

pub const GIT_CHECKOUT_OPTS_VERSION: c_uint = 1;

#[repr(C)]
pub struct git_checkout_opts {
    pub version: c_uint,
    pub checkout_strategy: c_uint,
    pub disable_filters: c_int,
    pub dir_mode: c_uint,
    pub file_mode: c_uint,
    pub file_open_flags: c_int,
    pub notify_flags: c_uint,
    pub notify_cb: Option<git_checkout_notify_cb>,
    pub notify_payload: *mut c_void,
    pub progress_cb: Option<git_checkout_progress_cb>,
    pub progress_payload: *mut c_void,
    pub paths: git_strarray,
    pub baseline: *mut git_tree,
}

pub const GIT_REMOTE_CALLBACKS_VERSION: c_uint = 1;

#[repr(C)]
pub struct git_remote_callbacks {
    pub version: c_uint,
    pub progress: Option<git_remote_progress_cb>,
    pub completion: Option<git_remote_completion_cb>,
    pub update_tips: Option<git_remote_update_tips_cb>,
    pub payload: *mut c_void,
}

pub const GIT_CLONE_OPTIONS_VERSION: c_uint = 1;

#[repr(C)]
pub struct git_clone_options {
    pub version: c_uint,
    pub checkout_opts: git_checkout_opts,
    pub bare: c_int,
    pub fetch_progress_cb: Option<git_transfer_progress_callback>,
    pub fetch_progress_payload: *mut c_void,
    pub remote_name: *const c_char,
    pub pushurl: *const c_char,
    pub fetch_spec: *const c_char,
    pub push_spec: *const c_char,
    pub cred_acquire_cb: Option<git_cred_acquire_cb>,
    pub cred_acquire_payload: *mut c_void,
    pub transport_flags: c_int,
    pub transport: *mut c_void,
    pub remote_callbacks: *mut git_remote_callbacks,
    pub remote_autotag: c_int,
}

#[repr(C)]
pub struct git_cred {
    pub credtype: c_int,
    pub free: Option<unsafe extern "system" fn(cred: *mut git_cred)>,
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

pub type git_branch_foreach_cb =
    unsafe extern "system" fn(branch_name: *const c_char, branch_type: c_uint, payload: *mut c_void) -> c_int;

pub type git_config_foreach_cb =
    unsafe extern "system" fn(entry: *const git_config_entry, payload: *mut c_void) -> c_int;

pub type git_reference_foreach_cb =
    unsafe extern "system" fn(refname: *const c_char, payload: *mut c_void) -> c_int;

pub type git_status_cb =
    unsafe extern "system" fn(path: *const c_char, status_flags: c_uint, payload: *mut c_void) -> c_int;

pub type git_diff_file_cb =
    unsafe extern "system" fn(delta: *const git_diff_delta, progress: f32, payload: *mut c_void) -> c_int;

pub type git_diff_hunk_cb = unsafe extern "system" fn(
    delta: *const git_diff_delta,
    range: *const git_diff_range,
    header: *const c_char,
    header_len: size_t,
    payload: *mut c_void,
) -> c_int;

pub type git_diff_data_cb = unsafe extern "system" fn(
    delta: *const git_diff_delta,
    range: *const git_diff_range,
    line_origin: c_char,
    content: *const c_char,
    content_len: size_t,
    payload: *mut c_void,
) -> c_int;

pub type git_note_foreach_cb = unsafe extern "system" fn(
    blob_id: *const git_oid,
    annotated_object_id: *const git_oid,
    payload: *mut c_void,
) -> c_int;

pub type git_push_status_cb =
    unsafe extern "system" fn(refname: *const c_char, msg: *const c_char, data: *mut c_void) -> c_int;

pub type git_headlist_cb =
    unsafe extern "system" fn(rhead: *mut git_remote_head, payload: *mut c_void) -> c_int;

pub type git_repository_fetchhead_foreach_cb = unsafe extern "system" fn(
    ref_name: *const c_char,
    remote_url: *const c_char,
    oid: *const git_oid,
    is_merge: c_uint,
    payload: *mut c_void,
) -> c_int;

pub type git_repository_mergehead_foreach_cb =
    unsafe extern "system" fn(oid: *const git_oid, payload: *mut c_void) -> c_int;

pub type git_transfer_progress_callback =
    unsafe extern "system" fn(stats: *const git_transfer_progress, payload: *mut c_void);

pub type git_blob_chunk_cb =
    unsafe extern "system" fn(content: *mut c_char, max_length: size_t, payload: *mut c_void) -> c_int;

pub type git_cred_acquire_cb = unsafe extern "system" fn(
    cred: *mut *mut git_cred,
    url: *const c_char,
    allowed_types: c_uint,
    payload: *mut c_void,
) -> c_int;

pub type git_remote_progress_cb =
    unsafe extern "system" fn(text: *const c_char, len: c_int, data: *mut c_void);

pub type git_remote_completion_cb =
    unsafe extern "system" fn(completion_type: c_int, data: *mut c_void) -> c_int;

pub type git_remote_update_tips_cb = unsafe extern "system" fn(
    refname: *const c_char,
    old_id: *const git_oid,
    new_id: *const git_oid,
    data: *mut c_void,
) -> c_int;

pub type git_checkout_notify_cb = unsafe extern "system" fn(
    why: c_uint,
    path: *const c_char,
    baseline: *const c_void,
    target: *const c_void,
    workdir: *const c_void,
    payload: *mut c_void,
) -> c_int;

pub type git_checkout_progress_cb = unsafe extern "system" fn(
    path: *const c_char,
    completed_steps: size_t,
    total_steps: size_t,
    payload: *mut c_void,
);

// ---------------------------------------------------------------------------
// Return codes
// ---------------------------------------------------------------------------

pub const GIT_OK: c_int = 0;
pub const GIT_ERROR: c_int = -1;
pub const GIT_ENOTFOUND: c_int = -3;
pub const GIT_EEXISTS: c_int = -4;
pub const GIT_EAMBIGUOUS: c_int = -5;
pub const GIT_EBUFS: c_int = -6;
pub const GIT_EUSER: c_int = -7;
pub const GIT_EBAREREPO: c_int = -8;
pub const GIT_EORPHANEDHEAD: c_int = -9;
pub const GIT_EUNMERGED: c_int = -10;
pub const GIT_ENONFASTFORWARD: c_int = -11;
pub const GIT_EINVALIDSPEC: c_int = -12;
pub const GIT_EMERGECONFLICT: c_int = -13;
pub const GIT_PASSTHROUGH: c_int = -30;
pub const GIT_ITEROVER: c_int = -31;

// Error classes
pub const GITERR_NOMEMORY: c_int = 1;
pub const GITERR_OS: c_int = 2;
pub const GITERR_INVALID: c_int = 3;
pub const GITERR_REFERENCE: c_int = 4;
pub const GITERR_ZLIB: c_int = 5;
pub const GITERR_REPOSITORY: c_int = 6;
pub const GITERR_CONFIG: c_int = 7;
pub const GITERR_REGEX: c_int = 8;
pub const GITERR_ODB: c_int = 9;
pub const GITERR_INDEX: c_int = 10;
pub const GITERR_OBJECT: c_int = 11;
pub const GITERR_NET: c_int = 12;
pub const GITERR_TAG: c_int = 13;
pub const GITERR_TREE: c_int = 14;
pub const GITERR_INDEXER: c_int = 15;
pub const GITERR_SSL: c_int = 16;
pub const GITERR_SUBMODULE: c_int = 17;
pub const GITERR_THREAD: c_int = 18;
pub const GITERR_STASH: c_int = 19;
pub const GITERR_CHECKOUT: c_int = 20;

// ---------------------------------------------------------------------------
// Enumerations passed as integers
// ---------------------------------------------------------------------------

pub const GIT_BRANCH_LOCAL: c_uint = 1;
pub const GIT_BRANCH_REMOTE: c_uint = 2;

pub const GIT_REF_INVALID: c_int = 0;
pub const GIT_REF_OID: c_int = 1;
pub const GIT_REF_SYMBOLIC: c_int = 2;
pub const GIT_REF_LISTALL: c_int = GIT_REF_OID | GIT_REF_SYMBOLIC;

pub const GIT_OBJ_ANY: c_int = -2;
pub const GIT_OBJ_BAD: c_int = -1;
pub const GIT_OBJ_COMMIT: c_int = 1;
pub const GIT_OBJ_TREE: c_int = 2;
pub const GIT_OBJ_BLOB: c_int = 3;
pub const GIT_OBJ_TAG: c_int = 4;

pub const GIT_SORT_NONE: c_uint = 0;
pub const GIT_SORT_TOPOLOGICAL: c_uint = 1 << 0;
pub const GIT_SORT_TIME: c_uint = 1 << 1;
pub const GIT_SORT_REVERSE: c_uint = 1 << 2;

pub const GIT_STATUS_CURRENT: c_uint = 0;
pub const GIT_STATUS_INDEX_NEW: c_uint = 1 << 0;
pub const GIT_STATUS_INDEX_MODIFIED: c_uint = 1 << 1;
pub const GIT_STATUS_INDEX_DELETED: c_uint = 1 << 2;
pub const GIT_STATUS_INDEX_RENAMED: c_uint = 1 << 3;
pub const GIT_STATUS_INDEX_TYPECHANGE: c_uint = 1 << 4;
pub const GIT_STATUS_WT_NEW: c_uint = 1 << 7;
pub const GIT_STATUS_WT_MODIFIED: c_uint = 1 << 8;
pub const GIT_STATUS_WT_DELETED: c_uint = 1 << 9;
pub const GIT_STATUS_WT_TYPECHANGE: c_uint = 1 << 10;
pub const GIT_STATUS_IGNORED: c_uint = 1 << 14;

pub const GIT_DIFF_LINE_CONTEXT: c_char = b' ' as c_char;
pub const GIT_DIFF_LINE_ADDITION: c_char = b'+' as c_char;
pub const GIT_DIFF_LINE_DELETION: c_char = b'-' as c_char;
pub const GIT_DIFF_LINE_ADD_EOFNL: c_char = b'\n' as c_char;
pub const GIT_DIFF_LINE_DEL_EOFNL: c_char = b'\0' as c_char;
pub const GIT_DIFF_LINE_FILE_HDR: c_char = b'F' as c_char;
pub const GIT_DIFF_LINE_HUNK_HDR: c_char = b'H' as c_char;
pub const GIT_DIFF_LINE_BINARY: c_char = b'B' as c_char;

pub const GIT_DELTA_UNMODIFIED: c_int = 0;
pub const GIT_DELTA_ADDED: c_int = 1;
pub const GIT_DELTA_DELETED: c_int = 2;
pub const GIT_DELTA_MODIFIED: c_int = 3;
pub const GIT_DELTA_RENAMED: c_int = 4;
pub const GIT_DELTA_COPIED: c_int = 5;
pub const GIT_DELTA_IGNORED: c_int = 6;
pub const GIT_DELTA_UNTRACKED: c_int = 7;
pub const GIT_DELTA_TYPECHANGE: c_int = 8;

pub const GIT_CONFIG_LEVEL_SYSTEM: c_uint = 1;
pub const GIT_CONFIG_LEVEL_XDG: c_uint = 2;
pub const GIT_CONFIG_LEVEL_GLOBAL: c_uint = 3;
pub const GIT_CONFIG_LEVEL_LOCAL: c_uint = 4;
pub const GIT_CONFIG_HIGHEST_LEVEL: c_int = -1;

pub const GIT_RESET_SOFT: c_int = 1;
pub const GIT_RESET_MIXED: c_int = 2;
pub const GIT_RESET_HARD: c_int = 3;

pub const GIT_DIRECTION_FETCH: c_int = 0;
pub const GIT_DIRECTION_PUSH: c_int = 1;

pub const GIT_REMOTE_DOWNLOAD_TAGS_AUTO: c_int = 0;
pub const GIT_REMOTE_DOWNLOAD_TAGS_NONE: c_int = 1;
pub const GIT_REMOTE_DOWNLOAD_TAGS_ALL: c_int = 2;

pub const GIT_REMOTE_COMPLETION_DOWNLOAD: c_int = 0;
pub const GIT_REMOTE_COMPLETION_INDEXING: c_int = 1;
pub const GIT_REMOTE_COMPLETION_ERROR: c_int = 2;

pub const GIT_CREDTYPE_USERPASS_PLAINTEXT: c_uint = 1;

pub const GIT_REPOSITORY_STATE_NONE: c_int = 0;
pub const GIT_REPOSITORY_STATE_MERGE: c_int = 1;
pub const GIT_REPOSITORY_STATE_REVERT: c_int = 2;
pub const GIT_REPOSITORY_STATE_CHERRY_PICK: c_int = 3;
pub const GIT_REPOSITORY_STATE_BISECT: c_int = 4;
pub const GIT_REPOSITORY_STATE_REBASE: c_int = 5;
pub const GIT_REPOSITORY_STATE_REBASE_INTERACTIVE: c_int = 6;
pub const GIT_REPOSITORY_STATE_REBASE_MERGE: c_int = 7;
pub const GIT_REPOSITORY_STATE_APPLY_MAILBOX: c_int = 8;
pub const GIT_REPOSITORY_STATE_APPLY_MAILBOX_OR_REBASE: c_int = 9;

pub const GIT_FILEMODE_NEW: c_uint = 0o000000;
pub const GIT_FILEMODE_TREE: c_uint = 0o040000;
pub const GIT_FILEMODE_BLOB: c_uint = 0o100644;
pub const GIT_FILEMODE_BLOB_EXECUTABLE: c_uint = 0o100755;
pub const GIT_FILEMODE_LINK: c_uint = 0o120000;
pub const GIT_FILEMODE_COMMIT: c_uint = 0o160000;

pub const GIT_CHECKOUT_NONE: c_uint = 0;
pub const GIT_CHECKOUT_SAFE: c_uint = 1 << 0;
pub const GIT_CHECKOUT_SAFE_CREATE: c_uint = 1 << 1;
pub const GIT_CHECKOUT_FORCE: c_uint = 1 << 2;
