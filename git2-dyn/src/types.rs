//! Value types and enumerations shared across the binding surface.

use std::fmt;

use git2_dyn_sys as sys;

macro_rules! ffi_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vm:meta])* $variant:ident = $val:expr),* $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name { $($(#[$vm])* $variant = $val),* }

        impl $name {
            /// Convert from the native integer. Returns `None` for unknown values.
            #[must_use]
            pub fn from_ffi(v: i32) -> Option<Self> {
                #[allow(unreachable_patterns)]
                match v { $(x if x == $val => Some(Self::$variant),)* _ => None }
            }

            /// The native integer for this value.
            #[must_use]
            pub const fn to_ffi(self) -> i32 {
                self as i32
            }
        }
    };
}

ffi_enum! {
    /// Return codes of native operations.
    pub enum ErrorCode {
        /// Generic failure.
        GenericError = sys::GIT_ERROR,
        /// Requested object could not be found.
        NotFound = sys::GIT_ENOTFOUND,
        /// Object exists, preventing the operation.
        Exists = sys::GIT_EEXISTS,
        /// More than one object matches.
        Ambiguous = sys::GIT_EAMBIGUOUS,
        /// Output buffer too short to hold the data.
        BufferTooShort = sys::GIT_EBUFS,
        /// A callback asked to stop.
        User = sys::GIT_EUSER,
        /// Operation not allowed on a bare repository.
        BareRepo = sys::GIT_EBAREREPO,
        /// HEAD refers to a branch with no commits.
        OrphanedHead = sys::GIT_EORPHANEDHEAD,
        /// Merge in progress prevented the operation.
        Unmerged = sys::GIT_EUNMERGED,
        /// Reference was not fast-forwardable.
        NonFastForward = sys::GIT_ENONFASTFORWARD,
        /// Name or spec is not in a valid format.
        InvalidSpec = sys::GIT_EINVALIDSPEC,
        /// Merge conflicts prevented the operation.
        MergeConflict = sys::GIT_EMERGECONFLICT,
        /// Internal passthrough signal.
        Passthrough = sys::GIT_PASSTHROUGH,
        /// Iteration is over.
        IterOver = sys::GIT_ITEROVER,
    }
}

ffi_enum! {
    /// Category recorded alongside a native error message.
    pub enum ErrorClass {
        /// No category.
        None = 0,
        /// Allocation failure.
        NoMemory = sys::GITERR_NOMEMORY,
        /// Operating system error.
        Os = sys::GITERR_OS,
        /// Invalid input.
        Invalid = sys::GITERR_INVALID,
        /// Reference error.
        Reference = sys::GITERR_REFERENCE,
        /// Compression error.
        Zlib = sys::GITERR_ZLIB,
        /// Repository error.
        Repository = sys::GITERR_REPOSITORY,
        /// Configuration error.
        Config = sys::GITERR_CONFIG,
        /// Regular expression error.
        Regex = sys::GITERR_REGEX,
        /// Object database error.
        Odb = sys::GITERR_ODB,
        /// Index error.
        Index = sys::GITERR_INDEX,
        /// Object error.
        Object = sys::GITERR_OBJECT,
        /// Network error.
        Net = sys::GITERR_NET,
        /// Tag error.
        Tag = sys::GITERR_TAG,
        /// Tree error.
        Tree = sys::GITERR_TREE,
        /// Pack indexer error.
        Indexer = sys::GITERR_INDEXER,
        /// TLS error.
        Ssl = sys::GITERR_SSL,
        /// Submodule error.
        Submodule = sys::GITERR_SUBMODULE,
        /// Threading error.
        Thread = sys::GITERR_THREAD,
        /// Stash error.
        Stash = sys::GITERR_STASH,
        /// Checkout error.
        Checkout = sys::GITERR_CHECKOUT,
    }
}

ffi_enum! {
    /// Which branches an enumeration covers; also the kind of a visited branch.
    pub enum BranchType {
        /// Branches under `refs/heads/`.
        Local = 1,
        /// Branches under `refs/remotes/`.
        Remote = 2,
        /// Both local and remote branches.
        All = 3,
    }
}

ffi_enum! {
    /// Reference storage kind.
    pub enum ReferenceType {
        /// Not a valid reference.
        Invalid = sys::GIT_REF_INVALID,
        /// Points directly at an object id.
        Direct = sys::GIT_REF_OID,
        /// Points at another reference.
        Symbolic = sys::GIT_REF_SYMBOLIC,
        /// Both kinds (enumeration filter).
        ListAll = sys::GIT_REF_LISTALL,
    }
}

ffi_enum! {
    /// Object type in the object database.
    pub enum ObjectType {
        /// Any type (lookup wildcard).
        Any = sys::GIT_OBJ_ANY,
        /// Invalid type.
        Bad = sys::GIT_OBJ_BAD,
        /// Commit.
        Commit = sys::GIT_OBJ_COMMIT,
        /// Tree.
        Tree = sys::GIT_OBJ_TREE,
        /// Blob.
        Blob = sys::GIT_OBJ_BLOB,
        /// Annotated tag.
        Tag = sys::GIT_OBJ_TAG,
    }
}

ffi_enum! {
    /// Pending operation recorded in the repository.
    pub enum RepositoryState {
        /// Nothing in progress.
        Clean = sys::GIT_REPOSITORY_STATE_NONE,
        /// Merge.
        Merge = sys::GIT_REPOSITORY_STATE_MERGE,
        /// Revert.
        Revert = sys::GIT_REPOSITORY_STATE_REVERT,
        /// Cherry-pick.
        CherryPick = sys::GIT_REPOSITORY_STATE_CHERRY_PICK,
        /// Bisect.
        Bisect = sys::GIT_REPOSITORY_STATE_BISECT,
        /// Rebase.
        Rebase = sys::GIT_REPOSITORY_STATE_REBASE,
        /// Interactive rebase.
        RebaseInteractive = sys::GIT_REPOSITORY_STATE_REBASE_INTERACTIVE,
        /// Rebase with merge backend.
        RebaseMerge = sys::GIT_REPOSITORY_STATE_REBASE_MERGE,
        /// `git am`.
        ApplyMailbox = sys::GIT_REPOSITORY_STATE_APPLY_MAILBOX,
        /// `git am` or rebase.
        ApplyMailboxOrRebase = sys::GIT_REPOSITORY_STATE_APPLY_MAILBOX_OR_REBASE,
    }
}

ffi_enum! {
    /// Reset mode.
    pub enum ResetType {
        /// Move HEAD only.
        Soft = sys::GIT_RESET_SOFT,
        /// Move HEAD and reset the index.
        Mixed = sys::GIT_RESET_MIXED,
        /// Move HEAD, reset the index and the working directory.
        Hard = sys::GIT_RESET_HARD,
    }
}

ffi_enum! {
    /// Remote connection direction.
    pub enum Direction {
        /// Fetch.
        Fetch = sys::GIT_DIRECTION_FETCH,
        /// Push.
        Push = sys::GIT_DIRECTION_PUSH,
    }
}

ffi_enum! {
    /// Automatic tag following on fetch.
    pub enum AutotagOption {
        /// Tags pointing at fetched objects.
        Auto = sys::GIT_REMOTE_DOWNLOAD_TAGS_AUTO,
        /// No tags.
        None = sys::GIT_REMOTE_DOWNLOAD_TAGS_NONE,
        /// All tags.
        All = sys::GIT_REMOTE_DOWNLOAD_TAGS_ALL,
    }
}

ffi_enum! {
    /// Stage reported by a remote completion callback.
    pub enum CompletionType {
        /// Download finished.
        Download = sys::GIT_REMOTE_COMPLETION_DOWNLOAD,
        /// Indexing finished.
        Indexing = sys::GIT_REMOTE_COMPLETION_INDEXING,
        /// Transfer failed.
        Error = sys::GIT_REMOTE_COMPLETION_ERROR,
    }
}

ffi_enum! {
    /// Configuration file priority level.
    pub enum ConfigLevel {
        /// System-wide file.
        System = 1,
        /// XDG-compatible file.
        Xdg = 2,
        /// User global file.
        Global = 3,
        /// Repository file.
        Local = 4,
        /// Highest level present (lookup wildcard).
        Highest = sys::GIT_CONFIG_HIGHEST_LEVEL,
    }
}

ffi_enum! {
    /// Status of a file in a diff delta.
    pub enum DeltaStatus {
        /// Unmodified.
        Unmodified = sys::GIT_DELTA_UNMODIFIED,
        /// Added.
        Added = sys::GIT_DELTA_ADDED,
        /// Deleted.
        Deleted = sys::GIT_DELTA_DELETED,
        /// Modified.
        Modified = sys::GIT_DELTA_MODIFIED,
        /// Renamed.
        Renamed = sys::GIT_DELTA_RENAMED,
        /// Copied.
        Copied = sys::GIT_DELTA_COPIED,
        /// Ignored.
        Ignored = sys::GIT_DELTA_IGNORED,
        /// Untracked.
        Untracked = sys::GIT_DELTA_UNTRACKED,
        /// Type changed.
        Typechange = sys::GIT_DELTA_TYPECHANGE,
    }
}

ffi_enum! {
    /// Mode of a tree entry.
    pub enum FileMode {
        /// Unreadable / new.
        New = 0o000_000,
        /// Subdirectory.
        Tree = 0o040_000,
        /// Regular file.
        Blob = 0o100_644,
        /// Executable file.
        BlobExecutable = 0o100_755,
        /// Symbolic link.
        Link = 0o120_000,
        /// Submodule commit.
        Commit = 0o160_000,
    }
}

/// Origin marker of a line delivered by a diff callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineOrigin {
    /// Unchanged context line.
    Context,
    /// Added line.
    Addition,
    /// Deleted line.
    Deletion,
    /// Both sides lack a trailing newline.
    AddEofNewline,
    /// Old side lacks a trailing newline.
    DelEofNewline,
    /// File header.
    FileHeader,
    /// Hunk header.
    HunkHeader,
    /// Binary file notice.
    Binary,
    /// Any other marker byte.
    Other(u8),
}

impl LineOrigin {
    /// Decode the native origin byte.
    #[must_use]
    pub const fn from_ffi(b: u8) -> Self {
        match b {
            b' ' => Self::Context,
            b'+' => Self::Addition,
            b'-' => Self::Deletion,
            b'\n' => Self::AddEofNewline,
            b'\0' => Self::DelEofNewline,
            b'F' => Self::FileHeader,
            b'H' => Self::HunkHeader,
            b'B' => Self::Binary,
            other => Self::Other(other),
        }
    }
}

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident { $($(#[$fm:meta])* $flag:ident = $val:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u32);

        impl $name {
            $($(#[$fm])* pub const $flag: Self = Self($val);)*

            /// Wrap raw native bits.
            #[must_use]
            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            /// Raw native bits.
            #[must_use]
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// Whether every bit of `other` is set.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Whether no bit is set.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut set = f.debug_set();
                $(if $val != 0 && self.contains(Self::$flag) { set.entry(&stringify!($flag)); })*
                set.finish()
            }
        }
    };
}

flag_set! {
    /// Working-tree / index status bits of a path.
    Status {
        /// No changes.
        CURRENT = sys::GIT_STATUS_CURRENT,
        /// New in the index.
        INDEX_NEW = sys::GIT_STATUS_INDEX_NEW,
        /// Modified in the index.
        INDEX_MODIFIED = sys::GIT_STATUS_INDEX_MODIFIED,
        /// Deleted in the index.
        INDEX_DELETED = sys::GIT_STATUS_INDEX_DELETED,
        /// Renamed in the index.
        INDEX_RENAMED = sys::GIT_STATUS_INDEX_RENAMED,
        /// Type changed in the index.
        INDEX_TYPECHANGE = sys::GIT_STATUS_INDEX_TYPECHANGE,
        /// Untracked in the working directory.
        WT_NEW = sys::GIT_STATUS_WT_NEW,
        /// Modified in the working directory.
        WT_MODIFIED = sys::GIT_STATUS_WT_MODIFIED,
        /// Deleted in the working directory.
        WT_DELETED = sys::GIT_STATUS_WT_DELETED,
        /// Type changed in the working directory.
        WT_TYPECHANGE = sys::GIT_STATUS_WT_TYPECHANGE,
        /// Ignored.
        IGNORED = sys::GIT_STATUS_IGNORED,
    }
}

flag_set! {
    /// Revision walk ordering.
    Sort {
        /// Native default order.
        NONE = sys::GIT_SORT_NONE,
        /// Parents after children.
        TOPOLOGICAL = sys::GIT_SORT_TOPOLOGICAL,
        /// Commit time.
        TIME = sys::GIT_SORT_TIME,
        /// Reverse of the selected order.
        REVERSE = sys::GIT_SORT_REVERSE,
    }
}

flag_set! {
    /// Checkout strategy bits.
    CheckoutStrategy {
        /// Dry run.
        NONE = sys::GIT_CHECKOUT_NONE,
        /// Only update unmodified files.
        SAFE = sys::GIT_CHECKOUT_SAFE,
        /// Safe, and create missing files.
        SAFE_CREATE = sys::GIT_CHECKOUT_SAFE_CREATE,
        /// Overwrite everything.
        FORCE = sys::GIT_CHECKOUT_FORCE,
    }
}

flag_set! {
    /// Credential kinds a remote accepts.
    CredentialTypes {
        /// Plain-text user name and password.
        USERPASS_PLAINTEXT = sys::GIT_CREDTYPE_USERPASS_PLAINTEXT,
    }
}

/// A 20-byte object id, copied out of native memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Oid(pub(crate) sys::git_oid);

impl Oid {
    /// Build from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; sys::GIT_OID_RAWSZ]) -> Self {
        Self(sys::git_oid { id: bytes })
    }

    /// Parse a 40-character hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let mut id = [0u8; sys::GIT_OID_RAWSZ];
        hex::decode_to_slice(s, &mut id)
            .map_err(|e| crate::Error::InvalidArgument(format!("invalid object id {s:?}: {e}")))?;
        Ok(Self::from_bytes(id))
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; sys::GIT_OID_RAWSZ] {
        &self.0.id
    }

    /// Whether every byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.id.iter().all(|b| *b == 0)
    }

    pub(crate) const fn raw(&self) -> *const sys::git_oid {
        &raw const self.0
    }

    /// Copy an id out of native memory. `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or point at a live `git_oid`.
    pub(crate) unsafe fn from_raw(ptr: *const sys::git_oid) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self(unsafe { *ptr }))
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.id))
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({self})")
    }
}

impl std::str::FromStr for Oid {
    type Err = crate::Error;
    fn from_str(s: &str) -> crate::Result<Self> {
        Self::from_hex(s)
    }
}

/// A point in time with a UTC offset in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Time {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    /// Offset from UTC in minutes.
    pub offset_minutes: i32,
}

/// Author / committer / tagger identity copied out of native memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureInfo {
    /// Full name.
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// When the action happened.
    pub when: Time,
}

/// A branch visited by [`Repository::for_each_branch`](crate::Repository::for_each_branch).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch {
    /// Short branch name (without `refs/heads/`).
    pub name: String,
    /// Local or remote.
    pub kind: BranchType,
}

/// A configuration entry copied out of native memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigEntry {
    /// Fully qualified variable name (`section.key`).
    pub name: String,
    /// Raw string value.
    pub value: String,
    /// File the value came from.
    pub level: Option<ConfigLevel>,
}

/// A path and its status bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusEntry {
    /// Path relative to the working directory.
    pub path: String,
    /// Status bits.
    pub status: Status,
}

/// Result of a call into an export that the binding deliberately does not
/// invoke: the native library is never loaded and `value` is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unimplemented<T> {
    /// Export the call stands in for.
    pub export: &'static str,
    /// The fixed value returned in its place.
    pub value: T,
}

impl<T> Unimplemented<T> {
    /// Stand in for `export`, logging that it was not called.
    pub(crate) fn stand_in(export: &'static str, value: T) -> Self {
        tracing::warn!(export, "export is not bound; returning a fixed value");
        Self { export, value }
    }
}

/// Snapshot of a fetch in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    /// Objects in the pack.
    pub total_objects: u32,
    /// Objects indexed so far.
    pub indexed_objects: u32,
    /// Objects received so far.
    pub received_objects: u32,
    /// Bytes received so far.
    pub received_bytes: usize,
}

impl From<&sys::git_transfer_progress> for TransferProgress {
    fn from(p: &sys::git_transfer_progress) -> Self {
        Self {
            total_objects: p.total_objects,
            indexed_objects: p.indexed_objects,
            received_objects: p.received_objects,
            received_bytes: p.received_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffi_enum_rejects_unknown_values() {
        assert_eq!(ErrorCode::from_ffi(-3), Some(ErrorCode::NotFound));
        assert_eq!(ErrorCode::from_ffi(-2), None);
        assert_eq!(BranchType::from_ffi(2), Some(BranchType::Remote));
        assert_eq!(ObjectType::Commit.to_ffi(), 1);
    }

    #[test]
    fn oid_hex_round_trip_and_rejects_garbage() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        let oid = Oid::from_hex(hex).unwrap();
        assert_eq!(oid.to_string(), hex);
        assert!(Oid::from_hex("xyz").is_err());
        assert!(Oid::default().is_zero());
    }

    #[test]
    fn status_flags_compose() {
        let s = Status::WT_NEW | Status::INDEX_MODIFIED;
        assert!(s.contains(Status::WT_NEW));
        assert!(!s.contains(Status::IGNORED));
        assert_eq!(format!("{s:?}"), r#"{"INDEX_MODIFIED", "WT_NEW"}"#);
    }

    #[test]
    fn line_origin_decodes_known_markers() {
        assert_eq!(LineOrigin::from_ffi(b'+'), LineOrigin::Addition);
        assert_eq!(LineOrigin::from_ffi(b'?'), LineOrigin::Other(b'?'));
    }
}
