#![doc = include_str!("../README.md")]
#![allow(unsafe_code)]

pub mod encoding;
pub mod error;
pub mod exports;
pub mod odb;
pub mod reference;
pub mod remote;
pub mod resolver;
pub mod types;

mod blob;
mod branch;
mod callback;
mod checkout;
mod commit;
mod config;
mod credential;
mod diff;
mod gitconfig;
mod graph;
mod handle;
mod index;
mod lifetime;
mod note;
mod object;
mod push;
mod repository;
mod revwalk;
mod runtime;
mod signature;
mod status;
mod tag;
mod tree;

// Re-export core public API at crate root.
pub use checkout::{CheckoutOptions, CloneOptions};
pub use commit::CommitMessage;
pub use config::{Config, ENV_CONVENTION, ENV_LIBRARY, ENV_RESOLVE};
pub use credential::Credential;
pub use diff::{DiffDelta, DiffEvent, DiffFile, DiffLine, DiffList, DiffOptions, DiffRange};
pub use error::{Error, ErrorRecord, Result};
pub use gitconfig::GitConfig;
pub use handle::{Borrowed, Handle, Owned, Resource, ResourceKind, SignatureRef, kind};
pub use index::{Conflict, Index, IndexEntryRef, NewIndexEntry};
pub use lifetime::{LibraryGuard, Phase};
pub use note::{Note, NoteEntry};
pub use object::Object;
pub use odb::Odb;
pub use push::{Push, PushStatus};
pub use reference::Reference;
pub use remote::{CredentialProvider, Refspec, Remote, RemoteCallbacks, RemoteHead};
pub use repository::{FetchHead, Repository};
pub use resolver::{CallingConvention, DynamicLoader, Export, ExportTable, Loader, Module, ResolvePolicy};
pub use revwalk::RevWalk;
pub use runtime::{Runtime, init};
pub use signature::Signature;
pub use tree::{TreeBuilder, TreeEntry, TreeEntryRef};
pub use types::{
    AutotagOption, Branch, BranchType, CheckoutStrategy, CompletionType, ConfigEntry, ConfigLevel,
    CredentialTypes, DeltaStatus, Direction, ErrorClass, ErrorCode, FileMode, LineOrigin, ObjectType,
    Oid, ReferenceType, RepositoryState, ResetType, SignatureInfo, Sort, Status, StatusEntry, Time,
    TransferProgress, Unimplemented,
};

// Re-export standalone functions.
pub use diff::diff_blobs;
pub use graph::{prettify_message, prettify_message_with_capacity};
