#![allow(unsafe_code)]
//! Checkout and clone options, and the checkout operations.

use std::ptr;

use git2_dyn_sys as sys;

use crate::encoding::{self, StrArray};
use crate::error::Result;
use crate::exports;
use crate::types::CheckoutStrategy;
use crate::{Index, Object, Repository};

/// How a checkout updates the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// Strategy bits.
    pub strategy: CheckoutStrategy,
    /// Restrict the checkout to these pathspecs. Empty means everything.
    pub paths: Vec<String>,
}

impl CheckoutOptions {
    /// Options with the given strategy and no path filter.
    #[must_use]
    pub fn with_strategy(strategy: CheckoutStrategy) -> Self {
        Self {
            strategy,
            paths: Vec::new(),
        }
    }

    pub(crate) fn to_raw(&self) -> Result<RawCheckout> {
        let mut paths = StrArray::new(&self.paths)?;
        let opts = sys::git_checkout_opts {
            version: sys::GIT_CHECKOUT_OPTS_VERSION,
            checkout_strategy: self.strategy.bits(),
            disable_filters: 0,
            dir_mode: 0,
            file_mode: 0,
            file_open_flags: 0,
            notify_flags: 0,
            notify_cb: None,
            notify_payload: ptr::null_mut(),
            progress_cb: None,
            progress_payload: ptr::null_mut(),
            paths: paths.raw(),
            baseline: ptr::null_mut(),
        };
        Ok(RawCheckout {
            _paths: paths,
            opts,
        })
    }
}

/// Native checkout options plus the strings they point into.
pub(crate) struct RawCheckout {
    _paths: StrArray,
    pub(crate) opts: sys::git_checkout_opts,
}

/// Options for [`Repository::clone_from_url`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Create a bare repository.
    pub bare: bool,
    /// Checkout of the default branch after fetching.
    pub checkout: CheckoutOptions,
    /// Name of the origin remote. `None` keeps the library default.
    pub remote_name: Option<String>,
}

/// Native clone options plus everything they point into.
pub(crate) struct RawClone {
    _checkout_paths: StrArray,
    _remote_name: Option<std::ffi::CString>,
    pub(crate) opts: sys::git_clone_options,
}

impl CloneOptions {
    pub(crate) fn to_raw(&self) -> Result<RawClone> {
        let RawCheckout {
            _paths: checkout_paths,
            opts: checkout_opts,
        } = self.checkout.to_raw()?;
        let remote_name = encoding::optional_c_string(self.remote_name.as_deref())?;
        let opts = sys::git_clone_options {
            version: sys::GIT_CLONE_OPTIONS_VERSION,
            checkout_opts,
            bare: i32::from(self.bare),
            fetch_progress_cb: None,
            fetch_progress_payload: ptr::null_mut(),
            remote_name: encoding::c_str_ptr(&remote_name),
            pushurl: ptr::null(),
            fetch_spec: ptr::null(),
            push_spec: ptr::null(),
            cred_acquire_cb: None,
            cred_acquire_payload: ptr::null_mut(),
            transport_flags: 0,
            transport: ptr::null_mut(),
            remote_callbacks: ptr::null_mut(),
            remote_autotag: sys::GIT_REMOTE_DOWNLOAD_TAGS_AUTO,
        };
        Ok(RawClone {
            _checkout_paths: checkout_paths,
            _remote_name: remote_name,
            opts,
        })
    }
}

impl Repository {
    /// Update the working directory and index to match `treeish`.
    pub fn checkout_tree(&self, treeish: &Object, options: &CheckoutOptions) -> Result<()> {
        let tree = treeish.as_ptr()?;
        let raw = options.to_raw()?;
        self.call_checked(&exports::git_checkout_tree, |f, repo| unsafe {
            f(repo, tree, &raw const raw.opts)
        })
        .map(drop)
    }

    /// Update the working directory to match `index`, or the repository's
    /// own index when `None`.
    pub fn checkout_index(&self, index: Option<&Index>, options: &CheckoutOptions) -> Result<()> {
        let index = index.map(Index::as_ptr).transpose()?.unwrap_or(ptr::null_mut());
        let raw = options.to_raw()?;
        self.call_checked(&exports::git_checkout_index, |f, repo| unsafe {
            f(repo, index, &raw const raw.opts)
        })
        .map(drop)
    }
}
