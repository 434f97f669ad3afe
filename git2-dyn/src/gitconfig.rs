#![allow(unsafe_code)]
//! Configuration objects: files, levels, typed get/set and enumeration.

use std::ffi::{c_int, c_uint, c_void};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::ptr;

use git2_dyn_sys as sys;

use crate::callback;
use crate::encoding::{self, FillBuffer};
use crate::error::{Error, Result};
use crate::exports;
use crate::handle::{Handle, kind};
use crate::resolver::FunctionBinding;
use crate::runtime::Runtime;
use crate::types::{ConfigEntry, ConfigLevel};

/// A set of configuration files ordered by level.
pub type GitConfig = Handle<kind::Config>;

type FindFile = unsafe extern "system" fn(*mut std::ffi::c_char, usize) -> c_int;

// Enum values cross the ABI as unsigned; `Highest` (-1) wraps as in C.
const fn level_bits(level: ConfigLevel) -> c_uint {
    level.to_ffi() as c_uint
}

/// Copy a borrowed native entry.
///
/// # Safety
/// `entry` must be null or point at a live `git_config_entry`.
unsafe fn read_entry(entry: *const sys::git_config_entry) -> Result<ConfigEntry> {
    let entry = unsafe { entry.as_ref() }.ok_or(Error::NullPointer)?;
    Ok(ConfigEntry {
        name: unsafe { encoding::borrowed_str_required(entry.name) }?,
        value: unsafe { encoding::borrowed_str(entry.value) }?.unwrap_or_default(),
        level: i32::try_from(entry.level).ok().and_then(ConfigLevel::from_ffi),
    })
}

impl GitConfig {
    /// An empty configuration with no backing files.
    pub fn new() -> Result<Self> {
        Self::new_in(Runtime::global())
    }

    pub(crate) fn new_in(rt: &'static Runtime) -> Result<Self> {
        Handle::create(rt, &exports::git_config_new, |f, out| unsafe { f(out) })
    }

    /// Configuration built from the global, XDG and system files that exist.
    pub fn open_default() -> Result<Self> {
        let rt = Runtime::global();
        let cfg = Self::new_in(rt)?;
        let files = [
            (Self::find_system_in(rt, FillBuffer::for_path())?, ConfigLevel::System),
            (Self::find_xdg_in(rt, FillBuffer::for_path())?, ConfigLevel::Xdg),
            (Self::find_global_in(rt, FillBuffer::for_path())?, ConfigLevel::Global),
        ];
        for (path, level) in files {
            if let Some(path) = path {
                cfg.add_file_ondisk(path, level, false)?;
            }
        }
        Ok(cfg)
    }

    /// Add a file as the source for `level`. With `force`, replace an
    /// existing file at that level.
    pub fn add_file_ondisk(&self, path: impl AsRef<Path>, level: ConfigLevel, force: bool) -> Result<()> {
        let path = encoding::path_to_c(path.as_ref())?;
        self.call_checked(&exports::git_config_add_file_ondisk, |f, cfg| unsafe {
            f(cfg, path.as_ptr(), level_bits(level), c_int::from(force))
        })
        .map(drop)
    }

    /// A view limited to a single level of this configuration.
    pub fn open_level(&self, level: ConfigLevel) -> Result<Self> {
        let parent = self.as_ptr()?;
        Handle::create(self.runtime(), &exports::git_config_open_level, |f, out| unsafe {
            f(out, parent, level_bits(level))
        })
    }

    /// Location of the user's global file (`~/.gitconfig`), if it exists.
    pub fn find_global() -> Result<Option<PathBuf>> {
        Self::find_global_in(Runtime::global(), FillBuffer::for_path())
    }

    /// [`find_global`](Self::find_global) into a buffer of `capacity` bytes.
    pub fn find_global_with_capacity(capacity: usize) -> Result<Option<PathBuf>> {
        Self::find_global_in(Runtime::global(), FillBuffer::with_capacity(capacity))
    }

    /// Location of the system-wide file, if it exists.
    pub fn find_system() -> Result<Option<PathBuf>> {
        Self::find_system_in(Runtime::global(), FillBuffer::for_path())
    }

    /// Location of the XDG file (`~/.config/git/config`), if it exists.
    pub fn find_xdg() -> Result<Option<PathBuf>> {
        Self::find_xdg_in(Runtime::global(), FillBuffer::for_path())
    }

    pub(crate) fn find_global_in(rt: &Runtime, buf: FillBuffer) -> Result<Option<PathBuf>> {
        find_file(rt, &exports::git_config_find_global, buf)
    }

    pub(crate) fn find_system_in(rt: &Runtime, buf: FillBuffer) -> Result<Option<PathBuf>> {
        find_file(rt, &exports::git_config_find_system, buf)
    }

    pub(crate) fn find_xdg_in(rt: &Runtime, buf: FillBuffer) -> Result<Option<PathBuf>> {
        find_file(rt, &exports::git_config_find_xdg, buf)
    }

    /// The highest-level entry for `name`, copied out. `None` if unset.
    pub fn get_entry(&self, name: &str) -> Result<Option<ConfigEntry>> {
        let name = encoding::to_c_string(name)?;
        let mut entry = ptr::null();
        let rc = self.call(&exports::git_config_get_entry, |f, cfg| unsafe {
            f(&raw mut entry, cfg, name.as_ptr())
        })?;
        if self.runtime().check_found(rc)?.is_none() {
            return Ok(None);
        }
        unsafe { read_entry(entry) }.map(Some)
    }

    /// String value of `name`.
    pub fn get_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.get_entry(name)?.map(|e| e.value))
    }

    /// Boolean value of `name` (`true`, `yes`, `on`, `1`, ...).
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        self.get_entry(name)?
            .map(|e| parse_bool_in(self.runtime(), &e.value))
            .transpose()
    }

    /// 32-bit integer value of `name`; `k`, `m` and `g` suffixes are honored.
    pub fn get_i32(&self, name: &str) -> Result<Option<i32>> {
        self.get_entry(name)?
            .map(|e| parse_i32_in(self.runtime(), &e.value))
            .transpose()
    }

    /// 64-bit integer value of `name`.
    pub fn get_i64(&self, name: &str) -> Result<Option<i64>> {
        self.get_entry(name)?
            .map(|e| parse_i64_in(self.runtime(), &e.value))
            .transpose()
    }

    /// Set a boolean in the highest-level writable file.
    pub fn set_bool(&self, name: &str, value: bool) -> Result<()> {
        let name = encoding::to_c_string(name)?;
        self.call_checked(&exports::git_config_set_bool, |f, cfg| unsafe {
            f(cfg, name.as_ptr(), c_int::from(value))
        })
        .map(drop)
    }

    /// Set a 32-bit integer.
    pub fn set_i32(&self, name: &str, value: i32) -> Result<()> {
        let name = encoding::to_c_string(name)?;
        self.call_checked(&exports::git_config_set_int32, |f, cfg| unsafe {
            f(cfg, name.as_ptr(), value)
        })
        .map(drop)
    }

    /// Set a 64-bit integer.
    pub fn set_i64(&self, name: &str, value: i64) -> Result<()> {
        let name = encoding::to_c_string(name)?;
        self.call_checked(&exports::git_config_set_int64, |f, cfg| unsafe {
            f(cfg, name.as_ptr(), value)
        })
        .map(drop)
    }

    /// Set a string.
    pub fn set_string(&self, name: &str, value: &str) -> Result<()> {
        let name = encoding::to_c_string(name)?;
        let value = encoding::to_c_string(value)?;
        self.call_checked(&exports::git_config_set_string, |f, cfg| unsafe {
            f(cfg, name.as_ptr(), value.as_ptr())
        })
        .map(drop)
    }

    /// Remove `name` from the highest-level writable file.
    pub fn delete_entry(&self, name: &str) -> Result<()> {
        let name = encoding::to_c_string(name)?;
        self.call_checked(&exports::git_config_delete_entry, |f, cfg| unsafe {
            f(cfg, name.as_ptr())
        })
        .map(drop)
    }

    /// Visit every entry across all levels.
    pub fn for_each(
        &self,
        visitor: impl FnMut(ConfigEntry) -> ControlFlow<i32>,
    ) -> Result<ControlFlow<i32>> {
        let cfg = self.as_ptr()?;
        let rt = self.runtime();
        callback::enumerate(rt, visitor, |payload| {
            rt.call(&exports::git_config_foreach, |f| unsafe {
                f(cfg, Some(entry_cb), payload)
            })
        })
    }

    /// Every entry across all levels.
    pub fn entries(&self) -> Result<Vec<ConfigEntry>> {
        callback::collect(|visit| self.for_each(visit))
    }

    /// Interpret `value` as a git boolean.
    pub fn parse_bool(value: &str) -> Result<bool> {
        parse_bool_in(Runtime::global(), value)
    }

    /// Interpret `value` as a git 32-bit integer.
    pub fn parse_i32(value: &str) -> Result<i32> {
        parse_i32_in(Runtime::global(), value)
    }

    /// Interpret `value` as a git 64-bit integer.
    pub fn parse_i64(value: &str) -> Result<i64> {
        parse_i64_in(Runtime::global(), value)
    }
}

fn find_file(rt: &Runtime, binding: &FunctionBinding<FindFile>, mut buf: FillBuffer) -> Result<Option<PathBuf>> {
    let capacity = buf.capacity();
    let out = buf.as_mut_ptr();
    let rc = rt.call(binding, |f| unsafe { f(out, capacity) })?;
    if rt.check_found(rc)?.is_none() {
        return Ok(None);
    }
    buf.read_path().map(Some)
}

pub(crate) fn parse_bool_in(rt: &Runtime, value: &str) -> Result<bool> {
    let value = encoding::to_c_string(value)?;
    let mut out: c_int = 0;
    let rc = rt.call(&exports::git_config_parse_bool, |f| unsafe {
        f(&raw mut out, value.as_ptr())
    })?;
    rt.check(rc)?;
    Ok(out != 0)
}

pub(crate) fn parse_i32_in(rt: &Runtime, value: &str) -> Result<i32> {
    let value = encoding::to_c_string(value)?;
    let mut out = 0i32;
    let rc = rt.call(&exports::git_config_parse_int32, |f| unsafe {
        f(&raw mut out, value.as_ptr())
    })?;
    rt.check(rc)?;
    Ok(out)
}

pub(crate) fn parse_i64_in(rt: &Runtime, value: &str) -> Result<i64> {
    let value = encoding::to_c_string(value)?;
    let mut out = 0i64;
    let rc = rt.call(&exports::git_config_parse_int64, |f| unsafe {
        f(&raw mut out, value.as_ptr())
    })?;
    rt.check(rc)?;
    Ok(out)
}

unsafe extern "system" fn entry_cb(entry: *const sys::git_config_entry, payload: *mut c_void) -> c_int {
    unsafe { callback::deliver(payload, || read_entry(entry)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvePolicy;
    use crate::runtime::testing::stub_runtime;
    use std::io::Write;

    fn file_with(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_typed_values_from_a_file() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let file = file_with("[core]\n\tbare = false\n\tcompression = 2k\n[user]\n\tname = Ada\n");
        let cfg = GitConfig::new_in(rt).unwrap();
        cfg.add_file_ondisk(file.path(), ConfigLevel::Local, false).unwrap();
        assert_eq!(cfg.get_bool("core.bare").unwrap(), Some(false));
        assert_eq!(cfg.get_i32("core.compression").unwrap(), Some(2048));
        assert_eq!(cfg.get_string("user.name").unwrap().as_deref(), Some("Ada"));
        assert_eq!(cfg.get_string("user.email").unwrap(), None);
        let entry = cfg.get_entry("user.name").unwrap().unwrap();
        assert_eq!(entry.level, Some(ConfigLevel::Local));
    }

    #[test]
    fn set_and_delete_round_trip() {
        let rt = stub_runtime(ResolvePolicy::PerCall);
        let file = file_with("");
        let cfg = GitConfig::new_in(rt).unwrap();
        cfg.add_file_ondisk(file.path(), ConfigLevel::Local, false).unwrap();
        cfg.set_i64("pack.window", 1 << 40).unwrap();
        cfg.set_bool("core.filemode", true).unwrap();
        cfg.set_string("user.email", "ada@example.com").unwrap();
        assert_eq!(cfg.get_i64("pack.window").unwrap(), Some(1 << 40));
        assert_eq!(cfg.get_bool("core.filemode").unwrap(), Some(true));
        cfg.delete_entry("user.email").unwrap();
        assert_eq!(cfg.get_entry("user.email").unwrap(), None);
    }

    #[test]
    fn enumerates_in_file_order_and_stops_on_break() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let file = file_with("[a]\n\tx = 1\n\ty = 2\n[b]\n\tz = 3\n");
        let cfg = GitConfig::new_in(rt).unwrap();
        cfg.add_file_ondisk(file.path(), ConfigLevel::Global, false).unwrap();
        let names: Vec<_> = cfg.entries().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a.x", "a.y", "b.z"]);
        let mut seen = 0;
        let flow = cfg
            .for_each(|_| {
                seen += 1;
                if seen == 2 { ControlFlow::Break(-1) } else { ControlFlow::Continue(()) }
            })
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(-1));
        assert_eq!(seen, 2);
    }

    #[test]
    fn open_level_filters_entries() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        let global = file_with("[user]\n\tname = Global\n");
        let local = file_with("[user]\n\tname = Local\n");
        let cfg = GitConfig::new_in(rt).unwrap();
        cfg.add_file_ondisk(global.path(), ConfigLevel::Global, false).unwrap();
        cfg.add_file_ondisk(local.path(), ConfigLevel::Local, false).unwrap();
        assert_eq!(cfg.get_string("user.name").unwrap().as_deref(), Some("Local"));
        let only_global = cfg.open_level(ConfigLevel::Global).unwrap();
        assert_eq!(only_global.get_string("user.name").unwrap().as_deref(), Some("Global"));
        assert_eq!(rt.live_handles(), 2);
    }

    #[test]
    fn parses_native_value_syntax() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        assert!(parse_bool_in(rt, "yes").unwrap());
        assert!(!parse_bool_in(rt, "off").unwrap());
        assert_eq!(parse_i32_in(rt, "3m").unwrap(), 3 * 1024 * 1024);
        assert_eq!(parse_i64_in(rt, "1g").unwrap(), 1 << 30);
        let err = parse_bool_in(rt, "perhaps").unwrap_err();
        assert_eq!(err.class(), Some(crate::ErrorClass::Config));
    }

    #[test]
    fn missing_global_file_is_none() {
        let rt = stub_runtime(ResolvePolicy::Cached);
        assert_eq!(GitConfig::find_system_in(rt, FillBuffer::for_path()).unwrap(), None);
    }
}
