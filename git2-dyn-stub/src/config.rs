//! Configuration: ini-style files parsed into per-level entries.

use std::ffi::{CString, c_char, c_int, c_uint, c_void};
use std::path::PathBuf;
use std::sync::Mutex;
use std::{fs, io};

use git2_dyn_sys as sys;

use crate::ffi::{self, arg, fail, fill, lock, owned_c, view, write_out};

/// One variable. `raw` points into `name` and `value`.
struct Entry {
    name: CString,
    value: CString,
    raw: sys::git_config_entry,
}

impl Entry {
    fn new(name: &str, value: &str, level: c_uint) -> Box<Self> {
        let name = owned_c(name);
        let value = owned_c(value);
        let raw = sys::git_config_entry {
            name: name.as_ptr(),
            value: value.as_ptr(),
            level,
        };
        Box::new(Self { name, value, raw })
    }

    fn name(&self) -> &str {
        self.name.to_str().unwrap_or_default()
    }

    fn value(&self) -> &str {
        self.value.to_str().unwrap_or_default()
    }
}

#[derive(Default)]
struct StubConfig {
    levels: Vec<c_uint>,
    // Boxed so entry addresses survive growth of the list.
    entries: Vec<Box<Entry>>,
}

impl StubConfig {
    fn highest(&self) -> Option<c_uint> {
        self.levels.iter().copied().max()
    }

    fn lookup(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.name() == name)
            .max_by_key(|e| e.raw.level)
            .map(|e| &**e)
    }

    fn set(&mut self, name: &str, value: &str) -> c_int {
        let Some(level) = self.highest() else {
            return fail(sys::GIT_ERROR, sys::GITERR_CONFIG, "cannot set a value: no configuration file added");
        };
        let Some(name) = normalize_key(name) else {
            return fail(sys::GIT_ERROR, sys::GITERR_CONFIG, format!("invalid config item name '{name}'"));
        };
        let entry = Entry::new(&name, value, level);
        match self
            .entries
            .iter_mut()
            .find(|e| e.raw.level == level && e.name() == name)
        {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
        sys::GIT_OK
    }
}

unsafe fn config<'a>(cfg: *mut sys::git_config) -> Option<&'a mut StubConfig> {
    let found = unsafe { view::<StubConfig, _>(cfg) };
    if found.is_none() {
        ffi::set_error(sys::GITERR_INVALID, "null config");
    }
    found
}

/// `section.key` or `section.subsection.key`, section and key lowercased.
fn normalize_key(name: &str) -> Option<String> {
    let (section, rest) = name.split_once('.')?;
    let (sub, key) = match rest.rsplit_once('.') {
        Some((sub, key)) => (Some(sub), key),
        None => (None, rest),
    };
    if section.is_empty() || key.is_empty() {
        return None;
    }
    Some(match sub {
        Some(sub) => format!("{}.{sub}.{}", section.to_lowercase(), key.to_lowercase()),
        None => format!("{}.{}", section.to_lowercase(), key.to_lowercase()),
    })
}

/// Parse ini text into `(name, value)` pairs in file order.
fn parse_file(text: &str) -> Vec<(String, String)> {
    let mut section = String::new();
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = match header.split_once(char::is_whitespace) {
                Some((name, sub)) => format!("{}.{}", name.to_lowercase(), sub.trim().trim_matches('"')),
                None => header.to_lowercase(),
            };
            continue;
        }
        let (key, value) = match line.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim().trim_matches('"')),
            None => (line, "true"),
        };
        if !section.is_empty() {
            out.push((format!("{section}.{}", key.to_lowercase()), value.to_owned()));
        }
    }
    out
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" | "" => Some(false),
        _ => parse_int(value).map(|n| n != 0),
    }
}

fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let (digits, scale) = match value.chars().last()?.to_ascii_lowercase() {
        'k' => (&value[..value.len() - 1], 1i64 << 10),
        'm' => (&value[..value.len() - 1], 1 << 20),
        'g' => (&value[..value.len() - 1], 1 << 30),
        _ => (value, 1),
    };
    digits.parse::<i64>().ok()?.checked_mul(scale)
}

fn invalid_value(value: &str, kind: &str) -> c_int {
    fail(
        sys::GIT_ERROR,
        sys::GITERR_CONFIG,
        format!("failed to parse '{value}' as {kind}"),
    )
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_new(out: *mut *mut sys::git_config) -> c_int {
    unsafe { write_out(out, StubConfig::default()) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_free(cfg: *mut sys::git_config) {
    ffi::count_free("git_config_free");
    unsafe { ffi::free_boxed::<StubConfig, _>(cfg) };
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_add_file_ondisk(
    cfg: *mut sys::git_config,
    path: *const c_char,
    level: c_uint,
    force: c_int,
) -> c_int {
    let Some(cfg) = (unsafe { config(cfg) }) else {
        return sys::GIT_ERROR;
    };
    let path = match unsafe { arg(path, "path") } {
        Ok(p) => p,
        Err(rc) => return rc,
    };
    if cfg.levels.contains(&level) {
        if force == 0 {
            return fail(
                sys::GIT_EEXISTS,
                sys::GITERR_CONFIG,
                "a file with the same level is already added",
            );
        }
        cfg.entries.retain(|e| e.raw.level != level);
    } else {
        cfg.levels.push(level);
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return fail(sys::GIT_ERROR, sys::GITERR_OS, format!("failed to read '{path}': {e}")),
    };
    for (name, value) in parse_file(&text) {
        cfg.entries.push(Entry::new(&name, &value, level));
    }
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_open_level(
    out: *mut *mut sys::git_config,
    parent: *mut sys::git_config,
    level: c_uint,
) -> c_int {
    let Some(parent) = (unsafe { config(parent) }) else {
        return sys::GIT_ERROR;
    };
    let wanted = if level == sys::GIT_CONFIG_HIGHEST_LEVEL as c_uint {
        parent.highest()
    } else {
        parent.levels.contains(&level).then_some(level)
    };
    let Some(level) = wanted else {
        return fail(
            sys::GIT_ENOTFOUND,
            sys::GITERR_CONFIG,
            format!("no config file exists for the given level '{level}'"),
        );
    };
    let single = StubConfig {
        levels: vec![level],
        entries: parent
            .entries
            .iter()
            .filter(|e| e.raw.level == level)
            .map(|e| Entry::new(e.name(), e.value(), level))
            .collect(),
    };
    unsafe { write_out(out, single) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_get_entry(
    out: *mut *const sys::git_config_entry,
    cfg: *mut sys::git_config,
    name: *const c_char,
) -> c_int {
    let Some(cfg) = (unsafe { config(cfg) }) else {
        return sys::GIT_ERROR;
    };
    let name = match unsafe { arg(name, "name") } {
        Ok(n) => n,
        Err(rc) => return rc,
    };
    let Some(key) = normalize_key(name) else {
        return fail(sys::GIT_ERROR, sys::GITERR_CONFIG, format!("invalid config item name '{name}'"));
    };
    let Some(out) = (unsafe { out.as_mut() }) else {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null output pointer");
    };
    match cfg.lookup(&key) {
        Some(entry) => {
            *out = &raw const entry.raw;
            sys::GIT_OK
        }
        None => fail(
            sys::GIT_ENOTFOUND,
            sys::GITERR_CONFIG,
            format!("config value '{name}' was not found"),
        ),
    }
}

unsafe fn set_value(cfg: *mut sys::git_config, name: *const c_char, value: &str) -> c_int {
    let Some(cfg) = (unsafe { config(cfg) }) else {
        return sys::GIT_ERROR;
    };
    match unsafe { arg(name, "name") } {
        Ok(name) => cfg.set(name, value),
        Err(rc) => rc,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_set_bool(cfg: *mut sys::git_config, name: *const c_char, value: c_int) -> c_int {
    unsafe { set_value(cfg, name, if value != 0 { "true" } else { "false" }) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_set_int32(cfg: *mut sys::git_config, name: *const c_char, value: i32) -> c_int {
    unsafe { set_value(cfg, name, &value.to_string()) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_set_int64(cfg: *mut sys::git_config, name: *const c_char, value: i64) -> c_int {
    unsafe { set_value(cfg, name, &value.to_string()) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_set_string(
    cfg: *mut sys::git_config,
    name: *const c_char,
    value: *const c_char,
) -> c_int {
    match unsafe { arg(value, "value") } {
        Ok(value) => unsafe { set_value(cfg, name, value) },
        Err(rc) => rc,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_delete_entry(cfg: *mut sys::git_config, name: *const c_char) -> c_int {
    let Some(cfg) = (unsafe { config(cfg) }) else {
        return sys::GIT_ERROR;
    };
    let name = match unsafe { arg(name, "name") } {
        Ok(n) => n,
        Err(rc) => return rc,
    };
    let (Some(key), Some(level)) = (normalize_key(name), cfg.highest()) else {
        return fail(sys::GIT_ENOTFOUND, sys::GITERR_CONFIG, format!("could not find key '{name}' to delete"));
    };
    let before = cfg.entries.len();
    cfg.entries.retain(|e| !(e.raw.level == level && e.name() == key));
    if cfg.entries.len() == before {
        return fail(sys::GIT_ENOTFOUND, sys::GITERR_CONFIG, format!("could not find key '{name}' to delete"));
    }
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_foreach(
    cfg: *mut sys::git_config,
    callback: Option<sys::git_config_foreach_cb>,
    payload: *mut c_void,
) -> c_int {
    let Some(cfg) = (unsafe { config(cfg) }) else {
        return sys::GIT_ERROR;
    };
    let Some(callback) = callback else {
        return fail(sys::GIT_ERROR, sys::GITERR_INVALID, "null callback");
    };
    for entry in &cfg.entries {
        if unsafe { callback(&raw const entry.raw, payload) } != 0 {
            return sys::GIT_EUSER;
        }
    }
    sys::GIT_OK
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_parse_bool(out: *mut c_int, value: *const c_char) -> c_int {
    let value = unsafe { ffi::c_str_lossy(value) };
    match (parse_bool(&value), unsafe { out.as_mut() }) {
        (Some(b), Some(out)) => {
            *out = c_int::from(b);
            sys::GIT_OK
        }
        _ => invalid_value(&value, "a boolean"),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_parse_int32(out: *mut i32, value: *const c_char) -> c_int {
    let value = unsafe { ffi::c_str_lossy(value) };
    match (parse_int(&value).and_then(|n| i32::try_from(n).ok()), unsafe { out.as_mut() }) {
        (Some(n), Some(out)) => {
            *out = n;
            sys::GIT_OK
        }
        _ => invalid_value(&value, "a 32-bit integer"),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_parse_int64(out: *mut i64, value: *const c_char) -> c_int {
    let value = unsafe { ffi::c_str_lossy(value) };
    match (parse_int(&value), unsafe { out.as_mut() }) {
        (Some(n), Some(out)) => {
            *out = n;
            sys::GIT_OK
        }
        _ => invalid_value(&value, "a 64-bit integer"),
    }
}

// ---------------------------------------------------------------------------
// Well-known file locations
// ---------------------------------------------------------------------------

static GLOBAL_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Make `git_config_find_global` report `path`, or nothing.
pub fn set_global_config_path(path: Option<PathBuf>) {
    *lock(&GLOBAL_FILE) = path;
}

fn missing_file(which: &str) -> c_int {
    fail(
        sys::GIT_ENOTFOUND,
        sys::GITERR_OS,
        format!("the {which} file does not exist"),
    )
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_find_global(global_config_path: *mut c_char, length: usize) -> c_int {
    let path = lock(&GLOBAL_FILE).clone();
    let Some(path) = path else {
        return missing_file("global");
    };
    let rc = unsafe { fill(global_config_path, length, &path.to_string_lossy(), sys::GITERR_NOMEMORY) };
    if rc < 0 { rc } else { sys::GIT_OK }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_find_system(_system_config_path: *mut c_char, _length: usize) -> c_int {
    missing_file("system")
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_config_find_xdg(_xdg_config_path: *mut c_char, _length: usize) -> c_int {
    missing_file("XDG")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ini_sections_and_subsections() {
        let text = "# comment\n[Core]\n\tBare = false\n[remote \"origin\"]\n\turl = \"https://example.com/x.git\"\n[x]\nflag\n";
        assert_eq!(
            parse_file(text),
            [
                ("core.bare".to_owned(), "false".to_owned()),
                ("remote.origin.url".to_owned(), "https://example.com/x.git".to_owned()),
                ("x.flag".to_owned(), "true".to_owned()),
            ]
        );
    }

    #[test]
    fn integers_take_binary_suffixes() {
        assert_eq!(parse_int("2k"), Some(2048));
        assert_eq!(parse_int("-1"), Some(-1));
        assert_eq!(parse_int("7G"), Some(7 << 30));
        assert_eq!(parse_int("12q"), None);
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn later_levels_win() {
        let mut cfg = StubConfig::default();
        cfg.levels = vec![sys::GIT_CONFIG_LEVEL_GLOBAL, sys::GIT_CONFIG_LEVEL_LOCAL];
        cfg.entries.push(Entry::new("user.name", "Global", sys::GIT_CONFIG_LEVEL_GLOBAL));
        cfg.entries.push(Entry::new("user.name", "Local", sys::GIT_CONFIG_LEVEL_LOCAL));
        assert_eq!(cfg.lookup("user.name").map(Entry::value), Some("Local"));
        assert_eq!(cfg.set("User.Email", "a@b"), 0);
        let email = cfg.lookup("user.email").unwrap();
        assert_eq!(email.raw.level, sys::GIT_CONFIG_LEVEL_LOCAL);
    }
}
