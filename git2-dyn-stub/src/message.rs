//! Commit message cleanup.

use std::ffi::{c_char, c_int};

use git2_dyn_sys as sys;

use crate::ffi::{arg, fill};

/// Trim trailing whitespace, drop leading and trailing blank lines, collapse
/// runs of blank lines and end with a newline.
fn prettify(message: &str, strip_comments: bool) -> String {
    let mut out = String::with_capacity(message.len() + 1);
    let mut pending_blank = false;
    for line in message.lines() {
        if strip_comments && line.starts_with('#') {
            continue;
        }
        let line = line.trim_end();
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push('\n');
            pending_blank = false;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn git_message_prettify(
    out: *mut c_char,
    out_size: usize,
    message: *const c_char,
    strip_comments: c_int,
) -> c_int {
    let message = match unsafe { arg(message, "message") } {
        Ok(m) => m,
        Err(rc) => return rc,
    };
    let pretty = prettify(message, strip_comments != 0);
    unsafe { fill(out, out_size, &pretty, sys::GITERR_INVALID) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(prettify("\n\nsubject \n\n\n\nbody\t\n\n", false), "subject\n\nbody\n");
        assert_eq!(prettify("", false), "");
        assert_eq!(prettify("# only comments\n", true), "");
    }
}
