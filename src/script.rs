//! Serializes an operation list into a POSIX shell script.
//!
//! Nothing here touches the trees themselves: the script is written for a
//! human to review and run once the overlay is unmounted.

use std::fs::{self, Permissions};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{OverlayError, Result};
use crate::plan::Operation;

const SCRIPT_MODE: u32 = 0o755;
const RANDOM_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptAction {
    Vacuum,
    Merge,
}

impl ScriptAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptAction::Vacuum => "vacuum",
            ScriptAction::Merge => "merge",
        }
    }
}

/// Quote `path` for `/bin/sh`, byte for byte.
///
/// Inside single quotes nothing is special except the quote itself, which is
/// written as `'\''`.
pub fn quote(path: &Path) -> Vec<u8> {
    let bytes = path.as_os_str().as_bytes();
    let mut quoted = Vec::with_capacity(bytes.len() + 2);
    quoted.push(b'\'');
    for &b in bytes {
        if b == b'\'' {
            quoted.extend_from_slice(b"'\\''");
        } else {
            quoted.push(b);
        }
    }
    quoted.push(b'\'');
    quoted
}

fn command(out: &mut Vec<u8>, parts: &[&[u8]]) {
    out.extend_from_slice(&parts.join(&b' '));
    out.push(b'\n');
}

fn reference_flag(path: &Path) -> Vec<u8> {
    let mut flag = b"--reference=".to_vec();
    flag.extend_from_slice(&quote(path));
    flag
}

fn copy_metadata(out: &mut Vec<u8>, from: &Path, to: &Path) {
    let reference = reference_flag(from);
    let to = quote(to);
    command(out, &[b"chown", &reference, b"--", &to]);
    command(out, &[b"chmod", &reference, b"--", &to]);
}

/// Append the shell commands for one operation.
pub fn render_operation(out: &mut Vec<u8>, op: &Operation) {
    match op {
        Operation::RemovePath { path } => command(out, &[b"rm", b"--", &quote(path)]),
        Operation::RemoveTree { path } => command(out, &[b"rm", b"-rf", b"--", &quote(path)]),
        Operation::PruneEmptyDirectory { path } => command(
            out,
            &[b"rmdir", b"--ignore-fail-on-non-empty", b"--", &quote(path)],
        ),
        Operation::CopyEntry { from, to } => command(
            out,
            &[
                b"cp",
                b"-a",
                b"--no-preserve=xattr",
                b"-T",
                b"--",
                &quote(from),
                &quote(to),
            ],
        ),
        Operation::MakeDirectory { path, reference } => {
            command(out, &[b"mkdir", b"--", &quote(path)]);
            copy_metadata(out, reference, path);
        }
        Operation::CopyMetadata { from, to } => copy_metadata(out, from, to),
        Operation::HardLink { target, link } => {
            command(out, &[b"ln", b"--", &quote(target), &quote(link)])
        }
        // Absolute paths never start with '-', so find needs no guard
        Operation::ClearDirectory { path } => {
            command(out, &[b"find", &quote(path), b"-mindepth", b"1", b"-delete"])
        }
    }
}

/// Full script text for `operations`.
pub fn render_script(
    action: ScriptAction,
    lower: &Path,
    upper: &Path,
    operations: &[Operation],
    generated_at: DateTime<Local>,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"#!/bin/sh\n");
    out.extend_from_slice(
        format!(
            "# overlay-tools {} {} script, generated {}\n",
            env!("CARGO_PKG_VERSION"),
            action.as_str(),
            generated_at.format("%Y-%m-%d %H:%M:%S %z")
        )
        .as_bytes(),
    );
    out.extend_from_slice(format!("# lowerdir: {}\n", lower.display()).as_bytes());
    out.extend_from_slice(format!("# upperdir: {}\n", upper.display()).as_bytes());
    out.extend_from_slice(b"# Run this only while the overlay is not mounted.\n");
    out.extend_from_slice(b"set -e\n\n");

    for op in operations {
        render_operation(&mut out, op);
    }
    out
}

/// Write the script into `dir` as `<prefix>XXXXXX.sh` with mode 0755 and
/// return its path.
pub fn write_script(
    dir: &Path,
    prefix: &str,
    action: ScriptAction,
    lower: &Path,
    upper: &Path,
    operations: &[Operation],
) -> Result<PathBuf> {
    let content = render_script(action, lower, upper, operations, Local::now());

    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".sh")
        .rand_bytes(RANDOM_SUFFIX_LEN)
        .tempfile_in(dir)
        .map_err(|e| OverlayError::io(dir, e))?;
    let path = file.path().to_path_buf();

    file.write_all(&content)
        .and_then(|_| file.flush())
        .map_err(|e| OverlayError::io(&path, e))?;
    fs::set_permissions(&path, Permissions::from_mode(SCRIPT_MODE))
        .map_err(|e| OverlayError::io(&path, e))?;
    file.keep().map_err(|e| OverlayError::io(&path, e.error))?;

    tracing::info!(
        "Wrote {} script with {} operation(s) to {}",
        action.as_str(),
        operations.len(),
        path.display()
    );
    Ok(path)
}
