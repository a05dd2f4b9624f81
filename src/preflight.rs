//! Safety checks run before a walk: the overlay must not be mounted, and we
//! must be privileged enough to read its extended attributes.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::error::{OverlayError, Result};
use crate::overlay::XattrNamespace;

const PROC_MOUNTS: &str = "/proc/mounts";
const PROBE_VALUE: &[u8] = b"probe";

/// An overlay entry from `/proc/mounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayMount {
    pub mount_point: PathBuf,
    pub lower_dirs: Vec<PathBuf>,
    pub upper_dir: Option<PathBuf>,
}

impl OverlayMount {
    pub fn uses(&self, lower: &Path, upper: &Path) -> bool {
        self.upper_dir.as_deref() == Some(upper) || self.lower_dirs.iter().any(|l| l == lower)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountStatus {
    NotMounted,
    Mounted(Vec<PathBuf>),
    /// The mount table could not be read.
    Unknown(String),
}

/// Undo the octal escaping (`\040` for space and so on) used in `/proc/mounts`.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let is_escape = bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b));
        if is_escape {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push(value as u8);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split an option string on commas that are not backslash-escaped.
fn split_options(options: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in options.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                parts.push(&options[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    parts.push(&options[start..]);
    parts
}

fn split_lower_dirs(value: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ':' => dirs.push(PathBuf::from(std::mem::take(&mut current))),
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        dirs.push(PathBuf::from(current));
    }
    dirs
}

pub fn parse_mounts(content: &str) -> Vec<OverlayMount> {
    let mut mounts = Vec::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || fields[2] != "overlay" {
            continue;
        }

        let mut mount = OverlayMount {
            mount_point: PathBuf::from(unescape(fields[1])),
            lower_dirs: Vec::new(),
            upper_dir: None,
        };
        for option in split_options(fields[3]) {
            let option = unescape(option);
            if let Some(value) = option
                .strip_prefix("lowerdir=")
                .or_else(|| option.strip_prefix("lowerdir+="))
            {
                mount.lower_dirs.extend(split_lower_dirs(value));
            } else if let Some(value) = option.strip_prefix("upperdir=") {
                mount.upper_dir = Some(PathBuf::from(value));
            }
        }
        mounts.push(mount);
    }
    mounts
}

/// Whether an overlay using `lower` or `upper` is currently mounted.
pub fn mount_status(lower: &Path, upper: &Path) -> MountStatus {
    match fs::read_to_string(PROC_MOUNTS) {
        Ok(content) => {
            let mount_points: Vec<PathBuf> = parse_mounts(&content)
                .into_iter()
                .filter(|m| m.uses(lower, upper))
                .map(|m| m.mount_point)
                .collect();
            if mount_points.is_empty() {
                MountStatus::NotMounted
            } else {
                MountStatus::Mounted(mount_points)
            }
        }
        Err(e) => MountStatus::Unknown(format!("cannot read {}: {}", PROC_MOUNTS, e)),
    }
}

/// Refuse to continue while the overlay may be mounted, unless the user
/// confirms or `assume_yes` is set.
pub fn check_not_mounted(lower: &Path, upper: &Path, assume_yes: bool) -> Result<()> {
    let reason = match mount_status(lower, upper) {
        MountStatus::NotMounted => return Ok(()),
        MountStatus::Mounted(points) => {
            let points: Vec<String> = points.iter().map(|p| p.display().to_string()).collect();
            format!("the overlay is still mounted at {}", points.join(", "))
        }
        MountStatus::Unknown(reason) => reason,
    };

    eprintln!("Warning: {}.", reason);
    if assume_yes {
        tracing::warn!("Continuing despite mount check: {}", reason);
        return Ok(());
    }
    if !io::stdin().is_terminal() {
        return Err(OverlayError::Mounted(format!(
            "{} (pass --yes to continue anyway)",
            reason
        )));
    }
    if prompt_yes_no(
        "It is strongly recommended to unmount the overlay first. Continue anyway?",
        false,
    )? {
        Ok(())
    } else {
        Err(OverlayError::Mounted(reason))
    }
}

/// Try writing and reading back an overlay attribute on a scratch file in `dir`.
pub fn probe_xattr(dir: &Path, namespace: XattrNamespace) -> Result<bool> {
    let probe = tempfile::Builder::new()
        .prefix(".xattr_test_")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| OverlayError::io(dir, e))?;
    let name = namespace.attribute("test");

    if let Err(e) = xattr::set(probe.path(), &name, PROBE_VALUE) {
        tracing::debug!("Setting {} failed: {}", name, e);
        return Ok(false);
    }
    let read_back = xattr::get(probe.path(), &name).ok().flatten();
    Ok(read_back.as_deref() == Some(PROBE_VALUE))
}

pub fn check_xattr_access(upper: &Path, namespace: XattrNamespace) -> Result<()> {
    if probe_xattr(upper, namespace)? {
        Ok(())
    } else {
        Err(OverlayError::Aborted(format!(
            "cannot write {}.* extended attributes in {}; run again as root",
            namespace,
            upper.display()
        )))
    }
}

/// Ask a y/N question on stderr, keeping stdout free for command output.
pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    ask_yes_no(io::stdin().lock(), io::stderr(), prompt, default)
}

fn ask_yes_no<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    prompt: &str,
    default: bool,
) -> Result<bool> {
    let default_hint = if default { "[Y/n]" } else { "[y/N]" };

    loop {
        write!(output, "{} {}: ", prompt, default_hint)
            .and_then(|_| output.flush())
            .map_err(|e| OverlayError::Aborted(format!("Failed to write prompt: {}", e)))?;

        let mut answer = String::new();
        let read = input
            .read_line(&mut answer)
            .map_err(|e| OverlayError::Aborted(format!("Failed to read input: {}", e)))?;
        if read == 0 {
            return Ok(default);
        }

        match answer.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => {
                writeln!(output, "Please enter 'y' or 'n'.")
                    .map_err(|e| OverlayError::Aborted(format!("Failed to write prompt: {}", e)))?;
            }
        }
    }
}
