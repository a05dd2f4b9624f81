use std::path::Path;

use crate::cli::validate_layers;
use crate::config::{get_config_path, validate_config, Config};
use crate::error::Result;
use crate::overlay::XattrNamespace;
use crate::preflight::{mount_status, probe_xattr, MountStatus};

const LOW_SPACE_BYTES: u64 = 1024 * 1024 * 1024;

struct DiagnosticCheck {
    name: String,
    status: DiagnosticStatus,
    details: Option<String>,
}

enum DiagnosticStatus {
    Ok,
    Warning,
    Error,
}

impl DiagnosticCheck {
    fn ok(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: DiagnosticStatus::Ok,
            details: Some(details.into()),
        }
    }

    fn warning(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: DiagnosticStatus::Warning,
            details: Some(details.into()),
        }
    }

    fn error(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: DiagnosticStatus::Error,
            details: Some(details.into()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            DiagnosticStatus::Ok => "\u{2713}",
            DiagnosticStatus::Warning => "\u{26a0}",
            DiagnosticStatus::Error => "\u{2717}",
        }
    }
}

pub fn run_doctor(lower: &Path, upper: &Path) -> Result<()> {
    println!();
    println!("overlay-tools Diagnostics");
    println!("=========================");
    println!();

    let mut checks: Vec<DiagnosticCheck> = Vec::new();
    let mut suggestions: Vec<String> = Vec::new();

    let (config_check, config) = check_config();
    checks.push(config_check);
    let namespace = config.overlay.xattr_namespace;

    let pair = match validate_layers(lower, upper) {
        Ok(pair) => {
            checks.push(DiagnosticCheck::ok("Layers", format!(
                "lower {}, upper {}",
                pair.lower.display(),
                pair.upper.display()
            )));
            Some(pair)
        }
        Err(e) => {
            checks.push(DiagnosticCheck::error("Layers", e.to_string()));
            None
        }
    };

    let uid_check = check_effective_uid();
    if matches!(uid_check.status, DiagnosticStatus::Warning) {
        suggestions.push("Run vacuum and merge as root so trusted.* attributes are visible".to_string());
    }
    checks.push(uid_check);

    if let Some(pair) = &pair {
        let xattr_check = check_xattr(&pair.upper, namespace);
        if matches!(xattr_check.status, DiagnosticStatus::Error) {
            let suggestion = match namespace {
                XattrNamespace::Trusted => "Run as root, or set overlay.xattr_namespace = \"user\" for userxattr mounts",
                XattrNamespace::User => "Use a filesystem with user xattr support for upperdir",
            };
            suggestions.push(suggestion.to_string());
        }
        checks.push(xattr_check);

        let mount_check = check_mounted(&pair.lower, &pair.upper);
        if !matches!(mount_check.status, DiagnosticStatus::Ok) {
            suggestions.push("Unmount the overlay before running the generated scripts".to_string());
        }
        checks.push(mount_check);

        checks.push(check_disk_space(&pair.lower));
    }

    for check in &checks {
        let details = check.details.as_deref().unwrap_or("");
        println!("{} {} - {}", check.symbol(), check.name, details);
    }

    if !suggestions.is_empty() {
        println!();
        println!("Suggestions:");
        for suggestion in &suggestions {
            println!("  -> {}", suggestion);
        }
    }

    println!();

    Ok(())
}

fn check_config() -> (DiagnosticCheck, Config) {
    let config_path = match get_config_path() {
        Ok(path) => path,
        Err(e) => return (DiagnosticCheck::warning("Config file", e.to_string()), Config::default()),
    };

    if !config_path.exists() {
        return (
            DiagnosticCheck::ok(
                "Config file",
                format!("not found at {}, using defaults", config_path.display()),
            ),
            Config::default(),
        );
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<Config>(&content) {
            Ok(config) => {
                let check = if let Err(e) = validate_config(&config) {
                    DiagnosticCheck::error("Config file", format!("invalid: {}", e))
                } else {
                    DiagnosticCheck::ok("Config file", format!("{} (valid)", config_path.display()))
                };
                (check, config)
            }
            Err(e) => (
                DiagnosticCheck::error("Config file", format!("parse error: {}", e)),
                Config::default(),
            ),
        },
        Err(e) => (
            DiagnosticCheck::error("Config file", format!("read error: {}", e)),
            Config::default(),
        ),
    }
}

fn check_effective_uid() -> DiagnosticCheck {
    let euid = nix::unistd::geteuid();
    if euid.is_root() {
        DiagnosticCheck::ok("Effective user", "root")
    } else {
        DiagnosticCheck::warning("Effective user", format!("uid {} (not root)", euid))
    }
}

fn check_xattr(upper: &Path, namespace: XattrNamespace) -> DiagnosticCheck {
    let name = format!("{}.* xattrs", namespace);
    match probe_xattr(upper, namespace) {
        Ok(true) => DiagnosticCheck::ok(name, "writable in upperdir"),
        Ok(false) => DiagnosticCheck::error(name, "cannot be written in upperdir"),
        Err(e) => DiagnosticCheck::error(name, format!("probe failed: {}", e)),
    }
}

fn check_mounted(lower: &Path, upper: &Path) -> DiagnosticCheck {
    match mount_status(lower, upper) {
        MountStatus::NotMounted => DiagnosticCheck::ok("Mount status", "not mounted"),
        MountStatus::Mounted(points) => {
            let points: Vec<String> = points.iter().map(|p| p.display().to_string()).collect();
            DiagnosticCheck::error("Mount status", format!("mounted at {}", points.join(", ")))
        }
        MountStatus::Unknown(reason) => DiagnosticCheck::warning("Mount status", reason),
    }
}

fn check_disk_space(lower: &Path) -> DiagnosticCheck {
    match fs2::available_space(lower) {
        Ok(bytes) => {
            let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
            if bytes >= LOW_SPACE_BYTES {
                DiagnosticCheck::ok("Disk space", format!("{:.1} GB available on lowerdir", gb))
            } else {
                DiagnosticCheck::warning(
                    "Disk space",
                    format!("{} MB available on lowerdir (low for a merge)", bytes / 1024 / 1024),
                )
            }
        }
        Err(e) => DiagnosticCheck::warning("Disk space", format!("could not check: {}", e)),
    }
}
