use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use overlay_tools::overlay::{OverlayXattrs, Whiteout, XattrNamespace};
use overlay_tools::DiskLayer;
use tempfile::TempDir;

/// Get the path to the overlay-tools binary for testing.
#[allow(dead_code)]
pub fn get_overlay_tools_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin!("overlay-tools").to_path_buf()
}

/// A lowerdir/upperdir pair plus an isolated config and script directory.
/// #[allow(dead_code)] because not every test file uses every helper.
#[allow(dead_code)]
pub struct TestLayers {
    pub temp_dir: TempDir,
    pub lower: PathBuf,
    pub upper: PathBuf,
    pub config_dir: PathBuf,
    pub script_dir: PathBuf,
}

impl Default for TestLayers {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl TestLayers {
    /// Layers whose config uses the `user` namespace and skips the xattr
    /// probe, so the tests run without root.
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let lower = temp_dir.path().join("lower");
        let upper = temp_dir.path().join("upper");
        let config_dir = temp_dir.path().join("config");
        let script_dir = temp_dir.path().join("scripts");
        for dir in [&lower, &upper, &config_dir, &script_dir] {
            fs::create_dir(dir).expect("Failed to create test directory");
        }

        fs::write(
            config_dir.join("config.toml"),
            r#"[safety]
check_xattr = false

[overlay]
xattr_namespace = "user"
"#,
        )
        .expect("Failed to write config file");

        Self {
            temp_dir,
            lower,
            upper,
            config_dir,
            script_dir,
        }
    }

    pub fn lower_path(&self, relative: &str) -> PathBuf {
        self.lower.join(relative)
    }

    pub fn upper_path(&self, relative: &str) -> PathBuf {
        self.upper.join(relative)
    }

    pub fn write_lower(&self, relative: &str, content: &str) {
        write_file(&self.lower_path(relative), content);
    }

    pub fn write_upper(&self, relative: &str, content: &str) {
        write_file(&self.upper_path(relative), content);
    }

    pub fn mkdir_lower(&self, relative: &str) {
        fs::create_dir_all(self.lower_path(relative)).expect("Failed to create lower dir");
    }

    pub fn mkdir_upper(&self, relative: &str) {
        fs::create_dir_all(self.upper_path(relative)).expect("Failed to create upper dir");
    }

    /// Create a whiteout in upper. Returns false when mknod is not permitted.
    pub fn whiteout_upper(&self, relative: &str) -> bool {
        let path = self.upper_path(relative);
        let parent = path.parent().expect("whiteout needs a parent");
        fs::create_dir_all(parent).expect("Failed to create whiteout parent");
        let name = path.file_name().expect("whiteout needs a name");
        Whiteout::create(parent, name).is_ok()
    }

    /// Mark an upper directory opaque. Returns false when the filesystem
    /// has no user xattr support.
    pub fn opaque_upper(&self, relative: &str) -> bool {
        let path = self.upper_path(relative);
        fs::create_dir_all(&path).expect("Failed to create opaque dir");
        self.xattrs().mark_opaque(&path).is_ok()
    }

    pub fn xattrs(&self) -> OverlayXattrs {
        OverlayXattrs::new(XattrNamespace::User)
    }

    pub fn lower_layer(&self) -> DiskLayer {
        DiskLayer::new(&self.lower, self.xattrs())
    }

    pub fn upper_layer(&self) -> DiskLayer {
        DiskLayer::new(&self.upper, self.xattrs())
    }

    /// Run the binary against this workspace's config directory.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(get_overlay_tools_path())
            .args(args)
            .env("OVERLAY_TOOLS_CONFIG_DIR", &self.config_dir)
            .env_remove("OVERLAY_TOOLS_LOG")
            .current_dir(self.temp_dir.path())
            .output()
            .expect("Failed to run overlay-tools")
    }

    /// `<command> -l <lower> -u <upper> -y <extra...>`
    pub fn run_on_layers(&self, command: &str, extra: &[&str]) -> Output {
        let lower = self.lower.to_string_lossy().to_string();
        let upper = self.upper.to_string_lossy().to_string();
        let mut args = vec![command, "-l", lower.as_str(), "-u", upper.as_str(), "-y"];
        args.extend_from_slice(extra);
        self.run(&args)
    }

    pub fn scripts(&self) -> Vec<PathBuf> {
        let mut scripts: Vec<PathBuf> = fs::read_dir(&self.script_dir)
            .expect("Failed to read script dir")
            .map(|entry| entry.expect("Failed to read entry").path())
            .collect();
        scripts.sort();
        scripts
    }
}

#[allow(dead_code)]
pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

#[allow(dead_code)]
pub fn set_mode(path: &Path, mode: u32) {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("Failed to set mode");
}

/// Run a generated script with /bin/sh and fail the test on a non-zero exit.
#[allow(dead_code)]
pub fn run_script(script: &Path) {
    let output = Command::new("/bin/sh")
        .arg(script)
        .output()
        .expect("Failed to run /bin/sh");
    assert!(
        output.status.success(),
        "Script {} failed. stdout: {}, stderr: {}",
        script.display(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Sorted `path kind detail` lines for every entry below `root`.
#[allow(dead_code)]
pub fn tree_listing(root: &Path) -> Vec<String> {
    let mut listing = Vec::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.expect("Failed to walk tree");
        let relative = entry
            .path()
            .strip_prefix(root)
            .expect("walkdir entry outside root")
            .to_string_lossy()
            .to_string();
        let file_type = entry.file_type();
        let line = if file_type.is_dir() {
            format!("{} dir", relative)
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path()).expect("Failed to read link");
            format!("{} link {}", relative, target.display())
        } else {
            let content = fs::read_to_string(entry.path()).unwrap_or_default();
            format!("{} file {}", relative, content)
        };
        listing.push(line);
    }
    listing
}
