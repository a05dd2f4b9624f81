//! OverlayFS extended attributes.
//!
//! The kernel stores directory opacity, metacopy state and directory
//! redirects as `<namespace>.overlay.*` attributes on upper entries.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

pub const OPAQUE_KEY: &str = "opaque";
pub const METACOPY_KEY: &str = "metacopy";
pub const REDIRECT_KEY: &str = "redirect";

/// Value the kernel writes into the opaque attribute.
const OPAQUE_VALUE: &[u8] = b"y";

/// Namespace OverlayFS keeps its attributes in. `user` corresponds to the
/// `userxattr` mount option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum XattrNamespace {
    #[default]
    Trusted,
    User,
}

impl XattrNamespace {
    pub fn attribute(&self, key: &str) -> String {
        format!("{}.overlay.{}", self, key)
    }
}

impl std::fmt::Display for XattrNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            XattrNamespace::Trusted => write!(f, "trusted"),
            XattrNamespace::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for XattrNamespace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trusted" => Ok(XattrNamespace::Trusted),
            "user" => Ok(XattrNamespace::User),
            _ => Err(format!(
                "Invalid xattr namespace '{}'. Must be one of: trusted, user",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayXattrs {
    namespace: XattrNamespace,
}

impl OverlayXattrs {
    pub fn new(namespace: XattrNamespace) -> Self {
        OverlayXattrs { namespace }
    }

    pub fn namespace(&self) -> XattrNamespace {
        self.namespace
    }

    pub fn is_opaque(&self, path: &Path) -> io::Result<bool> {
        Ok(self
            .get(path, OPAQUE_KEY)?
            .is_some_and(|value| value == OPAQUE_VALUE))
    }

    pub fn is_metacopy(&self, path: &Path) -> io::Result<bool> {
        Ok(self.get(path, METACOPY_KEY)?.is_some())
    }

    pub fn redirect(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        self.get(path, REDIRECT_KEY)
    }

    /// Mark a directory opaque the way the kernel does.
    pub fn mark_opaque(&self, path: &Path) -> io::Result<()> {
        xattr::set(path, self.namespace.attribute(OPAQUE_KEY), OPAQUE_VALUE)
    }

    fn get(&self, path: &Path, key: &str) -> io::Result<Option<Vec<u8>>> {
        match xattr::get(path, self.namespace.attribute(key)) {
            Ok(value) => Ok(value),
            // A filesystem without xattr support cannot carry overlay markers
            Err(e) if e.raw_os_error() == Some(libc::ENOTSUP) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
