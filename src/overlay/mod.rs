//! Reading an OverlayFS lowerdir/upperdir pair and classifying every path of
//! the merged view.

pub mod classify;
pub mod fingerprint;
pub mod inspect;
pub mod layer;
pub mod types;
pub mod walker;
pub mod whiteout;
pub mod xattrs;

#[cfg(test)]
pub mod memory;

pub use classify::classify;
pub use layer::{DiskLayer, Layer};
pub use types::{ChangeVerdict, EntryKind, EntrySnapshot, FileId, Fingerprint, RelativePath, Visit};
pub use walker::{walk, WalkOptions, Walker};
pub use whiteout::Whiteout;
pub use xattrs::{OverlayXattrs, XattrNamespace};
