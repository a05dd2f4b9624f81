//! Pairwise classification of a lower/upper entry pair.

use crate::error::Result;
use crate::overlay::types::{ChangeVerdict, EntryKind, EntrySnapshot};

/// Decide how the upper entry relates to the lower entry at the same path.
///
/// Rules are applied in order, first match wins:
/// 1. upper is a whiteout over an existing lower entry: `Deleted`
/// 2. upper is absent: `Unchanged`
/// 3. lower is absent: `Added` (a whiteout with nothing below it is `Unchanged`)
/// 4. both directories and upper is opaque: `OpaqueReplaced`
/// 5. same kind and every compared field equal: `Unchanged`
/// 6. anything else: `Modified`
///
/// `contents_match` is only called for two regular files whose metadata and
/// sizes already agree, so full-content fingerprints are never computed
/// when a cheaper check proves a difference.
pub fn classify<F>(
    lower: &EntrySnapshot,
    upper: &EntrySnapshot,
    contents_match: F,
) -> Result<ChangeVerdict>
where
    F: FnOnce() -> Result<bool>,
{
    use ChangeVerdict::*;
    use EntryKind::*;

    let verdict = match (lower.kind, upper.kind) {
        (Absent, Whiteout) => Unchanged,
        (_, Whiteout) => Deleted,
        (_, Absent) => Unchanged,
        (Absent, _) => Added,
        (l, u) if l != u => Modified,
        (Directory, Directory) if upper.is_opaque => OpaqueReplaced,
        (OtherSpecial, OtherSpecial) => {
            tracing::warn!("Special file cannot be compared, treating it as modified");
            Modified
        }
        _ if !lower.same_permissions(upper) => Modified,
        (RegularFile, RegularFile) => {
            if lower.size_bytes != upper.size_bytes {
                Modified
            } else if upper.is_metacopy || contents_match()? {
                // A metacopy upper file holds no data; reads go through to lower
                Unchanged
            } else {
                Modified
            }
        }
        (Symlink, Symlink) if lower.link_target == upper.link_target => Unchanged,
        // Directory content is judged by its children
        (Directory, Directory) => Unchanged,
        _ => Modified,
    };

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OverlayError;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::path::PathBuf;

    fn snapshot(kind: EntryKind) -> EntrySnapshot {
        EntrySnapshot {
            kind,
            mode_bits: 0o644,
            owner_uid: 1000,
            owner_gid: 1000,
            size_bytes: 1,
            ..EntrySnapshot::absent()
        }
    }

    fn file(size: u64, mode: u32) -> EntrySnapshot {
        EntrySnapshot {
            size_bytes: size,
            mode_bits: mode,
            ..snapshot(EntryKind::RegularFile)
        }
    }

    fn symlink(target: &str) -> EntrySnapshot {
        EntrySnapshot {
            link_target: Some(PathBuf::from(target)),
            ..snapshot(EntryKind::Symlink)
        }
    }

    fn opaque_dir() -> EntrySnapshot {
        EntrySnapshot {
            is_opaque: true,
            ..snapshot(EntryKind::Directory)
        }
    }

    fn never_called() -> Result<bool> {
        panic!("content comparison must not run here")
    }

    #[rstest]
    #[case::whiteout_over_file(EntryKind::RegularFile, EntryKind::Whiteout, ChangeVerdict::Deleted)]
    #[case::whiteout_over_dir(EntryKind::Directory, EntryKind::Whiteout, ChangeVerdict::Deleted)]
    #[case::whiteout_over_symlink(EntryKind::Symlink, EntryKind::Whiteout, ChangeVerdict::Deleted)]
    #[case::whiteout_over_special(EntryKind::OtherSpecial, EntryKind::Whiteout, ChangeVerdict::Deleted)]
    #[case::stray_whiteout(EntryKind::Absent, EntryKind::Whiteout, ChangeVerdict::Unchanged)]
    #[case::not_copied_up(EntryKind::RegularFile, EntryKind::Absent, ChangeVerdict::Unchanged)]
    #[case::dir_not_copied_up(EntryKind::Directory, EntryKind::Absent, ChangeVerdict::Unchanged)]
    #[case::new_file(EntryKind::Absent, EntryKind::RegularFile, ChangeVerdict::Added)]
    #[case::new_dir(EntryKind::Absent, EntryKind::Directory, ChangeVerdict::Added)]
    #[case::new_symlink(EntryKind::Absent, EntryKind::Symlink, ChangeVerdict::Added)]
    #[case::new_special(EntryKind::Absent, EntryKind::OtherSpecial, ChangeVerdict::Added)]
    #[case::file_became_dir(EntryKind::RegularFile, EntryKind::Directory, ChangeVerdict::Modified)]
    #[case::dir_became_file(EntryKind::Directory, EntryKind::RegularFile, ChangeVerdict::Modified)]
    #[case::file_became_symlink(EntryKind::RegularFile, EntryKind::Symlink, ChangeVerdict::Modified)]
    #[case::special_copied_up(EntryKind::OtherSpecial, EntryKind::OtherSpecial, ChangeVerdict::Modified)]
    #[case::same_dir(EntryKind::Directory, EntryKind::Directory, ChangeVerdict::Unchanged)]
    fn test_classify_by_kind(
        #[case] lower: EntryKind,
        #[case] upper: EntryKind,
        #[case] expected: ChangeVerdict,
    ) {
        let verdict = classify(&snapshot(lower), &snapshot(upper), never_called).unwrap();
        assert_eq!(verdict, expected);
    }

    #[test]
    fn test_identical_copy_up_is_unchanged() {
        let verdict = classify(&file(1, 0o644), &file(1, 0o644), || Ok(true)).unwrap();
        assert_eq!(verdict, ChangeVerdict::Unchanged);
    }

    #[test]
    fn test_content_difference_is_modified() {
        let verdict = classify(&file(1, 0o644), &file(1, 0o644), || Ok(false)).unwrap();
        assert_eq!(verdict, ChangeVerdict::Modified);
    }

    #[test]
    fn test_size_difference_skips_content_comparison() {
        let verdict = classify(&file(1, 0o644), &file(2, 0o644), never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Modified);
    }

    #[test]
    fn test_mode_difference_skips_content_comparison() {
        let verdict = classify(&file(1, 0o644), &file(1, 0o600), never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Modified);
    }

    #[test]
    fn test_owner_difference_is_modified() {
        let upper = EntrySnapshot {
            owner_uid: 0,
            ..file(1, 0o644)
        };
        let verdict = classify(&file(1, 0o644), &upper, never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Modified);
    }

    #[test]
    fn test_directory_mode_difference_is_modified() {
        let upper = EntrySnapshot {
            mode_bits: 0o700,
            ..snapshot(EntryKind::Directory)
        };
        let verdict = classify(&snapshot(EntryKind::Directory), &upper, never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Modified);
    }

    #[test]
    fn test_opaque_precedes_equality() {
        let verdict = classify(&snapshot(EntryKind::Directory), &opaque_dir(), never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::OpaqueReplaced);
    }

    #[test]
    fn test_opaque_dir_without_lower_is_added() {
        let verdict = classify(&EntrySnapshot::absent(), &opaque_dir(), never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Added);
    }

    #[test]
    fn test_opaque_dir_over_file_is_modified() {
        let verdict = classify(&snapshot(EntryKind::RegularFile), &opaque_dir(), never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Modified);
    }

    #[test]
    fn test_symlink_targets_compared_literally() {
        assert_eq!(
            classify(&symlink("a"), &symlink("a"), never_called).unwrap(),
            ChangeVerdict::Unchanged
        );
        assert_eq!(
            classify(&symlink("a"), &symlink("./a"), never_called).unwrap(),
            ChangeVerdict::Modified
        );
    }

    #[test]
    fn test_metacopy_with_same_metadata_is_unchanged() {
        let upper = EntrySnapshot {
            is_metacopy: true,
            ..file(1, 0o644)
        };
        let verdict = classify(&file(1, 0o644), &upper, never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Unchanged);
    }

    #[test]
    fn test_metacopy_with_new_mode_is_modified() {
        let upper = EntrySnapshot {
            is_metacopy: true,
            ..file(1, 0o600)
        };
        let verdict = classify(&file(1, 0o644), &upper, never_called).unwrap();
        assert_eq!(verdict, ChangeVerdict::Modified);
    }

    #[test]
    fn test_content_error_propagates() {
        let result = classify(&file(1, 0o644), &file(1, 0o644), || {
            Err(OverlayError::Aborted("read failed".to_string()))
        });
        assert!(result.is_err());
    }

    fn any_kind() -> impl Strategy<Value = EntryKind> {
        prop_oneof![
            Just(EntryKind::RegularFile),
            Just(EntryKind::Directory),
            Just(EntryKind::Symlink),
            Just(EntryKind::OtherSpecial),
            Just(EntryKind::Whiteout),
        ]
    }

    proptest! {
        #[test]
        fn test_whiteout_over_existing_is_always_deleted(
            lower_kind in any_kind(),
            mode in 0u32..0o7777,
            uid in 0u32..5000,
            size in 0u64..4096,
        ) {
            let lower = snapshot(lower_kind);
            let upper = EntrySnapshot {
                mode_bits: mode,
                owner_uid: uid,
                size_bytes: size,
                ..snapshot(EntryKind::Whiteout)
            };
            let verdict = classify(&lower, &upper, never_called).unwrap();
            prop_assert_eq!(verdict, ChangeVerdict::Deleted);
        }

        #[test]
        fn test_metadata_difference_is_never_unchanged(
            lower_mode in 0u32..0o7777,
            upper_mode in 0u32..0o7777,
        ) {
            prop_assume!(lower_mode != upper_mode);
            let verdict = classify(&file(8, lower_mode), &file(8, upper_mode), || Ok(true)).unwrap();
            prop_assert_eq!(verdict, ChangeVerdict::Modified);
        }
    }
}
