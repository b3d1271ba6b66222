//! Path safety checks for materializing archive directories.
//!
//! Entries copied out of a selected directory are joined onto a caller-chosen
//! destination; these checks keep every resulting path inside it.

use crate::error::Error;
use std::path::{Component, Path, PathBuf};

/// Validates and normalizes an archive-relative path.
///
/// This function performs the following checks:
/// - Rejects absolute paths and Windows prefixes
/// - Rejects paths containing ".." components (path traversal)
/// - Drops "." components and redundant separators
///
/// An empty result (e.g. the directory entry itself) is allowed and means
/// "the destination root".
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use relget::safety::validate_entry_path;
///
/// // Valid relative path
/// let safe_path = validate_entry_path("bin/tool").unwrap();
/// assert_eq!(safe_path, Path::new("bin/tool"));
///
/// // Path traversal attempt - rejected
/// assert!(validate_entry_path("../../etc/passwd").is_err());
///
/// // Absolute path - rejected
/// assert!(validate_entry_path("/etc/passwd").is_err());
/// ```
pub fn validate_entry_path(path: &str) -> Result<PathBuf, Error> {
    let mut normalized = PathBuf::new();

    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => continue,
            Component::ParentDir => {
                return Err(Error::UnsafePath(format!(
                    "path contains '..' component: {}",
                    path
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafePath(format!("absolute path not allowed: {}", path)));
            }
        }
    }

    Ok(normalized)
}

/// Resolve an archive-relative `path` beneath `root`.
pub fn join_within(root: &Path, path: &str) -> Result<PathBuf, Error> {
    Ok(root.join(validate_entry_path(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_entry_path_valid() {
        assert_eq!(validate_entry_path("file.txt").unwrap(), Path::new("file.txt"));
        assert_eq!(
            validate_entry_path("dir/subdir/file.txt").unwrap(),
            Path::new("dir/subdir/file.txt")
        );
        assert_eq!(
            validate_entry_path("./dir/file.txt").unwrap(),
            Path::new("dir/file.txt")
        );
        assert_eq!(validate_entry_path("dir//file").unwrap(), Path::new("dir/file"));
        assert_eq!(validate_entry_path("sub/").unwrap(), Path::new("sub"));
    }

    #[test]
    fn test_validate_entry_path_empty_is_root() {
        assert_eq!(validate_entry_path("").unwrap(), PathBuf::new());
        assert_eq!(validate_entry_path("./").unwrap(), PathBuf::new());
    }

    #[test]
    fn test_validate_entry_path_absolute() {
        assert!(matches!(
            validate_entry_path("/etc/passwd"),
            Err(Error::UnsafePath(_))
        ));
    }

    #[test]
    fn test_validate_entry_path_traversal() {
        for path in [
            "../etc/passwd",
            "../../etc/passwd",
            "dir/../etc/passwd",
            "dir/..",
            "./../../etc/passwd",
        ] {
            assert!(
                matches!(validate_entry_path(path), Err(Error::UnsafePath(_))),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_join_within() {
        let root = Path::new("/tmp/out");
        assert_eq!(
            join_within(root, "bin/tool").unwrap(),
            Path::new("/tmp/out/bin/tool")
        );
        assert_eq!(join_within(root, "").unwrap(), root);
        assert!(join_within(root, "../escape").is_err());
    }
}
