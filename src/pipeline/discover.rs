//! Input discovery and output-path derivation.
//!
//! Discovery walks the input tree with `tokio::fs` and collects every regular
//! file whose name ends with `.{source_extension}`. Order is whatever the
//! directory listing yields; files are converted independently, so no sort is
//! applied.
//!
//! Symlinked files are followed. Symlinked directories are not descended
//! into, which keeps a link cycle from turning the walk into an endless loop.

use crate::error::BatchError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Recursively list every `*.{extension}` file under `root`.
///
/// # Errors
/// - [`BatchError::InputNotFound`] when `root` does not exist
/// - [`BatchError::InputNotADirectory`] when `root` is a file
/// - [`BatchError::ReadFailed`] when a directory cannot be listed
pub async fn discover(root: &Path, extension: &str) -> Result<Vec<PathBuf>, BatchError> {
    let meta = tokio::fs::metadata(root).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BatchError::InputNotFound {
                path: root.to_path_buf(),
            }
        } else {
            BatchError::ReadFailed {
                path: root.to_path_buf(),
                source: e,
            }
        }
    })?;
    if !meta.is_dir() {
        return Err(BatchError::InputNotADirectory {
            path: root.to_path_buf(),
        });
    }

    let suffix = format!(".{extension}");
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let read_failed = |source| BatchError::ReadFailed {
            path: dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(read_failed)?;

        while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(read_failed)?;

            if file_type.is_dir() {
                pending.push(path);
                continue;
            }

            let is_file = if file_type.is_symlink() {
                // Dangling links are ignored rather than failing the run.
                tokio::fs::metadata(&path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false)
            } else {
                file_type.is_file()
            };

            if is_file && has_suffix(&path, &suffix) {
                debug!("Discovered {}", path.display());
                found.push(path);
            }
        }
    }

    debug!("Discovered {} .{} files under {}", found.len(), extension, root.display());
    Ok(found)
}

/// Map `file` under `input_root` to its mirrored location under `output_root`.
///
/// Only a trailing `.{source_ext}` is replaced, so `a.vox.backup.vox` becomes
/// `a.vox.backup.{target_ext}`. A name without the suffix keeps its name and
/// gains `.{target_ext}`.
///
/// # Errors
/// [`BatchError::PathOutsideRoot`] when `file` is not under `input_root`.
pub fn derive_output_path(
    input_root: &Path,
    output_root: &Path,
    file: &Path,
    source_ext: &str,
    target_ext: &str,
) -> Result<PathBuf, BatchError> {
    let relative = file
        .strip_prefix(input_root)
        .map_err(|_| BatchError::PathOutsideRoot {
            path: file.to_path_buf(),
            root: input_root.to_path_buf(),
        })?;

    let name = relative
        .file_name()
        .ok_or_else(|| BatchError::PathOutsideRoot {
            path: file.to_path_buf(),
            root: input_root.to_path_buf(),
        })?;

    let mut renamed = strip_suffix(name, &format!(".{source_ext}"))
        .unwrap_or(name)
        .to_os_string();
    renamed.push(".");
    renamed.push(target_ext);
    let renamed = relative.with_file_name(renamed);

    Ok(output_root.join(renamed))
}

/// Suffix checks work on the raw name bytes so names that are not valid
/// UTF-8 keep their identity.
fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .is_some_and(|n| n.as_encoded_bytes().ends_with(suffix.as_bytes()))
}

fn strip_suffix<'a>(name: &'a OsStr, suffix: &str) -> Option<&'a OsStr> {
    let stem = name.as_encoded_bytes().strip_suffix(suffix.as_bytes())?;
    // SAFETY: `suffix` is non-empty UTF-8, and splitting an encoded OsStr
    // immediately before a non-empty UTF-8 substring yields a valid OsStr.
    Some(unsafe { OsStr::from_encoded_bytes_unchecked(stem) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn derive(root: &str, out: &str, file: &str) -> PathBuf {
        derive_output_path(Path::new(root), Path::new(out), Path::new(file), "vox", "svox")
            .expect("file is under root")
    }

    #[test]
    fn derive_nested_path() {
        assert_eq!(derive("/a", "/b", "/a/x/y.vox"), PathBuf::from("/b/x/y.svox"));
    }

    #[test]
    fn derive_top_level_file() {
        assert_eq!(derive("/a", "/b", "/a/y.vox"), PathBuf::from("/b/y.svox"));
    }

    #[test]
    fn derive_replaces_only_trailing_extension() {
        assert_eq!(
            derive("/a", "/b", "/a/foo.vox.backup.vox"),
            PathBuf::from("/b/foo.vox.backup.svox")
        );
        assert_eq!(
            derive("/a", "/b", "/a/voxels.vox/inner.vox"),
            PathBuf::from("/b/voxels.vox/inner.svox")
        );
    }

    #[test]
    fn derive_relative_roots() {
        assert_eq!(
            derive("models", "out", "models/trees/oak.vox"),
            PathBuf::from("out/trees/oak.svox")
        );
    }

    #[test]
    fn derive_rejects_file_outside_root() {
        let err = derive_output_path(
            Path::new("/a"),
            Path::new("/b"),
            Path::new("/elsewhere/y.vox"),
            "vox",
            "svox",
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::PathOutsideRoot { .. }));
    }

    #[test]
    fn suffix_match_is_anchored() {
        assert!(has_suffix(Path::new("/a/b.vox"), ".vox"));
        assert!(!has_suffix(Path::new("/a/b.vox.bak"), ".vox"));
        assert!(!has_suffix(Path::new("/a/b.svox"), ".vox"));
        assert!(has_suffix(Path::new("/a/.vox"), ".vox"));
        assert!(!has_suffix(Path::new("/a/b.VOX"), ".vox"));
    }

    #[tokio::test]
    async fn discover_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("x/y/z")).unwrap();
        std::fs::write(root.join("top.vox"), b"VOX ").unwrap();
        std::fs::write(root.join("x/mid.vox"), b"VOX ").unwrap();
        std::fs::write(root.join("x/y/z/deep.vox"), b"VOX ").unwrap();
        std::fs::write(root.join("x/notes.txt"), b"ignore").unwrap();
        std::fs::write(root.join("x/y/archive.vox.bak"), b"ignore").unwrap();

        let found: BTreeSet<PathBuf> = discover(root, "vox").await.unwrap().into_iter().collect();
        let expected: BTreeSet<PathBuf> = [
            root.join("top.vox"),
            root.join("x/mid.vox"),
            root.join("x/y/z/deep.vox"),
        ]
        .into_iter()
        .collect();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn discover_skips_directories_named_like_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scene.vox")).unwrap();
        std::fs::write(dir.path().join("scene.vox/real.vox"), b"VOX ").unwrap();

        let found = discover(dir.path(), "vox").await.unwrap();
        assert_eq!(found, vec![dir.path().join("scene.vox/real.vox")]);
    }

    #[tokio::test]
    async fn discover_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        assert!(discover(dir.path(), "vox").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn discover_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("nope"), "vox").await.unwrap_err();
        assert!(matches!(err, BatchError::InputNotFound { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn discover_file_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single.vox");
        std::fs::write(&file, b"VOX ").unwrap();
        let err = discover(&file, "vox").await.unwrap_err();
        assert!(matches!(err, BatchError::InputNotADirectory { .. }), "got: {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn derive_keeps_non_utf8_names_distinct() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/in");
        let out = Path::new("/out");
        let e_acute = root.join(OsStr::from_bytes(b"a\xE9.vox"));
        let e_grave = root.join(OsStr::from_bytes(b"a\xE8.vox"));

        let first = derive_output_path(root, out, &e_acute, "vox", "svox").unwrap();
        let second = derive_output_path(root, out, &e_grave, "vox", "svox").unwrap();

        assert_ne!(first, second);
        assert_eq!(first.file_name().unwrap().as_bytes(), b"a\xE9.svox");
        assert_eq!(second.file_name().unwrap().as_bytes(), b"a\xE8.svox");
        assert!(has_suffix(&e_acute, ".vox"));
    }

    // Other unixes may refuse to create names that are not valid UTF-8.
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn discover_finds_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let e_acute = dir.path().join(OsStr::from_bytes(b"a\xE9.vox"));
        let e_grave = dir.path().join(OsStr::from_bytes(b"a\xE8.vox"));
        std::fs::write(&e_acute, b"VOX ").unwrap();
        std::fs::write(&e_grave, b"VOX ").unwrap();

        let found: BTreeSet<PathBuf> = discover(dir.path(), "vox").await.unwrap().into_iter().collect();
        let expected: BTreeSet<PathBuf> = [e_acute, e_grave].into_iter().collect();
        assert_eq!(found, expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn discover_follows_file_links_but_not_directory_links() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("models");
        let elsewhere = dir.path().join("elsewhere");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&elsewhere).unwrap();
        std::fs::write(elsewhere.join("hidden.vox"), b"VOX ").unwrap();
        std::fs::write(root.join("real.vox"), b"VOX ").unwrap();

        symlink(root.join("real.vox"), root.join("alias.vox")).unwrap();
        symlink(&elsewhere, root.join("linked_dir")).unwrap();
        symlink(root.join("missing.vox"), root.join("dangling.vox")).unwrap();
        // A cycle back to the root must not hang the walk.
        symlink(&root, root.join("loop")).unwrap();

        let found: BTreeSet<PathBuf> = discover(&root, "vox").await.unwrap().into_iter().collect();
        let expected: BTreeSet<PathBuf> =
            [root.join("real.vox"), root.join("alias.vox")].into_iter().collect();
        assert_eq!(found, expected);
    }
}
