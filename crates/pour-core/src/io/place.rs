//! Atomic file placement into the install prefix.

use std::path::{Path, PathBuf};

use pour_schema::Sha256Digest;

use crate::error::InstallError;
use crate::io::download::hash_file;

/// Copy `source` to `dest`, replacing any existing file atomically.
///
/// The copy is written next to `dest` first and renamed over it, so a
/// concurrent reader sees either the old or the new file, never a partial
/// one. Returns the digest of the placed file.
///
/// # Errors
///
/// [`InstallError::MissingArtifact`] if `source` is not a regular file,
/// [`InstallError::Io`] for any filesystem failure.
pub fn place_file(
    source: &Path,
    dest: &Path,
    executable: bool,
) -> Result<Sha256Digest, InstallError> {
    if !source.is_file() {
        return Err(InstallError::MissingArtifact {
            source_path: source.to_path_buf(),
        });
    }

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .map_err(|e| InstallError::io("create directory", parent, e))?;

    let tmp = staging_name(dest);
    if let Err(e) = copy_with_mode(source, &tmp, executable) {
        std::fs::remove_file(&tmp).ok();
        return Err(e);
    }
    if let Err(e) = std::fs::rename(&tmp, dest) {
        std::fs::remove_file(&tmp).ok();
        return Err(InstallError::io("move into place", dest, e));
    }

    hash_file(dest).map_err(|e| InstallError::io("hash", dest, e))
}

fn staging_name(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.pour-tmp"))
}

fn copy_with_mode(source: &Path, tmp: &Path, executable: bool) -> Result<(), InstallError> {
    std::fs::copy(source, tmp).map_err(|e| InstallError::io("copy", tmp, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if executable { 0o755 } else { 0o644 };
        std::fs::set_permissions(tmp, std::fs::Permissions::from_mode(mode))
            .map_err(|e| InstallError::io("set permissions on", tmp, e))?;
    }
    #[cfg(not(unix))]
    let _ = executable;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn places_and_replaces() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("payload");
        let dest = dir.path().join("prefix/bin/condash");

        std::fs::write(&src, b"v1").unwrap();
        let d1 = place_file(&src, &dest, true).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"v1");

        std::fs::write(&src, b"v2").unwrap();
        let d2 = place_file(&src, &dest, true).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"v2");
        assert_ne!(d1, d2);

        let leftovers: Vec<_> = std::fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("condash")]);
    }

    #[cfg(unix)]
    #[test]
    fn executables_get_0755() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("payload");
        std::fs::write(&src, b"#!/bin/sh\n").unwrap();

        let bin = dir.path().join("bin/condash");
        place_file(&src, &bin, true).unwrap();
        let mode = std::fs::metadata(&bin).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);

        let doc = dir.path().join("share/README");
        place_file(&src, &doc, false).unwrap();
        let mode = std::fs::metadata(&doc).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = place_file(&dir.path().join("nope"), &dir.path().join("bin/x"), true).unwrap_err();
        assert!(matches!(err, InstallError::MissingArtifact { .. }));
    }
}
