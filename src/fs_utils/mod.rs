//! Host filesystem path helpers.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

mod error;

pub use error::{FsUtilsError, FsUtilsErrorCode, FsUtilsResult};

/// Canonicalizes a host path, following symlinks.
pub fn sanitize_path_follow(raw: &Path, forbid_root: bool) -> FsUtilsResult<PathBuf> {
    let canon = raw.canonicalize().map_err(|e| {
        debug!(path = %raw.display(), error = ?e, "canonicalize failed");
        FsUtilsError::from_io_error(
            FsUtilsErrorCode::CanonicalizeFailed,
            &format!("Failed to canonicalize {}", raw.display()),
            e,
        )
    })?;
    debug!(raw = %raw.display(), canon = %canon.display(), "sanitize_follow result");
    if forbid_root && canon.is_absolute() && canon.parent().is_none() {
        return Err(FsUtilsError::new(
            FsUtilsErrorCode::RootForbidden,
            "Refusing to operate on filesystem root",
        ));
    }
    Ok(normalize_verbatim(&canon))
}

/// Makes a host path absolute without resolving its final component, so a
/// symlink stays a symlink. Fails when the path does not exist.
pub fn sanitize_path_nofollow(raw: &Path, forbid_root: bool) -> FsUtilsResult<PathBuf> {
    fs::symlink_metadata(raw).map_err(|e| {
        FsUtilsError::from_io_error(
            FsUtilsErrorCode::MetadataReadFailed,
            &format!("Path does not exist or unreadable: {}", raw.display()),
            e,
        )
    })?;
    let absolute = match (raw.parent(), raw.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            sanitize_path_follow(parent, false)?.join(name)
        }
        (_, Some(name)) => std::env::current_dir()
            .map_err(|e| {
                FsUtilsError::from_io_error(
                    FsUtilsErrorCode::CanonicalizeFailed,
                    "Failed to resolve current directory",
                    e,
                )
            })?
            .join(name),
        _ => sanitize_path_follow(raw, false)?,
    };
    if forbid_root && absolute.is_absolute() && absolute.parent().is_none() {
        return Err(FsUtilsError::new(
            FsUtilsErrorCode::RootForbidden,
            "Refusing to operate on filesystem root",
        ));
    }
    Ok(normalize_verbatim(&absolute))
}

pub fn is_symlink(path: &Path) -> FsUtilsResult<bool> {
    let meta = fs::symlink_metadata(path).map_err(|e| {
        FsUtilsError::from_io_error(
            FsUtilsErrorCode::MetadataReadFailed,
            &format!("Failed to read metadata for {}", path.display()),
            e,
        )
    })?;
    Ok(meta.file_type().is_symlink())
}

#[cfg(target_os = "windows")]
fn normalize_verbatim(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{rest}"));
    }
    if let Some(rest) = s.strip_prefix(r"\\?\") {
        return PathBuf::from(rest);
    }
    path.to_path_buf()
}

#[cfg(not(target_os = "windows"))]
fn normalize_verbatim(path: &Path) -> PathBuf {
    path.to_path_buf()
}
