use std::{
    fs,
    io::{self, ErrorKind},
    path::Path,
};
use tracing::debug;

use super::error::{ClipboardError, ClipboardErrorCode, ClipboardResult};
use crate::{
    progress::{ProgressMonitor, ProgressReader},
    resource::{
        file_extension, FileResource, FolderResource, Resource, ResourcePath, ResourceStore,
    },
};

fn check_cancelled(monitor: &ProgressMonitor) -> ClipboardResult<()> {
    if monitor.is_cancelled() {
        return Err(ClipboardError::cancelled());
    }
    Ok(())
}

fn ensure_not_child(source: &FolderResource, dest: &FolderResource) -> ClipboardResult<()> {
    if dest.path().starts_with(source.path()) {
        return Err(ClipboardError::invalid_input(
            "Cannot paste a folder into itself",
        ));
    }
    Ok(())
}

/// `name` with `-idx` inserted before the extension. Index 0 is the name itself.
pub(super) fn rename_candidate(name: &str, idx: usize) -> String {
    if idx == 0 {
        return name.to_string();
    }
    match file_extension(name) {
        Some(ext) if !ext.is_empty() => {
            let plain = &name[..name.len() - ext.len() - 1];
            format!("{plain}-{idx}.{ext}")
        }
        _ => format!("{name}-{idx}"),
    }
}

/// Picks the name `source` gets inside `dest`.
///
/// Duplicating into the source's own parent probes `name-1`, `name-2`, ...
/// until a free name is found. Any other destination keeps the name and
/// refuses when a member of that name is already there. The probe is not
/// atomic: a member created concurrently after the check is not detected.
pub fn resolve_target_name(
    store: &dyn ResourceStore,
    source: &Resource,
    dest: &FolderResource,
) -> ClipboardResult<String> {
    let name = source.name();
    if source.parent().as_ref() == Some(dest) {
        let mut idx = 1usize;
        loop {
            let candidate = rename_candidate(name, idx);
            if store.find_member(dest, &candidate)?.is_none() {
                return Ok(candidate);
            }
            idx += 1;
        }
    }
    if store.find_member(dest, name)?.is_some() {
        return Err(ClipboardError::target_exists(format!(
            "Target resource '{name}' already exists"
        )));
    }
    Ok(name.to_string())
}

/// Copies `source` into `dest` under the name picked by
/// [`resolve_target_name`] and returns the created path.
pub fn merge_resource(
    store: &dyn ResourceStore,
    source: &Resource,
    dest: &FolderResource,
    monitor: &ProgressMonitor,
) -> ClipboardResult<ResourcePath> {
    check_cancelled(monitor)?;
    if source.path().is_root() {
        return Err(ClipboardError::invalid_input(
            "Cannot paste the workspace root",
        ));
    }
    if let Resource::Folder(folder) = source {
        ensure_not_child(folder, dest)?;
    }
    let target_name = resolve_target_name(store, source, dest)?;
    debug!(source = %source.path(), dest = %dest.path(), %target_name, "merging resource");
    match source {
        Resource::File(file) => copy_file(store, file, dest, &target_name, monitor),
        Resource::Folder(folder) => copy_folder(store, folder, dest, &target_name, monitor),
    }
}

/// Creates (if absent) `dest/target_name`, copies the persistent properties of
/// `source` onto it and then replaces its content with the source bytes.
///
/// A failure while streaming leaves the created file and its properties in
/// place.
pub(super) fn copy_file(
    store: &dyn ResourceStore,
    source: &FileResource,
    dest: &FolderResource,
    target_name: &str,
    monitor: &ProgressMonitor,
) -> ClipboardResult<ResourcePath> {
    if !store.folder_exists(dest)? {
        debug!(folder = %dest.path(), "creating missing destination folder");
        store.create_folder(dest)?;
    }
    let target = dest.file(target_name)?;
    if store.resolve(target.path())?.is_none() {
        store.create_file(&target, &mut io::empty())?;
    }

    let props = store.persistent_properties(source.path())?;
    for (key, value) in &props {
        store.set_persistent_property(target.path(), key, value)?;
    }

    let mut reader = store.open_contents(source)?;
    let written = store.set_contents(&target, &mut ProgressReader::new(&mut *reader, monitor))?;
    debug!(
        source = %source.path(),
        target = %target.path(),
        bytes = written,
        properties = props.len(),
        "file copied"
    );
    Ok(target.path().clone())
}

/// Recreates `source` as `dest/target_name`, reusing the folder when it
/// already exists. Nested files never get a new name: an existing member of
/// the same name fails the copy with `TargetExists`.
pub(super) fn copy_folder(
    store: &dyn ResourceStore,
    source: &FolderResource,
    dest: &FolderResource,
    target_name: &str,
    monitor: &ProgressMonitor,
) -> ClipboardResult<ResourcePath> {
    check_cancelled(monitor)?;
    let target = dest.folder(target_name)?;
    if !store.folder_exists(&target)? {
        store.create_folder(&target)?;
    }
    for member in store.members(source)? {
        match member {
            Resource::File(file) => {
                check_cancelled(monitor)?;
                if store.find_member(&target, file.name())?.is_some() {
                    return Err(ClipboardError::target_exists(format!(
                        "Target file '{}' already exists",
                        target.path().join(file.name())?
                    )));
                }
                copy_file(store, &file, &target, file.name(), monitor)?;
            }
            Resource::Folder(folder) => {
                copy_folder(store, &folder, &target, folder.name(), monitor)?;
            }
        }
    }
    Ok(target.path().clone())
}

fn host_contains(store: &dyn ResourceStore, host: &Path, dest: &FolderResource) -> bool {
    let Some(dest_host) = store.host_location(dest.path()) else {
        return false;
    };
    match (host.canonicalize(), dest_host.canonicalize()) {
        (Ok(src), Ok(dst)) => dst.starts_with(src),
        (Ok(src), Err(_)) => dest_host.starts_with(src),
        _ => false,
    }
}

/// Imports a host file or directory into `dest` under its own name.
///
/// Returns `Ok(None)` when `host` no longer exists. Existing directories are
/// reused; an existing file is `TargetExists`.
pub fn copy_external(
    store: &dyn ResourceStore,
    host: &Path,
    dest: &FolderResource,
    monitor: &ProgressMonitor,
) -> ClipboardResult<Option<ResourcePath>> {
    check_cancelled(monitor)?;
    let meta = match fs::symlink_metadata(host) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %host.display(), "skipping vanished source");
            return Ok(None);
        }
        Err(e) => {
            return Err(ClipboardError::io(
                format_args!("Failed to read metadata for {}", host.display()),
                e,
            ))
        }
    };
    if meta.file_type().is_symlink() {
        return Err(ClipboardError::new(
            ClipboardErrorCode::SymlinkUnsupported,
            "Refusing to copy symlinks",
        ));
    }
    let name = host
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClipboardError::invalid_input("Invalid source path"))?;

    if meta.is_dir() {
        if host_contains(store, host, dest) {
            return Err(ClipboardError::invalid_input(
                "Cannot paste a folder into itself",
            ));
        }
        let folder = dest.folder(name)?;
        if !store.folder_exists(&folder)? {
            store.create_folder(&folder)?;
        }
        let entries = fs::read_dir(host)
            .map_err(|e| ClipboardError::io(format_args!("Failed to read dir {}", host.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ClipboardError::io("Failed to read dir entry", e))?;
            copy_external(store, &entry.path(), &folder, monitor)?;
        }
        return Ok(Some(folder.path().clone()));
    }

    let target = dest.file(name)?;
    if store.find_member(dest, name)?.is_some() {
        return Err(ClipboardError::target_exists(format!(
            "Target file '{}' already exists",
            target.path()
        )));
    }
    if !store.folder_exists(dest)? {
        store.create_folder(dest)?;
    }
    let mut reader = fs::File::open(host)
        .map_err(|e| ClipboardError::io(format_args!("Failed to open {}", host.display()), e))?;
    let written = store.create_file(&target, &mut ProgressReader::new(&mut reader, monitor))?;
    debug!(source = %host.display(), target = %target.path(), bytes = written, "file imported");
    Ok(Some(target.path().clone()))
}
