use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tracing::debug;

use super::{
    error::{ClipboardError, ClipboardErrorCode, ClipboardResult},
    PasteSource,
};
use crate::{
    fs_utils::sanitize_path_follow,
    progress::{ProgressMonitor, ProgressReader},
    resource::{Resource, ResourceStore},
};

/// A bulk drop that stopped early. `dropped` holds the targets of the
/// leading sources that were written completely.
#[derive(Debug, Clone)]
pub struct DropFailure {
    pub dropped: Vec<String>,
    pub error: ClipboardError,
}

impl From<ClipboardError> for DropFailure {
    fn from(error: ClipboardError) -> Self {
        Self {
            dropped: Vec::new(),
            error,
        }
    }
}

/// A destination that accepts a whole batch in one call.
pub trait DropTarget: Send + Sync {
    fn display_name(&self) -> String;

    /// Drops every source, returning one target description per source in
    /// source order. Entries written before an error stay.
    fn drop_nodes(
        &self,
        store: &dyn ResourceStore,
        sources: &[PasteSource],
        monitor: &ProgressMonitor,
    ) -> Result<Vec<String>, DropFailure>;
}

/// Host directory that receives resources and host files. Never overwrites.
pub struct DirectoryDropTarget {
    root: PathBuf,
}

impl DirectoryDropTarget {
    pub fn new(root: &Path) -> ClipboardResult<Self> {
        let root = sanitize_path_follow(root, false)?;
        if !root.is_dir() {
            return Err(ClipboardError::new(
                ClipboardErrorCode::NotDirectory,
                "Drop destination must be a directory",
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn check_cancelled(monitor: &ProgressMonitor) -> ClipboardResult<()> {
    if monitor.is_cancelled() {
        return Err(ClipboardError::cancelled());
    }
    Ok(())
}

fn create_dir_new(dest: &Path) -> ClipboardResult<()> {
    fs::create_dir(dest).map_err(|e| {
        if e.kind() == ErrorKind::AlreadyExists {
            ClipboardError::target_exists(format!("Destination already exists: {}", dest.display()))
        } else {
            ClipboardError::io(format_args!("Failed to create dir {}", dest.display()), e)
        }
    })
}

fn write_new_file(dest: &Path, reader: &mut dyn io::Read, monitor: &ProgressMonitor) -> ClipboardResult<u64> {
    let mut writer = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                ClipboardError::target_exists(format!("Destination already exists: {}", dest.display()))
            } else {
                ClipboardError::io(format_args!("Failed to open target {}", dest.display()), e)
            }
        })?;
    io::copy(&mut ProgressReader::new(reader, monitor), &mut writer)
        .map_err(|e| ClipboardError::io(format_args!("Failed to write {}", dest.display()), e))
}

fn export_resource(
    store: &dyn ResourceStore,
    resource: &Resource,
    dest: &Path,
    monitor: &ProgressMonitor,
) -> ClipboardResult<()> {
    check_cancelled(monitor)?;
    match resource {
        Resource::File(file) => {
            let mut reader = store.open_contents(file)?;
            write_new_file(dest, &mut *reader, monitor)?;
        }
        Resource::Folder(folder) => {
            create_dir_new(dest)?;
            for member in store.members(folder)? {
                export_resource(store, &member, &dest.join(member.name()), monitor)?;
            }
        }
    }
    Ok(())
}

fn export_host(src: &Path, dest: &Path, monitor: &ProgressMonitor) -> ClipboardResult<()> {
    check_cancelled(monitor)?;
    let meta = fs::symlink_metadata(src)
        .map_err(|e| ClipboardError::io(format_args!("Failed to read metadata for {}", src.display()), e))?;
    if meta.file_type().is_symlink() {
        return Err(ClipboardError::new(
            ClipboardErrorCode::SymlinkUnsupported,
            "Refusing to copy symlinks",
        ));
    }
    if meta.is_dir() {
        if dest.starts_with(src) {
            return Err(ClipboardError::invalid_input(
                "Cannot paste a folder into itself",
            ));
        }
        create_dir_new(dest)?;
        let entries = fs::read_dir(src)
            .map_err(|e| ClipboardError::io(format_args!("Failed to read dir {}", src.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| ClipboardError::io("Failed to read dir entry", e))?;
            export_host(&entry.path(), &dest.join(entry.file_name()), monitor)?;
        }
        return Ok(());
    }
    let mut reader = fs::File::open(src)
        .map_err(|e| ClipboardError::io(format_args!("Failed to open {}", src.display()), e))?;
    write_new_file(dest, &mut reader, monitor)?;
    Ok(())
}

impl DropTarget for DirectoryDropTarget {
    fn display_name(&self) -> String {
        self.root.display().to_string()
    }

    fn drop_nodes(
        &self,
        store: &dyn ResourceStore,
        sources: &[PasteSource],
        monitor: &ProgressMonitor,
    ) -> Result<Vec<String>, DropFailure> {
        let mut dropped = Vec::with_capacity(sources.len());
        for source in sources {
            match self.drop_one(store, source, monitor) {
                Ok(target) => dropped.push(target),
                Err(error) => return Err(DropFailure { dropped, error }),
            }
        }
        Ok(dropped)
    }
}

impl DirectoryDropTarget {
    fn drop_one(
        &self,
        store: &dyn ResourceStore,
        source: &PasteSource,
        monitor: &ProgressMonitor,
    ) -> ClipboardResult<String> {
        check_cancelled(monitor)?;
        let name = source
            .name()
            .ok_or_else(|| ClipboardError::invalid_input("Invalid source path"))?;
        let target = self.root.join(&name);
        match source {
            PasteSource::Resource(path) => {
                let resource = store.resolve(path)?.ok_or_else(|| {
                    ClipboardError::new(
                        ClipboardErrorCode::NotFound,
                        format!("Source does not exist: {path}"),
                    )
                })?;
                export_resource(store, &resource, &target, monitor)?;
            }
            PasteSource::External(host) => export_host(host, &target, monitor)?,
        }
        debug!(source = %name, target = %target.display(), "dropped into directory");
        Ok(target.display().to_string())
    }
}
