use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};
use tracing::debug;

use super::{
    FileResource, FolderResource, PersistentProperties, QualifiedName, Resource, ResourceError,
    ResourceErrorCode, ResourcePath, ResourceResult, ResourceStore,
};
use crate::{db::PropertyDb, fs_utils::sanitize_path_follow};

pub const METADATA_DIR: &str = ".respaste";
const DEFAULT_BUFFER_SIZE: usize = 512 * 1024;

/// Workspace backed by a host directory. Properties are kept in a
/// [`PropertyDb`] keyed by the resource path.
pub struct FsStore {
    root: PathBuf,
    properties: PropertyDb,
    buffer_size: usize,
}

fn io_err(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> ResourceError {
    let context = context.into();
    move |error| ResourceError::from_io_error(ResourceErrorCode::IoError, context, error)
}

fn copy_stream(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    buffer_size: usize,
) -> std::io::Result<u64> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut done: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        done = done.saturating_add(n as u64);
    }
    writer.flush()?;
    Ok(done)
}

impl FsStore {
    /// Opens the workspace rooted at `root`. Without an explicit
    /// `property_db` the database lives under `<root>/.respaste/`.
    pub fn open(root: &Path, property_db: Option<PathBuf>) -> ResourceResult<Self> {
        let root = sanitize_path_follow(root, true)
            .map_err(|e| ResourceError::new(ResourceErrorCode::InvalidPath, e.to_string()))?;
        if !root.is_dir() {
            return Err(ResourceError::new(
                ResourceErrorCode::NotAFolder,
                format!("Workspace root is not a directory: {}", root.display()),
            ));
        }
        let db_path = property_db.unwrap_or_else(|| root.join(METADATA_DIR).join("properties.db"));
        let properties = PropertyDb::open(&db_path)?;
        debug!(root = %root.display(), db = %db_path.display(), "workspace opened");
        Ok(Self {
            root,
            properties,
            buffer_size: DEFAULT_BUFFER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn host_path(&self, path: &ResourcePath) -> PathBuf {
        let mut host = self.root.clone();
        for segment in path.segments() {
            host.push(segment);
        }
        host
    }

    fn is_reserved(path: &ResourcePath) -> bool {
        path.segments().next() == Some(METADATA_DIR)
    }

    fn ensure_writable(path: &ResourcePath) -> ResourceResult<()> {
        if Self::is_reserved(path) {
            return Err(ResourceError::new(
                ResourceErrorCode::InvalidPath,
                format!("{path} is reserved for workspace metadata"),
            ));
        }
        Ok(())
    }
}

impl ResourceStore for FsStore {
    fn resolve(&self, path: &ResourcePath) -> ResourceResult<Option<Resource>> {
        if Self::is_reserved(path) {
            return Ok(None);
        }
        let host = self.host_path(path);
        let meta = match fs::symlink_metadata(&host) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ResourceError::from_io_error(
                    ResourceErrorCode::IoError,
                    format!("Failed to read metadata for {path}"),
                    e,
                ))
            }
        };
        if meta.file_type().is_symlink() {
            return Err(ResourceError::new(
                ResourceErrorCode::SymlinkUnsupported,
                format!("Symlinks are not supported in the workspace: {path}"),
            ));
        }
        if meta.is_dir() {
            Ok(Some(Resource::Folder(FolderResource::new(path.clone()))))
        } else {
            Ok(Some(Resource::File(FileResource::new(path.clone())?)))
        }
    }

    fn members(&self, folder: &FolderResource) -> ResourceResult<Vec<Resource>> {
        let host = self.host_path(folder.path());
        let mut out = Vec::new();
        for entry in fs::read_dir(&host).map_err(io_err(format!("Failed to read dir {}", folder.path())))? {
            let entry = entry.map_err(io_err("Failed to read dir entry"))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                debug!(entry = ?entry.path(), "skipping entry with non-UTF-8 name");
                continue;
            };
            if folder.path().is_root() && name == METADATA_DIR {
                continue;
            }
            let file_type = entry
                .file_type()
                .map_err(io_err(format!("Failed to read metadata for {name}")))?;
            let path = folder.path().join(name)?;
            if file_type.is_symlink() {
                debug!(%path, "skipping symlink member");
                continue;
            }
            if file_type.is_dir() {
                out.push(Resource::Folder(FolderResource::new(path)));
            } else {
                out.push(Resource::File(FileResource::new(path)?));
            }
        }
        Ok(out)
    }

    fn create_folder(&self, folder: &FolderResource) -> ResourceResult<()> {
        Self::ensure_writable(folder.path())?;
        let host = self.host_path(folder.path());
        fs::create_dir_all(&host).map_err(io_err(format!("Failed to create folder {}", folder.path())))
    }

    fn create_file(&self, file: &FileResource, contents: &mut dyn Read) -> ResourceResult<u64> {
        Self::ensure_writable(file.path())?;
        let host = self.host_path(file.path());
        let mut writer = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&host)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    ResourceError::already_exists(file.path())
                } else {
                    ResourceError::from_io_error(
                        ResourceErrorCode::IoError,
                        format!("Failed to create {}", file.path()),
                        e,
                    )
                }
            })?;
        let stale = self.properties.remove_properties(&file.path().to_string())?;
        if stale > 0 {
            debug!(path = %file.path(), stale, "dropped properties left by a removed file");
        }
        copy_stream(contents, &mut writer, self.buffer_size)
            .map_err(io_err(format!("Failed to write {}", file.path())))
    }

    fn open_contents<'a>(&'a self, file: &FileResource) -> ResourceResult<Box<dyn Read + 'a>> {
        let host = self.host_path(file.path());
        let reader = fs::File::open(&host).map_err(io_err(format!("Failed to open {}", file.path())))?;
        Ok(Box::new(reader))
    }

    fn content_length(&self, file: &FileResource) -> ResourceResult<u64> {
        let meta = fs::metadata(self.host_path(file.path()))
            .map_err(io_err(format!("Failed to read metadata for {}", file.path())))?;
        Ok(meta.len())
    }

    fn set_contents(&self, file: &FileResource, contents: &mut dyn Read) -> ResourceResult<u64> {
        Self::ensure_writable(file.path())?;
        let host = self.host_path(file.path());
        let mut writer = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&host)
            .map_err(io_err(format!("Failed to open {} for writing", file.path())))?;
        copy_stream(contents, &mut writer, self.buffer_size)
            .map_err(io_err(format!("Failed to write {}", file.path())))
    }

    fn persistent_properties(&self, path: &ResourcePath) -> ResourceResult<PersistentProperties> {
        if self.resolve(path)?.is_none() {
            return Err(ResourceError::not_found(path));
        }
        Ok(self.properties.properties(&path.to_string())?)
    }

    fn set_persistent_property(
        &self,
        path: &ResourcePath,
        key: &QualifiedName,
        value: &str,
    ) -> ResourceResult<()> {
        if self.resolve(path)?.is_none() {
            return Err(ResourceError::not_found(path));
        }
        Ok(self.properties.set_property(&path.to_string(), key, value)?)
    }

    fn host_location(&self, path: &ResourcePath) -> Option<PathBuf> {
        Some(self.host_path(path))
    }
}
