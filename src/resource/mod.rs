//! Workspace resource model.
//!
//! Resources are addressed by workspace-relative [`ResourcePath`]s and come in
//! two flavours, [`FileResource`] and [`FolderResource`], joined in the
//! [`Resource`] variant. The root of the workspace is a folder without a
//! parent. Everything that touches bytes or metadata goes through a
//! [`ResourceStore`].

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, io::Read, path::PathBuf, str::FromStr};

mod error;
mod fs_store;
mod memory;

pub use error::{ResourceError, ResourceErrorCode, ResourceResult};
pub use fs_store::{FsStore, METADATA_DIR};
pub use memory::MemoryStore;

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    segments: Vec<String>,
}

fn validate_segment(segment: &str) -> ResourceResult<()> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(ResourceError::new(
            ResourceErrorCode::InvalidPath,
            format!("Invalid resource name: '{segment}'"),
        ));
    }
    if segment.contains(['/', '\\', '\0']) {
        return Err(ResourceError::new(
            ResourceErrorCode::InvalidPath,
            format!("Resource name must not contain separators: '{segment}'"),
        ));
    }
    Ok(())
}

impl ResourcePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a `/`-separated workspace path. Leading, trailing and doubled
    /// separators are ignored.
    pub fn parse(raw: &str) -> ResourceResult<Self> {
        let mut segments = Vec::new();
        for segment in raw.split(['/', '\\']).filter(|s| !s.is_empty()) {
            validate_segment(segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, empty for the root.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn parent(&self) -> Option<ResourcePath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn join(&self, name: &str) -> ResourceResult<ResourcePath> {
        validate_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn starts_with(&self, prefix: &ResourcePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl FromStr for ResourcePath {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = ResourceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.to_string()
    }
}

/// Text after the last `.` of `name`, `None` when there is no dot.
pub fn file_extension(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileResource {
    path: ResourcePath,
}

impl FileResource {
    pub fn new(path: ResourcePath) -> ResourceResult<Self> {
        if path.is_root() {
            return Err(ResourceError::new(
                ResourceErrorCode::NotAFile,
                "The workspace root is not a file",
            ));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn parent(&self) -> FolderResource {
        FolderResource::new(self.path.parent().unwrap_or_default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FolderResource {
    path: ResourcePath,
}

impl FolderResource {
    pub fn new(path: ResourcePath) -> Self {
        Self { path }
    }

    pub fn root() -> Self {
        Self::new(ResourcePath::root())
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn parent(&self) -> Option<FolderResource> {
        self.path.parent().map(FolderResource::new)
    }

    pub fn file(&self, name: &str) -> ResourceResult<FileResource> {
        FileResource::new(self.path.join(name)?)
    }

    pub fn folder(&self, name: &str) -> ResourceResult<FolderResource> {
        Ok(FolderResource::new(self.path.join(name)?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Folder,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    File(FileResource),
    Folder(FolderResource),
}

impl Resource {
    pub fn path(&self) -> &ResourcePath {
        match self {
            Self::File(file) => file.path(),
            Self::Folder(folder) => folder.path(),
        }
    }

    pub fn name(&self) -> &str {
        self.path().name()
    }

    pub fn extension(&self) -> Option<&str> {
        file_extension(self.name())
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::File(_) => ResourceKind::File,
            Self::Folder(_) => ResourceKind::Folder,
        }
    }

    pub fn parent(&self) -> Option<FolderResource> {
        match self {
            Self::File(file) => Some(file.parent()),
            Self::Folder(folder) => folder.parent(),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    pub fn as_container(&self) -> Option<&FolderResource> {
        match self {
            Self::Folder(folder) => Some(folder),
            Self::File(_) => None,
        }
    }

    /// The container itself for folders, the parent folder for files.
    pub fn nearest_container(&self) -> FolderResource {
        match self {
            Self::Folder(folder) => folder.clone(),
            Self::File(file) => file.parent(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub qualifier: String,
    pub local_name: String,
}

impl QualifiedName {
    pub fn new(qualifier: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            local_name: local_name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifier.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{}:{}", self.qualifier, self.local_name)
        }
    }
}

impl FromStr for QualifiedName {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (qualifier, local_name) = s.split_once(':').unwrap_or(("", s));
        if local_name.is_empty() {
            return Err(ResourceError::new(
                ResourceErrorCode::InvalidInput,
                format!("Property key '{s}' has an empty local name"),
            ));
        }
        Ok(Self::new(qualifier, local_name))
    }
}

pub type PersistentProperties = BTreeMap<QualifiedName, String>;

/// Capabilities the paste merger needs from a workspace backend.
pub trait ResourceStore: Send + Sync {
    fn resolve(&self, path: &ResourcePath) -> ResourceResult<Option<Resource>>;

    /// Direct members in the order the backend lists them.
    fn members(&self, folder: &FolderResource) -> ResourceResult<Vec<Resource>>;

    /// Creates `folder` and every missing ancestor; an existing folder is not an error.
    fn create_folder(&self, folder: &FolderResource) -> ResourceResult<()>;

    /// Creates a new file from `contents`. Fails with `AlreadyExists` when a
    /// member of that name is present and `NotFound` when the parent is missing.
    fn create_file(&self, file: &FileResource, contents: &mut dyn Read) -> ResourceResult<u64>;

    fn open_contents<'a>(&'a self, file: &FileResource) -> ResourceResult<Box<dyn Read + 'a>>;

    fn content_length(&self, file: &FileResource) -> ResourceResult<u64>;

    /// Replaces the whole content of an existing file.
    fn set_contents(&self, file: &FileResource, contents: &mut dyn Read) -> ResourceResult<u64>;

    fn persistent_properties(&self, path: &ResourcePath) -> ResourceResult<PersistentProperties>;

    fn set_persistent_property(
        &self,
        path: &ResourcePath,
        key: &QualifiedName,
        value: &str,
    ) -> ResourceResult<()>;

    fn find_member(
        &self,
        container: &FolderResource,
        name: &str,
    ) -> ResourceResult<Option<Resource>> {
        self.resolve(&container.path().join(name)?)
    }

    fn folder_exists(&self, folder: &FolderResource) -> ResourceResult<bool> {
        if folder.path().is_root() {
            return Ok(true);
        }
        Ok(matches!(self.resolve(folder.path())?, Some(Resource::Folder(_))))
    }

    /// Where `path` lives on the host filesystem, for stores that have one.
    fn host_location(&self, _path: &ResourcePath) -> Option<PathBuf> {
        None
    }
}

pub fn read_all(store: &dyn ResourceStore, file: &FileResource) -> ResourceResult<Vec<u8>> {
    let mut reader = store.open_contents(file)?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).map_err(|e| {
        ResourceError::from_io_error(
            ResourceErrorCode::IoError,
            format!("Failed to read {}", file.path()),
            e,
        )
    })?;
    Ok(buf)
}
