use std::{
    collections::{BTreeMap, HashSet},
    io::{Cursor, Read},
    sync::{Mutex, MutexGuard},
};

use super::{
    FileResource, FolderResource, PersistentProperties, QualifiedName, Resource, ResourceError,
    ResourceErrorCode, ResourcePath, ResourceResult, ResourceStore,
};

enum Node {
    Folder { children: Vec<String> },
    File { data: Vec<u8> },
}

struct Tree {
    nodes: BTreeMap<ResourcePath, Node>,
    properties: BTreeMap<ResourcePath, PersistentProperties>,
    unreadable: HashSet<ResourcePath>,
}

impl Tree {
    fn resource(&self, path: &ResourcePath) -> ResourceResult<Option<Resource>> {
        Ok(match self.nodes.get(path) {
            None => None,
            Some(Node::Folder { .. }) => Some(Resource::Folder(FolderResource::new(path.clone()))),
            Some(Node::File { .. }) => Some(Resource::File(FileResource::new(path.clone())?)),
        })
    }

    fn attach(&mut self, path: &ResourcePath, node: Node) -> ResourceResult<()> {
        let parent = path.parent().ok_or_else(|| {
            ResourceError::new(ResourceErrorCode::InvalidPath, "Cannot replace the workspace root")
        })?;
        match self.nodes.get_mut(&parent) {
            Some(Node::Folder { children }) => children.push(path.name().to_string()),
            Some(Node::File { .. }) => {
                return Err(ResourceError::new(
                    ResourceErrorCode::NotAFolder,
                    format!("Parent is a file: {parent}"),
                ))
            }
            None => return Err(ResourceError::not_found(&parent)),
        }
        self.nodes.insert(path.clone(), node);
        Ok(())
    }
}

/// Resource tree kept entirely in process memory.
pub struct MemoryStore {
    tree: Mutex<Tree>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ResourcePath::root(), Node::Folder { children: Vec::new() });
        Self {
            tree: Mutex::new(Tree {
                nodes,
                properties: BTreeMap::new(),
                unreadable: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> ResourceResult<MutexGuard<'_, Tree>> {
        self.tree.lock().map_err(|_| ResourceError::lock_failed())
    }

    /// Adds a folder (and missing ancestors) at `raw`.
    pub fn add_folder(&self, raw: &str) -> ResourceResult<FolderResource> {
        let folder = FolderResource::new(ResourcePath::parse(raw)?);
        self.create_folder(&folder)?;
        Ok(folder)
    }

    /// Adds a file at `raw`, creating missing ancestors.
    pub fn add_file(&self, raw: &str, data: &[u8]) -> ResourceResult<FileResource> {
        let file = FileResource::new(ResourcePath::parse(raw)?)?;
        self.create_folder(&file.parent())?;
        self.create_file(&file, &mut Cursor::new(data))?;
        Ok(file)
    }

    /// Makes every later read of `file` fail like a damaged medium would.
    pub fn mark_unreadable(&self, file: &FileResource) -> ResourceResult<()> {
        self.lock()?.unreadable.insert(file.path().clone());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|tree| tree.nodes.len() - 1).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn drain(contents: &mut dyn Read, path: &ResourcePath) -> ResourceResult<Vec<u8>> {
    let mut data = Vec::new();
    contents.read_to_end(&mut data).map_err(|e| {
        ResourceError::from_io_error(
            ResourceErrorCode::IoError,
            format!("Failed to read content for {path}"),
            e,
        )
    })?;
    Ok(data)
}

impl ResourceStore for MemoryStore {
    fn resolve(&self, path: &ResourcePath) -> ResourceResult<Option<Resource>> {
        self.lock()?.resource(path)
    }

    fn members(&self, folder: &FolderResource) -> ResourceResult<Vec<Resource>> {
        let tree = self.lock()?;
        let children = match tree.nodes.get(folder.path()) {
            Some(Node::Folder { children }) => children,
            Some(Node::File { .. }) => {
                return Err(ResourceError::new(
                    ResourceErrorCode::NotAFolder,
                    format!("Not a folder: {}", folder.path()),
                ))
            }
            None => return Err(ResourceError::not_found(folder.path())),
        };
        let mut out = Vec::with_capacity(children.len());
        for name in children {
            if let Some(resource) = tree.resource(&folder.path().join(name)?)? {
                out.push(resource);
            }
        }
        Ok(out)
    }

    fn create_folder(&self, folder: &FolderResource) -> ResourceResult<()> {
        let mut tree = self.lock()?;
        let mut current = ResourcePath::root();
        for segment in folder.path().segments() {
            current = current.join(segment)?;
            match tree.nodes.get(&current) {
                Some(Node::Folder { .. }) => continue,
                Some(Node::File { .. }) => {
                    return Err(ResourceError::new(
                        ResourceErrorCode::NotAFolder,
                        format!("A file is in the way: {current}"),
                    ))
                }
                None => tree.attach(&current, Node::Folder { children: Vec::new() })?,
            }
        }
        Ok(())
    }

    fn create_file(&self, file: &FileResource, contents: &mut dyn Read) -> ResourceResult<u64> {
        let data = drain(contents, file.path())?;
        let mut tree = self.lock()?;
        if tree.nodes.contains_key(file.path()) {
            return Err(ResourceError::already_exists(file.path()));
        }
        let written = data.len() as u64;
        tree.attach(file.path(), Node::File { data })?;
        Ok(written)
    }

    fn open_contents<'a>(&'a self, file: &FileResource) -> ResourceResult<Box<dyn Read + 'a>> {
        let tree = self.lock()?;
        if tree.unreadable.contains(file.path()) {
            return Err(ResourceError::new(
                ResourceErrorCode::IoError,
                format!("Failed to open {}: input/output error", file.path()),
            ));
        }
        match tree.nodes.get(file.path()) {
            Some(Node::File { data }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Folder { .. }) => Err(ResourceError::new(
                ResourceErrorCode::NotAFile,
                format!("Not a file: {}", file.path()),
            )),
            None => Err(ResourceError::not_found(file.path())),
        }
    }

    fn content_length(&self, file: &FileResource) -> ResourceResult<u64> {
        match self.lock()?.nodes.get(file.path()) {
            Some(Node::File { data }) => Ok(data.len() as u64),
            Some(Node::Folder { .. }) => Err(ResourceError::new(
                ResourceErrorCode::NotAFile,
                format!("Not a file: {}", file.path()),
            )),
            None => Err(ResourceError::not_found(file.path())),
        }
    }

    fn set_contents(&self, file: &FileResource, contents: &mut dyn Read) -> ResourceResult<u64> {
        let incoming = drain(contents, file.path())?;
        let mut tree = self.lock()?;
        match tree.nodes.get_mut(file.path()) {
            Some(Node::File { data }) => {
                *data = incoming;
                Ok(data.len() as u64)
            }
            Some(Node::Folder { .. }) => Err(ResourceError::new(
                ResourceErrorCode::NotAFile,
                format!("Not a file: {}", file.path()),
            )),
            None => Err(ResourceError::not_found(file.path())),
        }
    }

    fn persistent_properties(&self, path: &ResourcePath) -> ResourceResult<PersistentProperties> {
        let tree = self.lock()?;
        if !tree.nodes.contains_key(path) {
            return Err(ResourceError::not_found(path));
        }
        Ok(tree.properties.get(path).cloned().unwrap_or_default())
    }

    fn set_persistent_property(
        &self,
        path: &ResourcePath,
        key: &QualifiedName,
        value: &str,
    ) -> ResourceResult<()> {
        let mut tree = self.lock()?;
        if !tree.nodes.contains_key(path) {
            return Err(ResourceError::not_found(path));
        }
        tree.properties
            .entry(path.clone())
            .or_default()
            .insert(key.clone(), value.to_string());
        Ok(())
    }
}
