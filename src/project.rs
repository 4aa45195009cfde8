use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    ResourceView,
    ResourceEdit,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResourceView => "project-resource-view",
            Self::ResourceEdit => "project-resource-edit",
        }
    }
}

/// The project a paste destination belongs to.
#[derive(Clone, Debug, Serialize)]
pub struct Project {
    name: String,
    permissions: BTreeSet<Permission>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_permissions(name, [Permission::ResourceView, Permission::ResourceEdit])
    }

    pub fn read_only(name: impl Into<String>) -> Self {
        Self::with_permissions(name, [Permission::ResourceView])
    }

    pub fn with_permissions(
        name: impl Into<String>,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}
