use serde::{Deserialize, Serialize};

use crate::tree::Facet;

/// Prefix the server puts on the row that re-emits the queried value itself.
pub const PARENT_MARKER_PREFIX: &str = "..";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFolder {
    pub facet: Facet,
    pub technical_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub count: u32,
    pub has_children_of_same_facet: bool,
}

impl VirtualFolder {
    pub fn is_parent_marker(&self) -> bool {
        self.technical_name.starts_with(PARENT_MARKER_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryObject {
    pub name: String,
    /// Human label from the type registry, e.g. "Class"
    pub object_type: String,
    /// Raw server type code, e.g. "CLAS/OC"
    pub type_code: String,
    /// File extension used when the object is materialised, e.g. "clas.abap"
    pub extension: String,
    pub uri: Option<String>,
    pub package_name: Option<String>,
}

/// Folders and objects accumulated over one discovery call.
///
/// Rows are only ever appended; folders stay sorted by facet, then name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub folders: Vec<VirtualFolder>,
    pub objects: Vec<RepositoryObject>,
}

impl DiscoveryResult {
    pub fn new(folders: Vec<VirtualFolder>, objects: Vec<RepositoryObject>) -> Self {
        let mut result = Self { folders, objects };
        result.sort_folders();
        result
    }

    /// Append another round's rows and restore folder order.
    ///
    /// Rows already present (same facet and name for folders, same name and
    /// type for objects) are skipped, so overlapping rounds list each row once.
    pub fn merge(&mut self, other: DiscoveryResult) {
        for folder in other.folders {
            let seen = self
                .folders
                .iter()
                .any(|f| f.facet == folder.facet && f.technical_name == folder.technical_name);
            if !seen {
                self.folders.push(folder);
            }
        }
        for object in other.objects {
            let seen = self
                .objects
                .iter()
                .any(|o| o.name == object.name && o.type_code == object.type_code);
            if !seen {
                self.objects.push(object);
            }
        }
        self.sort_folders();
    }

    fn sort_folders(&mut self) {
        // stable, so equal names keep arrival order
        self.folders
            .sort_by(|a, b| a.facet.cmp(&b.facet).then_with(|| a.technical_name.cmp(&b.technical_name)));
    }

    pub fn folders_for(&self, facet: Facet) -> impl Iterator<Item = &VirtualFolder> {
        self.folders.iter().filter(move |f| f.facet == facet)
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.objects.is_empty()
    }
}
