use crate::language::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Folder,
}

/// One file or folder held by the store.
///
/// The store owns the canonical path-to-entity map; entities reference
/// their parent by plain path string and folders list children by path, so
/// the tree never holds owning back-references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntity {
    pub id: String,
    /// Absolute, slash-separated, `/`-prefixed, no trailing slash.
    pub path: String,
    /// Final path segment.
    pub name: String,
    pub kind: EntityKind,
    /// Content byte length for loaded files; loader-reported size otherwise.
    pub size: u64,
    pub language: Option<Language>,
    pub extension: Option<String>,
    pub mime_type: Option<String>,
    /// Present only once loaded; `content_loaded` distinguishes an empty
    /// file from one whose content an external fetch has not supplied yet.
    pub content: Option<String>,
    pub content_loaded: bool,
    pub modified_at: DateTime<Utc>,
    pub is_binary: bool,
    pub is_symlink: bool,
    /// None only for root-level entities.
    pub parent_path: Option<String>,
    /// Folder children in insertion order, by path. Empty for files.
    pub children: Vec<String>,
    /// Module specifiers this file references (derived, files only).
    pub imports: Vec<String>,
    /// Symbol names this file declares (derived, files only).
    pub exports: Vec<String>,
}

impl FileEntity {
    pub fn is_file(&self) -> bool {
        self.kind == EntityKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntityKind::Folder
    }
}

/// Snapshot node for `get_file_tree`: the entity plus its recursively
/// collected children, folders before files, then alphabetical.
#[derive(Debug, Clone, Serialize)]
pub struct FileTreeNode {
    pub entity: FileEntity,
    pub children: Vec<FileTreeNode>,
}
