//! The virtual file store.
//!
//! ## Architecture
//!
//! ### entity.rs
//! The file/folder record (`FileEntity`) and the tree snapshot node.
//!
//! ### index.rs
//! The multi-dimensional index: path map plus derived language, extension,
//! folder, exported-symbol, and import-graph structures. Exclusively owned
//! and mutated by the store.
//!
//! ### mod.rs
//! `VirtualFileStore`: path normalization, tree invariants (parent/child
//! consistency), create/update/delete/rename, bulk load, lazy content, and
//! the `PatchTarget` seam the patch engine reads and writes through.
//!
//! ### search.rs
//! Ranked search over the store: language/extension/prefix filters, glob
//! matching, and regex content search with context lines.
//!
//! Everything is in-memory and single-writer; nothing here performs I/O.

pub mod entity;
pub mod index;
pub mod search;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::id::{IdGenerator, UuidIdGenerator};
use crate::language::{self, analyze, Language};
use crate::patch::PatchTarget;
use crate::store::entity::{EntityKind, FileEntity, FileTreeNode};
use crate::store::index::FileIndex;
use chrono::Utc;

/// Repository-level tag supplied by the bulk loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySource {
    pub name: String,
    pub origin: Option<String>,
}

/// One tuple from the bulk loader boundary.
#[derive(Debug, Clone)]
pub struct LoadEntry {
    pub path: String,
    pub kind: EntityKind,
    pub size: u64,
    /// None = content to be fetched lazily later.
    pub content: Option<String>,
}

pub struct VirtualFileStore {
    index: FileIndex,
    ids: Box<dyn IdGenerator>,
    config: EngineConfig,
    source: Option<RepositorySource>,
}

impl Default for VirtualFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualFileStore {
    pub fn new() -> Self {
        Self::with_ids(Box::new(UuidIdGenerator), EngineConfig::default())
    }

    pub fn with_ids(ids: Box<dyn IdGenerator>, config: EngineConfig) -> Self {
        Self {
            index: FileIndex::new(),
            ids,
            config,
            source: None,
        }
    }

    pub fn source(&self) -> Option<&RepositorySource> {
        self.source.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Normalize to absolute slash-separated form: leading `/`, no
    /// trailing slash, no empty/`.`/`..` segments, backslashes folded.
    pub fn normalize_path(path: &str) -> Result<String, StoreError> {
        let slashed = path.replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();
        for segment in slashed.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(StoreError::InvalidPath(path.to_string()));
                    }
                }
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(format!("/{}", segments.join("/")))
    }

    fn parent_of(path: &str) -> Option<String> {
        let (parent, _) = path.rsplit_once('/')?;
        if parent.is_empty() {
            None
        } else {
            Some(parent.to_string())
        }
    }

    fn name_of(path: &str) -> String {
        path.rsplit('/').next().unwrap_or(path).to_string()
    }

    /// Create a file. Fails if the path is occupied; missing ancestor
    /// folders are created implicitly, the same inference the bulk loader
    /// performs.
    pub fn create(&mut self, path: &str, content: &str) -> Result<FileEntity, StoreError> {
        let path = Self::normalize_path(path)?;
        if self.index.contains(&path) {
            return Err(StoreError::AlreadyExists(path));
        }
        let parent_path = self.ensure_parents(&path)?;

        let name = Self::name_of(&path);
        let classification = language::classify(&name);
        let analysis = if content.is_empty() || classification.is_binary {
            analyze::Analysis::default()
        } else {
            analyze::analyze(classification.language, content)
        };

        let entity = FileEntity {
            id: self.ids.next_id(),
            path: path.clone(),
            name,
            kind: EntityKind::File,
            size: content.len() as u64,
            language: Some(classification.language),
            extension: classification.extension,
            mime_type: Some(classification.mime_type),
            content: Some(content.to_string()),
            content_loaded: true,
            modified_at: Utc::now(),
            is_binary: classification.is_binary,
            is_symlink: false,
            parent_path,
            children: Vec::new(),
            imports: analysis.imports,
            exports: analysis.exports,
        };

        self.index.insert(entity.clone());
        self.link_to_parent(&path);
        tracing::info!(path = %path, "created file");
        Ok(entity)
    }

    /// Create a folder. Fails if the path is occupied.
    pub fn create_folder(&mut self, path: &str) -> Result<FileEntity, StoreError> {
        let path = Self::normalize_path(path)?;
        if self.index.contains(&path) {
            return Err(StoreError::AlreadyExists(path));
        }
        let parent_path = self.ensure_parents(&path)?;
        let entity = self.new_folder_entity(path.clone(), parent_path);

        self.index.insert(entity.clone());
        self.link_to_parent(&path);
        tracing::info!(path = %path, "created folder");
        Ok(entity)
    }

    fn new_folder_entity(&mut self, path: String, parent_path: Option<String>) -> FileEntity {
        FileEntity {
            id: self.ids.next_id(),
            name: Self::name_of(&path),
            path,
            kind: EntityKind::Folder,
            size: 0,
            language: None,
            extension: None,
            mime_type: None,
            content: None,
            content_loaded: false,
            modified_at: Utc::now(),
            is_binary: false,
            is_symlink: false,
            parent_path,
            children: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Create any missing ancestor folders; returns the direct parent path.
    fn ensure_parents(&mut self, path: &str) -> Result<Option<String>, StoreError> {
        let Some(parent) = Self::parent_of(path) else {
            return Ok(None);
        };

        let mut missing: Vec<String> = Vec::new();
        let mut cursor = Some(parent.clone());
        while let Some(current) = cursor {
            match self.index.get(&current) {
                Some(existing) if existing.is_folder() => break,
                Some(_) => return Err(StoreError::NotAFolder(current)),
                None => {
                    cursor = Self::parent_of(&current);
                    missing.push(current);
                }
            }
        }
        for folder_path in missing.into_iter().rev() {
            let parent_path = Self::parent_of(&folder_path);
            let entity = self.new_folder_entity(folder_path.clone(), parent_path);
            self.index.insert(entity);
            self.link_to_parent(&folder_path);
        }
        Ok(Some(parent))
    }

    /// Append to the parent folder's child list, skipping duplicates.
    fn link_to_parent(&mut self, path: &str) {
        let Some(parent) = Self::parent_of(path) else {
            return;
        };
        if let Some(folder) = self.index.get_mut(&parent) {
            if !folder.children.iter().any(|c| c == path) {
                folder.children.push(path.to_string());
            }
        }
    }

    fn unlink_from_parent(&mut self, path: &str) {
        let Some(parent) = Self::parent_of(path) else {
            return;
        };
        if let Some(folder) = self.index.get_mut(&parent) {
            folder.children.retain(|c| c != path);
        }
    }

    /// Delete an entity; folders delete their descendants depth-first
    /// before the node itself.
    pub fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        let path = Self::normalize_path(path)?;
        if !self.index.contains(&path) {
            return Err(StoreError::NotFound(path));
        }
        self.delete_recursive(&path);
        self.unlink_from_parent(&path);
        Ok(())
    }

    fn delete_recursive(&mut self, path: &str) {
        let children = self
            .index
            .get(path)
            .map(|e| e.children.clone())
            .unwrap_or_default();
        for child in children {
            self.delete_recursive(&child);
        }
        self.index.remove(path);
        tracing::info!(path = %path, "deleted entity");
    }

    /// Replace a file's content: recompute size and analysis, bump the
    /// timestamp, re-index with retract-then-insert semantics.
    pub fn update(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        let path = Self::normalize_path(path)?;
        self.replace_content(&path, content, true)
    }

    /// Install lazily fetched content and flip `content_loaded`. Does not
    /// bump the modified timestamp: the content was not edited here.
    pub fn provide_content(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        let path = Self::normalize_path(path)?;
        self.replace_content(&path, content, false)
    }

    fn replace_content(
        &mut self,
        path: &str,
        content: &str,
        is_edit: bool,
    ) -> Result<(), StoreError> {
        match self.index.get(path) {
            None => return Err(StoreError::NotFound(path.to_string())),
            Some(entity) if !entity.is_file() => {
                return Err(StoreError::NotAFile(path.to_string()))
            }
            Some(_) => {}
        }

        // Retract-then-insert: imports/exports feed derived indexes.
        let mut entity = self
            .index
            .remove(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let analysis = match (entity.language, content.is_empty() || entity.is_binary) {
            (Some(language), false) => analyze::analyze(language, content),
            _ => analyze::Analysis::default(),
        };
        entity.size = content.len() as u64;
        entity.content = Some(content.to_string());
        entity.content_loaded = true;
        entity.imports = analysis.imports;
        entity.exports = analysis.exports;
        if is_edit {
            entity.modified_at = Utc::now();
        }
        self.index.insert(entity);
        tracing::info!(path = %path, edit = is_edit, "updated file content");
        Ok(())
    }

    /// Rename/move an entity. Fails if the new path is occupied. Folder
    /// renames cascade: every descendant is re-keyed under the new prefix
    /// so no stale parent pointer or child path survives.
    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<(), StoreError> {
        let old_path = Self::normalize_path(old_path)?;
        let new_path = Self::normalize_path(new_path)?;
        if old_path == new_path {
            return Ok(());
        }
        if !self.index.contains(&old_path) {
            return Err(StoreError::NotFound(old_path));
        }
        if self.index.contains(&new_path) {
            return Err(StoreError::AlreadyExists(new_path));
        }
        // A folder cannot move under itself.
        if new_path.starts_with(&format!("{old_path}/")) {
            return Err(StoreError::InvalidPath(new_path));
        }

        let new_parent = self.ensure_parents(&new_path)?;
        self.unlink_from_parent(&old_path);

        // Re-key the node and, for folders, its whole subtree.
        let old_prefix = format!("{old_path}/");
        let mut moved: Vec<String> = self
            .index
            .paths()
            .filter(|p| **p == old_path || p.starts_with(&old_prefix))
            .cloned()
            .collect();
        // Parents before children so links stay coherent while re-keying.
        moved.sort();

        for path in moved {
            let Some(mut entity) = self.index.remove(&path) else {
                continue;
            };
            let rekeyed = format!("{new_path}{}", &path[old_path.len()..]);
            entity.name = Self::name_of(&rekeyed);
            entity.parent_path = if path == old_path {
                new_parent.clone()
            } else {
                entity
                    .parent_path
                    .map(|p| format!("{new_path}{}", &p[old_path.len()..]))
            };
            entity.children = entity
                .children
                .iter()
                .map(|c| format!("{new_path}{}", &c[old_path.len()..]))
                .collect();
            if entity.is_file() {
                let classification = language::classify(&entity.name);
                entity.language = Some(classification.language);
                entity.extension = classification.extension;
                entity.mime_type = Some(classification.mime_type);
                entity.is_binary = classification.is_binary;
            }
            entity.path = rekeyed;
            self.index.insert(entity);
        }

        self.link_to_parent(&new_path);
        tracing::info!(from = %old_path, to = %new_path, "renamed entity");
        Ok(())
    }

    /// Bulk-load a repository snapshot. Missing intermediate folders are
    /// inferred from path prefixes; classifier-ignored paths are skipped.
    /// Returns the number of entries materialized (inferred folders not
    /// counted).
    pub fn load_repository(
        &mut self,
        source: RepositorySource,
        entries: Vec<LoadEntry>,
    ) -> Result<usize, StoreError> {
        let mut loaded = 0usize;
        for entry in entries {
            let path = Self::normalize_path(&entry.path)?;
            if language::should_ignore(&path) {
                tracing::warn!(path = %path, "skipping ignored path in bulk load");
                continue;
            }
            if self.index.contains(&path) {
                continue;
            }
            match entry.kind {
                EntityKind::Folder => {
                    self.create_folder(&path)?;
                }
                EntityKind::File => match entry.content {
                    Some(content) => {
                        self.create(&path, &content)?;
                    }
                    None => {
                        // Entity exists with metadata only; content arrives
                        // through provide_content when fetched.
                        self.create(&path, "")?;
                        if let Some(stored) = self.index.get_mut(&path) {
                            stored.size = entry.size;
                            stored.content = None;
                            stored.content_loaded = false;
                        }
                    }
                },
            }
            loaded += 1;
        }
        tracing::info!(repository = %source.name, entries = loaded, "bulk load complete");
        self.source = Some(source);
        Ok(loaded)
    }

    pub fn get_entity(&self, path: &str) -> Option<&FileEntity> {
        let path = Self::normalize_path(path).ok()?;
        self.index.get(&path)
    }

    pub fn get_file(&self, path: &str) -> Option<&FileEntity> {
        self.get_entity(path).filter(|e| e.is_file())
    }

    /// Direct children of a folder, in insertion order.
    pub fn get_children(&self, path: &str) -> Vec<&FileEntity> {
        let Some(folder) = self.get_entity(path).filter(|e| e.is_folder()) else {
            return Vec::new();
        };
        folder
            .children
            .iter()
            .filter_map(|child| self.index.get(child))
            .collect()
    }

    /// Entities with no parent: folders before files, then by name.
    pub fn get_root_entries(&self) -> Vec<&FileEntity> {
        let mut roots: Vec<&FileEntity> = self
            .index
            .entities()
            .filter(|e| e.parent_path.is_none())
            .collect();
        sort_siblings(&mut roots);
        roots
    }

    /// Recursive tree snapshot, rebuilt on every call.
    pub fn get_file_tree(&self) -> Vec<FileTreeNode> {
        self.get_root_entries()
            .into_iter()
            .map(|root| self.build_tree_node(root))
            .collect()
    }

    fn build_tree_node(&self, entity: &FileEntity) -> FileTreeNode {
        let mut children: Vec<&FileEntity> = entity
            .children
            .iter()
            .filter_map(|child| self.index.get(child))
            .collect();
        sort_siblings(&mut children);
        FileTreeNode {
            entity: entity.clone(),
            children: children
                .into_iter()
                .map(|child| self.build_tree_node(child))
                .collect(),
        }
    }

    // Index-backed queries.

    pub fn files_by_language(&self, language: Language) -> Vec<String> {
        self.index.paths_by_language(language)
    }

    pub fn files_by_extension(&self, extension: &str) -> Vec<String> {
        self.index.paths_by_extension(&extension.to_lowercase())
    }

    pub fn files_exporting(&self, symbol: &str) -> Vec<String> {
        self.index.files_exporting(symbol)
    }

    pub fn imports_of(&self, path: &str) -> Vec<String> {
        self.index.imports_of(path)
    }

    pub fn importers_of(&self, specifier: &str) -> Vec<String> {
        self.index.importers_of(specifier)
    }

    pub fn entity_count(&self) -> usize {
        self.index.len()
    }
}

fn sort_siblings(entities: &mut [&FileEntity]) {
    entities.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// The store is its own patch target: the engine reads and writes content
/// through this seam without knowing about entities or indexes.
impl PatchTarget for VirtualFileStore {
    fn read_file(&self, path: &str) -> Option<String> {
        self.get_file(path)
            .filter(|e| e.content_loaded)
            .and_then(|e| e.content.clone())
    }

    fn write_file(&mut self, path: &str, content: &str) {
        let result = if self.get_entity(path).is_some() {
            self.update(path, content)
        } else {
            self.create(path, content).map(|_| ())
        };
        if let Err(e) = result {
            tracing::error!(path = %path, error = %e, "patch write failed");
        }
    }
}
