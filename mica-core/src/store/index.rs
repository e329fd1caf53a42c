//! Multi-dimensional file index.
//!
//! Owns the canonical path-to-entity map and every derived structure: paths
//! by language, paths by extension, direct children per folder, declaring
//! files per exported symbol, and the import graph in both directions. All
//! derived structures are a pure function of the entities currently held;
//! insert and remove touch every structure atomically and are idempotent.

use crate::language::Language;
use crate::store::entity::FileEntity;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub struct FileIndex {
    by_path: HashMap<String, FileEntity>,
    by_language: HashMap<Language, BTreeSet<String>>,
    by_extension: HashMap<String, BTreeSet<String>>,
    children_of: HashMap<String, BTreeSet<String>>,
    /// Symbol name -> declaring paths, in insertion order.
    by_export: HashMap<String, Vec<String>>,
    /// Path -> raw specifiers it imports.
    imports_of: HashMap<String, BTreeSet<String>>,
    /// Specifier -> paths importing it (transpose of `imports_of`).
    importers_of: HashMap<String, BTreeSet<String>>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index an entity under its current fields.
    ///
    /// Callers update entities with remove-then-insert; as a backstop an
    /// insert over an already-indexed path retracts the prior contribution
    /// first so no stale derived entry can survive.
    pub fn insert(&mut self, entity: FileEntity) {
        if self.by_path.contains_key(&entity.path) {
            self.remove(&entity.path);
        }

        let path = entity.path.clone();
        if let Some(language) = entity.language {
            self.by_language.entry(language).or_default().insert(path.clone());
        }
        if let Some(extension) = &entity.extension {
            self.by_extension
                .entry(extension.clone())
                .or_default()
                .insert(path.clone());
        }
        if let Some(parent) = &entity.parent_path {
            self.children_of
                .entry(parent.clone())
                .or_default()
                .insert(path.clone());
        }
        for symbol in &entity.exports {
            let declaring = self.by_export.entry(symbol.clone()).or_default();
            if !declaring.contains(&path) {
                declaring.push(path.clone());
            }
        }
        if !entity.imports.is_empty() {
            let specifiers: BTreeSet<String> = entity.imports.iter().cloned().collect();
            for specifier in &specifiers {
                self.importers_of
                    .entry(specifier.clone())
                    .or_default()
                    .insert(path.clone());
            }
            self.imports_of.insert(path.clone(), specifiers);
        }

        tracing::debug!(path = %path, "indexed entity");
        self.by_path.insert(path, entity);
    }

    /// Retract an entity and its contribution to every derived structure.
    /// Removing a path that is not indexed is a no-op.
    pub fn remove(&mut self, path: &str) -> Option<FileEntity> {
        let entity = self.by_path.remove(path)?;

        if let Some(language) = entity.language {
            prune(&mut self.by_language, &language, path);
        }
        if let Some(extension) = &entity.extension {
            prune(&mut self.by_extension, extension, path);
        }
        if let Some(parent) = &entity.parent_path {
            prune(&mut self.children_of, parent, path);
        }
        for symbol in &entity.exports {
            if let Some(declaring) = self.by_export.get_mut(symbol) {
                declaring.retain(|p| p != path);
                if declaring.is_empty() {
                    self.by_export.remove(symbol);
                }
            }
        }
        if let Some(specifiers) = self.imports_of.remove(path) {
            for specifier in &specifiers {
                prune(&mut self.importers_of, specifier, path);
            }
        }

        tracing::debug!(path = %path, "unindexed entity");
        Some(entity)
    }

    pub fn get(&self, path: &str) -> Option<&FileEntity> {
        self.by_path.get(path)
    }

    /// Mutable access for the owning store. Indexed fields (language,
    /// extension, parent, imports, exports) must not change through this
    /// handle; the store goes through remove-then-insert for those.
    pub(crate) fn get_mut(&mut self, path: &str) -> Option<&mut FileEntity> {
        self.by_path.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.by_path.keys()
    }

    pub fn entities(&self) -> impl Iterator<Item = &FileEntity> {
        self.by_path.values()
    }

    pub fn paths_by_language(&self, language: Language) -> Vec<String> {
        collect(self.by_language.get(&language))
    }

    pub fn paths_by_extension(&self, extension: &str) -> Vec<String> {
        collect(self.by_extension.get(extension))
    }

    /// Direct (non-recursive) children of a folder path.
    pub fn children_of(&self, parent: &str) -> Vec<String> {
        collect(self.children_of.get(parent))
    }

    /// Files declaring an exported symbol, in the order they were indexed.
    pub fn files_exporting(&self, symbol: &str) -> Vec<String> {
        self.by_export.get(symbol).cloned().unwrap_or_default()
    }

    /// Specifiers a path imports.
    pub fn imports_of(&self, path: &str) -> Vec<String> {
        collect(self.imports_of.get(path))
    }

    /// Paths importing a specifier (who imports this, not who it imports).
    pub fn importers_of(&self, specifier: &str) -> Vec<String> {
        collect(self.importers_of.get(specifier))
    }
}

fn prune<K: std::hash::Hash + Eq + Clone>(
    map: &mut HashMap<K, BTreeSet<String>>,
    key: &K,
    path: &str,
) {
    if let Some(bucket) = map.get_mut(key) {
        bucket.remove(path);
        if bucket.is_empty() {
            map.remove(key);
        }
    }
}

fn collect(bucket: Option<&BTreeSet<String>>) -> Vec<String> {
    bucket.map(|b| b.iter().cloned().collect()).unwrap_or_default()
}
