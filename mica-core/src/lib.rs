pub mod config;
pub mod error;
pub mod history;
pub mod id;
pub mod language;
pub mod patch;
pub mod store;

#[cfg(test)]
mod tests;

// Public library API - consumers embedding the engine get the main types
// here (but everything is public so go nuts).
pub use config::EngineConfig;
pub use error::{PatchError, StoreError};
pub use history::{HistoryEntry, HistoryEntryKind, HistoryManager};
pub use id::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use language::{classify, should_ignore, Classification, Language};
pub use patch::apply::{apply_operation, apply_patch, reverse, PatchOutcome};
pub use patch::diff::{diff_lines, regions_to_operations, ChangeRegion, RegionKind};
pub use patch::validate::{validate, Conflict, ConflictKind, Resolution, ValidationReport};
pub use patch::{OperationKind, Patch, PatchOperation, PatchStatus, PatchTarget, Provenance};
pub use store::entity::{EntityKind, FileEntity, FileTreeNode};
pub use store::search::{ContentMatch, ContentQuery, SearchQuery, SearchResult};
pub use store::{LoadEntry, RepositorySource, VirtualFileStore};
