//! The patch engine: line-level diffing, edit application with content
//! validation, whole-patch conflict detection, and exact reverse patches.
//!
//! ## Architecture
//!
//! ### diff.rs
//! LCS-based line diff between two content strings, emitting merged
//! insert/delete/replace regions, plus the bridge from regions to
//! operations.
//!
//! ### apply.rs
//! Applies a single operation (with old-text validation) or a whole patch
//! (grouped by file, descending line order, all-or-nothing), and builds the
//! reverse patch whose application exactly undoes a forward patch.
//!
//! ### validate.rs
//! Checks a patch against live content and reports conflicts with
//! machine-actionable resolutions (force-append, relocate) instead of a
//! single error code.
//!
//! ### find.rs
//! Exact and closest-match text location inside a file, backing the
//! relocate resolution and mismatch diagnostics.
//!
//! The engine holds no state between calls and never touches storage
//! directly: content flows through the caller-supplied [`PatchTarget`].

pub mod apply;
pub mod diff;
pub mod find;
pub mod validate;

use crate::id::IdGenerator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied content accessor pair. Implemented by the store, but the
/// engine and history manager only ever see this trait, so they work
/// against any storage a consumer brings.
pub trait PatchTarget {
    fn read_file(&self, path: &str) -> Option<String>;
    fn write_file(&mut self, path: &str, content: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Delete,
    Replace,
    /// Applied as an equivalent replace.
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Pending,
    Applied,
    Reverted,
    Failed,
    Conflict,
}

/// One atomic text edit against a single file's line range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchOperation {
    pub id: String,
    pub kind: OperationKind,
    pub file_path: String,
    /// 1-based inclusive range. For inserts, `start_line` is the line the
    /// new text goes in front of (one past the end appends).
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    /// Exact text currently occupying the range; validated before any
    /// delete/replace mutates content.
    pub old_text: String,
    pub new_text: String,
    pub origin: Provenance,
    pub created_at: DateTime<Utc>,
}

/// A named, ordered group of operations with provenance and status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub id: String,
    pub name: String,
    pub operations: Vec<PatchOperation>,
    pub origin: Provenance,
    pub status: PatchStatus,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
    /// Linkage back to the AI suggestion that produced this patch, if any.
    pub suggestion_id: Option<String>,
    pub confidence: Option<f64>,
}

impl Patch {
    pub fn new(
        ids: &mut dyn IdGenerator,
        name: impl Into<String>,
        origin: Provenance,
        operations: Vec<PatchOperation>,
    ) -> Self {
        Self {
            id: ids.next_id(),
            name: name.into(),
            operations,
            origin,
            status: PatchStatus::Pending,
            created_at: Utc::now(),
            applied_at: None,
            suggestion_id: None,
            confidence: None,
        }
    }
}

impl PatchOperation {
    pub fn new(
        ids: &mut dyn IdGenerator,
        kind: OperationKind,
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
        origin: Provenance,
    ) -> Self {
        Self {
            id: ids.next_id(),
            kind,
            file_path: file_path.into(),
            start_line: Some(start_line),
            end_line: Some(end_line),
            old_text: old_text.into(),
            new_text: new_text.into(),
            origin,
            created_at: Utc::now(),
        }
    }
}
