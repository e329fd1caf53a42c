//! Grouped undo/redo history over patches and direct edits.
//!
//! Two ordered stacks of entries. Undo pops a contiguous same-group run
//! off the undo stack, applies each entry's inverse through the caller's
//! [`PatchTarget`], and pushes the run onto the redo stack; redo mirrors
//! it, reversing iteration order so effects replay in the original forward
//! order. Recording any new entry outside of replay clears the redo stack,
//! and the undo stack drops its oldest entries past the configured cap.

use crate::config::EngineConfig;
use crate::error::PatchError;
use crate::id::{IdGenerator, UuidIdGenerator};
use crate::patch::apply::{apply_patch, reverse};
use crate::patch::{Patch, PatchStatus, PatchTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryEntryKind {
    /// A patch that was applied; undoing applies its reverse.
    PatchApplied(Patch),
    /// A patch that was explicitly reverted; undoing re-applies it.
    PatchReverted(Patch),
    /// A direct content edit outside the patch engine.
    Edit {
        path: String,
        before: String,
        after: String,
    },
}

/// One undoable unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub kind: HistoryEntryKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Entries created within the same `start_group`/`end_group` bracket
    /// share an id and undo/redo atomically together.
    pub group_id: Option<String>,
}

pub struct HistoryManager {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    active_group: Option<String>,
    max_entries: usize,
    ids: Box<dyn IdGenerator>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(Box::new(UuidIdGenerator), EngineConfig::default())
    }
}

impl HistoryManager {
    pub fn new(ids: Box<dyn IdGenerator>, config: EngineConfig) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            active_group: None,
            max_entries: config.max_history_entries,
            ids,
        }
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Bracket a logical multi-step user action. Entries recorded until
    /// `end_group` share the returned group id.
    pub fn start_group(&mut self) -> String {
        let group_id = self.ids.next_id();
        self.active_group = Some(group_id.clone());
        group_id
    }

    pub fn end_group(&mut self) {
        self.active_group = None;
    }

    pub fn record_patch_applied(&mut self, patch: Patch, description: impl Into<String>) {
        self.push(HistoryEntryKind::PatchApplied(patch), description.into());
    }

    pub fn record_patch_reverted(&mut self, patch: Patch, description: impl Into<String>) {
        self.push(HistoryEntryKind::PatchReverted(patch), description.into());
    }

    pub fn record_edit(
        &mut self,
        path: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.push(
            HistoryEntryKind::Edit {
                path: path.into(),
                before: before.into(),
                after: after.into(),
            },
            description.into(),
        );
    }

    fn push(&mut self, kind: HistoryEntryKind, description: String) {
        self.undo.push_back(HistoryEntry {
            id: self.ids.next_id(),
            kind,
            description,
            timestamp: Utc::now(),
            group_id: self.active_group.clone(),
        });
        // Any new mutation invalidates the redone future.
        self.redo.clear();
        while self.undo.len() > self.max_entries {
            self.undo.pop_front();
        }
    }

    /// Undo the most recent entry, or the whole group it belongs to.
    /// Returns how many entries were undone (0 on an empty stack). A
    /// replay failure re-pushes the failing entry and surfaces the error;
    /// already-undone entries of the run stay undone on the redo stack.
    pub fn undo(&mut self, target: &mut dyn PatchTarget) -> Result<usize, PatchError> {
        let mut undone = 0usize;
        let mut group: Option<String> = None;

        while let Some(entry) = self.undo.pop_back() {
            if undone > 0 && (entry.group_id.is_none() || entry.group_id != group) {
                self.undo.push_back(entry);
                break;
            }
            group = entry.group_id.clone();

            match self.apply_inverse(&entry, target) {
                Ok(entry) => {
                    self.redo.push(entry);
                    undone += 1;
                }
                Err(e) => {
                    self.undo.push_back(entry);
                    return Err(e);
                }
            }

            if group.is_none() {
                break;
            }
        }

        tracing::debug!(entries = undone, "undo complete");
        Ok(undone)
    }

    /// Redo the most recently undone entry or group: pops the contiguous
    /// same-group run and replays forward effects in original recording
    /// order, pushing each entry back onto the undo stack. Undo pushes a
    /// group onto the redo stack newest-first, so popping here already
    /// yields the original forward order.
    pub fn redo(&mut self, target: &mut dyn PatchTarget) -> Result<usize, PatchError> {
        let mut run: Vec<HistoryEntry> = Vec::new();
        while let Some(entry) = self.redo.pop() {
            if let Some(last) = run.last() {
                if entry.group_id.is_none() || entry.group_id != last.group_id {
                    self.redo.push(entry);
                    break;
                }
            }
            let single = entry.group_id.is_none();
            run.push(entry);
            if single {
                break;
            }
        }

        let mut redone = 0usize;
        let mut run = run.into_iter();
        while let Some(entry) = run.next() {
            match self.apply_forward(&entry, target) {
                Ok(entry) => {
                    self.undo.push_back(entry);
                    redone += 1;
                }
                Err(e) => {
                    // Put the failed entry and the unreplayed remainder back,
                    // failed entry on top so the next redo retries it.
                    let mut rest: Vec<HistoryEntry> = run.collect();
                    while let Some(later) = rest.pop() {
                        self.redo.push(later);
                    }
                    self.redo.push(entry);
                    return Err(e);
                }
            }
        }

        tracing::debug!(entries = redone, "redo complete");
        Ok(redone)
    }

    /// Apply an entry's inverse effect, returning the entry updated for
    /// the redo stack.
    fn apply_inverse(
        &mut self,
        entry: &HistoryEntry,
        target: &mut dyn PatchTarget,
    ) -> Result<HistoryEntry, PatchError> {
        let mut entry = entry.clone();
        match &mut entry.kind {
            HistoryEntryKind::PatchApplied(patch) => {
                let mut inverse = reverse(patch, self.ids.as_mut());
                apply_patch(&mut inverse, target)?;
                patch.status = PatchStatus::Reverted;
            }
            HistoryEntryKind::PatchReverted(patch) => {
                let mut forward = patch.clone();
                forward.status = PatchStatus::Pending;
                apply_patch(&mut forward, target)?;
                patch.status = PatchStatus::Applied;
            }
            HistoryEntryKind::Edit { path, before, .. } => {
                target.write_file(path, before);
            }
        }
        Ok(entry)
    }

    /// Re-apply an entry's forward effect, the mirror of `apply_inverse`.
    fn apply_forward(
        &mut self,
        entry: &HistoryEntry,
        target: &mut dyn PatchTarget,
    ) -> Result<HistoryEntry, PatchError> {
        let mut entry = entry.clone();
        match &mut entry.kind {
            HistoryEntryKind::PatchApplied(patch) => {
                let mut forward = patch.clone();
                forward.status = PatchStatus::Pending;
                apply_patch(&mut forward, target)?;
                patch.status = PatchStatus::Applied;
                patch.applied_at = forward.applied_at;
            }
            HistoryEntryKind::PatchReverted(patch) => {
                let mut inverse = reverse(patch, self.ids.as_mut());
                apply_patch(&mut inverse, target)?;
                patch.status = PatchStatus::Reverted;
            }
            HistoryEntryKind::Edit { path, after, .. } => {
                target.write_file(path, after);
            }
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIdGenerator;
    use crate::patch::{OperationKind, PatchOperation, Provenance};
    use std::collections::HashMap;

    struct MemoryTarget {
        files: HashMap<String, String>,
    }

    impl MemoryTarget {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
            }
        }
    }

    impl PatchTarget for MemoryTarget {
        fn read_file(&self, path: &str) -> Option<String> {
            self.files.get(path).cloned()
        }

        fn write_file(&mut self, path: &str, content: &str) {
            self.files.insert(path.to_string(), content.to_string());
        }
    }

    fn manager() -> HistoryManager {
        HistoryManager::new(
            Box::new(SequentialIdGenerator::new("h")),
            EngineConfig::default(),
        )
    }

    fn replace_patch(path: &str, line: usize, old: &str, new: &str) -> Patch {
        let mut ids = SequentialIdGenerator::new("p");
        let op = PatchOperation::new(
            &mut ids,
            OperationKind::Replace,
            path,
            line,
            line,
            old,
            new,
            Provenance::User,
        );
        Patch::new(&mut ids, "edit", Provenance::User, vec![op])
    }

    #[test]
    fn undo_and_redo_a_direct_edit() {
        let mut history = manager();
        let mut target = MemoryTarget::new(&[("/f", "after")]);
        history.record_edit("/f", "before", "after", "typed");

        assert_eq!(history.undo(&mut target).unwrap(), 1);
        assert_eq!(target.read_file("/f").unwrap(), "before");
        assert!(history.can_redo());

        assert_eq!(history.redo(&mut target).unwrap(), 1);
        assert_eq!(target.read_file("/f").unwrap(), "after");
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_of_applied_patch_applies_reverse() {
        let mut history = manager();
        let mut target = MemoryTarget::new(&[("/f", "line1\nline2\nline3")]);
        let mut patch = replace_patch("/f", 2, "line2", "modified");
        apply_patch(&mut patch, &mut target).unwrap();
        history.record_patch_applied(patch, "replace line 2");

        history.undo(&mut target).unwrap();
        assert_eq!(target.read_file("/f").unwrap(), "line1\nline2\nline3");

        history.redo(&mut target).unwrap();
        assert_eq!(target.read_file("/f").unwrap(), "line1\nmodified\nline3");
    }

    #[test]
    fn grouped_entries_undo_atomically() {
        let mut history = manager();
        let mut target = MemoryTarget::new(&[("/a", "a2"), ("/b", "b2"), ("/c", "c1")]);

        history.record_edit("/c", "c0", "c1", "lone edit");
        history.start_group();
        history.record_edit("/a", "a1", "a2", "group edit a");
        history.record_edit("/b", "b1", "b2", "group edit b");
        history.end_group();

        // One undo unwinds the whole group but not the lone edit below it.
        assert_eq!(history.undo(&mut target).unwrap(), 2);
        assert_eq!(target.read_file("/a").unwrap(), "a1");
        assert_eq!(target.read_file("/b").unwrap(), "b1");
        assert_eq!(target.read_file("/c").unwrap(), "c1");

        assert_eq!(history.redo(&mut target).unwrap(), 2);
        assert_eq!(target.read_file("/a").unwrap(), "a2");
        assert_eq!(target.read_file("/b").unwrap(), "b2");
    }

    #[test]
    fn new_entry_clears_redo() {
        let mut history = manager();
        let mut target = MemoryTarget::new(&[("/f", "v2")]);
        history.record_edit("/f", "v1", "v2", "first");
        history.undo(&mut target).unwrap();
        assert!(history.can_redo());

        history.record_edit("/f", "v1", "v3", "second");
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_stack_is_capped_from_the_oldest_end() {
        let mut history = HistoryManager::new(
            Box::new(SequentialIdGenerator::new("h")),
            EngineConfig {
                max_history_entries: 3,
                ..Default::default()
            },
        );
        for i in 0..5 {
            history.record_edit("/f", format!("v{i}"), format!("v{}", i + 1), "edit");
        }
        assert_eq!(history.undo_len(), 3);

        // Only the newest three survive.
        let mut target = MemoryTarget::new(&[("/f", "v5")]);
        assert_eq!(history.undo(&mut target).unwrap(), 1);
        assert_eq!(target.read_file("/f").unwrap(), "v4");
    }

    #[test]
    fn undo_on_empty_stack_is_zero() {
        let mut history = manager();
        let mut target = MemoryTarget::new(&[]);
        assert_eq!(history.undo(&mut target).unwrap(), 0);
        assert_eq!(history.redo(&mut target).unwrap(), 0);
    }

    #[test]
    fn undo_redo_symmetry_over_a_sequence() {
        let mut history = manager();
        let mut target = MemoryTarget::new(&[("/f", "v0")]);
        let states: Vec<String> = (0..4).map(|i| format!("v{i}")).collect();

        for pair in states.windows(2) {
            target.write_file("/f", &pair[1]);
            history.record_edit("/f", pair[0].clone(), pair[1].clone(), "step");
        }
        let final_state = target.read_file("/f").unwrap();

        for _ in 0..3 {
            history.undo(&mut target).unwrap();
        }
        assert_eq!(target.read_file("/f").unwrap(), "v0");
        for _ in 0..3 {
            history.redo(&mut target).unwrap();
        }
        assert_eq!(target.read_file("/f").unwrap(), final_state);
    }
}
