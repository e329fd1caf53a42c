//! Patch application and reversal.

use crate::error::PatchError;
use crate::id::IdGenerator;
use crate::patch::{OperationKind, Patch, PatchOperation, PatchStatus, PatchTarget, Provenance};
use chrono::Utc;
use std::collections::HashMap;

/// What a successful `apply_patch` touched.
#[derive(Debug, Clone, Default)]
pub struct PatchOutcome {
    pub files_written: Vec<String>,
    pub operations_applied: usize,
}

/// Apply one operation to content, returning the new content.
///
/// Delete/replace first verify that the exact text occupying the declared
/// range equals the operation's recorded old text; a mismatch fails with
/// both sides attached and the content untouched. Insert only needs a valid
/// insertion line (one past the end appends). Move applies as replace.
pub fn apply_operation(content: &str, op: &PatchOperation) -> Result<String, PatchError> {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = op
        .start_line
        .ok_or_else(|| PatchError::MissingRange(op.id.clone()))?;

    match op.kind {
        OperationKind::Insert => {
            if start < 1 || start > lines.len() + 1 {
                return Err(PatchError::LineOutOfRange {
                    path: op.file_path.clone(),
                    start,
                    end: start,
                    line_count: lines.len(),
                });
            }
            let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
            out.extend_from_slice(&lines[..start - 1]);
            out.extend(op.new_text.split('\n'));
            out.extend_from_slice(&lines[start - 1..]);
            Ok(out.join("\n"))
        }
        OperationKind::Delete | OperationKind::Replace | OperationKind::Move => {
            let end = op.end_line.unwrap_or(start);
            if start < 1 || end < start || end > lines.len() {
                return Err(PatchError::LineOutOfRange {
                    path: op.file_path.clone(),
                    start,
                    end,
                    line_count: lines.len(),
                });
            }
            let actual = lines[start - 1..end].join("\n");
            if actual != op.old_text {
                return Err(PatchError::ContentMismatch {
                    path: op.file_path.clone(),
                    line: start,
                    expected: op.old_text.clone(),
                    actual,
                });
            }
            let mut out: Vec<&str> = Vec::with_capacity(lines.len());
            out.extend_from_slice(&lines[..start - 1]);
            if op.kind != OperationKind::Delete {
                out.extend(op.new_text.split('\n'));
            }
            out.extend_from_slice(&lines[end..]);
            Ok(out.join("\n"))
        }
    }
}

/// Apply a whole patch through the target's accessor pair.
///
/// Operations are grouped by file and applied per file in descending
/// start-line order, so an edit never observes offsets shifted by an edit
/// above it in the same pass. All-or-nothing across the patch: every new
/// content is staged in memory first, and nothing is written unless every
/// operation succeeds. The patch status moves to `Applied` or `Failed`.
pub fn apply_patch(
    patch: &mut Patch,
    target: &mut dyn PatchTarget,
) -> Result<PatchOutcome, PatchError> {
    match stage_patch(patch, target) {
        Ok(staged) => {
            let mut outcome = PatchOutcome {
                operations_applied: patch.operations.len(),
                ..Default::default()
            };
            for (path, content) in staged {
                target.write_file(&path, &content);
                outcome.files_written.push(path);
            }
            patch.status = PatchStatus::Applied;
            patch.applied_at = Some(Utc::now());
            tracing::info!(patch = %patch.id, files = outcome.files_written.len(), "applied patch");
            Ok(outcome)
        }
        Err(e) => {
            patch.status = PatchStatus::Failed;
            tracing::warn!(patch = %patch.id, error = %e, "patch failed, no files written");
            Err(e)
        }
    }
}

/// Compute every touched file's new content without writing anything.
fn stage_patch(
    patch: &Patch,
    target: &dyn PatchTarget,
) -> Result<Vec<(String, String)>, PatchError> {
    let mut file_order: Vec<String> = Vec::new();
    let mut by_file: HashMap<String, Vec<&PatchOperation>> = HashMap::new();
    for op in &patch.operations {
        if !by_file.contains_key(&op.file_path) {
            file_order.push(op.file_path.clone());
        }
        by_file.entry(op.file_path.clone()).or_default().push(op);
    }

    let mut staged = Vec::with_capacity(file_order.len());
    for path in file_order {
        let mut ops = by_file.remove(&path).unwrap_or_default();
        // Descending by start line; at equal starts deletes and replaces
        // run before inserts. A reverse patch can land a delete of
        // re-inserted text and an insert of deleted text on the same line,
        // and the delete must see the text before the insert shifts it.
        ops.sort_by_key(|op| {
            let insert_last = op.kind == OperationKind::Insert;
            (std::cmp::Reverse(op.start_line.unwrap_or(0)), insert_last)
        });

        // None until the first operation runs against a file that does not
        // exist yet; only a pure insert at line 1 may create one.
        let mut content: Option<String> = target.read_file(&path);
        for op in ops {
            content = Some(match content {
                Some(current) => apply_operation(&current, op)?,
                None if op.kind == OperationKind::Insert => {
                    if op.start_line == Some(1) {
                        op.new_text.clone()
                    } else {
                        return Err(PatchError::LineOutOfRange {
                            path: path.clone(),
                            start: op.start_line.unwrap_or(0),
                            end: op.end_line.unwrap_or(0),
                            line_count: 0,
                        });
                    }
                }
                None => return Err(PatchError::FileNotFound(path.clone())),
            });
        }
        if let Some(content) = content {
            staged.push((path, content));
        }
    }
    Ok(staged)
}

/// Build the exact inverse of a patch.
///
/// Old/new texts swap, insert and delete flip (replace and move stay
/// replace), every operation gets a fresh id, and the operation order
/// reverses so the inverse undoes effects in the opposite order they were
/// applied. Line ranges are recomputed against the post-apply layout: an
/// operation's region shifts by the net line delta of every same-file
/// operation below it.
pub fn reverse(patch: &Patch, ids: &mut dyn IdGenerator) -> Patch {
    let reversed_ops: Vec<PatchOperation> = patch
        .operations
        .iter()
        .rev()
        .map(|op| reverse_operation(op, patch, ids))
        .collect();

    Patch {
        id: ids.next_id(),
        name: format!("Reverse of {}", patch.name),
        operations: reversed_ops,
        origin: Provenance::System,
        status: PatchStatus::Pending,
        created_at: Utc::now(),
        applied_at: None,
        suggestion_id: None,
        confidence: None,
    }
}

fn reverse_operation(
    op: &PatchOperation,
    patch: &Patch,
    ids: &mut dyn IdGenerator,
) -> PatchOperation {
    let Some(start) = op.start_line else {
        // No range to recompute; mirror the texts and let apply report it.
        let mut mirrored = op.clone();
        mirrored.id = ids.next_id();
        std::mem::swap(&mut mirrored.old_text, &mut mirrored.new_text);
        return mirrored;
    };

    // Net lines added by same-file operations strictly below this one;
    // they ran later in the descending pass and shifted this region.
    let shift: isize = patch
        .operations
        .iter()
        .filter(|other| {
            other.id != op.id
                && other.file_path == op.file_path
                && other.start_line.is_some_and(|s| s < start)
        })
        .map(line_delta)
        .sum();
    let start = (start as isize + shift) as usize;

    let (kind, start_line, end_line, old_text, new_text) = match op.kind {
        OperationKind::Insert => {
            let added = line_count(&op.new_text);
            (
                OperationKind::Delete,
                start,
                start + added - 1,
                op.new_text.clone(),
                String::new(),
            )
        }
        OperationKind::Delete => (
            OperationKind::Insert,
            start,
            start,
            String::new(),
            op.old_text.clone(),
        ),
        OperationKind::Replace | OperationKind::Move => {
            let added = line_count(&op.new_text);
            (
                OperationKind::Replace,
                start,
                start + added - 1,
                op.new_text.clone(),
                op.old_text.clone(),
            )
        }
    };

    PatchOperation {
        id: ids.next_id(),
        kind,
        file_path: op.file_path.clone(),
        start_line: Some(start_line),
        end_line: Some(end_line),
        old_text,
        new_text,
        origin: Provenance::System,
        created_at: Utc::now(),
    }
}

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Lines added minus lines removed by one operation.
fn line_delta(op: &PatchOperation) -> isize {
    let (removed, added) = match op.kind {
        OperationKind::Insert => (0, line_count(&op.new_text)),
        OperationKind::Delete => (
            op.end_line.unwrap_or(0) - op.start_line.unwrap_or(0) + 1,
            0,
        ),
        OperationKind::Replace | OperationKind::Move => (
            op.end_line.unwrap_or(0) - op.start_line.unwrap_or(0) + 1,
            line_count(&op.new_text),
        ),
    };
    added as isize - removed as isize
}
