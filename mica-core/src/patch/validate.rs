//! Whole-patch validation against live content.

use crate::patch::find::{find_closest, find_exact};
use crate::patch::{OperationKind, Patch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    FileNotFound,
    LineOutOfRange,
    ContentChanged,
}

/// A way a caller can resolve one conflict. `Skip` and `ForceApply` are
/// always legal caller choices; validation only attaches the options that
/// the engine can vouch for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Resolution {
    /// Drop the conflicting operation and apply the rest.
    Skip,
    /// Apply despite the mismatch, overwriting whatever is there now.
    ForceApply,
    /// The declared range fell off the end; append instead.
    ForceAppend,
    /// The recorded old text was found intact at exactly one other
    /// location; re-target the operation there.
    RelocateTo { line: usize },
}

/// One detected mismatch between an operation and live content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub operation_id: String,
    pub file_path: String,
    pub kind: ConflictKind,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    /// How many places the recorded old text occurs elsewhere. More than
    /// one means relocation is ambiguous and no relocate option is offered.
    pub occurrences: usize,
    pub resolutions: Vec<Resolution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// No conflicts at all.
    pub is_valid: bool,
    /// Every conflict carries at least one resolution option.
    pub can_apply: bool,
    pub conflicts: Vec<Conflict>,
}

/// Check every operation of a patch against current content.
///
/// A missing target file conflicts unless the operation is a pure insert; a
/// start line past the file's end conflicts with a force-append option; old
/// text that no longer matches conflicts as content-changed, with a
/// relocate option iff the text survives intact at exactly one other spot
/// (multiple survivals are reported as ambiguous rather than guessed at).
pub fn validate<F>(patch: &Patch, read_file: F) -> ValidationReport
where
    F: Fn(&str) -> Option<String>,
{
    let mut conflicts = Vec::new();

    for op in &patch.operations {
        let content = read_file(&op.file_path);

        let Some(content) = content else {
            if op.kind != OperationKind::Insert {
                conflicts.push(Conflict {
                    operation_id: op.id.clone(),
                    file_path: op.file_path.clone(),
                    kind: ConflictKind::FileNotFound,
                    message: format!("Target file not found: {}", op.file_path),
                    expected: None,
                    actual: None,
                    occurrences: 0,
                    resolutions: Vec::new(),
                });
            }
            continue;
        };

        let lines: Vec<String> = content.split('\n').map(str::to_string).collect();
        let Some(start) = op.start_line else {
            conflicts.push(Conflict {
                operation_id: op.id.clone(),
                file_path: op.file_path.clone(),
                kind: ConflictKind::LineOutOfRange,
                message: "Operation has no line range".to_string(),
                expected: None,
                actual: None,
                occurrences: 0,
                resolutions: vec![Resolution::ForceAppend],
            });
            continue;
        };

        let max_start = if op.kind == OperationKind::Insert {
            lines.len() + 1
        } else {
            lines.len()
        };
        if start < 1 || start > max_start {
            conflicts.push(Conflict {
                operation_id: op.id.clone(),
                file_path: op.file_path.clone(),
                kind: ConflictKind::LineOutOfRange,
                message: format!(
                    "Line {start} is out of range for {} ({} lines)",
                    op.file_path,
                    lines.len()
                ),
                expected: None,
                actual: None,
                occurrences: 0,
                resolutions: vec![Resolution::ForceAppend],
            });
            continue;
        }

        if op.kind == OperationKind::Insert {
            continue;
        }

        let end = op.end_line.unwrap_or(start).min(lines.len());
        let actual = lines[start - 1..end].join("\n");
        if actual != op.old_text {
            conflicts.push(content_changed_conflict(op, &lines, start, actual));
        }
    }

    ValidationReport {
        is_valid: conflicts.is_empty(),
        can_apply: conflicts.iter().all(|c| !c.resolutions.is_empty()),
        conflicts,
    }
}

fn content_changed_conflict(
    op: &crate::patch::PatchOperation,
    lines: &[String],
    start: usize,
    actual: String,
) -> Conflict {
    let old_lines: Vec<String> = op.old_text.split('\n').map(str::to_string).collect();
    let hits = find_exact(lines, &old_lines);

    let mut message = format!(
        "Content changed at {}:{}: recorded old text no longer matches",
        op.file_path, start
    );
    let mut resolutions = Vec::new();
    match hits.len() {
        0 => {
            if let Some(hint) = find_closest(lines, &old_lines).and_then(|m| m.describe()) {
                message.push_str(". ");
                message.push_str(hint.trim_end());
            }
        }
        1 => resolutions.push(Resolution::RelocateTo { line: hits[0] + 1 }),
        n => {
            message.push_str(&format!(
                ". Old text found at {n} other locations; relocation is ambiguous"
            ));
        }
    }

    Conflict {
        operation_id: op.id.clone(),
        file_path: op.file_path.clone(),
        kind: ConflictKind::ContentChanged,
        message,
        expected: Some(op.old_text.clone()),
        actual: Some(actual),
        occurrences: hits.len(),
        resolutions,
    }
}
