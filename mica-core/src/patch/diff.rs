//! LCS-based line diff.

use crate::id::IdGenerator;
use crate::patch::{OperationKind, PatchOperation, Provenance};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Insert,
    Delete,
    Replace,
}

/// One contiguous changed region between two texts.
///
/// Lines are 1-based in the ORIGINAL text. For delete/replace the range is
/// inclusive over the replaced lines; for insert, `start_line` names the
/// original line the new text goes in front of (one past the last line
/// appends) and `end_line` equals `start_line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRegion {
    pub kind: RegionKind,
    pub start_line: usize,
    pub end_line: usize,
    pub old_text: String,
    pub new_text: String,
}

/// Diff two content strings into ordered change regions.
///
/// Classic longest-common-subsequence walk: build the LCS table over lines,
/// then emit the non-common runs as insert/delete/replace regions.
/// Interleaved deletions and insertions between two common lines coalesce
/// into a single replace, so adjacent same-kind regions never survive.
///
/// O(n*m) time and space in line counts. Fine for interactively edited
/// files; do not feed it generated multi-megabyte sources.
pub fn diff_lines(original: &str, modified: &str) -> Vec<ChangeRegion> {
    if original == modified {
        return Vec::new();
    }

    let old_lines: Vec<&str> = original.split('\n').collect();
    let new_lines: Vec<&str> = modified.split('\n').collect();

    let table = lcs_table(&old_lines, &new_lines);

    let mut regions = Vec::new();
    let mut pending_old: Vec<&str> = Vec::new();
    let mut pending_new: Vec<&str> = Vec::new();
    // Original line index (0-based) where the pending run started.
    let mut pending_start = 0usize;

    let mut i = 0;
    let mut j = 0;
    while i < old_lines.len() || j < new_lines.len() {
        if i < old_lines.len() && j < new_lines.len() && old_lines[i] == new_lines[j] {
            flush(&mut regions, &mut pending_old, &mut pending_new, pending_start);
            i += 1;
            j += 1;
            pending_start = i;
        } else if j < new_lines.len()
            && (i == old_lines.len() || table[i][j + 1] >= table[i + 1][j])
        {
            if pending_old.is_empty() && pending_new.is_empty() {
                pending_start = i;
            }
            pending_new.push(new_lines[j]);
            j += 1;
        } else {
            if pending_old.is_empty() && pending_new.is_empty() {
                pending_start = i;
            }
            pending_old.push(old_lines[i]);
            i += 1;
        }
    }
    flush(&mut regions, &mut pending_old, &mut pending_new, pending_start);

    regions
}

/// `table[i][j]` = LCS length of `old[i..]` and `new[j..]`.
fn lcs_table(old: &[&str], new: &[&str]) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    table
}

fn flush(
    regions: &mut Vec<ChangeRegion>,
    pending_old: &mut Vec<&str>,
    pending_new: &mut Vec<&str>,
    pending_start: usize,
) {
    if pending_old.is_empty() && pending_new.is_empty() {
        return;
    }

    let old_text = pending_old.join("\n");
    let new_text = pending_new.join("\n");
    let start_line = pending_start + 1;

    let region = if pending_old.is_empty() {
        ChangeRegion {
            kind: RegionKind::Insert,
            start_line,
            end_line: start_line,
            old_text: String::new(),
            new_text,
        }
    } else if pending_new.is_empty() {
        ChangeRegion {
            kind: RegionKind::Delete,
            start_line,
            end_line: pending_start + pending_old.len(),
            old_text,
            new_text: String::new(),
        }
    } else {
        ChangeRegion {
            kind: RegionKind::Replace,
            start_line,
            end_line: pending_start + pending_old.len(),
            old_text,
            new_text,
        }
    };

    pending_old.clear();
    pending_new.clear();
    regions.push(region);
}

/// Turn diff regions into patch operations against one file.
pub fn regions_to_operations(
    ids: &mut dyn IdGenerator,
    file_path: &str,
    regions: &[ChangeRegion],
    origin: Provenance,
) -> Vec<PatchOperation> {
    regions
        .iter()
        .map(|region| {
            let kind = match region.kind {
                RegionKind::Insert => OperationKind::Insert,
                RegionKind::Delete => OperationKind::Delete,
                RegionKind::Replace => OperationKind::Replace,
            };
            PatchOperation::new(
                ids,
                kind,
                file_path,
                region.start_line,
                region.end_line,
                region.old_text.clone(),
                region.new_text.clone(),
                origin,
            )
        })
        .collect()
}
