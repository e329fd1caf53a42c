//! Cross-component scenarios: store + patch engine + history working
//! together the way an editor drives them.

use crate::config::EngineConfig;
use crate::history::HistoryManager;
use crate::id::SequentialIdGenerator;
use crate::patch::apply::{apply_operation, apply_patch, reverse};
use crate::patch::diff::{diff_lines, regions_to_operations};
use crate::patch::validate::validate;
use crate::patch::{OperationKind, Patch, PatchOperation, PatchTarget, Provenance};
use crate::store::VirtualFileStore;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

fn setup_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

fn store() -> VirtualFileStore {
    setup_tracing();
    VirtualFileStore::with_ids(
        Box::new(SequentialIdGenerator::new("e")),
        EngineConfig::default(),
    )
}

fn diff_patch(ids: &mut SequentialIdGenerator, path: &str, before: &str, after: &str) -> Patch {
    let regions = diff_lines(before, after);
    let ops = regions_to_operations(ids, path, &regions, Provenance::User);
    Patch::new(ids, "diff patch", Provenance::User, ops)
}

/// Applying the regions a diff produces, in descending-line order, must
/// reproduce the modified text exactly.
fn assert_diff_reproduces(original: &str, modified: &str) {
    let mut ids = SequentialIdGenerator::new("op");
    let regions = diff_lines(original, modified);
    let mut ops = regions_to_operations(&mut ids, "/f", &regions, Provenance::User);
    ops.sort_by_key(|op| std::cmp::Reverse(op.start_line));

    let mut content = original.to_string();
    for op in &ops {
        content = apply_operation(&content, op).unwrap();
    }
    assert_eq!(content, modified, "diff of {original:?} -> {modified:?}");
}

#[test]
fn diff_identity_is_a_noop() {
    for content in ["", "one line", "line1\nline2\nline3", "a\n\n\nb"] {
        assert!(diff_lines(content, content).is_empty());
    }
}

#[test]
fn diff_reproduces_modified_text() {
    let cases = [
        ("line1\nline2\nline3", "line1\nmodified\nline3"),
        ("a\nb\nc", "a\nc"),
        ("a\nc", "a\nb\nc"),
        ("", "brand new"),
        ("old", ""),
        ("a\nb\nc\nd\ne", "e\nd\nc\nb\na"),
        ("fn main() {\n    old();\n}", "fn main() {\n    new();\n    extra();\n}"),
        ("x\ny\nz", "p\nq"),
    ];
    for (original, modified) in cases {
        assert_diff_reproduces(original, modified);
    }
}

#[test]
fn patch_round_trip_restores_original() {
    let mut ids = SequentialIdGenerator::new("x");
    let mut store = store();
    let original = "alpha\nbeta\ngamma\ndelta";
    store.create("/src/a.ts", original).unwrap();

    let mut patch = diff_patch(&mut ids, "/src/a.ts", original, "alpha\nBETA\ndelta\nepsilon");
    apply_patch(&mut patch, &mut store).unwrap();
    assert_eq!(
        store.read_file("/src/a.ts").unwrap(),
        "alpha\nBETA\ndelta\nepsilon"
    );

    let mut inverse = reverse(&patch, &mut ids);
    apply_patch(&mut inverse, &mut store).unwrap();
    assert_eq!(store.read_file("/src/a.ts").unwrap(), original);
}

#[test]
fn replace_line_scenario() {
    // Store contains /src/a.ts = "line1\nline2\nline3"; a patch replaces
    // line 2; validate is clean, apply succeeds, reverse restores.
    let mut ids = SequentialIdGenerator::new("x");
    let mut store = store();
    store.create("/src/a.ts", "line1\nline2\nline3").unwrap();

    let op = PatchOperation::new(
        &mut ids,
        OperationKind::Replace,
        "/src/a.ts",
        2,
        2,
        "line2",
        "modified",
        Provenance::Ai,
    );
    let mut patch = Patch::new(&mut ids, "replace line 2", Provenance::Ai, vec![op]);

    let report = validate(&patch, |path| store.read_file(path));
    assert!(report.is_valid);
    assert!(report.conflicts.is_empty());

    apply_patch(&mut patch, &mut store).unwrap();
    assert_eq!(store.read_file("/src/a.ts").unwrap(), "line1\nmodified\nline3");

    let mut inverse = reverse(&patch, &mut ids);
    apply_patch(&mut inverse, &mut store).unwrap();
    assert_eq!(store.read_file("/src/a.ts").unwrap(), "line1\nline2\nline3");
}

#[test]
fn stale_old_text_scenario() {
    // Patch recorded against "foo" at line 2, but live content has "bar"
    // there and no "foo" anywhere: one content-changed conflict, not
    // applicable. With "foo" surviving elsewhere, a relocation is offered.
    let mut ids = SequentialIdGenerator::new("x");
    let mut store = store();
    store.create("/a.txt", "one\nbar\nthree").unwrap();

    let op = PatchOperation::new(
        &mut ids,
        OperationKind::Replace,
        "/a.txt",
        2,
        2,
        "foo",
        "patched",
        Provenance::Ai,
    );
    let patch = Patch::new(&mut ids, "stale", Provenance::Ai, vec![op]);

    let report = validate(&patch, |path| store.read_file(path));
    assert_eq!(report.conflicts.len(), 1);
    assert!(!report.can_apply);

    store.update("/a.txt", "one\nbar\nfoo").unwrap();
    let report = validate(&patch, |path| store.read_file(path));
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.can_apply);
    assert_eq!(
        report.conflicts[0].resolutions,
        vec![crate::patch::validate::Resolution::RelocateTo { line: 3 }]
    );
}

#[test]
fn folder_delete_scenario() {
    // Deleting a folder with two nested files removes all three entities
    // and every index entry; lookups afterwards come back absent.
    let mut store = store();
    store.create("/pkg/a.ts", "export const a = 1;").unwrap();
    store.create("/pkg/sub/b.ts", "export const b = 2;").unwrap();
    assert_eq!(store.entity_count(), 4); // /pkg, /pkg/sub, two files

    store.delete("/pkg").unwrap();
    assert_eq!(store.entity_count(), 0);
    for path in ["/pkg", "/pkg/a.ts", "/pkg/sub/b.ts"] {
        assert!(store.get_entity(path).is_none());
    }
    assert!(store.files_exporting("a").is_empty());
    assert!(store.files_exporting("b").is_empty());
    assert!(store.files_by_extension("ts").is_empty());
}

#[test]
fn undo_redo_symmetry_through_the_store() {
    // N mutations, N undos, N redos: final state equals the state right
    // after the original mutations.
    let mut ids = SequentialIdGenerator::new("x");
    let mut store = store();
    let mut history = HistoryManager::new(
        Box::new(SequentialIdGenerator::new("h")),
        EngineConfig::default(),
    );

    let states = [
        "v1",
        "v1\nv2",
        "v1\nv2 edited",
        "final",
    ];
    store.create("/doc.txt", states[0]).unwrap();

    for pair in states.windows(2) {
        let mut patch = diff_patch(&mut ids, "/doc.txt", pair[0], pair[1]);
        apply_patch(&mut patch, &mut store).unwrap();
        history.record_patch_applied(patch, "step");
    }
    assert_eq!(store.read_file("/doc.txt").unwrap(), "final");

    for _ in 0..3 {
        assert_eq!(history.undo(&mut store).unwrap(), 1);
    }
    assert_eq!(store.read_file("/doc.txt").unwrap(), "v1");

    for _ in 0..3 {
        assert_eq!(history.redo(&mut store).unwrap(), 1);
    }
    assert_eq!(store.read_file("/doc.txt").unwrap(), "final");
}

#[test]
fn grouped_multi_file_refactor_undoes_atomically() {
    let mut ids = SequentialIdGenerator::new("x");
    let mut store = store();
    let mut history = HistoryManager::new(
        Box::new(SequentialIdGenerator::new("h")),
        EngineConfig::default(),
    );
    store.create("/src/a.ts", "const name = 1;").unwrap();
    store.create("/src/b.ts", "use(name);").unwrap();

    history.start_group();
    for (path, before, after) in [
        ("/src/a.ts", "const name = 1;", "const renamed = 1;"),
        ("/src/b.ts", "use(name);", "use(renamed);"),
    ] {
        let mut patch = diff_patch(&mut ids, path, before, after);
        apply_patch(&mut patch, &mut store).unwrap();
        history.record_patch_applied(patch, "rename symbol");
    }
    history.end_group();

    assert_eq!(history.undo(&mut store).unwrap(), 2);
    assert_eq!(store.read_file("/src/a.ts").unwrap(), "const name = 1;");
    assert_eq!(store.read_file("/src/b.ts").unwrap(), "use(name);");

    assert_eq!(history.redo(&mut store).unwrap(), 2);
    assert_eq!(store.read_file("/src/a.ts").unwrap(), "const renamed = 1;");
    assert_eq!(store.read_file("/src/b.ts").unwrap(), "use(renamed);");
}

#[test]
fn patch_created_file_disappears_on_undo_content_level() {
    // Undoing a pure-insert patch deletes the inserted lines; the file
    // entity survives with empty content (the engine edits content, the
    // store owns entity lifecycle).
    let mut ids = SequentialIdGenerator::new("x");
    let mut store = store();
    let mut history = HistoryManager::new(
        Box::new(SequentialIdGenerator::new("h")),
        EngineConfig::default(),
    );

    let op = PatchOperation::new(
        &mut ids,
        OperationKind::Insert,
        "/new.txt",
        1,
        1,
        "",
        "hello\nworld",
        Provenance::User,
    );
    let mut patch = Patch::new(&mut ids, "create file", Provenance::User, vec![op]);
    apply_patch(&mut patch, &mut store).unwrap();
    assert_eq!(store.read_file("/new.txt").unwrap(), "hello\nworld");
    history.record_patch_applied(patch, "create");

    history.undo(&mut store).unwrap();
    assert_eq!(store.read_file("/new.txt").unwrap(), "");
}

#[test]
fn store_keeps_index_consistent_through_patching() {
    let mut ids = SequentialIdGenerator::new("x");
    let mut store = store();
    store.create("/src/a.ts", "export function before() {}").unwrap();
    assert_eq!(store.files_exporting("before"), vec!["/src/a.ts"]);

    let before = store.read_file("/src/a.ts").unwrap();
    let mut patch = diff_patch(&mut ids, "/src/a.ts", &before, "export function after() {}");
    apply_patch(&mut patch, &mut store).unwrap();

    // Writes went through store.update, so analysis and index followed.
    assert!(store.files_exporting("before").is_empty());
    assert_eq!(store.files_exporting("after"), vec!["/src/a.ts"]);
}
