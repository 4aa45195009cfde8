use super::ops::rename_candidate;
use super::*;
use crate::progress::CopyProgressPayload;
use crate::resource::{
    read_all, FileResource, FsStore, MemoryStore, QualifiedName, Resource, ResourceStore,
};
use crate::tasks::CancelToken;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

fn path(raw: &str) -> ResourcePath {
    ResourcePath::parse(raw).unwrap()
}

fn folder(raw: &str) -> FolderResource {
    FolderResource::new(path(raw))
}

fn file_at(raw: &str) -> FileResource {
    FileResource::new(path(raw)).unwrap()
}

fn service(store: Arc<MemoryStore>) -> PasteService {
    PasteService::new(store, Project::new("General"))
}

fn member_names(store: &dyn ResourceStore, raw: &str) -> Vec<String> {
    store
        .members(&folder(raw))
        .unwrap()
        .iter()
        .map(|r| r.name().to_string())
        .collect()
}

fn write_host(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn rename_candidate_inserts_suffix_before_extension() {
    assert_eq!(rename_candidate("report.pdf", 0), "report.pdf");
    assert_eq!(rename_candidate("report.pdf", 1), "report-1.pdf");
    assert_eq!(rename_candidate("report.pdf", 2), "report-2.pdf");
    assert_eq!(rename_candidate("archive.tar.gz", 1), "archive.tar-1.gz");
    assert_eq!(rename_candidate("Makefile", 3), "Makefile-3");
    assert_eq!(rename_candidate("trailing.", 1), "trailing.-1");
    assert_eq!(rename_candidate(".project", 1), "-1.project");
}

#[test]
fn duplicate_in_place_takes_next_free_suffix() {
    let store = MemoryStore::new();
    let source = store.add_file("docs/report.txt", b"r").unwrap();
    store.add_file("docs/report-1.txt", b"older copy").unwrap();

    let name =
        resolve_target_name(&store, &Resource::File(source), &folder("docs")).unwrap();
    assert_eq!(name, "report-2.txt");
}

#[test]
fn duplicate_in_place_uses_first_suffix_when_free() {
    let store = MemoryStore::new();
    let source = store.add_file("docs/report.txt", b"r").unwrap();
    store.add_file("docs/report-2.txt", b"gap").unwrap();

    let name =
        resolve_target_name(&store, &Resource::File(source), &folder("docs")).unwrap();
    assert_eq!(name, "report-1.txt");
}

#[test]
fn duplicate_notes_sql_in_place() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("scripts/notes.sql", b"select * from notes;").unwrap();
    store.add_file("scripts/notes-1.sql", b"select 1;").unwrap();

    let svc = service(store.clone());
    let report = svc.paste(
        &[PasteSource::Resource(path("scripts/notes.sql"))],
        &PasteDestination::Resource(path("scripts")),
        &svc.monitor(),
    );

    assert!(!report.has_failures());
    assert_eq!(report.pasted_targets(), vec!["/scripts/notes-2.sql"]);
    assert_eq!(
        read_all(&*store, &file_at("scripts/notes-2.sql")).unwrap(),
        b"select * from notes;"
    );
    assert_eq!(
        read_all(&*store, &file_at("scripts/notes-1.sql")).unwrap(),
        b"select 1;"
    );
}

#[test]
fn cross_container_paste_keeps_name() {
    let store = MemoryStore::new();
    let source = store.add_file("x/a.txt", b"a").unwrap();
    store.add_folder("y").unwrap();

    let name = resolve_target_name(&store, &Resource::File(source), &folder("y")).unwrap();
    assert_eq!(name, "a.txt");
}

#[test]
fn cross_container_collision_is_rejected_and_leaves_target_alone() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("x/a.txt", b"from x").unwrap();
    store.add_file("y/a.txt", b"from y").unwrap();

    let svc = service(store.clone());
    let report = svc.paste(
        &[PasteSource::Resource(path("x/a.txt"))],
        &PasteDestination::Resource(path("y")),
        &svc.monitor(),
    );

    let failed: Vec<_> = report.failed().collect();
    assert_eq!(failed.len(), 1);
    match &failed[0].outcome {
        PasteOutcome::Rejected { reason } => {
            assert_eq!(reason.code, "target_exists");
            assert!(reason.message.contains("'a.txt' already exists"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(member_names(&*store, "y"), vec!["a.txt"]);
    assert_eq!(
        read_all(&*store, &file_at("y/a.txt")).unwrap(),
        b"from y"
    );
}

#[test]
fn file_copy_preserves_bytes_and_properties() {
    let store = MemoryStore::new();
    let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let source = store.add_file("src/blob.bin", &payload).unwrap();
    let dialect = QualifiedName::new("org.example.sql", "dialect");
    let charset = QualifiedName::new("", "charset");
    store
        .set_persistent_property(source.path(), &dialect, "postgres")
        .unwrap();
    store
        .set_persistent_property(source.path(), &charset, "utf-8")
        .unwrap();

    let target = merge_resource(
        &store,
        &Resource::File(source.clone()),
        &folder("dst"),
        &ProgressMonitor::new(),
    )
    .unwrap();

    assert_eq!(target, path("dst/blob.bin"));
    let copied = file_at("dst/blob.bin");
    assert_eq!(read_all(&store, &copied).unwrap(), payload);
    assert_eq!(
        store.persistent_properties(copied.path()).unwrap(),
        store.persistent_properties(source.path()).unwrap()
    );
}

#[test]
fn missing_destination_folders_are_created() {
    let store = MemoryStore::new();
    let source = store.add_file("a.txt", b"a").unwrap();

    merge_resource(
        &store,
        &Resource::File(source),
        &folder("deep/er/still"),
        &ProgressMonitor::new(),
    )
    .unwrap();

    assert_eq!(member_names(&store, "deep/er/still"), vec!["a.txt"]);
}

#[test]
fn folder_copy_into_empty_destination_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_host(&dir.path().join("proj/one.sql"), b"select 1;");
    write_host(&dir.path().join("proj/two.sql"), b"select 2;");
    write_host(&dir.path().join("proj/three.txt"), b"three");
    fs::create_dir_all(dir.path().join("dest")).unwrap();
    let store = FsStore::open(dir.path(), None).unwrap();

    let target = merge_resource(
        &store,
        &Resource::Folder(folder("proj")),
        &folder("dest"),
        &ProgressMonitor::new(),
    )
    .unwrap();

    assert_eq!(target, path("dest/proj"));
    for name in ["one.sql", "two.sql", "three.txt"] {
        assert_eq!(
            fs::read(dir.path().join("dest/proj").join(name)).unwrap(),
            fs::read(dir.path().join("proj").join(name)).unwrap(),
            "{name} differs"
        );
    }
    let mut names = member_names(&store, "dest/proj");
    names.sort();
    assert_eq!(names, vec!["one.sql", "three.txt", "two.sql"]);
}

#[test]
fn folder_duplicate_in_place_gets_suffix() {
    let store = MemoryStore::new();
    store.add_file("proj/a.txt", b"a").unwrap();
    store.add_file("proj/sub/b.txt", b"b").unwrap();

    let target = merge_resource(
        &store,
        &Resource::Folder(folder("proj")),
        &FolderResource::root(),
        &ProgressMonitor::new(),
    )
    .unwrap();

    assert_eq!(target, path("proj-1"));
    assert_eq!(read_all(&store, &file_at("proj-1/sub/b.txt")).unwrap(), b"b");
}

#[test]
fn nested_collisions_are_not_renamed() {
    let store = MemoryStore::new();
    store.add_file("src/proj/a.txt", b"new").unwrap();
    store.add_file("src/proj/b.txt", b"new").unwrap();
    store.add_file("dst/proj/a.txt", b"old").unwrap();

    let err = copy_folder_via_merge(&store, "src/proj", "dst").unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::TargetExists);
    assert_eq!(read_all(&store, &file_at("dst/proj/a.txt")).unwrap(), b"old");
}

fn copy_folder_via_merge(
    store: &MemoryStore,
    source: &str,
    dest: &str,
) -> ClipboardResult<ResourcePath> {
    // Pasting into a container that already holds a same-named folder is a
    // top-level collision, so go through the recursive step directly.
    let source = folder(source);
    let name = source.name().to_string();
    super::ops::copy_folder(store, &source, &folder(dest), &name, &ProgressMonitor::new())
}

#[test]
fn pasting_folder_into_its_own_subtree_is_refused() {
    let store = MemoryStore::new();
    store.add_file("proj/sub/a.txt", b"a").unwrap();

    let err = merge_resource(
        &store,
        &Resource::Folder(folder("proj")),
        &folder("proj/sub"),
        &ProgressMonitor::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::InvalidInput);
}

struct CancelOnBytes {
    token: CancelToken,
}

impl ProgressSink for CancelOnBytes {
    fn emit(&self, payload: CopyProgressPayload) {
        if payload.bytes > 0 {
            self.token.cancel();
        }
    }
}

#[test]
fn cancel_mid_folder_copy_keeps_created_entries() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("proj/a.txt", b"first").unwrap();
    store.add_file("proj/b.txt", b"second").unwrap();
    store.add_file("proj/c.txt", b"third").unwrap();
    store.add_folder("dst").unwrap();

    let token = CancelToken::new();
    let monitor = ProgressMonitor::new()
        .with_cancel(token.clone())
        .with_sink(Arc::new(CancelOnBytes {
            token: token.clone(),
        }))
        .with_throttle(ProgressThrottle {
            step_bytes: 1,
            interval: Duration::from_secs(3600),
        });

    let svc = service(store.clone());
    let report = svc.paste(
        &[
            PasteSource::Resource(path("proj")),
            PasteSource::Resource(path("proj/a.txt")),
        ],
        &PasteDestination::Resource(path("dst")),
        &monitor,
    );

    assert!(token.is_cancelled());
    assert!(!report.has_failures());
    assert!(report
        .items
        .iter()
        .all(|item| item.outcome == PasteOutcome::Cancelled));
    assert_eq!(member_names(&*store, "dst/proj"), vec!["a.txt"]);
    assert_eq!(
        read_all(&*store, &file_at("dst/proj/a.txt")).unwrap(),
        b"first"
    );
    assert!(report.summary().is_none());
}

#[test]
fn batch_continues_past_io_failures() {
    let store = Arc::new(MemoryStore::new());
    let mut sources = Vec::new();
    for idx in 0..5 {
        let file = store
            .add_file(&format!("src/f{idx}.dat"), format!("data {idx}").as_bytes())
            .unwrap();
        if idx == 1 || idx == 3 {
            store.mark_unreadable(&file).unwrap();
        }
        sources.push(PasteSource::Resource(file.path().clone()));
    }

    let svc = service(store.clone());
    let report = svc.paste(
        &sources,
        &PasteDestination::Resource(path("dst")),
        &svc.monitor(),
    );

    let failed: Vec<&str> = report.failed().map(|item| item.name.as_str()).collect();
    assert_eq!(failed, vec!["f1.dat", "f3.dat"]);
    for item in report.failed() {
        match &item.outcome {
            PasteOutcome::Rejected { reason } => assert_eq!(reason.code, "io_error"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(report.pasted_targets().len(), 3);
    for idx in [0, 2, 4] {
        assert_eq!(
            read_all(&*store, &file_at(&format!("dst/f{idx}.dat"))).unwrap(),
            format!("data {idx}").as_bytes()
        );
    }
    // The target is created before its content is streamed; a read failure
    // leaves it empty.
    assert_eq!(
        read_all(&*store, &file_at("dst/f1.dat")).unwrap(),
        b""
    );
    let summary = report.summary().unwrap();
    assert!(summary.contains("Failed to paste 2 item(s) into project 'General'"));
    assert!(summary.ends_with("f1.dat,\nf3.dat"));
}

#[test]
fn missing_permission_rejects_every_item_before_mutation() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("a.txt", b"a").unwrap();
    store.add_file("b.txt", b"b").unwrap();
    let before = store.len();

    let svc = PasteService::new(store.clone(), Project::read_only("Shared"));
    let report = svc.paste(
        &[
            PasteSource::Resource(path("a.txt")),
            PasteSource::Resource(path("b.txt")),
        ],
        &PasteDestination::Resource(path("dst")),
        &svc.monitor(),
    );

    assert_eq!(report.failed().count(), 2);
    for item in &report.items {
        match &item.outcome {
            PasteOutcome::Rejected { reason } => assert_eq!(reason.code, "permission_denied"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(store.len(), before);
    assert!(report.summary().unwrap().contains("'Shared'"));
}

#[test]
fn missing_source_is_reported_per_item() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("a.txt", b"a").unwrap();

    let svc = service(store.clone());
    let report = svc.paste(
        &[
            PasteSource::Resource(path("gone.txt")),
            PasteSource::Resource(path("a.txt")),
        ],
        &PasteDestination::Resource(path("dst")),
        &svc.monitor(),
    );

    let failed: Vec<&str> = report.failed().map(|item| item.name.as_str()).collect();
    assert_eq!(failed, vec!["gone.txt"]);
    assert_eq!(report.pasted_targets(), vec!["/dst/a.txt"]);
}

#[test]
fn file_destination_pastes_into_its_parent() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("x/a.txt", b"a").unwrap();
    store.add_file("y/readme.md", b"r").unwrap();

    let svc = service(store.clone());
    let report = svc.paste(
        &[PasteSource::Resource(path("x/a.txt"))],
        &PasteDestination::Resource(path("y/readme.md")),
        &svc.monitor(),
    );

    assert_eq!(report.pasted_targets(), vec!["/y/a.txt"]);
}

#[test]
fn directory_drop_target_receives_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let host_file = dir.path().join("host.txt");
    write_host(&host_file, b"from host");

    let store = Arc::new(MemoryStore::new());
    store.add_file("proj/a.sql", b"select 1;").unwrap();
    store.add_file("proj/nested/b.sql", b"select 2;").unwrap();

    let target = DirectoryDropTarget::new(&out).unwrap();
    let svc = service(store);
    let report = svc.paste(
        &[
            PasteSource::Resource(path("proj")),
            PasteSource::External(host_file),
        ],
        &PasteDestination::Drop(&target),
        &svc.monitor(),
    );

    assert!(!report.has_failures());
    assert_eq!(report.pasted_targets().len(), 2);
    assert_eq!(fs::read(out.join("proj/a.sql")).unwrap(), b"select 1;");
    assert_eq!(fs::read(out.join("proj/nested/b.sql")).unwrap(), b"select 2;");
    assert_eq!(fs::read(out.join("host.txt")).unwrap(), b"from host");
}

#[test]
fn failed_bulk_drop_marks_every_item_failed() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    write_host(&out.join("b.txt"), b"already here");

    let store = Arc::new(MemoryStore::new());
    store.add_file("a.txt", b"a").unwrap();
    store.add_file("b.txt", b"b").unwrap();
    store.add_file("c.txt", b"c").unwrap();

    let target = DirectoryDropTarget::new(&out).unwrap();
    let svc = service(store);
    let report = svc.paste(
        &[
            PasteSource::Resource(path("a.txt")),
            PasteSource::Resource(path("b.txt")),
            PasteSource::Resource(path("c.txt")),
        ],
        &PasteDestination::Drop(&target),
        &svc.monitor(),
    );

    assert_eq!(report.failed().count(), 3);
    assert_eq!(fs::read(out.join("b.txt")).unwrap(), b"already here");
    // Entries dropped before the failure remain.
    assert!(out.join("a.txt").exists());
    assert!(!out.join("c.txt").exists());
}

#[test]
fn drop_target_requires_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    write_host(&file, b"x");
    let err = DirectoryDropTarget::new(&file).err().unwrap();
    assert_eq!(err.code(), ClipboardErrorCode::NotDirectory);
}

#[test]
fn external_directory_import_reuses_folders_and_rejects_existing_files() {
    let host = tempfile::tempdir().unwrap();
    write_host(&host.path().join("drop/a.txt"), b"a");
    write_host(&host.path().join("drop/inner/b.txt"), b"b");

    let store = MemoryStore::new();
    let imported = copy_external(
        &store,
        &host.path().join("drop"),
        &folder("incoming"),
        &ProgressMonitor::new(),
    )
    .unwrap();
    assert_eq!(imported, Some(path("incoming/drop")));
    assert_eq!(read_all(&store, &file_at("incoming/drop/inner/b.txt")).unwrap(), b"b");

    let err = copy_external(
        &store,
        &host.path().join("drop"),
        &folder("incoming"),
        &ProgressMonitor::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::TargetExists);
}

#[test]
fn vanished_external_sources_are_skipped() {
    let host = tempfile::tempdir().unwrap();
    write_host(&host.path().join("keep.txt"), b"k");

    let store = Arc::new(MemoryStore::new());
    let svc = service(store.clone());
    let report = svc.paste(
        &[
            PasteSource::External(host.path().join("missing.txt")),
            PasteSource::External(host.path().join("keep.txt")),
        ],
        &PasteDestination::Resource(path("in")),
        &svc.monitor(),
    );

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.pasted_targets(), vec!["/in/keep.txt"]);
}

#[test]
fn importing_workspace_folder_into_itself_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    write_host(&root.join("proj/a.txt"), b"a");
    let store = FsStore::open(&root, None).unwrap();

    let err = copy_external(
        &store,
        &root.join("proj"),
        &folder("proj/inner"),
        &ProgressMonitor::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::InvalidInput);
}

#[test]
fn empty_clipboard_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let svc = service(store);
    let clipboard = Clipboard::new();
    let err = svc
        .paste_clipboard(
            &clipboard,
            &PasteDestination::Resource(ResourcePath::root()),
            &svc.monitor(),
        )
        .unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::ClipboardEmpty);
}

#[test]
fn clipboard_files_are_pasted() {
    let host = tempfile::tempdir().unwrap();
    write_host(&host.path().join("q.sql"), b"select now();");
    let store = Arc::new(MemoryStore::new());
    let svc = service(store.clone());

    let clipboard = Clipboard::new();
    clipboard
        .set_files(vec![host.path().join("q.sql")])
        .unwrap();
    let report = svc
        .paste_clipboard(
            &clipboard,
            &PasteDestination::Resource(path("scripts")),
            &svc.monitor(),
        )
        .unwrap();

    assert_eq!(report.pasted_targets(), vec!["/scripts/q.sql"]);
    assert!(clipboard.contents().is_some());
    clipboard.set_nodes(Vec::new());
    assert!(clipboard.contents().is_none());
}

#[cfg(unix)]
#[test]
fn clipboard_refuses_symlinks() {
    let host = tempfile::tempdir().unwrap();
    write_host(&host.path().join("real.txt"), b"r");
    let link = host.path().join("link.txt");
    std::os::unix::fs::symlink(host.path().join("real.txt"), &link).unwrap();

    let err = Clipboard::new().set_files(vec![link]).unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::SymlinkUnsupported);
}

#[test]
fn spawned_paste_reports_and_unregisters() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("a.txt", b"a").unwrap();
    let svc = Arc::new(service(store.clone()));

    let job = svc
        .spawn_paste(
            "job-1",
            vec![PasteSource::Resource(path("a.txt"))],
            ResourcePath::root(),
            None,
        )
        .unwrap();
    assert_eq!(job.id(), "job-1");
    let report = job.join().unwrap();

    assert_eq!(report.pasted_targets(), vec!["/a-1.txt"]);
    let err = svc.cancel("job-1").unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::TaskNotFound);
}

#[test]
fn size_estimate_covers_resources_and_host_files() {
    let host = tempfile::tempdir().unwrap();
    write_host(&host.path().join("d/x.bin"), &[0u8; 10]);
    write_host(&host.path().join("d/y/z.bin"), &[0u8; 5]);
    let store = MemoryStore::new();
    store.add_file("p/a", &[1u8; 7]).unwrap();
    store.add_file("p/q/b", &[1u8; 3]).unwrap();

    let total = estimate_total_size(
        &store,
        &[
            PasteSource::External(host.path().join("d")),
            PasteSource::Resource(path("p")),
            PasteSource::Resource(path("nope")),
        ],
    );
    assert_eq!(total, 25);
}

#[test]
fn pasted_file_does_not_pick_up_properties_of_a_removed_target() {
    let dir = tempfile::tempdir().unwrap();
    write_host(&dir.path().join("x/a.txt"), b"fresh");
    write_host(&dir.path().join("dst/a.txt"), b"removed later");
    let store = FsStore::open(dir.path(), None).unwrap();
    store
        .set_persistent_property(
            &path("dst/a.txt"),
            &QualifiedName::new("org.example", "stale"),
            "old-owner",
        )
        .unwrap();
    fs::remove_file(dir.path().join("dst/a.txt")).unwrap();

    merge_resource(
        &store,
        &Resource::File(file_at("x/a.txt")),
        &folder("dst"),
        &ProgressMonitor::new(),
    )
    .unwrap();

    assert_eq!(
        store.persistent_properties(&path("dst/a.txt")).unwrap(),
        store.persistent_properties(&path("x/a.txt")).unwrap()
    );
}

/// Holds the first copied chunk until the test lets it continue.
struct PauseOnFirstBytes {
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl ProgressSink for PauseOnFirstBytes {
    fn emit(&self, payload: CopyProgressPayload) {
        if payload.bytes == 0 {
            return;
        }
        let gate = self.gate.lock().unwrap().take();
        if let Some((started, resume)) = gate {
            started.send(()).unwrap();
            resume.recv().unwrap();
        }
    }
}

#[test]
fn running_job_stops_when_cancelled_by_id() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("proj/a.txt", b"first").unwrap();
    store.add_file("proj/b.txt", b"second").unwrap();
    store.add_file("notes.txt", b"notes").unwrap();
    let svc = Arc::new(service(store.clone()).with_throttle(ProgressThrottle {
        step_bytes: 1,
        interval: Duration::from_secs(3600),
    }));

    let (started_tx, started_rx) = mpsc::channel();
    let (resume_tx, resume_rx) = mpsc::channel();
    let sink = Arc::new(PauseOnFirstBytes {
        gate: Mutex::new(Some((started_tx, resume_rx))),
    });
    let job = svc
        .spawn_paste(
            "job",
            vec![
                PasteSource::Resource(path("proj")),
                PasteSource::Resource(path("notes.txt")),
            ],
            path("dst"),
            Some(sink),
        )
        .unwrap();

    started_rx.recv().unwrap();
    svc.cancel("job").unwrap();
    resume_tx.send(()).unwrap();
    let report = job.join().unwrap();

    assert!(!report.has_failures());
    assert!(report
        .items
        .iter()
        .all(|item| item.outcome == PasteOutcome::Cancelled));
    assert_eq!(member_names(&*store, "dst/proj"), vec!["a.txt"]);
    assert_eq!(read_all(&*store, &file_at("dst/proj/a.txt")).unwrap(), b"first");
    assert!(store.resolve(&path("dst/notes.txt")).unwrap().is_none());
    assert_eq!(
        svc.cancel("job").unwrap_err().code(),
        ClipboardErrorCode::TaskNotFound
    );
}

#[test]
fn cancelled_bulk_drop_keeps_completed_items_pasted() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    let store = Arc::new(MemoryStore::new());
    store.add_file("a.txt", b"a").unwrap();
    store.add_file("b.txt", b"b").unwrap();

    let token = CancelToken::new();
    let monitor = ProgressMonitor::new()
        .with_cancel(token.clone())
        .with_sink(Arc::new(CancelOnBytes {
            token: token.clone(),
        }))
        .with_throttle(ProgressThrottle {
            step_bytes: 1,
            interval: Duration::from_secs(3600),
        });
    let target = DirectoryDropTarget::new(&out).unwrap();
    let svc = service(store);
    let report = svc.paste(
        &[
            PasteSource::Resource(path("a.txt")),
            PasteSource::Resource(path("b.txt")),
        ],
        &PasteDestination::Drop(&target),
        &monitor,
    );

    assert!(matches!(report.items[0].outcome, PasteOutcome::Pasted { .. }));
    assert_eq!(report.items[1].outcome, PasteOutcome::Cancelled);
    assert!(!report.has_failures());
    assert_eq!(fs::read(out.join("a.txt")).unwrap(), b"a");
    assert!(!out.join("b.txt").exists());
}

/// Claims success but reports only the first target.
struct ShortDropTarget;

impl DropTarget for ShortDropTarget {
    fn display_name(&self) -> String {
        "short".to_string()
    }

    fn drop_nodes(
        &self,
        _store: &dyn ResourceStore,
        sources: &[PasteSource],
        _monitor: &ProgressMonitor,
    ) -> Result<Vec<String>, DropFailure> {
        Ok(sources.iter().take(1).map(|s| s.display_name()).collect())
    }
}

#[test]
fn drop_target_returning_too_few_targets_fails_the_batch() {
    let store = Arc::new(MemoryStore::new());
    store.add_file("a.txt", b"a").unwrap();
    store.add_file("b.txt", b"b").unwrap();

    let svc = service(store);
    let report = svc.paste(
        &[
            PasteSource::Resource(path("a.txt")),
            PasteSource::Resource(path("b.txt")),
        ],
        &PasteDestination::Drop(&ShortDropTarget),
        &svc.monitor(),
    );

    assert_eq!(report.items.len(), 2);
    for item in &report.items {
        match &item.outcome {
            PasteOutcome::Rejected { reason } => assert_eq!(reason.code, "task_failed"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

#[test]
fn missing_clipboard_file_is_not_found() {
    let host = tempfile::tempdir().unwrap();
    let err = Clipboard::new()
        .set_files(vec![host.path().join("gone.txt")])
        .unwrap_err();
    assert_eq!(err.code(), ClipboardErrorCode::NotFound);
}
