//! Integration tests for dirscan
//!
//! Every test builds a real tree in a temporary directory and compares
//! the scanner's output against an independent walk of the same tree.

use dirscan::fs::FileId;
use dirscan::validator::{AcceptAll, ExcludePatterns};
use dirscan::{FileRecord, ProgressMode, ScanConfig, ScanError, ScanEvent, ScanSummary, Scanner};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const ROOTS: &[&str] = &["", "first", "second"];
const SUBDIRS: &[&str] = &["", "test1", "hello world"];
const FILES: &[&str] = &["a.txt", "foo.txt", "test.txt"];

/// Build the roots x subdirs x files tree, each file holding its own path
fn build_tree() -> TempDir {
    let dir = tempdir().unwrap();

    for root in ROOTS {
        for sub in SUBDIRS {
            for file in FILES {
                let path = dir.path().join(root).join(sub).join(file);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(&path, path.to_string_lossy().as_bytes()).unwrap();
            }
        }
    }

    dir
}

/// Build a tree `width` directories wide with `files` files in each
fn build_wide_tree(width: usize, files: usize) -> TempDir {
    let dir = tempdir().unwrap();

    for d in 0..width {
        let sub = dir.path().join(format!("dir{:03}", d));
        fs::create_dir(&sub).unwrap();
        for f in 0..files {
            fs::write(sub.join(format!("file{}.dat", f)), vec![b'x'; f + 1]).unwrap();
        }
    }

    dir
}

/// Independent recursive walk: every non-directory entry with its size
fn reference_walk(root: &Path) -> BTreeSet<(PathBuf, u64)> {
    let mut found = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let entry = entry.unwrap();
            let metadata = fs::symlink_metadata(entry.path()).unwrap();
            if metadata.is_dir() {
                stack.push(entry.path());
            } else {
                found.insert((entry.path(), metadata.len()));
            }
        }
    }

    found
}

/// Everything a scan delivered, in arrival order
struct Collected {
    files: Vec<FileRecord>,
    errors: Vec<dirscan::ListError>,
    progress: usize,
    summary: ScanSummary,
}

impl Collected {
    fn paths(&self) -> BTreeSet<(PathBuf, u64)> {
        self.files.iter().map(|f| (f.path.clone(), f.size)).collect()
    }
}

fn scan_with(mut scanner: Scanner, workers: usize, root: &Path) -> Collected {
    scanner.init(workers, AcceptAll).unwrap();
    scanner.scan_directory(root).unwrap();
    collect(scanner)
}

fn scan(root: &Path, workers: usize) -> Collected {
    scan_with(Scanner::new(ScanConfig::default()), workers, root)
}

fn collect(mut scanner: Scanner) -> Collected {
    let mut files = Vec::new();
    let mut errors = Vec::new();
    let mut progress = 0;

    let summary = scanner
        .drain(|event| match event {
            ScanEvent::File(file) => files.push(file),
            ScanEvent::Error(err) => errors.push(err),
            ScanEvent::Progress(_) => progress += 1,
        })
        .unwrap();

    scanner.close().unwrap();

    Collected {
        files,
        errors,
        progress,
        summary,
    }
}

#[test]
fn test_matches_reference_walk() {
    let tree = build_tree();
    let expected = reference_walk(tree.path());
    assert_eq!(expected.len(), ROOTS.len() * SUBDIRS.len() * FILES.len());

    let result = scan(tree.path(), 4);

    assert!(result.errors.is_empty());
    assert_eq!(result.paths(), expected);
    assert_eq!(result.files.len(), expected.len());
    assert_eq!(result.summary.files, expected.len() as u64);
    assert!(result.summary.completed);

    // Root, first, second and two named subdirectories under each
    assert_eq!(result.summary.dirs, 9);
}

#[test]
fn test_single_root_nine_files() {
    let tree = build_tree();
    let root = tree.path().join("first");

    let result = scan(&root, 1);

    assert_eq!(result.files.len(), SUBDIRS.len() * FILES.len());
    assert_eq!(result.paths(), reference_walk(&root));

    let written: u64 = result
        .files
        .iter()
        .map(|f| f.path.to_string_lossy().len() as u64)
        .sum();
    let reported: u64 = result.files.iter().map(|f| f.size).sum();
    assert_eq!(reported, written);
    assert_eq!(result.summary.bytes, written);
}

#[test]
fn test_no_duplicates() {
    let tree = build_wide_tree(40, 5);
    let result = scan(tree.path(), 8);

    let unique: BTreeSet<_> = result.files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(unique.len(), result.files.len());
    assert_eq!(result.files.len(), 200);
}

#[test]
fn test_worker_count_does_not_change_output() {
    let tree = build_tree();
    let expected = reference_walk(tree.path());

    for workers in [1, 2, 8] {
        let result = scan(tree.path(), workers);
        assert_eq!(result.paths(), expected, "workers = {}", workers);
    }
}

#[test]
fn test_sizes_sum_to_summary() {
    let tree = build_wide_tree(10, 10);
    let result = scan(tree.path(), 3);

    let expected: u64 = reference_walk(tree.path()).iter().map(|(_, s)| s).sum();
    let reported: u64 = result.files.iter().map(|f| f.size).sum();

    assert_eq!(reported, expected);
    assert_eq!(result.summary.bytes, expected);
}

#[test]
fn test_finished_fires_once_and_last() {
    let tree = build_tree();
    let mut scanner = Scanner::new(ScanConfig::default());
    scanner.init(4, AcceptAll).unwrap();
    scanner.scan_directory(tree.path()).unwrap();

    let summary = scanner.drain(|_| {}).unwrap();
    assert_eq!(summary.files, 27);

    // Nothing trails Finished, and it does not fire again
    assert!(scanner.results().try_recv().is_err());
    assert!(scanner.errors().try_recv().is_err());
    assert!(scanner.finished().try_recv().is_err());

    scanner.close().unwrap();

    // Streams disconnect once closed
    assert!(scanner.results().recv().is_err());
    assert!(scanner.finished().recv().is_err());
}

#[test]
fn test_reject_all_still_finishes() {
    let tree = build_tree();
    let mut scanner = Scanner::new(ScanConfig::default());
    scanner.init(2, |_: &Path, _: &fs::Metadata| false).unwrap();
    scanner.scan_directory(tree.path()).unwrap();

    let result = collect(scanner);
    assert!(result.files.is_empty());
    assert_eq!(result.summary.files, 0);
    assert_eq!(result.summary.rejected, 27);
    assert!(result.summary.completed);
}

#[test]
fn test_empty_root() {
    let dir = tempdir().unwrap();
    let result = scan(dir.path(), 2);

    assert!(result.files.is_empty());
    assert_eq!(result.summary.dirs, 1);
}

#[test]
fn test_nonexistent_root_fails_synchronously() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let mut scanner = Scanner::new(ScanConfig::default());
    scanner.init(2, AcceptAll).unwrap();

    let err = scanner.scan_directory(&missing).unwrap_err();
    assert!(matches!(err, ScanError::InvalidRoot { ref path, .. } if *path == missing));
    assert!(!scanner.is_finished());
    assert!(scanner.finished().try_recv().is_err());
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_isolated() {
    use std::os::unix::fs::PermissionsExt;

    let tree = build_tree();
    let locked = tree.path().join("second").join("test1");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = scan(tree.path(), 4);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, locked);
    assert!(result.errors[0].is_permission_denied());
    assert_eq!(result.summary.errors, 1);

    // Everything outside the locked directory is still reported
    assert_eq!(result.files.len(), 27 - FILES.len());
    assert!(result.files.iter().all(|f| !f.path.starts_with(&locked)));
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_not_followed() {
    let tree = build_tree();
    let link = tree.path().join("first").join("loop");
    std::os::unix::fs::symlink(tree.path(), &link).unwrap();

    let result = scan(tree.path(), 4);

    // The link is an entry of its own, its target is not walked again
    assert_eq!(result.files.len(), 28);
    let reported = result.files.iter().find(|f| f.path == link).unwrap();
    assert!(reported.entry_type.is_symlink());
}

#[test]
fn test_abort_before_scan() {
    let tree = build_tree();
    let mut scanner = Scanner::new(ScanConfig::default());
    scanner.init(2, AcceptAll).unwrap();
    scanner.abort();
    scanner.scan_directory(tree.path()).unwrap();

    let result = collect(scanner);
    assert!(result.files.is_empty());
    assert_eq!(result.summary.dirs, 0);
    assert!(!result.summary.completed);
}

#[test]
fn test_abort_during_scan_stops_fan_out() {
    let tree = build_wide_tree(100, 3);
    fs::write(tree.path().join("trigger.txt"), b"stop").unwrap();

    // Abort from inside the root listing, before any child is enqueued
    let mut scanner = Scanner::new(ScanConfig::default());
    let abort = scanner.abort_handle();
    scanner
        .init(2, move |_: &Path, _: &fs::Metadata| {
            abort.abort();
            true
        })
        .unwrap();
    scanner.scan_directory(tree.path()).unwrap();

    let result = collect(scanner);

    assert!(!result.summary.completed);
    assert_eq!(result.summary.dirs, 1);
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].path, tree.path().join("trigger.txt"));
    assert_eq!(result.summary.files, 1);
}

#[test]
fn test_vanished_directory_is_isolated() {
    let dir = tempdir().unwrap();
    let alpha = dir.path().join("alpha");
    let beta = dir.path().join("beta");
    for sub in [&alpha, &beta] {
        fs::create_dir(sub).unwrap();
        fs::write(sub.join("inner.txt"), b"inner").unwrap();
    }
    fs::write(dir.path().join("root.txt"), b"root").unwrap();

    // One worker with rendezvous progress: a child's event is taken before
    // that child is listed, while its sibling is still queued
    let config = ScanConfig::default().with_progress_mode(ProgressMode::Blocking);
    let mut scanner = Scanner::new(config);
    scanner.init(1, AcceptAll).unwrap();
    scanner.scan_directory(dir.path()).unwrap();

    let mut removed: Option<PathBuf> = None;
    let mut files = Vec::new();
    let mut errors = Vec::new();
    let summary = scanner
        .drain(|event| match event {
            ScanEvent::Progress(event) if removed.is_none() && event.directory != dir.path() => {
                let sibling = if event.directory == alpha { &beta } else { &alpha };
                fs::remove_dir_all(sibling).unwrap();
                removed = Some(sibling.clone());
            }
            ScanEvent::Progress(_) => {}
            ScanEvent::File(file) => files.push(file.path),
            ScanEvent::Error(err) => errors.push(err),
        })
        .unwrap();
    scanner.close().unwrap();

    let removed = removed.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, removed);
    assert!(errors[0].is_not_found());
    assert_eq!(summary.errors, 1);

    // The rest of the tree is still reported and the scan completes
    let survivor = if removed == alpha { &beta } else { &alpha };
    let files: BTreeSet<PathBuf> = files.into_iter().collect();
    let expected = BTreeSet::from([dir.path().join("root.txt"), survivor.join("inner.txt")]);
    assert_eq!(files, expected);
    assert!(summary.completed);
}

#[test]
fn test_non_recursive() {
    let tree = build_tree();
    let mut scanner = Scanner::new(ScanConfig::default());
    scanner.set_recursive(false);

    let result = scan_with(scanner, 2, tree.path());

    let expected: BTreeSet<PathBuf> = FILES.iter().map(|f| tree.path().join(f)).collect();
    let actual: BTreeSet<PathBuf> = result.files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(actual, expected);
    assert_eq!(result.summary.dirs, 1);
}

#[test]
fn test_blocking_progress_reports_every_directory() {
    let tree = build_tree();
    let config = ScanConfig::default().with_progress_mode(ProgressMode::Blocking);

    let result = scan_with(Scanner::new(config), 4, tree.path());

    assert_eq!(result.paths(), reference_walk(tree.path()));
    assert_eq!(result.progress, 9);
    assert_eq!(result.summary.progress_dropped, 0);
}

#[test]
fn test_tiny_queue_uses_backlog() {
    let tree = build_wide_tree(64, 2);
    let config = ScanConfig::default().with_queue_size(1);

    let result = scan_with(Scanner::new(config), 2, tree.path());

    assert_eq!(result.paths(), reference_walk(tree.path()));
    assert_eq!(result.summary.dirs, 65);
}

#[test]
fn test_backlogged_jobs_counted() {
    let tree = build_wide_tree(64, 1);
    let config = ScanConfig::default().with_queue_size(1);

    // The lone worker is busy with the root while it offers every child
    let result = scan_with(Scanner::new(config), 1, tree.path());

    assert_eq!(result.files.len(), 64);
    assert_eq!(result.summary.backlogged, 63);
}

#[test]
fn test_init_accepts_large_worker_count() {
    let tree = build_tree();
    let result = scan(tree.path(), ScanConfig::MAX_WORKERS + 1);

    assert_eq!(result.paths(), reference_walk(tree.path()));
}

#[test]
fn test_small_results_buffer() {
    let tree = build_wide_tree(8, 20);
    let config = ScanConfig::default().with_results_buffer(1);

    let result = scan_with(Scanner::new(config), 4, tree.path());

    assert_eq!(result.files.len(), 160);
}

#[test]
fn test_max_depth() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("d1").join("d2");
    fs::create_dir_all(&deep).unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("d1").join("b.txt"), b"b").unwrap();
    fs::write(deep.join("c.txt"), b"c").unwrap();

    let config = ScanConfig::default().with_max_depth(1);
    let result = scan_with(Scanner::new(config), 2, dir.path());

    let names: BTreeSet<_> = result
        .files
        .iter()
        .filter_map(|f| f.name().map(String::from))
        .collect();
    assert_eq!(names, BTreeSet::from(["a.txt".to_string(), "b.txt".to_string()]));
    assert_eq!(result.summary.pruned, 1);
}

#[test]
fn test_excluded_directories_not_descended() {
    let tree = build_tree();
    let patterns = ExcludePatterns::new(["/hello world$"]).unwrap();
    let config = ScanConfig::default().with_exclude_dirs(patterns);

    let result = scan_with(Scanner::new(config), 2, tree.path());

    assert_eq!(result.files.len(), 27 - ROOTS.len() * FILES.len());
    assert!(result
        .files
        .iter()
        .all(|f| !f.path.to_string_lossy().contains("hello world")));
    assert_eq!(result.summary.pruned, ROOTS.len() as u64);
}

#[test]
fn test_identity_failure_skips_entry() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), b"keep").unwrap();
    fs::write(dir.path().join("lost.txt"), b"lost").unwrap();

    let scanner = Scanner::new(ScanConfig::default()).with_identity(|path: &Path| {
        if path.ends_with("lost.txt") {
            Err(io::Error::other("no identifier"))
        } else {
            Ok(FileId(7))
        }
    });

    let result = scan_with(scanner, 1, dir.path());

    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].file_id, FileId(7));
    assert_eq!(result.summary.skipped, 1);
}

#[cfg(unix)]
#[test]
fn test_file_ids_match_inodes() {
    use std::os::unix::fs::MetadataExt;

    let tree = build_tree();
    let result = scan(tree.path(), 2);

    for file in &result.files {
        let ino = fs::symlink_metadata(&file.path).unwrap().ino();
        assert_eq!(file.file_id.get(), ino);
    }
}

#[test]
fn test_lifecycle_errors() {
    let tree = build_tree();
    let mut scanner = Scanner::new(ScanConfig::default());

    assert!(matches!(scanner.drain(|_| {}), Err(ScanError::NotInitialized)));

    scanner.init(2, AcceptAll).unwrap();
    scanner.scan_directory(tree.path()).unwrap();
    assert!(matches!(
        scanner.scan_directory(tree.path()),
        Err(ScanError::AlreadyStarted) | Err(ScanError::AlreadyFinished)
    ));

    scanner.drain(|_| {}).unwrap();
    scanner.close().unwrap();
    assert!(matches!(scanner.close(), Err(ScanError::AlreadyClosed)));
    assert!(matches!(scanner.drain(|_| {}), Err(ScanError::AlreadyClosed)));
}

#[test]
fn test_drop_without_close() {
    let tree = build_wide_tree(50, 5);
    let mut scanner = Scanner::new(ScanConfig::default().with_results_buffer(1));
    scanner.init(4, AcceptAll).unwrap();
    scanner.scan_directory(tree.path()).unwrap();

    // Read a little, then walk away; dropping must not hang
    let _ = scanner.results().recv();
    drop(scanner);
}
