use dirsnap_scan::{MetadataRecord, Recorder, SnapshotConfig, SnapshotError, WarningKind};
use filetime::FileTime;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn build_tree(root: &Path) {
    fs::create_dir_all(root.join("photos/2023")).unwrap();
    fs::create_dir_all(root.join("music")).unwrap();
    fs::write(root.join("readme.md"), "# hi").unwrap();
    fs::write(root.join("photos/cover.png"), "png").unwrap();
    fs::write(root.join("photos/2023/beach.jpg"), "jpg").unwrap();
    fs::write(root.join("music/song with spaces.mp3"), "mp3").unwrap();
}

fn read_records(artifact: &Path) -> Vec<MetadataRecord> {
    fs::read_to_string(artifact)
        .unwrap()
        .lines()
        .map(|line| MetadataRecord::parse_line(line).unwrap())
        .collect()
}

#[test]
fn test_artifact_lists_every_entry_by_base_name() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    build_tree(src.path());

    let artifact = out.path().join("tree_snapshot.txt");
    let recorder = Recorder::new(&SnapshotConfig::new(out.path()));
    let stats = recorder.write_snapshot(src.path(), &artifact).unwrap();

    let records = read_records(&artifact);
    assert_eq!(stats.records, records.len() as u64);
    assert!(stats.warnings.is_empty());

    let names: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
    let expected: HashSet<&str> = [
        "photos",
        "2023",
        "music",
        "readme.md",
        "cover.png",
        "beach.jpg",
        "song with spaces.mp3",
    ]
    .into_iter()
    .collect();
    assert_eq!(names, expected);
    assert!(records.iter().all(|r| !r.name.contains('/')));
}

#[test]
fn test_artifact_line_format() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = src.path().join("only.txt");
    fs::write(&file, "x").unwrap();
    filetime::set_file_mtime(&file, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let artifact = out.path().join("src_snapshot.txt");
    Recorder::new(&SnapshotConfig::new(out.path()))
        .write_snapshot(src.path(), &artifact)
        .unwrap();

    assert_eq!(fs::read_to_string(&artifact).unwrap(), "only.txt 1600000000\n");
}

#[test]
fn test_rerun_is_idempotent_and_truncates() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    build_tree(src.path());

    let artifact = out.path().join("tree_snapshot.txt");
    fs::write(&artifact, "stale line from an older run 1\n".repeat(100)).unwrap();

    let recorder = Recorder::new(&SnapshotConfig::new(out.path()));
    recorder.write_snapshot(src.path(), &artifact).unwrap();
    let mut first = read_records(&artifact);
    recorder.write_snapshot(src.path(), &artifact).unwrap();
    let mut second = read_records(&artifact);

    assert!(first.iter().all(|r| !r.name.starts_with("stale")));
    let key = |r: &MetadataRecord| (r.name.clone(), r.mtime_secs());
    first.sort_by_key(key);
    second.sort_by_key(key);
    assert_eq!(first, second);
}

#[test]
fn test_records_iterator_restarts() {
    let src = TempDir::new().unwrap();
    build_tree(src.path());
    let recorder = Recorder::new(&SnapshotConfig::default());

    let first = recorder.records(src.path()).unwrap().count();
    fs::write(src.path().join("late.txt"), "").unwrap();
    let second = recorder.records(src.path()).unwrap().count();

    assert_eq!(second, first + 1);
}

#[test]
fn test_unwritable_artifact() {
    let src = TempDir::new().unwrap();
    build_tree(src.path());

    let artifact = src.path().join("no/such/dir/x_snapshot.txt");
    let err = Recorder::new(&SnapshotConfig::default())
        .write_snapshot(src.path(), &artifact)
        .unwrap_err();
    assert!(matches!(err, SnapshotError::ArtifactUnwritable { .. }));
}

#[test]
fn test_unreadable_root_leaves_previous_artifact() {
    let out = TempDir::new().unwrap();
    let artifact = out.path().join("gone_snapshot.txt");
    fs::write(&artifact, "previous 1\n").unwrap();

    let err = Recorder::new(&SnapshotConfig::new(out.path()))
        .write_snapshot(&out.path().join("gone"), &artifact)
        .unwrap_err();

    assert!(matches!(err, SnapshotError::DirectoryUnreadable { .. }));
    assert_eq!(fs::read_to_string(&artifact).unwrap(), "previous 1\n");
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_a_warning() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    build_tree(src.path());
    let locked = src.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("secret.txt"), "").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users ignore the mode bits.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let artifact = out.path().join("tree_snapshot.txt");
    let stats = Recorder::new(&SnapshotConfig::new(out.path()))
        .write_snapshot(src.path(), &artifact)
        .unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let names: HashSet<String> = read_records(&artifact)
        .into_iter()
        .map(|r| r.name.to_string())
        .collect();
    assert!(names.contains("locked"));
    assert!(names.contains("beach.jpg"));
    assert!(!names.contains("secret.txt"));
    assert!(stats
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::PermissionDenied));
}

#[cfg(unix)]
#[test]
fn test_followed_links_that_fail_are_skipped() {
    use std::os::unix::fs::symlink;

    let src = TempDir::new().unwrap();
    let root = src.path();
    fs::write(root.join("regular.txt"), "x").unwrap();
    fs::create_dir(root.join("nested")).unwrap();
    fs::write(root.join("nested/deep.txt"), "y").unwrap();
    symlink(root.join("does-not-exist"), root.join("dangling")).unwrap();
    symlink(root, root.join("nested/up")).unwrap();

    let mut config = SnapshotConfig::default();
    config.follow_symlinks = true;
    let items: Vec<_> = Recorder::new(&config).records(root).unwrap().collect();

    let names: HashSet<&str> = items
        .iter()
        .filter_map(|i| i.as_ref().ok())
        .map(|r| r.name.as_str())
        .collect();
    let expected: HashSet<&str> = ["regular.txt", "nested", "deep.txt"].into_iter().collect();
    assert_eq!(names, expected);

    let warnings: Vec<_> = items.iter().filter_map(|i| i.as_ref().err()).collect();
    assert_eq!(warnings.len(), 2, "{warnings:?}");
    assert!(warnings
        .iter()
        .any(|w| w.kind == WarningKind::MetadataError && w.path.ends_with("dangling")));
    assert!(warnings
        .iter()
        .any(|w| w.kind == WarningKind::SymlinkLoop && w.path.ends_with("nested/up")));
}

#[cfg(unix)]
#[test]
fn test_links_are_recorded_when_not_followed() {
    use std::os::unix::fs::symlink;

    let src = TempDir::new().unwrap();
    let root = src.path();
    symlink(root.join("does-not-exist"), root.join("dangling")).unwrap();
    symlink(root, root.join("up")).unwrap();

    let items: Vec<_> = Recorder::new(&SnapshotConfig::default())
        .records(root)
        .unwrap()
        .collect();

    let names: HashSet<String> = items
        .into_iter()
        .map(|i| i.unwrap().name.to_string())
        .collect();
    let expected: HashSet<String> = ["dangling", "up"].into_iter().map(String::from).collect();
    assert_eq!(names, expected);
}

#[test]
fn test_far_future_mtime_is_recorded() {
    // tmpfs stores timestamps far beyond what most date libraries accept.
    let shm = Path::new("/dev/shm");
    if !shm.is_dir() {
        return;
    }
    let src = TempDir::new_in(shm).unwrap();
    let out = TempDir::new().unwrap();
    let file = src.path().join("future.bin");
    fs::write(&file, "x").unwrap();
    fs::write(src.path().join("today.txt"), "y").unwrap();
    let secs = 10_000_000_000_000i64;
    if filetime::set_file_mtime(&file, FileTime::from_unix_time(secs, 0)).is_err() {
        return;
    }

    let artifact = out.path().join("src_snapshot.txt");
    let stats = Recorder::new(&SnapshotConfig::new(out.path()))
        .write_snapshot(src.path(), &artifact)
        .unwrap();

    assert_eq!(stats.records, 2);
    let contents = fs::read_to_string(&artifact).unwrap();
    assert!(contents.lines().any(|l| l == "future.bin 10000000000000"));
    assert!(contents.lines().any(|l| l.starts_with("today.txt ")));
}
