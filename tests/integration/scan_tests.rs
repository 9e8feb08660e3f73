use filetime::{set_file_mtime, FileTime};
use mediadupe::duplicates::{
    Collaborators, DedupeEngine, FinderConfig, FinderError, GroupId, KeepCriterion, Mode,
    Strategy,
};
use mediadupe::scanner::{FileRecord, Sha256Hasher, WalkEnumerator};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

const MB: usize = 1_000_000;

fn write_with_mtime(dir: &Path, name: &str, content: &[u8], unix_secs: i64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
    path
}

#[test]
fn test_exact_keep_newer_reclaims_losers() {
    let dir = tempdir().unwrap();
    let big = vec![b'a'; 10 * MB];
    let small = vec![b'b'; 5 * MB];

    write_with_mtime(dir.path(), "big_old.bin", &big, 1_600_000_000);
    let big_new = write_with_mtime(dir.path(), "big_new.bin", &big, 1_700_000_000);
    let small_new = write_with_mtime(dir.path(), "small_new.bin", &small, 1_700_000_000);
    write_with_mtime(dir.path(), "small_old.bin", &small, 1_600_000_000);

    let config = FinderConfig::default()
        .with_mode(Mode::Exact)
        .with_keep_priority(vec![KeepCriterion::Newer]);
    let outcome = DedupeEngine::new(config).find(dir.path()).unwrap();

    assert_eq!(outcome.groups.len(), 2);
    let keepers: Vec<&PathBuf> = outcome.dispositions.iter().map(|d| &d.keep.path).collect();
    assert!(keepers.contains(&&big_new));
    assert!(keepers.contains(&&small_new));
    assert_eq!(outcome.summary.total_losers, 2);
    assert_eq!(outcome.summary.reclaimable_bytes, 15 * MB as u64);
}

#[test]
fn test_group_ids_are_content_hashes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"abc").unwrap();
    fs::write(dir.path().join("b"), b"abc").unwrap();

    let outcome = DedupeEngine::new(FinderConfig::default())
        .find(dir.path())
        .unwrap();

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(
        outcome.groups[0].id,
        GroupId::Hash(Sha256Hasher::hash_bytes(b"abc"))
    );
    assert_eq!(outcome.groups[0].id.strategy(), Strategy::Exact);
}

#[test]
fn test_unique_files_produce_no_groups() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"one").unwrap();
    fs::write(dir.path().join("b"), b"two").unwrap();
    fs::write(dir.path().join("c"), b"three").unwrap();

    let outcome = DedupeEngine::new(FinderConfig::default())
        .find(dir.path())
        .unwrap();

    assert!(outcome.groups.is_empty());
    assert!(outcome.plan.is_empty());
    assert_eq!(outcome.summary.total_files, 3);
}

#[test]
fn test_nested_directories_and_depth_limit() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(dir.path().join("top.mp4"), b"same").unwrap();
    fs::write(sub.join("nested.mp4"), b"same").unwrap();

    let all = DedupeEngine::new(FinderConfig::default())
        .find(dir.path())
        .unwrap();
    assert_eq!(all.groups.len(), 1);

    let shallow = Collaborators::default()
        .with_enumerator(Arc::new(WalkEnumerator::new().with_max_depth(Some(1))));
    let limited = DedupeEngine::with_collaborators(FinderConfig::default(), shallow)
        .find(dir.path())
        .unwrap();
    assert!(limited.groups.is_empty());
    assert_eq!(limited.summary.total_files, 1);
}

#[test]
fn test_pattern_filter() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"same").unwrap();
    fs::write(dir.path().join("b.mp4"), b"same").unwrap();
    fs::write(dir.path().join("c.txt"), b"same").unwrap();

    let walker = WalkEnumerator::new().with_pattern(Some("*.mp4".to_string()));
    let collaborators = Collaborators::default().with_enumerator(Arc::new(walker));
    let outcome = DedupeEngine::with_collaborators(FinderConfig::default(), collaborators)
        .find(dir.path())
        .unwrap();

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].len(), 2);
}

#[test]
fn test_pattern_matching_nothing_is_fatal() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"x").unwrap();

    let walker = WalkEnumerator::new().with_pattern(Some("*.mkv".to_string()));
    let collaborators = Collaborators::default().with_enumerator(Arc::new(walker));
    let result = DedupeEngine::with_collaborators(FinderConfig::default(), collaborators)
        .find(dir.path());

    assert!(matches!(result, Err(FinderError::NoFilesMatched(_))));
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let result = DedupeEngine::new(FinderConfig::default()).find(&dir.path().join("missing"));
    assert!(matches!(result, Err(FinderError::PathNotFound(_))));
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let dir = tempdir().unwrap();
    for name in ["d", "b", "a", "c"] {
        fs::write(dir.path().join(name), b"identical").unwrap();
        set_file_mtime(dir.path().join(name), FileTime::from_unix_time(1_650_000_000, 0)).unwrap();
    }

    let run = || {
        let outcome = DedupeEngine::new(FinderConfig::default().with_threads(4))
            .find(dir.path())
            .unwrap();
        let d = &outcome.dispositions[0];
        (d.keep.path.clone(), d.loser_paths())
    };

    // Full tie: equal-length paths fall back to the greatest path.
    let first = run();
    assert_eq!(first.0, dir.path().join("d"));
    for _ in 0..3 {
        assert_eq!(run(), first);
    }
}

#[test]
#[cfg(unix)]
fn test_hard_links_reclaim_nothing() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    fs::write(&a, vec![9u8; 4096]).unwrap();
    fs::hard_link(&a, &b).unwrap();

    let engine = DedupeEngine::new(FinderConfig::default().with_mode(Mode::Exact));
    let outcome = engine.find(dir.path()).unwrap();
    assert_eq!(outcome.summary.total_files, 1);
    assert!(outcome.groups.is_empty());
    assert_eq!(outcome.summary.reclaimable_bytes, 0);

    // Records built by hand still group, but nothing is planned.
    let records = vec![
        Arc::new(FileRecord::from_path(&a).unwrap()),
        Arc::new(FileRecord::from_path(&b).unwrap()),
    ];
    let outcome = engine.find_in_records(records).unwrap();
    assert_eq!(outcome.groups.len(), 1);
    assert!(outcome.plan.is_empty());
    assert_eq!(outcome.plan.protected_count(), 1);
    assert_eq!(outcome.summary.reclaimable_bytes, 0);
}
