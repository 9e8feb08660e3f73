use mediadupe::actions::{
    ActionKind, ActionOutcome, AlwaysConfirm, DisposeConfig, Disposer, NeverConfirm,
};
use mediadupe::duplicates::{Collaborators, DedupeEngine, FinderConfig, KeepCriterion};
use mediadupe::scanner::WalkEnumerator;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn four_copies(dir: &Path) {
    for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
        fs::write(dir.join(name), b"same clip bytes").unwrap();
    }
}

#[test]
fn test_dry_run_reports_without_touching_files() {
    let dir = tempdir().unwrap();
    four_copies(dir.path());

    let outcome = DedupeEngine::new(FinderConfig::default())
        .find(dir.path())
        .unwrap();
    assert_eq!(outcome.plan.len(), 3);

    let result = Disposer::new(DisposeConfig::default().with_dry_run(true))
        .with_confirm(Box::new(NeverConfirm))
        .dispose(&outcome.plan);

    assert!(result.dry_run);
    assert_eq!(result.disposed_count, 3);
    assert!(result
        .actions
        .iter()
        .all(|a| a.outcome == ActionOutcome::WouldPerform));
    for name in ["a.mp4", "b.mp4", "c.mp4", "d.mp4"] {
        assert!(dir.path().join(name).exists());
    }
    assert!(result.summary().starts_with("Would dispose 3 file(s)"));
}

#[test]
fn test_forced_delete_keeps_only_the_winner() {
    let dir = tempdir().unwrap();
    four_copies(dir.path());

    let outcome = DedupeEngine::new(FinderConfig::default())
        .find(dir.path())
        .unwrap();
    let keeper = outcome.dispositions[0].keep.path.clone();

    let result = Disposer::new(DisposeConfig::default().with_force(true)).dispose(&outcome.plan);

    assert!(result.all_succeeded());
    assert_eq!(result.disposed_count, 3);
    assert_eq!(result.bytes_reclaimed, 3 * 15);
    assert!(keeper.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_interactive_confirmation_is_respected() {
    let dir = tempdir().unwrap();
    four_copies(dir.path());
    let outcome = DedupeEngine::new(FinderConfig::default())
        .find(dir.path())
        .unwrap();

    let declined = Disposer::new(DisposeConfig::default())
        .with_confirm(Box::new(NeverConfirm))
        .dispose(&outcome.plan);
    assert_eq!(declined.declined_count(), 3);
    assert_eq!(declined.disposed_count, 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);

    let confirmed = Disposer::new(DisposeConfig::default())
        .with_confirm(Box::new(AlwaysConfirm))
        .dispose(&outcome.plan);
    assert_eq!(confirmed.disposed_count, 3);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_quarantine_moves_losers_under_relative_paths() {
    let scan = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    let season = scan.path().join("show/season1");
    fs::create_dir_all(&season).unwrap();
    fs::write(scan.path().join("show/ep1.mkv"), b"episode one").unwrap();
    fs::write(season.join("ep1.mkv"), b"episode one").unwrap();

    // Deeper path wins, so the shallow copy is quarantined.
    let config = FinderConfig::default().with_keep_priority(vec![KeepCriterion::Deeper]);
    let outcome = DedupeEngine::new(config).find(scan.path()).unwrap();
    assert_eq!(outcome.dispositions[0].keep.path, season.join("ep1.mkv"));

    let dispose = DisposeConfig::default()
        .with_force(true)
        .with_quarantine_root(Some(quarantine.path().to_path_buf()))
        .with_scan_root(Some(scan.path().to_path_buf()));
    let result = Disposer::new(dispose).dispose(&outcome.plan);

    let moved = quarantine.path().join("show/ep1.mkv");
    assert!(result.all_succeeded());
    assert_eq!(
        result.actions[0].kind,
        ActionKind::Quarantine {
            destination: moved.clone()
        }
    );
    assert!(!scan.path().join("show/ep1.mkv").exists());
    assert_eq!(fs::read(&moved).unwrap(), b"episode one");
    assert!(season.join("ep1.mkv").exists());
}

#[test]
fn test_quarantine_collision_fails_that_file_only() {
    let scan = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    fs::write(scan.path().join("a.mp4"), b"same").unwrap();
    fs::write(scan.path().join("b.mp4"), b"same").unwrap();
    fs::write(scan.path().join("c.mp4"), b"same").unwrap();
    // Keeper is c.mp4 (greatest path); a.mp4 already has a quarantined copy.
    fs::write(quarantine.path().join("a.mp4"), b"older").unwrap();

    let outcome = DedupeEngine::new(FinderConfig::default())
        .find(scan.path())
        .unwrap();
    let dispose = DisposeConfig::default()
        .with_force(true)
        .with_quarantine_root(Some(quarantine.path().to_path_buf()))
        .with_scan_root(Some(scan.path().to_path_buf()));
    let result = Disposer::new(dispose).dispose(&outcome.plan);

    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.disposed_count, 1);
    assert!(scan.path().join("a.mp4").exists());
    assert!(!scan.path().join("b.mp4").exists());
    assert_eq!(fs::read(quarantine.path().join("a.mp4")).unwrap(), b"older");
}

#[test]
fn test_file_changed_after_scan_is_not_disposed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"same").unwrap();
    fs::write(dir.path().join("b.mp4"), b"same").unwrap();

    let outcome = DedupeEngine::new(FinderConfig::default())
        .find(dir.path())
        .unwrap();
    let loser = outcome.plan.items()[0].path.clone();
    fs::write(&loser, b"grown since the scan").unwrap();

    let result = Disposer::new(DisposeConfig::default().with_force(true)).dispose(&outcome.plan);

    assert_eq!(result.failure_count(), 1);
    assert!(loser.exists());
}

#[test]
#[cfg(unix)]
fn test_followed_symlink_never_costs_its_target() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("a.mp4");
    let link = dir.path().join("zz_link_to_a.mp4");
    fs::write(&real, b"only copy").unwrap();
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let collaborators = Collaborators::default()
        .with_enumerator(Arc::new(WalkEnumerator::new().with_follow_symlinks(true)));
    let outcome = DedupeEngine::with_collaborators(FinderConfig::default(), collaborators)
        .find(dir.path())
        .unwrap();

    assert_eq!(outcome.summary.total_files, 1);
    assert!(outcome.groups.is_empty());

    let result = Disposer::new(DisposeConfig::default().with_force(true)).dispose(&outcome.plan);
    assert_eq!(result.disposed_count, 0);
    assert_eq!(fs::read(&link).unwrap(), b"only copy");
}
