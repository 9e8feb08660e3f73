use mediadupe::duplicates::{
    Collaborators, DedupeEngine, FailureStage, FinderConfig, GroupId, KeepCriterion, Mode,
    PerceptualConfig, PerceptualLinkage, ToleranceConfig,
};
use mediadupe::scanner::ManifestProber;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Write placeholder media files plus a manifest describing them.
fn library(names: &[&str], manifest: &str) -> (TempDir, Arc<ManifestProber>) {
    let dir = tempdir().unwrap();
    for (i, name) in names.iter().enumerate() {
        // Distinct bytes so exact hashing never groups them.
        fs::write(dir.path().join(name), format!("clip {}", i)).unwrap();
    }
    let manifest_dir = tempdir().unwrap();
    let manifest_path = manifest_dir.path().join("manifest.json");
    fs::write(&manifest_path, manifest.replace("{ROOT}", &dir.path().display().to_string()))
        .unwrap();
    let prober = Arc::new(ManifestProber::load(&manifest_path).unwrap());
    (dir, prober)
}

fn engine(config: FinderConfig, prober: Arc<ManifestProber>) -> DedupeEngine {
    let collaborators = Collaborators::default()
        .with_prober(prober.clone())
        .with_sampler(prober);
    DedupeEngine::with_collaborators(config, collaborators)
}

#[test]
fn test_tolerance_groups_reencodes_and_keeps_best_resolution() {
    let (dir, prober) = library(
        &["movie_720.mp4", "movie_1080.mkv", "other.mp4", "notes.txt"],
        r#"{ "files": {
            "{ROOT}/movie_720.mp4": { "duration_seconds": 5400.2, "width": 1280, "height": 720 },
            "{ROOT}/movie_1080.mkv": { "duration_seconds": 5400.9, "width": 1920, "height": 1080 },
            "{ROOT}/other.mp4": { "duration_seconds": 1200.0, "width": 1920, "height": 1080 }
        } }"#,
    );

    let config = FinderConfig::default()
        .with_mode(Mode::Tolerance)
        .with_keep_priority(vec![KeepCriterion::Resolution]);
    let outcome = engine(config, prober).find(dir.path()).unwrap();

    assert_eq!(outcome.summary.total_files, 4);
    assert_eq!(outcome.summary.media_files, 3);
    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].id, GroupId::Meta(0));

    let d = &outcome.dispositions[0];
    assert_eq!(d.keep.path, dir.path().join("movie_1080.mkv"));
    assert_eq!(d.loser_paths(), vec![dir.path().join("movie_720.mp4")]);
}

#[test]
fn test_tolerance_respects_same_resolution() {
    let (dir, prober) = library(
        &["a.mp4", "b.mp4"],
        r#"{ "files": {
            "{ROOT}/a.mp4": { "duration_seconds": 60.0, "width": 1280, "height": 720 },
            "{ROOT}/b.mp4": { "duration_seconds": 60.0, "width": 1920, "height": 1080 }
        } }"#,
    );

    let config = FinderConfig::default()
        .with_mode(Mode::Tolerance)
        .with_tolerance(ToleranceConfig {
            require_same_resolution: true,
            ..Default::default()
        });
    let outcome = engine(config, prober).find(dir.path()).unwrap();

    assert!(outcome.groups.is_empty());
}

#[test]
fn test_perceptual_groups_visually_similar_files() {
    let (dir, prober) = library(
        &["a.mp4", "b.mp4", "c.mp4"],
        r#"{ "files": {
            "{ROOT}/a.mp4": { "duration_seconds": 30.0, "signature": [0, 0, 0, 0, 0] },
            "{ROOT}/b.mp4": { "duration_seconds": 31.0, "signature": [1, 3, 0, 7, 0] },
            "{ROOT}/c.mp4": { "duration_seconds": 30.0, "signature": [18446744073709551615, 18446744073709551615, 18446744073709551615, 18446744073709551615, 18446744073709551615] }
        } }"#,
    );

    let config = FinderConfig::default().with_mode(Mode::Perceptual);
    let outcome = engine(config, prober).find(dir.path()).unwrap();

    assert_eq!(outcome.summary.signed_files, 3);
    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].id, GroupId::Phash(0));
    let mut paths = outcome.groups[0].paths();
    paths.sort();
    assert_eq!(paths, vec![dir.path().join("a.mp4"), dir.path().join("b.mp4")]);
}

#[test]
fn test_perceptual_linkage_policies_differ_on_chains() {
    // a~b and b~c at a 4-bit budget, but a and c are 8 bits apart per frame.
    let manifest = r#"{ "files": {
        "{ROOT}/a.mp4": { "signature": [0, 0] },
        "{ROOT}/b.mp4": { "signature": [15, 15] },
        "{ROOT}/c.mp4": { "signature": [255, 255] }
    } }"#;
    let names = ["a.mp4", "b.mp4", "c.mp4"];

    let run = |linkage| {
        let (dir, prober) = library(&names, manifest);
        let config = FinderConfig::default()
            .with_mode(Mode::Perceptual)
            .with_perceptual(PerceptualConfig {
                threshold_per_frame: 4,
                sample_frame_count: 2,
                linkage,
            });
        let outcome = engine(config, prober).find(dir.path()).unwrap();
        outcome.groups.iter().map(|g| g.len()).collect::<Vec<_>>()
    };

    assert_eq!(run(PerceptualLinkage::Anchored), vec![2]);
    assert_eq!(run(PerceptualLinkage::Transitive), vec![3]);
}

#[test]
fn test_probe_errors_are_per_file() {
    let (dir, prober) = library(
        &["a.mp4", "b.mp4", "broken.mp4"],
        r#"{ "files": {
            "{ROOT}/a.mp4": { "duration_seconds": 10.0 },
            "{ROOT}/b.mp4": { "duration_seconds": 10.2 },
            "{ROOT}/broken.mp4": { "error": "moov atom not found" }
        } }"#,
    );

    let config = FinderConfig::default().with_mode(Mode::Tolerance);
    let outcome = engine(config, prober).find(dir.path()).unwrap();

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.diagnostics.failure_count(FailureStage::Probe), 1);
    assert_eq!(outcome.summary.total_files, 3);
}

#[test]
fn test_all_mode_never_disposes_a_keeper() {
    // a and b are byte-identical; b and c share a duration.
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.mp4"), b"identical").unwrap();
    fs::write(dir.path().join("b.mp4"), b"identical").unwrap();
    fs::write(dir.path().join("c.mp4"), b"another encode").unwrap();
    let manifest = format!(
        r#"{{ "files": {{
            "{root}/a.mp4": {{ "duration_seconds": 90.0 }},
            "{root}/b.mp4": {{ "duration_seconds": 100.0, "width": 640, "height": 360 }},
            "{root}/c.mp4": {{ "duration_seconds": 100.3, "width": 1920, "height": 1080 }}
        }} }}"#,
        root = dir.path().display()
    );
    let prober = Arc::new(ManifestProber::from_json(&manifest, Path::new("/")).unwrap());

    let config = FinderConfig::default()
        .with_mode(Mode::All)
        .with_keep_priority(vec![KeepCriterion::Resolution]);
    let outcome = engine(config, prober).find(dir.path()).unwrap();

    assert_eq!(outcome.groups.len(), 2);
    let keepers: Vec<_> = outcome.dispositions.iter().map(|d| d.keep.path.clone()).collect();
    for item in outcome.plan.items() {
        assert!(!keepers.contains(&item.path), "{} is a keeper", item.path.display());
    }
}

#[test]
fn test_relative_root_matches_manifest_and_yields_absolute_paths() {
    let dir = tempfile::tempdir_in(".").unwrap();
    assert!(dir.path().is_relative());
    fs::write(dir.path().join("a.mp4"), b"first cut").unwrap();
    fs::write(dir.path().join("b.mp4"), b"second cut").unwrap();
    fs::write(
        dir.path().join("media.json"),
        r#"{ "files": {
            "./a.mp4": { "duration_seconds": 90.0, "width": 1280, "height": 720 },
            "b.mp4": { "duration_seconds": 90.4, "width": 1920, "height": 1080 }
        } }"#,
    )
    .unwrap();
    let prober = Arc::new(ManifestProber::load(&dir.path().join("media.json")).unwrap());

    let root = dir.path().join(".");
    let outcome = engine(FinderConfig::default().with_mode(Mode::Tolerance), prober)
        .find(&root)
        .unwrap();

    let canonical = dir.path().canonicalize().unwrap();
    assert_eq!(outcome.root, canonical);
    assert_eq!(outcome.summary.media_files, 2);
    assert_eq!(outcome.groups.len(), 1);
    assert!(outcome.groups[0].members.iter().all(|m| m.path.is_absolute()));
    assert_eq!(outcome.dispositions[0].keep.path, canonical.join("b.mp4"));
}
