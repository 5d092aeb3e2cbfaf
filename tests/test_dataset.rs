mod common;
use common::{is_partition, plan, recording, regular_changes};
use std::cell::Cell;

use reachprep::{
    ConfigError, DatasetConfig, Hyperparams, Mode, ModelType, Preprocessor, PrimateReaching,
    ProcessedSeries, RawRecording, SpikeVelocity,
};

/// 18 segments of 10 steps over 200 columns.
fn regular_recording(n_ch: usize) -> RawRecording {
    recording(n_ch, 200, &regular_changes(200, 10))
}

/// Counts how often the pipeline asks for preprocessing.
#[derive(Default)]
struct Counting {
    calls: Cell<usize>,
}

impl Preprocessor for Counting {
    fn process(&self, raw: &RawRecording) -> anyhow::Result<ProcessedSeries> {
        self.calls.set(self.calls.get() + 1);
        SpikeVelocity.process(raw)
    }
}

#[test]
fn flat_layout_serves_columns() {
    let raw = regular_recording(6);
    let cfg = DatasetConfig { train_ratio: 0.5, ..DatasetConfig::default() };
    let mut ds = PrimateReaching::from_parts(plan(cfg), &raw, "flat", &SpikeVelocity, None).unwrap();

    assert_eq!(ds.segment_count(), 18);
    assert_eq!(ds.input_feature_size(), 6);
    assert_eq!(ds.splits().len(), 1);
    let sets = &ds.splits()[0];
    // chunk = 4 → 2 train, 1 val, 1 test per chunk; last 2 segments unassigned.
    assert_eq!((sets.train.len(), sets.val.len(), sets.test.len()), (8, 4, 4));

    ds.set_segment(3).unwrap();
    assert_eq!(ds.len(), 10);
    let seg = ds.segments()[3];
    let (x, y) = ds.get(2).unwrap();
    assert_eq!(x.shape(), &[6]);
    assert_eq!(y.len(), 2);
    for c in 0..6 {
        assert_eq!(x[[c]], raw.spikes[[c, seg.start + 2]]);
    }
    assert!(ds.get(10).is_none());
}

#[test]
fn windowed_layout_serves_bins() {
    let raw = regular_recording(4);
    let cfg = DatasetConfig {
        mode: Mode::Windowed,
        stride: 0.008,
        bin_width: 0.016,
        num_steps: Some(2),
        model_type: ModelType::Snn,
        ..DatasetConfig::default()
    };
    let mut ds = PrimateReaching::from_parts(plan(cfg), &raw, "win", &SpikeVelocity, None).unwrap();

    assert!(ds.flat(0).is_none());
    let w = ds.windowed(5).unwrap();
    assert_eq!(w.samples.dim(), (5, 2, 4));
    assert_eq!(w.labels.dim(), (2, 5));

    ds.set_segment(5).unwrap();
    assert_eq!(ds.len(), 5);
    let (x, y) = ds.get(4).unwrap();
    assert_eq!(x.shape(), &[2, 4]);
    assert_eq!(y.len(), 2);
    assert!(x.iter().all(|&v| v == 0.0 || v == 1.0));
}

#[test]
fn kfold_builds_one_split_per_fold() {
    let raw = regular_recording(3);
    let cfg = DatasetConfig {
        hyperparams: Hyperparams { k_fold: true, fold_num: Some(3), seed: Some(11) },
        ..DatasetConfig::default()
    };
    let ds = PrimateReaching::from_parts(plan(cfg.clone()), &raw, "kf", &SpikeVelocity, None).unwrap();
    assert_eq!(ds.splits().len(), 3);
    for f in ds.splits() {
        assert!(is_partition(&[&f.train, &f.val, &f.test], 18));
    }
    assert!(ds.fold(3).is_none());

    let again = PrimateReaching::from_parts(plan(cfg), &raw, "kf", &SpikeVelocity, None).unwrap();
    assert_eq!(ds.splits(), again.splits());
}

#[test]
fn too_many_folds_is_fatal() {
    let raw = regular_recording(3);
    let cfg = DatasetConfig {
        hyperparams: Hyperparams { k_fold: true, fold_num: Some(50), seed: Some(0) },
        ..DatasetConfig::default()
    };
    let err = PrimateReaching::from_parts(plan(cfg), &raw, "kf", &SpikeVelocity, None)
        .err()
        .expect("fold count must be rejected");
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::FoldCount { requested: 50, segments: 18 })
    );
}

#[test]
fn no_boundaries_gives_empty_dataset() {
    let raw = recording(3, 80, &[]);
    let mut ds = PrimateReaching::from_parts(
        plan(DatasetConfig { mode: Mode::Windowed, ..DatasetConfig::default() }),
        &raw, "flat-target", &SpikeVelocity, None,
    ).unwrap();
    assert_eq!(ds.segment_count(), 0);
    assert_eq!(ds.splits()[0].total(), 0);
    assert_eq!(ds.len(), 0);
    assert!(ds.get(0).is_none());
    assert!(ds.set_segment(0).is_err());
}

#[test]
fn length_mismatch_from_preprocessor_is_rejected() {
    let raw = regular_recording(2);
    let short = |_: &RawRecording| {
        ProcessedSeries::new(ndarray::Array2::zeros((2, 150)), ndarray::Array2::zeros((2, 150)))
    };
    let res = PrimateReaching::from_parts(plan(DatasetConfig::default()), &raw, "short", &short, None);
    assert!(res.is_err());
}

#[test]
fn build_reads_recording_and_caches_series() {
    let dir = tempfile::tempdir().unwrap();
    let raw = regular_recording(5);
    raw.save(&dir.path().join("session.safetensors")).unwrap();

    let cfg = DatasetConfig {
        path: dir.path().to_path_buf(),
        filename: "session".into(),
        cache_path: Some(dir.path().join("cache")),
        ..DatasetConfig::default()
    };

    let pre = Counting::default();
    let first = PrimateReaching::build(&cfg, &pre).unwrap();
    assert_eq!(pre.calls.get(), 1);
    assert!(!first.report().cache_hit);
    assert!(dir.path().join("cache/input/session.safetensors").exists());
    assert!(dir.path().join("cache/label/session.safetensors").exists());

    let second = PrimateReaching::build(&cfg, &pre).unwrap();
    assert_eq!(pre.calls.get(), 1, "second build must come from the cache");
    assert!(second.report().cache_hit);
    assert_eq!(first.segments(), second.segments());
    assert_eq!(first.flat(7), second.flat(7));

    let regen = DatasetConfig { regenerate: true, ..cfg };
    let third = PrimateReaching::build(&regen, &pre).unwrap();
    assert_eq!(pre.calls.get(), 2);
    assert!(!third.report().cache_hit);
}

#[test]
fn unwritable_cache_does_not_stop_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let raw = regular_recording(3);
    raw.save(&dir.path().join("session.safetensors")).unwrap();
    // A plain file where the cache directory should be.
    let blocker = dir.path().join("cache");
    std::fs::write(&blocker, b"occupied").unwrap();

    let cfg = DatasetConfig {
        path: dir.path().to_path_buf(),
        filename: "session".into(),
        cache_path: Some(blocker.clone()),
        ..DatasetConfig::default()
    };
    let pre = Counting::default();
    let ds = PrimateReaching::build(&cfg, &pre).unwrap();
    assert_eq!(pre.calls.get(), 1);
    assert!(!ds.report().cache_hit);
    assert_eq!(ds.segment_count(), 18);
    assert!(blocker.is_file());

    PrimateReaching::build(&cfg, &pre).unwrap();
    assert_eq!(pre.calls.get(), 2, "nothing was cached, so preprocessing reruns");
}

#[test]
fn missing_recording_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DatasetConfig {
        path: dir.path().to_path_buf(),
        filename: "absent".into(),
        ..DatasetConfig::default()
    };
    assert!(PrimateReaching::build(&cfg, &SpikeVelocity).is_err());
}

#[test]
fn config_from_json() {
    let cfg: DatasetConfig = serde_json::from_str(r#"{
        "hyperparams": { "k-fold": false },
        "filename": "indy_20160622_01",
        "postprocessed-cache-path": "cache",
        "biological_delay": 3,
        "mode": "3D",
        "stride": 0.004,
        "bin_width": 0.02,
        "num_steps": 5,
        "model_type": "ANN",
        "max_segment_len": 500
    }"#).unwrap();
    let p = cfg.resolve().unwrap();
    assert_eq!(p.delay, 3);
    assert_eq!(p.max_segment_len, 500);
    match p.layout {
        reachprep::Layout::Windowed(w) => {
            assert_eq!((w.advance, w.bin_width, w.num_steps), (1, 5, Some(5)));
        }
        reachprep::Layout::Flat => panic!("expected 3D"),
    }
}
