//! The primate reaching dataset.
//!
//! [`PrimateReaching`] runs the whole pipeline once at construction:
//!
//! ```text
//! recording ─┬─ detect_boundaries → build_segments
//!            └─ cache or preprocessor → ProcessedSeries
//!                 │
//!                 ├─ filter_by_length
//!                 ├─ apply_delay + drop_overruns      (delay > 0)
//!                 ├─ vanilla_split | kfold_split
//!                 └─ window_all                       (3-D layout)
//! ```
//!
//! Afterwards it serves `(sample, label)` pairs from one active segment at a
//! time.  The active segment is switched with [`PrimateReaching::set_segment`],
//! so a consumer can walk any split of any fold without rebuilding.
use anyhow::{bail, ensure, Context, Result};
use log::{info, warn};
use ndarray::{s, Array1, Array2, ArrayD, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;

use crate::boundary::detect_boundaries;
use crate::cache::CacheStore;
use crate::config::{DatasetConfig, Layout, PipelinePlan, SplitPolicy};
use crate::delay::apply_delay;
use crate::io::{RawRecording, EXTENSION};
use crate::preprocess::Preprocessor;
use crate::segment::{build_segments, drop_overruns, filter_by_length, Segment};
use crate::split::{kfold_split, vanilla_split, SplitIndexSets};
use crate::window::{window_all, WindowedSample};

/// Per-segment tensors in the configured layout.
#[derive(Debug, Clone)]
enum SegmentData {
    /// `([C, len], [D, len])`
    Flat(Vec<(Array2<f32>, Array2<f32>)>),
    Windowed(Vec<WindowedSample>),
}

/// What happened while building, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub boundaries: usize,
    pub segments_detected: usize,
    pub segments_after_length_filter: usize,
    pub segments_after_delay: usize,
    pub cache_hit: bool,
}

pub struct PrimateReaching {
    plan: PipelinePlan,
    segments: Vec<Segment>,
    folds: Vec<SplitIndexSets>,
    data: SegmentData,
    n_channels: usize,
    active: usize,
    report: BuildReport,
}

impl PrimateReaching {
    /// Read the recording named by `cfg` and run the pipeline.
    pub fn build<P: Preprocessor + ?Sized>(cfg: &DatasetConfig, preprocessor: &P) -> Result<Self> {
        let plan = cfg.resolve()?;
        let raw = RawRecording::open(&cfg.path, &cfg.filename).with_context(|| {
            format!("loading recording {:?} from {}", cfg.filename, cfg.path.display())
        })?;
        let cache = cfg
            .cache_path
            .as_ref()
            .map(|root| CacheStore::new(root).regenerate(cfg.regenerate));
        Self::from_parts(plan, &raw, cache_key(&cfg.filename), preprocessor, cache.as_ref())
    }

    /// Run the pipeline over an already loaded recording.
    ///
    /// `name` keys the cache entry; without a cache it is only used in logs.
    pub fn from_parts<P: Preprocessor + ?Sized>(
        plan: PipelinePlan,
        raw: &RawRecording,
        name: &str,
        preprocessor: &P,
        cache: Option<&CacheStore>,
    ) -> Result<Self> {
        let mut report = BuildReport::default();

        let boundaries = detect_boundaries(&raw.target_pos);
        let segments = build_segments(&boundaries);
        report.boundaries = boundaries.len();
        report.segments_detected = segments.len();
        info!("{name}: {} boundaries, {} segments", boundaries.len(), segments.len());

        let series = match cache.and_then(|c| c.try_load(name)) {
            Some(series) => {
                report.cache_hit = true;
                series
            }
            None => {
                let series = preprocessor
                    .process(raw)
                    .with_context(|| format!("preprocessing {name}"))?;
                if let Some(c) = cache {
                    if let Err(e) = c.store(name, &series) {
                        warn!("cache: could not save {name}: {e:#}");
                    }
                }
                series
            }
        };
        info!(
            "{name}: samples {:?}, labels {:?}",
            series.samples().dim(),
            series.labels().dim()
        );
        ensure!(
            series.len() == raw.target_pos.ncols(),
            "{name}: processed series has {} steps but target_pos has {}",
            series.len(),
            raw.target_pos.ncols()
        );

        let (segments, _) = filter_by_length(segments, plan.max_segment_len);
        report.segments_after_length_filter = segments.len();

        let (series, segments) = if plan.delay > 0 {
            let series = apply_delay(series, plan.delay);
            let (segments, _) = drop_overruns(segments, series.len());
            (series, segments)
        } else {
            (series, segments)
        };
        report.segments_after_delay = segments.len();

        let folds = split(&plan.split, segments.len())?;
        for (k, f) in folds.iter().enumerate() {
            info!(
                "{name}: split {k}: train={} val={} test={}",
                f.train.len(),
                f.val.len(),
                f.test.len()
            );
        }

        let n_channels = series.samples().nrows();
        let (samples, labels) = series.into_parts();
        let data = match plan.layout {
            Layout::Flat => SegmentData::Flat(
                segments
                    .iter()
                    .map(|seg| {
                        (
                            samples.slice(s![.., seg.start..seg.end]).to_owned(),
                            labels.slice(s![.., seg.start..seg.end]).to_owned(),
                        )
                    })
                    .collect(),
            ),
            Layout::Windowed(p) => SegmentData::Windowed(window_all(&samples, &labels, &segments, &p)),
        };

        Ok(Self { plan, segments, folds, data, n_channels, active: 0, report })
    }

    /// Positions available in the active segment.
    pub fn len(&self) -> usize {
        match &self.data {
            SegmentData::Flat(v) => v.get(self.active).map_or(0, |(x, _)| x.ncols()),
            SegmentData::Windowed(v) => v.get(self.active).map_or(0, |w| w.n_bins()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(sample, label)` at `pos` in the active segment.
    ///
    /// Flat layout: sample `[C]`, the channel vector at column `pos`.
    /// Windowed layout: sample `[steps, C]`, bin `pos`.
    /// Label `[D]` in both.
    pub fn get(&self, pos: usize) -> Option<(ArrayD<f32>, Array1<f32>)> {
        if pos >= self.len() {
            return None;
        }
        match &self.data {
            SegmentData::Flat(v) => {
                let (x, y) = &v[self.active];
                Some((x.column(pos).to_owned().into_dyn(), y.column(pos).to_owned()))
            }
            SegmentData::Windowed(v) => {
                let w = &v[self.active];
                Some((
                    w.samples.index_axis(Axis(0), pos).to_owned().into_dyn(),
                    w.labels.column(pos).to_owned(),
                ))
            }
        }
    }

    /// Make segment `idx` the one [`len`](Self::len) and [`get`](Self::get) read from.
    pub fn set_segment(&mut self, idx: usize) -> Result<()> {
        if idx >= self.segment_count() {
            bail!("segment {idx} out of range ({} segments)", self.segment_count());
        }
        self.active = idx;
        Ok(())
    }

    pub fn active_segment(&self) -> usize {
        self.active
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Retained segments, in series coordinates.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// One entry for the four-chunk split, one per fold for k-fold.
    pub fn splits(&self) -> &[SplitIndexSets] {
        &self.folds
    }

    pub fn fold(&self, k: usize) -> Option<&SplitIndexSets> {
        self.folds.get(k)
    }

    /// Windowed tensors of segment `idx`; `None` in the flat layout.
    pub fn windowed(&self, idx: usize) -> Option<&WindowedSample> {
        match &self.data {
            SegmentData::Windowed(v) => v.get(idx),
            SegmentData::Flat(_) => None,
        }
    }

    /// `([C, len], [D, len])` slices of segment `idx`; `None` in the windowed layout.
    pub fn flat(&self, idx: usize) -> Option<(&Array2<f32>, &Array2<f32>)> {
        match &self.data {
            SegmentData::Flat(v) => v.get(idx).map(|(x, y)| (x, y)),
            SegmentData::Windowed(_) => None,
        }
    }

    /// Input channel count, as a decoder's input width.
    pub fn input_feature_size(&self) -> usize {
        self.n_channels
    }

    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }
}

fn split(policy: &SplitPolicy, n_segments: usize) -> Result<Vec<SplitIndexSets>> {
    let folds = match *policy {
        SplitPolicy::Vanilla { train_ratio } => vec![vanilla_split(n_segments, train_ratio)],
        SplitPolicy::KFold { folds, seed: Some(seed) } => {
            kfold_split(n_segments, folds, &mut StdRng::seed_from_u64(seed))?
        }
        SplitPolicy::KFold { folds, seed: None } => {
            kfold_split(n_segments, folds, &mut rand::thread_rng())?
        }
    };
    Ok(folds)
}

/// Cache entries are keyed by the bare recording name.
fn cache_key(filename: &str) -> &str {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    name.strip_suffix(&format!(".{EXTENSION}")).unwrap_or(name)
}
