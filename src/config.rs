//! Dataset configuration.
//!
//! [`DatasetConfig`] holds every option the dataset recognises, in the same
//! shape as the JSON configuration files the CLI reads.  It is resolved once
//! into a [`PipelinePlan`]; downstream stages only ever see the resolved
//! policy they need, never the raw `mode` / `model_type` strings.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::window::{Collapse, WindowParams};

/// Configuration failures.  All of these are fatal at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown mode {0:?} (expected \"2D\" or \"3D\")")]
    UnknownMode(String),

    #[error("unknown model type {0:?} (expected \"ANN\" or \"SNN\")")]
    UnknownModelType(String),

    #[error("hyperparams.k-fold is set but hyperparams.fold_num is missing")]
    MissingFoldNum,

    #[error("k-fold needs at least 2 folds, got {0}")]
    TooFewFolds(usize),

    #[error("k-fold partition cannot produce {requested} folds from {segments} segments")]
    FoldCount { requested: usize, segments: usize },

    #[error("train_ratio must lie in (0, 1), got {0}")]
    TrainRatio(f64),

    #[error("{name} = {value} s is shorter than one base tick ({tick} s)")]
    SubTick { name: &'static str, value: f32, tick: f32 },

    #[error("bin_width ({bin_width} steps) must be at least one stride ({advance} steps)")]
    BinNarrowerThanStride { bin_width: usize, advance: usize },

    #[error("num_steps must be positive")]
    ZeroSteps,

    #[error("max_segment_len must be positive")]
    ZeroMaxSegmentLen,
}

/// Output layout of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Mode {
    /// Per-segment `[channels, time]` slices, indexed by time column.
    #[serde(rename = "2D")]
    Flat,
    /// Per-segment `[bins, steps, channels]` windows, indexed by bin.
    #[serde(rename = "3D")]
    Windowed,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2D" | "2d" => Ok(Mode::Flat),
            "3D" | "3d" => Ok(Mode::Windowed),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Flat => "2D",
            Mode::Windowed => "3D",
        })
    }
}

/// Consumer model family.  Decides how sub-bins are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ModelType {
    /// Rate-coded consumers: sub-bins are summed.
    #[serde(rename = "ANN")]
    Ann,
    /// Spiking consumers: a sub-bin is 1 if any spike occurred in it.
    #[serde(rename = "SNN")]
    Snn,
}

impl FromStr for ModelType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ANN" | "ann" => Ok(ModelType::Ann),
            "SNN" | "snn" => Ok(ModelType::Snn),
            other => Err(ConfigError::UnknownModelType(other.to_string())),
        }
    }
}

impl ModelType {
    pub fn collapse(self) -> Collapse {
        match self {
            ModelType::Ann => Collapse::Sum,
            ModelType::Snn => Collapse::AnySpike,
        }
    }
}

/// Training hyper-parameters the dataset needs to know about.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hyperparams {
    /// Use shuffled k-fold splitting instead of the four-chunk split.
    #[serde(rename = "k-fold", default)]
    pub k_fold: bool,

    /// Number of folds.  Required when `k_fold` is set.
    #[serde(default)]
    pub fold_num: Option<usize>,

    /// Seed for the k-fold shuffle.  Unseeded runs draw from the thread RNG.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Configuration for [`PrimateReaching`](crate::dataset::PrimateReaching).
///
/// Field names follow the JSON keys, so a config file can be written as:
///
/// ```
/// use reachprep::DatasetConfig;
///
/// let cfg: DatasetConfig = serde_json::from_str(r#"{
///     "hyperparams": { "k-fold": true, "fold_num": 5, "seed": 7 },
///     "path": "data/primate_reaching",
///     "filename": "indy_20160622_01",
///     "mode": "3D",
///     "stride": 0.004,
///     "bin_width": 0.028,
///     "num_steps": 7,
///     "model_type": "SNN"
/// }"#).unwrap();
/// assert_eq!(cfg.hyperparams.fold_num, Some(5));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub hyperparams: Hyperparams,

    /// Directory holding the raw recordings.
    pub path: PathBuf,

    /// Recording name.  The `.safetensors` suffix is appended when absent.
    pub filename: String,

    /// Root of the preprocessed-series cache.  `None` disables caching.
    #[serde(rename = "postprocessed-cache-path")]
    pub cache_path: Option<PathBuf>,

    /// Ignore any cached series and recompute.
    pub regenerate: bool,

    /// Label lag in time steps (sensorimotor latency).
    pub biological_delay: usize,

    pub mode: Mode,

    /// Distance between consecutive bin ends, in seconds.
    pub stride: f32,

    /// Width of one bin, in seconds.  Only used when `overlap` is set.
    pub bin_width: f32,

    /// Reduced step count per bin.  `None` keeps the full bin resolution.
    pub num_steps: Option<usize>,

    pub train_ratio: f64,

    pub model_type: ModelType,

    /// Segments this long or longer (in steps) are dropped.
    pub max_segment_len: usize,

    /// Raw per-sample resolution in seconds.
    pub base_tick: f32,

    /// Overlapping bins of `bin_width`; otherwise bins are `stride` wide.
    pub overlap: bool,
}

impl Default for DatasetConfig {
    /// 2-D layout, four-chunk split, 4 ms stride, 208 ms bins, no delay.
    fn default() -> Self {
        Self {
            hyperparams: Hyperparams::default(),
            path: PathBuf::new(),
            filename: String::new(),
            cache_path: None,
            regenerate: false,
            biological_delay: 0,
            mode: Mode::Flat,
            stride: 0.004,
            bin_width: 0.208,
            num_steps: None,
            train_ratio: 0.8,
            model_type: ModelType::Ann,
            max_segment_len: 2000,
            base_tick: 0.004,
            overlap: true,
        }
    }
}

/// How segment positions are assigned to train / validation / test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitPolicy {
    /// Four contiguous chunks, each split by `train_ratio`.
    Vanilla { train_ratio: f64 },
    /// Shuffled k-fold; the held-out fold is halved into val / test.
    KFold { folds: usize, seed: Option<u64> },
}

/// What the dataset hands out per position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
    Flat,
    Windowed(WindowParams),
}

/// A validated configuration, resolved once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePlan {
    pub split: SplitPolicy,
    pub layout: Layout,
    pub delay: usize,
    pub max_segment_len: usize,
}

impl DatasetConfig {
    /// Validate and resolve into a [`PipelinePlan`].
    pub fn resolve(&self) -> Result<PipelinePlan, ConfigError> {
        if self.max_segment_len == 0 {
            return Err(ConfigError::ZeroMaxSegmentLen);
        }

        let split = if self.hyperparams.k_fold {
            let folds = self.hyperparams.fold_num.ok_or(ConfigError::MissingFoldNum)?;
            if folds < 2 {
                return Err(ConfigError::TooFewFolds(folds));
            }
            SplitPolicy::KFold { folds, seed: self.hyperparams.seed }
        } else {
            if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
                return Err(ConfigError::TrainRatio(self.train_ratio));
            }
            SplitPolicy::Vanilla { train_ratio: self.train_ratio }
        };

        let layout = match self.mode {
            Mode::Flat => Layout::Flat,
            Mode::Windowed => Layout::Windowed(self.window_params()?),
        };

        Ok(PipelinePlan {
            split,
            layout,
            delay: self.biological_delay,
            max_segment_len: self.max_segment_len,
        })
    }

    /// Convert the second-based stride / bin width into step counts.
    ///
    /// Seconds are divided by `base_tick` and rounded, so `0.208 / 0.004`
    /// is 52 steps rather than 51.
    pub fn window_params(&self) -> Result<WindowParams, ConfigError> {
        let tick = self.base_tick;
        let advance = steps_of("stride", self.stride, tick)?;
        let bin_width = if self.overlap {
            steps_of("bin_width", self.bin_width, tick)?
        } else {
            advance
        };
        if bin_width < advance {
            return Err(ConfigError::BinNarrowerThanStride { bin_width, advance });
        }
        if self.num_steps == Some(0) {
            return Err(ConfigError::ZeroSteps);
        }
        Ok(WindowParams {
            advance,
            bin_width,
            num_steps: self.num_steps,
            collapse: self.model_type.collapse(),
        })
    }
}

fn steps_of(name: &'static str, value: f32, tick: f32) -> Result<usize, ConfigError> {
    let steps = (value / tick).round();
    if !steps.is_finite() || steps < 1.0 {
        return Err(ConfigError::SubTick { name, value, tick });
    }
    Ok(steps as usize)
}
