//! # reachprep: trial segmentation and windowing for reaching recordings
//!
//! `reachprep` turns a continuous motor-cortex recording (binned spikes,
//! cursor and target position) into per-trial, model-ready tensors for
//! movement decoders.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording.safetensors  (spikes, t, cursor_pos, target_pos)
//!   │
//!   ├─ boundary::detect_boundaries   target jumps → trial boundaries
//!   ├─ segment::build_segments       [bᵢ, bᵢ₊₁) ranges
//!   ├─ preprocess / cache            samples [C, T], labels [L, T]
//!   ├─ segment::filter_by_length     drop over-long trials
//!   ├─ delay::apply_delay            labels lead inputs by d steps
//!   ├─ split                         four-chunk or shuffled k-fold
//!   └─ window::window_all            [bins, steps, C] per segment (3-D only)
//!        │
//!        └─→ PrimateReaching::get(pos) → (sample, label)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use reachprep::{DatasetConfig, Mode, PrimateReaching, SpikeVelocity};
//!
//! let cfg = DatasetConfig {
//!     path: "data/primate_reaching".into(),
//!     filename: "indy_20160622_01".into(),
//!     mode: Mode::Windowed,
//!     bin_width: 0.028,
//!     num_steps: Some(7),
//!     ..DatasetConfig::default()
//! };
//! let mut ds = PrimateReaching::build(&cfg, &SpikeVelocity).unwrap();
//!
//! let test = ds.splits()[0].test.clone();
//! for seg in test {
//!     ds.set_segment(seg).unwrap();
//!     for pos in 0..ds.len() {
//!         let (x, y) = ds.get(pos).unwrap();   // x: [7, C], y: [2]
//!         let _ = (x, y);
//!     }
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use reachprep::{build_segments, detect_boundaries, filter_by_length, vanilla_split};
//! use ndarray::Array2;
//!
//! let target = Array2::from_shape_fn((2, 100), |(_, t)| (t / 25) as f32);
//! let bounds = detect_boundaries(&target);             // [24, 49, 74]
//! let (segs, _) = filter_by_length(build_segments(&bounds), 2000);
//! assert_eq!(segs.len(), 2);
//! let sets = vanilla_split(segs.len(), 0.8);
//! assert_eq!(sets.total(), 0); // fewer than four segments: nothing to split
//! ```

pub mod boundary;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod delay;
pub mod io;
pub mod preprocess;
pub mod segment;
pub mod split;
pub mod window;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{ConfigError, DatasetConfig, Hyperparams, Layout, Mode, ModelType, PipelinePlan, SplitPolicy};

// pipeline stages
pub use boundary::detect_boundaries;
pub use delay::apply_delay;
pub use segment::{build_segments, drop_overruns, filter_by_length, Segment, SegmentReport};
pub use split::{kfold_split, vanilla_split, SplitIndexSets};
pub use window::{window_all, window_segment, Collapse, WindowParams, WindowedSample};

// data in / out
pub use cache::CacheStore;
pub use io::{RawRecording, StFile, StWriter};
pub use preprocess::{Preprocessor, ProcessedSeries, SpikeVelocity};

// façade
pub use dataset::{BuildReport, PrimateReaching};
