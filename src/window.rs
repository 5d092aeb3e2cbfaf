//! Causal windowing of segments into fixed-size bins.
//!
//! A segment `[C, L]` becomes `floor(L / advance)` bins.  Bin `c` ends just
//! before column `c · advance`, the column its label is read from:
//!
//! ```text
//!            bin_width
//!        ┌───────────────┐
//!   … ───┼───────────────┼── columns
//!        c·adv−bw        c·adv (excluded)
//! ```
//!
//! While `c · advance < bin_width` there are not enough columns before
//! `c · advance` to fill a bin.  Those warm-up bins take columns
//! `[0, max(c · advance, 1))` into their leading steps and leave the rest
//! zero, so bin 0 holds column 0.
//!
//! Optionally each bin is reduced to `num_steps` sub-bins of
//! `bin_width / num_steps` columns, counted from the start of the bin.  The
//! newest `bin_width mod num_steps` steps do not fill a sub-bin and are
//! dropped.  Sub-bins are summed, then collapsed per [`Collapse`].
//!
//! Output: samples `[bins, steps, C]`, labels `[L, bins]`.
use log::debug;
use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::segment::Segment;

/// How the steps of a bin are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapse {
    /// Keep counts (rate-coded consumers).
    Sum,
    /// 1.0 if any spike occurred, else 0.0 (spiking consumers).
    AnySpike,
}

/// Windowing geometry in time steps.
///
/// `advance` and `bin_width` must be at least 1 and `bin_width >= advance`;
/// [`DatasetConfig::window_params`](crate::DatasetConfig::window_params)
/// only produces such values.  Hand-built values must do the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    /// Steps between consecutive bin ends.
    pub advance: usize,
    /// Steps per bin.
    pub bin_width: usize,
    /// Reduced step count per bin, if any.
    pub num_steps: Option<usize>,
    pub collapse: Collapse,
}

impl WindowParams {
    /// Steps along the second output axis.
    pub fn out_steps(&self) -> usize {
        match self.num_steps {
            Some(n) if n < self.bin_width => n,
            _ => self.bin_width,
        }
    }

    /// Number of bins produced from a segment of `len` steps.
    ///
    /// # Panics
    /// If `advance` is zero.
    pub fn n_bins(&self, len: usize) -> usize {
        assert!(self.advance > 0, "window advance must be at least one step");
        len / self.advance
    }
}

/// A windowed segment.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSample {
    /// `[bins, steps, channels]`
    pub samples: Array3<f32>,
    /// `[label_dim, bins]`
    pub labels: Array2<f32>,
}

impl WindowedSample {
    pub fn n_bins(&self) -> usize {
        self.samples.len_of(Axis(0))
    }
}

/// Window one segment.  `samples` is `[C, L]`, `labels` is `[D, L]`.
pub fn window_segment(
    samples: ArrayView2<f32>,
    labels: ArrayView2<f32>,
    p: &WindowParams,
) -> WindowedSample {
    let (n_ch, len) = samples.dim();
    let n_bins = p.n_bins(len);
    let bw = p.bin_width;

    // [C, bins, bw] while filling; permuted at the end.
    let mut binned = Array3::<f32>::zeros((n_ch, n_bins, bw));
    let mut out_labels = Array2::<f32>::zeros((labels.nrows(), n_bins));

    for c in 0..n_bins {
        let at = c * p.advance;
        let (start, end) = if at < bw { (0, at.max(1)) } else { (at - bw, at) };
        binned
            .slice_mut(s![.., c, ..end - start])
            .assign(&samples.slice(s![.., start..end]));
        out_labels.column_mut(c).assign(&labels.column(at));
    }

    let reduced = match p.num_steps {
        Some(n) if n < bw => sum_sub_bins(&binned, n),
        _ => binned,
    };
    let collapsed = match p.collapse {
        Collapse::Sum => reduced,
        Collapse::AnySpike => reduced.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
    };

    // [C, bins, steps] → [bins, steps, C]
    let samples = collapsed.permuted_axes([1, 2, 0]).as_standard_layout().into_owned();
    WindowedSample { samples, labels: out_labels }
}

/// Sum consecutive groups of `bw / n` steps into `n` sub-bins.
/// The newest `bw mod n` steps do not fill a group and are discarded.
fn sum_sub_bins(binned: &Array3<f32>, n: usize) -> Array3<f32> {
    let (n_ch, n_bins, bw) = binned.dim();
    let group = bw / n;
    let mut out = Array3::<f32>::zeros((n_ch, n_bins, n));
    for i in 0..n {
        let from = i * group;
        let summed = binned
            .slice(s![.., .., from..from + group])
            .sum_axis(Axis(2));
        out.slice_mut(s![.., .., i]).assign(&summed);
    }
    out
}

/// Window every segment of a `[C, T]` / `[D, T]` series.
pub fn window_all(
    samples: &Array2<f32>,
    labels: &Array2<f32>,
    segments: &[Segment],
    p: &WindowParams,
) -> Vec<WindowedSample> {
    let out: Vec<WindowedSample> = segments
        .iter()
        .map(|seg| {
            window_segment(
                samples.slice(s![.., seg.start..seg.end]),
                labels.slice(s![.., seg.start..seg.end]),
                p,
            )
        })
        .collect();
    if let Some(first) = out.first() {
        debug!(
            "windowed {} segments; first sample {:?}, labels {:?}",
            out.len(),
            first.samples.dim(),
            first.labels.dim()
        );
    }
    out
}
