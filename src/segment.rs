//! Segments: half-open `[start, end)` ranges between consecutive boundaries.
//!
//! Boundaries `b₀ < b₁ < … < bₙ₋₁` give `n − 1` segments
//! `[b₀, b₁), [b₁, b₂), …`.  Abnormally long segments (missed or aborted
//! trials) are removed by [`filter_by_length`]; they are dropped whole, never
//! truncated.
use log::{info, warn};

/// A half-open index range into the processed series' time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Segment counts around a filtering step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentReport {
    pub before: usize,
    pub after: usize,
}

impl SegmentReport {
    #[inline]
    pub fn dropped(&self) -> usize {
        self.before - self.after
    }
}

/// Pair up consecutive boundaries.  Fewer than two boundaries → no segments.
pub fn build_segments(boundaries: &[usize]) -> Vec<Segment> {
    boundaries
        .windows(2)
        .map(|w| Segment { start: w[0], end: w[1] })
        .collect()
}

/// Keep segments strictly shorter than `max_len`, preserving order.
pub fn filter_by_length(segments: Vec<Segment>, max_len: usize) -> (Vec<Segment>, SegmentReport) {
    let before = segments.len();
    let kept: Vec<Segment> = segments.into_iter().filter(|s| s.len() < max_len).collect();
    let report = SegmentReport { before, after: kept.len() };
    info!(
        "segments: {} before length filter, {} after (max_segment_len = {max_len})",
        report.before, report.after
    );
    (kept, report)
}

/// Drop segments reaching past `series_len`.
///
/// After delay compensation the series is shorter than the one the
/// boundaries were detected on; tail segments may no longer fit.  They are
/// removed and reported rather than clamped.
pub fn drop_overruns(segments: Vec<Segment>, series_len: usize) -> (Vec<Segment>, SegmentReport) {
    let before = segments.len();
    let kept: Vec<Segment> = segments.into_iter().filter(|s| s.end <= series_len).collect();
    let report = SegmentReport { before, after: kept.len() };
    if report.dropped() > 0 {
        warn!(
            "{} segment(s) end past the delayed series (len {series_len}) and were dropped",
            report.dropped()
        );
    }
    (kept, report)
}
