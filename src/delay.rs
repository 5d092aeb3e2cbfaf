//! Biological delay compensation.
//!
//! `samples`: [C, T] → [C, T − d] (last `d` columns dropped)
//! `labels`:  [L, T] → [L, T − d] (first `d` columns dropped)
//!
//! After the shift, input column `i` is paired with the label originally
//! recorded at `i + d`.
use log::info;
use ndarray::s;

use crate::preprocess::ProcessedSeries;

/// Shift labels `delay` steps ahead of the inputs.  `delay == 0` is a no-op;
/// a delay covering the whole series leaves zero columns.
pub fn apply_delay(series: ProcessedSeries, delay: usize) -> ProcessedSeries {
    if delay == 0 {
        return series;
    }
    let n_t = series.len();
    let keep = n_t.saturating_sub(delay);
    info!("applying biological delay of {delay} steps ({n_t} → {keep} columns)");

    let (samples, labels) = series.into_parts();
    let samples = samples.slice(s![.., ..keep]).to_owned();
    let labels = labels.slice(s![.., n_t - keep..]).to_owned();
    ProcessedSeries::from_aligned(samples, labels)
}
