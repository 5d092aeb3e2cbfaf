/// Shared helpers: synthetic reaching recordings.
use ndarray::{Array1, Array2};
use reachprep::{DatasetConfig, PipelinePlan, RawRecording};

/// Target position `[2, n_t]` that takes a new value at each column in
/// `changes`.  Boundaries land one column earlier.
#[allow(unused)]
pub fn target_with_changes(n_t: usize, changes: &[usize]) -> Array2<f32> {
    Array2::from_shape_fn((2, n_t), |(r, t)| {
        let k = changes.iter().filter(|&&c| c <= t).count() as f32;
        if r == 0 { k } else { -k * 0.5 }
    })
}

/// A recording with `n_ch` channels of sparse spike counts.
#[allow(unused)]
pub fn recording(n_ch: usize, n_t: usize, changes: &[usize]) -> RawRecording {
    let spikes = Array2::from_shape_fn((n_ch, n_t), |(c, t)| {
        if (c * 7 + t * 3) % 5 == 0 { 1.0_f32 } else { 0.0 }
    });
    RawRecording {
        spikes: spikes.into_dyn(),
        t: Array1::from_shape_fn(n_t, |i| i as f64 * 0.004),
        cursor_pos: Array2::from_shape_fn((2, n_t), |(r, t)| (r as f32 + 1.0) * (t as f32 * 0.01).sin()),
        target_pos: target_with_changes(n_t, changes),
    }
}

/// Changes every `every` columns: `n_t / every − 1` changes.
#[allow(unused)]
pub fn regular_changes(n_t: usize, every: usize) -> Vec<usize> {
    (1..n_t / every).map(|k| k * every).collect()
}

#[allow(unused)]
pub fn plan(cfg: DatasetConfig) -> PipelinePlan {
    cfg.resolve().expect("valid test config")
}

#[allow(unused)]
/// Whether `sets` are pairwise disjoint and their union is exactly `0..n`.
pub fn is_partition(sets: &[&Vec<usize>], n: usize) -> bool {
    let mut seen = vec![false; n];
    for s in sets {
        for &i in s.iter() {
            if i >= n || seen[i] {
                return false;
            }
            seen[i] = true;
        }
    }
    seen.into_iter().all(|v| v)
}
