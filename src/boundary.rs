//! Trial boundary detection.
//!
//! A new trial starts whenever the target moves.  For each coordinate row of
//! `target_pos` ([2, T]) the first difference is taken along time; index `i`
//! is a boundary when any row satisfies `target[r, i + 1] != target[r, i]`.
//! The final column has no successor and is never a boundary.
use ndarray::{Array2, Axis};

/// Sorted, de-duplicated indices immediately preceding a target change.
///
/// Inputs shorter than two columns have no differences and yield an empty set.
pub fn detect_boundaries(target_pos: &Array2<f32>) -> Vec<usize> {
    let n_t = target_pos.ncols();
    if n_t < 2 {
        return vec![];
    }

    (0..n_t - 1)
        .filter(|&i| {
            target_pos
                .axis_iter(Axis(0))
                .any(|row| row[i + 1] != row[i])
        })
        .collect()
}
