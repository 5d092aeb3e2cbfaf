//! The preprocessing collaborator: raw recording → aligned samples / labels.
//!
//! The dataset does not care how inputs and targets are derived, only that
//! both come back as `[rows, T]` arrays on a shared time axis.  Anything
//! implementing [`Preprocessor`] can be plugged in, including plain closures.
use anyhow::{ensure, Result};
use ndarray::{Array1, Array2, Axis};

use crate::io::RawRecording;

/// Inputs `[C, T]` and labels `[L, T]` on a shared time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSeries {
    samples: Array2<f32>,
    labels: Array2<f32>,
}

impl ProcessedSeries {
    /// Pair `samples` with `labels`; both must have the same column count.
    pub fn new(samples: Array2<f32>, labels: Array2<f32>) -> Result<Self> {
        ensure!(
            samples.ncols() == labels.ncols(),
            "samples have {} time steps but labels have {}",
            samples.ncols(),
            labels.ncols()
        );
        Ok(Self { samples, labels })
    }

    /// Caller guarantees equal column counts.
    pub(crate) fn from_aligned(samples: Array2<f32>, labels: Array2<f32>) -> Self {
        debug_assert_eq!(samples.ncols(), labels.ncols());
        Self { samples, labels }
    }

    pub fn samples(&self) -> &Array2<f32> {
        &self.samples
    }

    pub fn labels(&self) -> &Array2<f32> {
        &self.labels
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.samples.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (Array2<f32>, Array2<f32>) {
        (self.samples, self.labels)
    }
}

/// Turns a raw recording into a [`ProcessedSeries`].
pub trait Preprocessor {
    fn process(&self, raw: &RawRecording) -> Result<ProcessedSeries>;
}

impl<F> Preprocessor for F
where
    F: Fn(&RawRecording) -> Result<ProcessedSeries>,
{
    fn process(&self, raw: &RawRecording) -> Result<ProcessedSeries> {
        self(raw)
    }
}

/// Binned spike counts in, cursor velocity out.
///
/// * samples: `spikes` flattened to `[C, T]`; any sorted-unit axes between
///   the channel and time axes are summed away.
/// * labels:  `[2, T]` cursor velocity, `(pos[t+1] − pos[t]) / (t[t+1] − t[t])`.
///   The last column repeats the previous velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpikeVelocity;

impl Preprocessor for SpikeVelocity {
    fn process(&self, raw: &RawRecording) -> Result<ProcessedSeries> {
        let samples = collapse_units(raw)?;
        let labels = cursor_velocity(&raw.cursor_pos, &raw.t)?;
        ProcessedSeries::new(samples, labels)
    }
}

fn collapse_units(raw: &RawRecording) -> Result<Array2<f32>> {
    let spikes = &raw.spikes;
    ensure!(spikes.ndim() >= 2, "spikes must be at least 2-D, got rank {}", spikes.ndim());
    let mut out = spikes.to_owned();
    while out.ndim() > 2 {
        out = out.sum_axis(Axis(1));
    }
    Ok(out.into_dimensionality()?)
}

fn cursor_velocity(pos: &Array2<f32>, t: &Array1<f64>) -> Result<Array2<f32>> {
    let n_t = pos.ncols();
    ensure!(t.len() == n_t, "cursor_pos has {n_t} steps but t has {}", t.len());
    let mut vel = Array2::<f32>::zeros(pos.raw_dim());
    if n_t < 2 {
        return Ok(vel);
    }
    for i in 0..n_t - 1 {
        let dt = (t[i + 1] - t[i]) as f32;
        if dt == 0.0 {
            continue;
        }
        for r in 0..pos.nrows() {
            vel[[r, i]] = (pos[[r, i + 1]] - pos[[r, i]]) / dt;
        }
    }
    let last = vel.column(n_t - 2).to_owned();
    vel.column_mut(n_t - 1).assign(&last);
    Ok(vel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn recording(spikes: ndarray::ArrayD<f32>, n_t: usize) -> RawRecording {
        RawRecording {
            spikes,
            t: Array1::from_shape_fn(n_t, |i| i as f64 * 0.004),
            cursor_pos: Array2::from_shape_fn((2, n_t), |(r, t)| (r + 1) as f32 * t as f32),
            target_pos: Array2::zeros((2, n_t)),
        }
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(ProcessedSeries::new(Array2::zeros((4, 10)), Array2::zeros((2, 9))).is_err());
    }

    #[test]
    fn sorted_units_are_summed() {
        let spikes = Array3::from_elem((3, 4, 10), 1.0_f32).into_dyn();
        let out = SpikeVelocity.process(&recording(spikes, 10)).unwrap();
        assert_eq!(out.samples().dim(), (3, 10));
        assert!(out.samples().iter().all(|&v| v == 4.0));
    }

    #[test]
    fn velocity_is_position_slope() {
        let spikes = Array2::<f32>::zeros((2, 6)).into_dyn();
        let out = SpikeVelocity.process(&recording(spikes, 6)).unwrap();
        for &v in out.labels().row(0).iter() {
            approx::assert_abs_diff_eq!(v, 250.0, epsilon = 1e-2);
        }
        for &v in out.labels().row(1).iter() {
            approx::assert_abs_diff_eq!(v, 500.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn closures_are_preprocessors() {
        let p = |raw: &RawRecording| {
            let n = raw.n_times();
            ProcessedSeries::new(Array2::ones((1, n)), Array2::zeros((1, n)))
        };
        let out = p.process(&recording(Array2::<f32>::zeros((1, 5)).into_dyn(), 5)).unwrap();
        assert_eq!(out.len(), 5);
    }
}
