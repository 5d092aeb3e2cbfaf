//! Train / validation / test assignment of segment positions.
//!
//! Two policies:
//!
//! * [`vanilla_split`]: the segment list is cut into four equal contiguous
//!   chunks and every chunk is split train → val → test by ratio, so each
//!   split draws from the whole session instead of one block of it.
//! * [`kfold_split`]: shuffled k-fold.  Each fold's held-out positions are
//!   halved: the first half validates, the second half tests.
//!
//! Both return positions into the segment list, never data.
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::ConfigError;

/// Number of contiguous chunks used by [`vanilla_split`].
pub const VANILLA_CHUNKS: usize = 4;

/// Segment positions per split.  The three sets are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitIndexSets {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndexSets {
    /// Total positions across all three sets.
    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}

/// Four-chunk contiguous split.
///
/// With `n` segments each chunk holds `S = ⌊n / 4⌋`.  The trailing `n mod 4`
/// segments belong to no split.  Inside a chunk the first `⌊ratio · S⌋`
/// (at most `S`, at least 0) go to train, the next `⌊(S − train) / 2⌋` to validation, the rest to test.
pub fn vanilla_split(n_segments: usize, train_ratio: f64) -> SplitIndexSets {
    let chunk = n_segments / VANILLA_CHUNKS;
    let train_len = ((train_ratio * chunk as f64).floor() as usize).min(chunk);
    let val_len = (chunk - train_len) / 2;

    let mut sets = SplitIndexSets::default();
    for c in 0..VANILLA_CHUNKS {
        let base = c * chunk;
        sets.train.extend(base..base + train_len);
        sets.val.extend(base + train_len..base + train_len + val_len);
        sets.test.extend(base + train_len + val_len..base + chunk);
    }

    let leftover = n_segments - VANILLA_CHUNKS * chunk;
    if leftover > 0 {
        debug!("vanilla split: {leftover} trailing segment(s) not assigned to any split");
    }
    debug!(
        "vanilla split: chunk={chunk} train={} val={} test={}",
        sets.train.len(),
        sets.val.len(),
        sets.test.len()
    );
    sets
}

/// Shuffled k-fold split over positions `0..n_segments`.
///
/// Positions are shuffled with `rng` and cut into `folds` consecutive groups;
/// the first `n mod folds` groups get one extra position.  For fold `k` the
/// held-out group (sorted) is bisected into val / test and every other
/// position (sorted) trains.
///
/// An empty segment list yields `folds` empty triples.  Otherwise fails when
/// the partition cannot produce exactly `folds` folds.
pub fn kfold_split<R: Rng + ?Sized>(
    n_segments: usize,
    folds: usize,
    rng: &mut R,
) -> Result<Vec<SplitIndexSets>, ConfigError> {
    if folds < 2 {
        return Err(ConfigError::TooFewFolds(folds));
    }
    if n_segments == 0 {
        debug!("k-fold split: no segments, {folds} empty folds");
        return Ok(vec![SplitIndexSets::default(); folds]);
    }
    if folds > n_segments {
        return Err(ConfigError::FoldCount { requested: folds, segments: n_segments });
    }

    let mut order: Vec<usize> = (0..n_segments).collect();
    order.shuffle(rng);

    let base = n_segments / folds;
    let extra = n_segments % folds;
    let mut out = Vec::with_capacity(folds);
    let mut start = 0;
    for k in 0..folds {
        let size = base + usize::from(k < extra);
        let mut held: Vec<usize> = order[start..start + size].to_vec();
        held.sort_unstable();

        let mut is_held = vec![false; n_segments];
        for &i in &held {
            is_held[i] = true;
        }
        let train: Vec<usize> = (0..n_segments).filter(|&i| !is_held[i]).collect();

        let half = held.len() / 2;
        let test = held.split_off(half);
        out.push(SplitIndexSets { train, val: held, test });
        start += size;
    }

    debug!("k-fold split: {folds} folds over {n_segments} segments");
    Ok(out)
}
