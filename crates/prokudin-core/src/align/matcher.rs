use rayon::prelude::*;

use super::features::Descriptor;

/// Below this many comparisons the search runs on the calling thread.
const PARALLEL_COMPARISONS: usize = 16_384;

/// A mutual nearest-neighbour pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorMatch {
    /// Index into the query descriptor set.
    pub query: usize,
    /// Index into the train descriptor set.
    pub train: usize,
    pub distance: u32,
}

#[inline]
pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Brute-force Hamming matching with cross-check.
///
/// A pair is kept only when each descriptor is the other's nearest
/// neighbour. Distance ties resolve to the lowest index. Output is ordered by
/// query index.
pub fn match_cross_checked(query: &[Descriptor], train: &[Descriptor]) -> Vec<DescriptorMatch> {
    if query.is_empty() || train.is_empty() {
        return Vec::new();
    }
    let parallel = query.len() * train.len() >= PARALLEL_COMPARISONS;
    let forward = nearest_all(query, train, parallel);
    let backward = nearest_all(train, query, parallel);

    forward
        .into_iter()
        .enumerate()
        .filter_map(|(q, (t, distance))| {
            (backward[t].0 == q).then_some(DescriptorMatch {
                query: q,
                train: t,
                distance,
            })
        })
        .collect()
}

fn nearest_all(from: &[Descriptor], to: &[Descriptor], parallel: bool) -> Vec<(usize, u32)> {
    if parallel {
        from.par_iter().map(|d| nearest(d, to)).collect()
    } else {
        from.iter().map(|d| nearest(d, to)).collect()
    }
}

fn nearest(d: &Descriptor, candidates: &[Descriptor]) -> (usize, u32) {
    let mut best = (0, u32::MAX);
    for (i, c) in candidates.iter().enumerate() {
        let dist = hamming(d, c);
        if dist < best.1 {
            best = (i, dist);
        }
    }
    best
}
