//! Interface selection probabilities (component C5): per-interface
//! constant weight (size / strength) combined with a location-in-pcg
//! weight at selection time.

use crate::core::bins::Bins;
use ndarray::Array2;

/// Precomputed location-weight ramps, keyed by pcg length, up to
/// `n_standard_cases`; longer pcgs compute their ramp on demand.
#[derive(Debug, Clone)]
pub struct LocationWeightTable {
    n_standard_cases: usize,
    table: Vec<Vec<f64>>,
}

impl LocationWeightTable {
    pub fn new(n_standard_cases: usize) -> Self {
        let table = (0..=n_standard_cases).map(location_weights).collect();
        Self {
            n_standard_cases,
            table,
        }
    }

    /// Location weights for a pcg of `pcg_len` crystals (`pcg_len - 1`
    /// interfaces). Empty for `pcg_len < 2`.
    pub fn weights_for(&self, pcg_len: usize) -> Vec<f64> {
        if pcg_len <= self.n_standard_cases {
            self.table[pcg_len].clone()
        } else {
            location_weights(pcg_len)
        }
    }
}

/// A symmetric descending-then-ascending ramp of `pcg_len - 1` weights,
/// peaking at both ends and troughing at the center. Built from
/// `divmod(pcg_len, 2)`: a descending run `size, size-1, ..., 1`
/// followed by an ascending run back up to `size`, which starts at `1`
/// (repeating the trough) when `pcg_len` is odd and at `2` when
/// `pcg_len` is even.
fn location_weights(pcg_len: usize) -> Vec<f64> {
    let size = pcg_len / 2;
    let corr = pcg_len % 2;
    let mut out: Vec<f64> = (1..=size).rev().map(|i| i as f64).collect();
    let ascending_start = if corr == 1 { 1 } else { 2 };
    if size >= ascending_start {
        out.extend((ascending_start..=size).map(|i| i as f64));
    }
    out
}

/// Row-normalized predicted interface proportion for directed pair
/// `(a, b)`.
pub fn strength_weight(predicted_frequencies: &Array2<i64>, a: usize, b: usize) -> f64 {
    let row_sum: i64 = (0..predicted_frequencies.ncols())
        .map(|c| predicted_frequencies[[a, c]].max(0))
        .sum();
    if row_sum == 0 {
        0.0
    } else {
        predicted_frequencies[[a, b]].max(0) as f64 / row_sum as f64
    }
}

/// Size weight: sum of the flanking crystals' median sizes.
pub fn size_weight(bins: &Bins, k_left: usize, k_right: usize) -> f64 {
    bins.size_bins_medians[k_left] + bins.size_bins_medians[k_right]
}

/// Constant per-interface probability weight `C = Z / S`.
pub fn constant_prob(size_weight: f64, strength_weight: f64) -> f64 {
    if strength_weight == 0.0 {
        0.0
    } else {
        size_weight / strength_weight
    }
}

/// Normalizes effective weights (`L .* C` if location is enabled, else
/// `C`) into a selection-probability vector. Empty input yields an empty
/// vector.
pub fn normalized_probs(location: Option<&[f64]>, constants: &[f64]) -> Vec<f64> {
    let effective: Vec<f64> = match location {
        Some(l) => l.iter().zip(constants).map(|(a, b)| a * b).collect(),
        None => constants.to_vec(),
    };
    let total: f64 = effective.iter().sum();
    if total <= 0.0 {
        let n = effective.len();
        if n == 0 {
            Vec::new()
        } else {
            vec![1.0 / n as f64; n]
        }
    } else {
        effective.iter().map(|w| w / total).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_has_correct_length_and_is_symmetric() {
        for pcg_len in 2..10 {
            let r = location_weights(pcg_len);
            let n = pcg_len - 1;
            assert_eq!(r.len(), n);
            for i in 0..n {
                assert!((r[i] - r[n - 1 - i]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn location_table_matches_on_demand_ramp() {
        let table = LocationWeightTable::new(16);
        for len in 2..20 {
            assert_eq!(table.weights_for(len), location_weights(len));
        }
    }

    #[test]
    fn even_pcg_lengths_match_ground_truth_divmod_construction() {
        assert_eq!(location_weights(4), vec![2.0, 1.0, 2.0]);
        assert_eq!(location_weights(6), vec![3.0, 2.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn odd_pcg_lengths_still_match_ground_truth() {
        assert_eq!(location_weights(5), vec![2.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn normalized_probs_sum_to_one() {
        let probs = normalized_probs(Some(&[2.0, 1.0, 2.0]), &[1.0, 1.0, 1.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }
}
