//! Chemical-weathering discretization tables.
//!
//! These tables let chemical weathering move a crystal's chem-state
//! index forward without recomputing geometry: the volume a bin
//! represents at chem-state `s` is precomputed for every `(s, mineral,
//! bin)` once at model construction.

use crate::core::bins::{sphere_volume, Bins};
use ndarray::Array2;
use ndarray::Array3;

/// Per-`(chem_state, mineral, bin)` derived quantities used by chemical
/// weathering and intra-crystal breakage.
#[derive(Debug, Clone)]
pub struct DiscretizationTables {
    /// Median volume of bin `k` at chem-state `s`, mineral `m`.
    pub volume_bins_medians_matrix: Array3<f64>,
    /// Volume dissolved advancing a crystal from state `s-1` to `s`;
    /// index 0 along the state axis is unused (zero).
    pub volume_change_matrix: Array3<f64>,
    /// Smallest bin index at state `s-1` whose advanced volume (at state
    /// `s`) is still positive. Bins below this threshold are dissolved
    /// outright by chemical weathering.
    pub negative_volume_thresholds: Array2<usize>,
    /// Smallest bin index at `(s, m)` above which intra-crystal breakage
    /// is permitted to act, derived from `intra_cb_thresholds`.
    pub intra_cb_threshold_bin: Array2<usize>,
}

impl DiscretizationTables {
    pub fn new(
        bins: &Bins,
        n_timesteps: usize,
        n_minerals: usize,
        chem_weath_rates: &[f64],
        intra_cb_thresholds: &[f64],
    ) -> Self {
        let b = bins.n_bins;
        let mut volume_bins_medians_matrix = Array3::<f64>::zeros((n_timesteps, n_minerals, b));
        let mut volume_change_matrix = Array3::<f64>::zeros((n_timesteps, n_minerals, b));
        let mut negative_volume_thresholds = Array2::<usize>::zeros((n_timesteps, n_minerals));
        let mut intra_cb_threshold_bin = Array2::<usize>::zeros((n_timesteps, n_minerals));

        for m in 0..n_minerals {
            let rate = chem_weath_rates[m];
            for s in 0..n_timesteps {
                for k in 0..b {
                    let shrunk = (bins.size_bins_medians[k] - s as f64 * rate).max(0.0);
                    volume_bins_medians_matrix[[s, m, k]] = sphere_volume(shrunk);
                }
            }
        }

        for m in 0..n_minerals {
            for s in 1..n_timesteps {
                for k in 0..b {
                    let prev = volume_bins_medians_matrix[[s - 1, m, k]];
                    let next = volume_bins_medians_matrix[[s, m, k]];
                    volume_change_matrix[[s, m, k]] = (prev - next).max(0.0);
                }

                let threshold = (0..b)
                    .find(|&k| volume_bins_medians_matrix[[s, m, k]] > 0.0)
                    .unwrap_or(b);
                negative_volume_thresholds[[s, m]] = threshold;
            }
        }

        for m in 0..n_minerals {
            let threshold_volume = sphere_volume(intra_cb_thresholds[m]);
            for s in 0..n_timesteps {
                let threshold = (0..b)
                    .find(|&k| volume_bins_medians_matrix[[s, m, k]] >= threshold_volume)
                    .unwrap_or(b);
                intra_cb_threshold_bin[[s, m]] = threshold;
            }
        }

        Self {
            volume_bins_medians_matrix,
            volume_change_matrix,
            negative_volume_thresholds,
            intra_cb_threshold_bin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volumes_shrink_with_chem_state() {
        let bins = Bins::new();
        let tables = DiscretizationTables::new(&bins, 5, 1, &[0.01], &[1.0 / 256.0]);
        for k in 0..bins.n_bins {
            assert!(
                tables.volume_bins_medians_matrix[[1, 0, k]]
                    <= tables.volume_bins_medians_matrix[[0, 0, k]]
            );
        }
    }

    #[test]
    fn negative_volume_threshold_is_monotonic_in_state() {
        let bins = Bins::new();
        let tables = DiscretizationTables::new(&bins, 10, 1, &[0.05], &[1.0 / 256.0]);
        let mut last = 0;
        for s in 1..10 {
            let t = tables.negative_volume_thresholds[[s, 0]];
            assert!(t >= last, "threshold should not decrease with state");
            last = t;
        }
    }
}
