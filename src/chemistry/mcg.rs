//! Chemical weathering of mono-crystalline grains (component C8).

use crate::math::discretization::DiscretizationTables;
use ndarray::Array3;

/// Residue produced by one chem-weathering pass over the mcg population,
/// per mineral.
#[derive(Debug, Clone)]
pub struct McgChemResult {
    pub residue: Vec<f64>,
    pub residue_count: Vec<u64>,
    /// `true` if any crystal rolled past the last chem-state and had to
    /// be folded back and a warning raised.
    pub exhausted: bool,
}

/// Shifts the chem-state axis forward by one (`mcg[s] <- mcg[s-1]`,
/// circularly), dissolving crystals that fall below their mineral's
/// negative-volume threshold and tallying shrinkage residue for
/// survivors. Crystals already at the last chem-state wrap
/// into slot 0 and are folded back into the last slot, raising
/// `exhausted`.
pub fn chem_mcg(
    mcg: &mut Array3<u64>,
    disc: &DiscretizationTables,
    n_minerals: usize,
) -> McgChemResult {
    let (n_states, _, n_bins) = mcg.dim();
    let mut residue = vec![0.0f64; n_minerals];
    let mut residue_count = vec![0u64; n_minerals];

    let mut shifted = Array3::<u64>::zeros((n_states, n_minerals, n_bins));
    for m in 0..n_minerals {
        for k in 0..n_bins {
            shifted[[0, m, k]] = mcg[[n_states - 1, m, k]];
            for s in 1..n_states {
                shifted[[s, m, k]] = mcg[[s - 1, m, k]];
            }
        }
    }

    for m in 0..n_minerals {
        for s in 1..n_states {
            for k in 0..n_bins {
                let count = shifted[[s, m, k]];
                if count == 0 {
                    continue;
                }
                let threshold = disc.negative_volume_thresholds[[s, m]];
                if k < threshold {
                    let vol = disc.volume_bins_medians_matrix[[s - 1, m, k]];
                    residue[m] += vol * count as f64;
                    residue_count[m] += count;
                    shifted[[s, m, k]] = 0;
                } else {
                    residue[m] += disc.volume_change_matrix[[s, m, k]] * count as f64;
                }
            }
        }
    }

    let mut exhausted = false;
    for m in 0..n_minerals {
        for k in 0..n_bins {
            let wrapped = shifted[[0, m, k]];
            if wrapped > 0 {
                exhausted = true;
                shifted[[n_states - 1, m, k]] += wrapped;
                shifted[[0, m, k]] = 0;
            }
        }
    }

    *mcg = shifted;
    McgChemResult {
        residue,
        residue_count,
        exhausted,
    }
}
