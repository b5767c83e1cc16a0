//! Chemical weathering of poly-crystalline grains (component C9).

use crate::analysis::probability::{constant_prob, size_weight, strength_weight};
use crate::core::bins::Bins;
use crate::core::state::{Pcg, ParentRockState};
use crate::math::discretization::DiscretizationTables;
use ndarray::Array2;

/// Residue produced by one chem-weathering pass over the pcg population,
/// per mineral.
#[derive(Debug, Clone)]
pub struct PcgChemResult {
    pub residue_1: Vec<f64>,
    pub residue_2: Vec<f64>,
}

/// Advances every crystal in every pcg by one chem-state, dissolving
/// crystals that fall below their new state's threshold, dropping
/// emptied pcgs, promoting length-1 survivors to mcgs, and rebuilding
/// `interface_counts` and each pcg's `interface_probs` from the
/// survivors. A no-op on step 0.
pub fn chem_pcg(
    state: &mut ParentRockState,
    bins: &Bins,
    disc: &DiscretizationTables,
    predicted_freq: &Array2<i64>,
    step: usize,
    n_minerals: usize,
) -> PcgChemResult {
    let mut residue_1 = vec![0.0f64; n_minerals];
    let mut residue_2 = vec![0.0f64; n_minerals];
    if step == 0 {
        return PcgChemResult { residue_1, residue_2 };
    }

    let n_timesteps = disc.negative_volume_thresholds.dim().0;
    let old_pcgs = std::mem::take(&mut state.pcgs);
    let mut new_pcgs = Vec::with_capacity(old_pcgs.len());
    let mut interface_counts = Array2::<i64>::zeros(state.interface_counts.dim());

    for pcg in old_pcgs {
        let n = pcg.len();
        let mut minerals = Vec::with_capacity(n);
        let mut crystal_sizes = Vec::with_capacity(n);
        let mut chem_states = Vec::with_capacity(n);

        for i in 0..n {
            let m = pcg.minerals[i] as usize;
            let old_state = pcg.chem_states[i] as usize;
            let new_state = (old_state + 1).min(n_timesteps - 1);
            let k = pcg.crystal_sizes[i] as usize;
            let threshold = disc.negative_volume_thresholds[[new_state, m]];

            if k < threshold {
                residue_1[m] += disc.volume_bins_medians_matrix[[old_state, m, k]];
            } else {
                residue_2[m] += disc.volume_change_matrix[[new_state, m, k]];
                minerals.push(m as u16);
                crystal_sizes.push(k as u16);
                chem_states.push(new_state as u16);
            }
        }

        match minerals.len() {
            0 => {}
            1 => {
                let singleton = Pcg {
                    minerals,
                    crystal_sizes,
                    chem_states,
                    interface_probs: Vec::new(),
                };
                state.promote_to_mcg(&singleton);
            }
            len => {
                let mut interface_probs = Vec::with_capacity(len - 1);
                for i in 0..len - 1 {
                    let a = minerals[i] as usize;
                    let b = minerals[i + 1] as usize;
                    interface_counts[[a, b]] += 1;
                    let s_w = strength_weight(predicted_freq, a, b);
                    let z_w = size_weight(bins, crystal_sizes[i] as usize, crystal_sizes[i + 1] as usize);
                    interface_probs.push(constant_prob(z_w, s_w));
                }
                new_pcgs.push(Pcg {
                    minerals,
                    crystal_sizes,
                    chem_states,
                    interface_probs,
                });
            }
        }
    }

    state.pcgs = new_pcgs;
    state.interface_counts = interface_counts;
    PcgChemResult { residue_1, residue_2 }
}
