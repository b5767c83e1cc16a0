//! Inter-crystal breakage: selects one (or, with multi-pcg breakage
//! enabled, several) interface per pcg and splits it there (component
//! C7).

use crate::analysis::probability::{normalized_probs, LocationWeightTable};
use crate::core::state::{Pcg, ParentRockState};
use crate::rng::step_rng;
use rand::Rng;

/// Runs one inter-crystal-breakage pass: every pcg of length `>= 2`
/// draws one uniform (seeded by `step`) and splits at the interface it
/// selects. Fragments of length 1 are promoted directly to mcgs.
pub fn inter_cb(
    state: &mut ParentRockState,
    location_table: Option<&LocationWeightTable>,
    enable_multi_pcg_breakage: bool,
    step: usize,
) {
    let mut rng = step_rng(step);
    let old_pcgs = std::mem::take(&mut state.pcgs);
    let mut new_pcgs = Vec::with_capacity(old_pcgs.len());

    for pcg in old_pcgs {
        if pcg.len() < 2 {
            new_pcgs.push(pcg);
            continue;
        }

        let location = location_table.map(|t| t.weights_for(pcg.len()));
        let probs = normalized_probs(location.as_deref(), &pcg.interface_probs);

        let u: f64 = rng.gen();
        let mut cumsum = 0.0;
        // Matches numpy's `argmax` on an all-False comparison array,
        // which returns index 0: if no prefix sum exceeds `u`, fall back
        // to the first interface rather than the last.
        let mut selected = 0;
        let mut selected_prob = probs[0];
        for (i, &p) in probs.iter().enumerate() {
            cumsum += p;
            if u < cumsum {
                selected = i;
                selected_prob = p;
                break;
            }
        }

        let mut split_points = vec![selected + 1];
        if enable_multi_pcg_breakage {
            for (i, &p) in probs.iter().enumerate() {
                if i != selected && p > selected_prob {
                    split_points.push(i + 1);
                }
            }
            split_points.sort_unstable();
            split_points.dedup();
        }

        for &p in &split_points {
            let a = pcg.minerals[p - 1] as usize;
            let b = pcg.minerals[p] as usize;
            state.interface_counts[[a, b]] -= 1;
        }

        let mut bounds = vec![0usize];
        bounds.extend(split_points.iter().copied());
        bounds.push(pcg.len());

        for w in bounds.windows(2) {
            let (start, end) = (w[0], w[1]);
            if start == end {
                continue;
            }
            let fragment = Pcg {
                minerals: pcg.minerals[start..end].to_vec(),
                crystal_sizes: pcg.crystal_sizes[start..end].to_vec(),
                chem_states: pcg.chem_states[start..end].to_vec(),
                interface_probs: if end > start + 1 {
                    pcg.interface_probs[start..end - 1].to_vec()
                } else {
                    Vec::new()
                },
            };
            if fragment.len() == 1 {
                state.promote_to_mcg(&fragment);
            } else {
                new_pcgs.push(fragment);
            }
        }
    }

    state.pcgs = new_pcgs;
}
