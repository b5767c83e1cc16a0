//! Intra-crystal breakage: splits a fraction of mono-crystals in each
//! size bin into two smaller bins (component C6).

use crate::math::break_patterns::BreakPatternTable;
use crate::math::discretization::DiscretizationTables;
use ndarray::Array3;

#[derive(Debug, Clone)]
pub struct IntraCbResult {
    pub residue: Vec<f64>,
    pub residue_count: Vec<u64>,
}

/// Runs one intra-crystal-breakage pass over every `(chem_state,
/// mineral)` plane of `mcg`. `p[m]` is mineral `m`'s selection
/// fraction; the floor/ceil alternation by step parity keeps the
/// long-run expected selection exactly `p[m]`.
pub fn intra_cb(
    mcg: &mut Array3<u64>,
    table: &BreakPatternTable,
    disc: &DiscretizationTables,
    p: &[f64],
    step: usize,
    n_minerals: usize,
) -> IntraCbResult {
    let (n_states, _, n_bins) = mcg.dim();
    let mut residue = vec![0.0f64; n_minerals];
    let mut residue_count = vec![0u64; n_minerals];
    let even_step = step % 2 == 0;

    for m in 0..n_minerals {
        for s in 0..n_states {
            let plane_sum: u64 = (0..n_bins).map(|k| mcg[[s, m, k]]).sum();
            if plane_sum == 0 {
                continue;
            }
            let threshold = disc.intra_cb_threshold_bin[[s, m]] + 5;
            if threshold >= n_bins {
                continue;
            }

            for k in threshold..n_bins {
                let count = mcg[[s, m, k]];
                if count == 0 {
                    continue;
                }
                let raw = count as f64 * p[m];
                let selected = if even_step { raw.floor() } else { raw.ceil() };
                let n_selected = (selected as u64).min(count);
                if n_selected == 0 {
                    continue;
                }

                mcg[[s, m, k]] -= n_selected;

                let events = table.get(m, s, k);
                let n_events = events.len() as u64;
                let q = n_selected / n_events;
                let r = n_selected % n_events;

                for (idx, event) in events.iter().enumerate() {
                    let c = if idx as u64 == n_events - 1 { q + r } else { q };
                    if c == 0 {
                        continue;
                    }
                    mcg[[s, m, event.left_bin]] += c;
                    if let Some(rb) = event.right_bin {
                        mcg[[s, m, rb]] += c;
                    }
                    residue[m] += event.residue_per_event * c as f64;
                    residue_count[m] += c;
                }
            }
        }
    }

    IntraCbResult {
        residue,
        residue_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bins::Bins;

    #[test]
    fn selection_is_subtracted_and_redistributed() {
        let bins = Bins::new();
        let disc = DiscretizationTables::new(&bins, 2, 1, &[0.01], &[1.0 / 256.0]);
        let table = BreakPatternTable::new(&bins, &disc, 1, 2);
        let mut mcg = Array3::<u64>::zeros((2, 1, bins.n_bins));
        mcg[[0, 0, 150]] = 100;

        let before: u64 = mcg.iter().sum();
        let result = intra_cb(&mut mcg, &table, &disc, &[1.0], 0, 1);
        let after: u64 = mcg.iter().sum();

        assert!(after >= before);
        assert!(result.residue_count[0] > 0);
    }

    #[test]
    fn bins_below_threshold_are_untouched() {
        let bins = Bins::new();
        let disc = DiscretizationTables::new(&bins, 2, 1, &[0.01], &[1.0 / 256.0]);
        let table = BreakPatternTable::new(&bins, &disc, 1, 2);
        let mut mcg = Array3::<u64>::zeros((2, 1, bins.n_bins));
        mcg[[0, 0, 0]] = 50;

        intra_cb(&mut mcg, &table, &disc, &[1.0], 0, 1);
        assert_eq!(mcg[[0, 0, 0]], 50);
    }
}
