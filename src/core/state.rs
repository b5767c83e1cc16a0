//! Parent-rock state: pcgs, mcgs, and the interface-count matrix that
//! must stay consistent with them.

use ndarray::{Array2, Array3};

/// A poly-crystalline grain: an ordered sequence of crystals sharing one
/// bag, each with a mineral, a size bin, and a chem-state, plus the
/// per-interface constant probability weight between consecutive
/// crystals.
#[derive(Debug, Clone)]
pub struct Pcg {
    pub minerals: Vec<u16>,
    pub crystal_sizes: Vec<u16>,
    pub chem_states: Vec<u16>,
    /// Length `minerals.len() - 1`; the constant weight `C = Z / S` for
    /// each interface.
    pub interface_probs: Vec<f64>,
}

impl Pcg {
    pub fn len(&self) -> usize {
        self.minerals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minerals.is_empty()
    }

    /// `true` once a pcg has been reduced to a single crystal and must
    /// be promoted to an mcg and dropped.
    pub fn is_single_crystal(&self) -> bool {
        self.minerals.len() == 1
    }
}

/// The full mutable state the orchestrator steps forward: pcgs, the
/// mono-crystal population, and the adjacency matrix they induce.
#[derive(Debug, Clone)]
pub struct ParentRockState {
    pub pcgs: Vec<Pcg>,
    /// `[a, b]`: count of directed adjacent mineral pairs across all
    /// pcgs.
    pub interface_counts: Array2<i64>,
    /// `[chem_state, mineral, bin]`.
    pub mcg: Array3<u64>,
}

impl ParentRockState {
    pub fn new(n_minerals: usize, n_timesteps: usize, n_bins: usize) -> Self {
        Self {
            pcgs: Vec::new(),
            interface_counts: Array2::zeros((n_minerals, n_minerals)),
            mcg: Array3::zeros((n_timesteps, n_minerals, n_bins)),
        }
    }

    /// Total crystals currently held in pcgs.
    pub fn pcg_crystal_count(&self) -> u64 {
        self.pcgs.iter().map(|p| p.len() as u64).sum()
    }

    /// Total mono-crystals across every `(state, mineral, bin)` slot.
    pub fn mcg_crystal_count(&self) -> u64 {
        self.mcg.iter().sum()
    }

    /// Moves a pcg's single surviving crystal into the mcg population at
    /// its current chem-state and bin.
    pub fn promote_to_mcg(&mut self, pcg: &Pcg) {
        debug_assert_eq!(pcg.len(), 1);
        let s = pcg.chem_states[0] as usize;
        let m = pcg.minerals[0] as usize;
        let k = pcg.crystal_sizes[0] as usize;
        self.mcg[[s, m, k]] += 1;
    }

    /// Drops every pcg that has been reduced to zero crystals, and
    /// promotes every single-crystal pcg to the mcg population.
    pub fn reap_pcgs(&mut self) {
        let mut kept = Vec::with_capacity(self.pcgs.len());
        for pcg in std::mem::take(&mut self.pcgs) {
            if pcg.is_empty() {
                continue;
            }
            if pcg.is_single_crystal() {
                self.promote_to_mcg(&pcg);
            } else {
                kept.push(pcg);
            }
        }
        self.pcgs = kept;
    }

    /// Total adjacency count equals the sum of `(pcg.len() - 1)` over all
    /// pcgs.
    pub fn interface_count_consistent(&self) -> bool {
        let expected: i64 = self
            .pcgs
            .iter()
            .map(|p| p.len().saturating_sub(1) as i64)
            .sum();
        let actual: i64 = self.interface_counts.iter().sum();
        actual == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pcg(minerals: Vec<u16>) -> Pcg {
        let n = minerals.len();
        Pcg {
            minerals,
            crystal_sizes: vec![0; n],
            chem_states: vec![0; n],
            interface_probs: vec![1.0; n.saturating_sub(1)],
        }
    }

    #[test]
    fn reap_promotes_singletons_and_drops_empties() {
        let mut state = ParentRockState::new(2, 3, 4);
        state.pcgs.push(make_pcg(vec![0, 1, 0]));
        state.pcgs.push(make_pcg(vec![1]));
        state.pcgs.push(make_pcg(vec![]));
        state.reap_pcgs();

        assert_eq!(state.pcgs.len(), 1);
        assert_eq!(state.mcg[[0, 1, 0]], 1);
    }

    #[test]
    fn interface_count_consistency_holds_for_fresh_state() {
        let mut state = ParentRockState::new(2, 1, 4);
        state.pcgs.push(make_pcg(vec![0, 1, 0]));
        state.interface_counts[[0, 1]] = 1;
        state.interface_counts[[1, 0]] = 1;
        assert!(state.interface_count_consistent());
    }
}
