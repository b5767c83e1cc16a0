//! Precomputed intra-crystal breakage patterns (component C4).
//!
//! For every `(mineral, chem-state, bin)` triple this precomputes the
//! small set of two-child bin pairs that approximately conserve the
//! parent crystal's volume, so that intra-crystal breakage (C6) reduces
//! to table lookups and integer bin arithmetic at simulation time.

use crate::math::discretization::DiscretizationTables;

/// One candidate way to split a crystal in `left_bin` (and a possible
/// `right_bin`) out of a parent bin, with the leftover volume that could
/// not be represented by either child bin.
#[derive(Debug, Clone, Copy)]
pub struct BreakEvent {
    pub left_bin: usize,
    /// `None` when the complementary child would be smaller than the
    /// smallest representable bin — the whole complementary volume is
    /// then residue and only `left_bin` receives a surviving crystal.
    pub right_bin: Option<usize>,
    pub residue_per_event: f64,
}

/// Maximum number of `(left_bin, right_bin)` candidates generated per
/// `(mineral, chem-state, bin)` triple. Bounds table-construction cost;
/// breakage only ever needs a handful of alternatives to spread load
/// across several bin pairs evenly.
const MAX_CANDIDATES: usize = 4;

#[derive(Debug, Clone)]
pub struct BreakPatternTable {
    /// Indexed `[mineral][chem_state][bin]`.
    patterns: Vec<Vec<Vec<Vec<BreakEvent>>>>,
}

impl BreakPatternTable {
    pub fn new(
        bins: &crate::core::bins::Bins,
        disc: &DiscretizationTables,
        n_minerals: usize,
        n_timesteps: usize,
    ) -> Self {
        let b = bins.n_bins;
        let mut patterns = Vec::with_capacity(n_minerals);

        for m in 0..n_minerals {
            let mut per_state = Vec::with_capacity(n_timesteps);
            for s in 0..n_timesteps {
                let mut per_bin = Vec::with_capacity(b);
                for k in 0..b {
                    per_bin.push(Self::build_events(bins, disc, m, s, k));
                }
                per_state.push(per_bin);
            }
            patterns.push(per_state);
        }

        Self { patterns }
    }

    fn build_events(
        bins: &crate::core::bins::Bins,
        disc: &DiscretizationTables,
        m: usize,
        s: usize,
        k: usize,
    ) -> Vec<BreakEvent> {
        let parent_vol = disc.volume_bins_medians_matrix[[s, m, k]];
        let mut events = Vec::with_capacity(MAX_CANDIDATES);

        for i in 0..MAX_CANDIDATES {
            if i + 1 > k {
                break;
            }
            let left_bin = k - 1 - i;
            let left_vol = disc.volume_bins_medians_matrix[[s, m, left_bin]];
            let target_right = parent_vol - left_vol;

            if target_right <= 0.0 {
                continue;
            }

            let right_bin = Self::floor_bin_for_volume(bins, disc, m, s, left_bin, target_right);

            let (right_bin, residue) = match right_bin {
                Some(rb) => {
                    let rb_vol = disc.volume_bins_medians_matrix[[s, m, rb]];
                    (Some(rb), (target_right - rb_vol).max(0.0))
                }
                None => (None, target_right),
            };

            events.push(BreakEvent {
                left_bin,
                right_bin,
                residue_per_event: residue,
            });
        }

        if events.is_empty() {
            // Degenerate fallback: the parent is too small to host any
            // two-child split under MAX_CANDIDATES offsets. Everything
            // becomes residue, no surviving crystal.
            events.push(BreakEvent {
                left_bin: k.saturating_sub(1),
                right_bin: None,
                residue_per_event: parent_vol,
            });
        }

        events
    }

    /// Largest bin index `<= max_bin` whose median volume at `(s, m)`
    /// does not exceed `target`, or `None` if even the smallest bin is
    /// too large.
    fn floor_bin_for_volume(
        _bins: &crate::core::bins::Bins,
        disc: &DiscretizationTables,
        m: usize,
        s: usize,
        max_bin: usize,
        target: f64,
    ) -> Option<usize> {
        if disc.volume_bins_medians_matrix[[s, m, 0]] > target {
            return None;
        }
        let mut best = 0usize;
        for k in 0..=max_bin {
            if disc.volume_bins_medians_matrix[[s, m, k]] <= target {
                best = k;
            } else {
                break;
            }
        }
        Some(best)
    }

    pub fn get(&self, mineral: usize, chem_state: usize, bin: usize) -> &[BreakEvent] {
        &self.patterns[mineral][chem_state][bin]
    }
}
