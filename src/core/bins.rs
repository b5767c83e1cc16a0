//! Logarithmic size/volume bins (component C1).
//!
//! Crystal sizes are tracked as indices into a geometric sequence rather
//! than raw floats, so that downstream breakage and chemical-weathering
//! operators become table lookups and integer addition instead of
//! floating-point arithmetic.

use ndarray::Array1;
use std::f64::consts::PI;

/// Number of logarithmic size/volume bins.
///
/// The bin count is otherwise unconstrained; this crate fixes it to span
/// the same truncation range as the crystal-size distribution
/// (`[1/256, 30]` mm) so that a crystal sampled at either truncation
/// boundary always lands inside a valid bin. See DESIGN.md.
pub const N_BINS: usize = 200;

/// Truncated-lognormal CSD bounds, in millimeters.
pub const TRUNC_LEFT_MM: f64 = 1.0 / 256.0;
pub const TRUNC_RIGHT_MM: f64 = 30.0;

/// Volume of a sphere with the given linear size (diameter), `c = pi/6`.
pub fn sphere_volume(size: f64) -> f64 {
    (PI / 6.0) * size.powi(3)
}

/// Paired size/volume bin axes plus their medians, including an
/// extended median table used by intra-crystal breakage to reach
/// "negative" bins.
#[derive(Debug, Clone)]
pub struct Bins {
    pub n_bins: usize,
    /// Bin edges, length `n_bins + 1`.
    pub size_bins: Array1<f64>,
    pub volume_bins: Array1<f64>,
    /// Per-bin representative values, length `n_bins`.
    pub size_bins_medians: Array1<f64>,
    pub volume_bins_medians: Array1<f64>,
    /// Extended median table covering signed bin offsets `[-n_bins,
    /// n_bins)`, indexed as `search_volume_bins_medians[k + n_bins]`.
    pub search_volume_bins_medians: Array1<f64>,
    ratio: f64,
}

impl Bins {
    pub fn new() -> Self {
        Self::with_bounds(N_BINS, TRUNC_LEFT_MM, TRUNC_RIGHT_MM)
    }

    pub fn with_bounds(n_bins: usize, trunc_left: f64, trunc_right: f64) -> Self {
        let ratio = (trunc_right / trunc_left).powf(1.0 / n_bins as f64);

        let size_at = |k: i64| trunc_left * ratio.powi(k as i32);

        let size_bins: Array1<f64> = (0..=n_bins).map(|k| size_at(k as i64)).collect();
        let volume_bins: Array1<f64> = size_bins.mapv(sphere_volume);

        let size_bins_medians: Array1<f64> = (0..n_bins)
            .map(|k| (size_bins[k] * size_bins[k + 1]).sqrt())
            .collect();
        let volume_bins_medians: Array1<f64> = size_bins_medians.mapv(sphere_volume);

        let search_volume_bins_medians: Array1<f64> = (-(n_bins as i64)..n_bins as i64)
            .map(|k| {
                let lo = size_at(k);
                let hi = size_at(k + 1);
                sphere_volume((lo * hi).sqrt())
            })
            .collect();

        Self {
            n_bins,
            size_bins,
            volume_bins,
            size_bins_medians,
            volume_bins_medians,
            search_volume_bins_medians,
            ratio,
        }
    }

    /// Geometric ratio between consecutive bin edges.
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Bins a volume via `searchsorted(volume_bins, v) - 1`, clamping
    /// both underflow (v below the smallest bin) and overflow to bin 0
    /// via unsigned wraparound.
    pub fn bin_of_volume(&self, v: f64) -> usize {
        let pos = self
            .volume_bins
            .as_slice()
            .unwrap()
            .partition_point(|&edge| edge <= v);
        if pos == 0 {
            0
        } else {
            let idx = pos - 1;
            if idx >= self.n_bins {
                0
            } else {
                idx
            }
        }
    }

    /// Looks up the extended median table at signed bin offset `k`.
    pub fn search_median(&self, k: i64) -> f64 {
        let idx = (k + self.n_bins as i64) as usize;
        self.search_volume_bins_medians[idx]
    }
}

impl Default for Bins {
    fn default() -> Self {
        Self::new()
    }
}
