//! Mineral indexing and per-mineral property broadcasting.

use crate::error::{Result, SedGenError};

/// Index into the canonical mineral order, fixed once at construction
/// and used everywhere a mineral needs to be named.
pub type MineralId = u16;

/// Broadcasts a construction-time property: given as a single value it
/// applies to every mineral class; given per-mineral it must match
/// `n_minerals` exactly.
pub fn broadcast_or_validate(values: &[f64], n_minerals: usize, field: &str) -> Result<Vec<f64>> {
    match values.len() {
        1 => Ok(vec![values[0]; n_minerals]),
        n if n == n_minerals => Ok(values.to_vec()),
        other => Err(SedGenError::InvalidInput(format!(
            "{field} must have length 1 or {n_minerals}, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasts_single_value() {
        let out = broadcast_or_validate(&[0.5], 3, "intra_cb_p").unwrap();
        assert_eq!(out, vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn accepts_full_length() {
        let out = broadcast_or_validate(&[0.1, 0.2, 0.3], 3, "intra_cb_p").unwrap();
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn rejects_mismatched_length() {
        let err = broadcast_or_validate(&[0.1, 0.2], 3, "intra_cb_p").unwrap_err();
        assert!(matches!(err, SedGenError::InvalidInput(_)));
    }
}
