//! Interface-frequency construction and realization (component C3).
//!
//! Builds a directed mineral-pair frequency matrix from the crystal
//! counts per mineral, realizes it as a single long sequence of mineral
//! indices (the interface array), then corrects drift introduced by
//! rounding the frequency table.

use ndarray::Array2;
use rand::Rng;

/// Output of building and realizing the interface sequence for a parent
/// rock: one mineral index per crystal position, plus the resulting
/// symmetric-by-construction adjacency counts.
#[derive(Debug, Clone)]
pub struct InterfaceBuild {
    pub interface_array: Vec<u16>,
    pub interface_counts: Array2<i64>,
}

/// Predicted directed interface-frequency matrix `F[a,b] = round(p_a *
/// p_b * (N-1))`, corrected so `sum(F) == N-1` by adjusting `F[0,0]`.
pub fn predicted_frequencies(minerals_n: &[u64]) -> Array2<i64> {
    let m = minerals_n.len();
    let n: u64 = minerals_n.iter().sum();
    let n_minus_1 = n.saturating_sub(1) as f64;
    let p: Vec<f64> = minerals_n.iter().map(|&c| c as f64 / n as f64).collect();

    let mut f = Array2::<i64>::zeros((m, m));
    for a in 0..m {
        for b in 0..m {
            f[[a, b]] = (p[a] * p[b] * n_minus_1).round() as i64;
        }
    }

    let sum_f: i64 = f.iter().sum();
    let surplus = sum_f - n_minus_1 as i64;
    f[[0, 0]] -= surplus;

    f
}

/// As [`predicted_frequencies`], but driven by a supplied row-stochastic
/// interfacial-composition matrix (`composition[a,b] = P(b | a)`)
/// instead of deriving `p_b` from mineral counts alone.
pub fn predicted_frequencies_with_composition(
    minerals_n: &[u64],
    composition: &Array2<f64>,
) -> Array2<i64> {
    let m = minerals_n.len();
    let n: u64 = minerals_n.iter().sum();
    let n_minus_1 = n.saturating_sub(1) as f64;
    let p: Vec<f64> = minerals_n.iter().map(|&c| c as f64 / n as f64).collect();

    let mut f = Array2::<i64>::zeros((m, m));
    for a in 0..m {
        for b in 0..m {
            f[[a, b]] = (p[a] * composition[[a, b]] * n_minus_1).round() as i64;
        }
    }

    let sum_f: i64 = f.iter().sum();
    let surplus = sum_f - n_minus_1 as i64;
    f[[0, 0]] -= surplus;

    f
}

/// Realizes `interface_array` by walking `N` positions, drawing from row
/// `F[prev, ·]` at each step, and corrects drift against `minerals_n`.
pub fn build_interfaces(minerals_n: &[u64], rng: &mut impl Rng) -> InterfaceBuild {
    build_interfaces_from(predicted_frequencies(minerals_n), minerals_n, rng)
}

/// As [`build_interfaces`], but realizing a caller-supplied frequency
/// matrix (e.g. from [`predicted_frequencies_with_composition`]).
pub fn build_interfaces_from(
    mut f: Array2<i64>,
    minerals_n: &[u64],
    rng: &mut impl Rng,
) -> InterfaceBuild {
    let m = minerals_n.len();
    let n: u64 = minerals_n.iter().sum();

    let mut interface_array = Vec::with_capacity(n as usize);
    if n == 0 {
        return InterfaceBuild {
            interface_array,
            interface_counts: Array2::zeros((m, m)),
        };
    }

    interface_array.push(0u16);
    let mut prev = 0usize;
    for _ in 1..n {
        let row_sum: i64 = (0..m).map(|b| f[[prev, b]].max(0)).sum();
        let next = if row_sum > 0 {
            categorical_from_counts(&f, prev, row_sum, rng)
        } else {
            // Row exhausted: fall back to whichever mineral still has
            // any remaining frequency mass anywhere in the table.
            fallback_mineral(&f, m, rng)
        };
        f[[prev, next]] -= 1;
        interface_array.push(next as u16);
        prev = next;
    }

    let mut interface_counts = Array2::<i64>::zeros((m, m));
    for w in interface_array.windows(2) {
        interface_counts[[w[0] as usize, w[1] as usize]] += 1;
    }

    let mut build = InterfaceBuild {
        interface_array,
        interface_counts,
    };
    correct_drift(&mut build, minerals_n);
    build
}

fn categorical_from_counts(f: &Array2<i64>, row: usize, row_sum: i64, rng: &mut impl Rng) -> usize {
    let m = f.ncols();
    let u: f64 = rng.gen::<f64>() * row_sum as f64;
    let mut acc = 0.0;
    for b in 0..m {
        acc += f[[row, b]].max(0) as f64;
        if u < acc {
            return b;
        }
    }
    m - 1
}

fn fallback_mineral(f: &Array2<i64>, m: usize, rng: &mut impl Rng) -> usize {
    let totals: Vec<i64> = (0..m).map(|b| (0..m).map(|a| f[[a, b]].max(0)).sum()).collect();
    let total: i64 = totals.iter().sum();
    if total == 0 {
        return rng.gen_range(0..m);
    }
    let u = rng.gen::<f64>() * total as f64;
    let mut acc = 0.0;
    for (b, &t) in totals.iter().enumerate() {
        acc += t as f64;
        if u < acc {
            return b;
        }
    }
    m - 1
}

/// Corrects per-mineral count drift left over from rounding `F`.
fn correct_drift(build: &mut InterfaceBuild, minerals_n: &[u64]) {
    let m = minerals_n.len();
    let mut actual = vec![0i64; m];
    for &v in &build.interface_array {
        actual[v as usize] += 1;
    }

    for mineral in 0..m {
        let drift = actual[mineral] - minerals_n[mineral] as i64;
        if drift > 0 {
            for _ in 0..drift {
                remove_one_from_tail(build, mineral);
            }
        } else if drift < 0 {
            for _ in 0..(-drift) {
                append_one(build, mineral);
            }
        }
    }
}

fn remove_one_from_tail(build: &mut InterfaceBuild, mineral: usize) {
    let idx = match build.interface_array.iter().rposition(|&v| v as usize == mineral) {
        Some(idx) => idx,
        None => return,
    };
    let left = if idx > 0 {
        Some(build.interface_array[idx - 1] as usize)
    } else {
        None
    };
    let right = if idx + 1 < build.interface_array.len() {
        Some(build.interface_array[idx + 1] as usize)
    } else {
        None
    };

    if let Some(l) = left {
        build.interface_counts[[l, mineral]] -= 1;
    }
    if let Some(r) = right {
        build.interface_counts[[mineral, r]] -= 1;
    }
    if let (Some(l), Some(r)) = (left, right) {
        build.interface_counts[[l, r]] += 1;
    }
    build.interface_array.remove(idx);
}

fn append_one(build: &mut InterfaceBuild, mineral: usize) {
    if let Some(&last) = build.interface_array.last() {
        build.interface_counts[[last as usize, mineral]] += 1;
    }
    build.interface_array.push(mineral as u16);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::interface_rng;

    #[test]
    fn interface_count_matches_adjacency_sum() {
        let minerals_n = vec![50u64, 30, 20];
        let mut rng = interface_rng();
        let build = build_interfaces(&minerals_n, &mut rng);
        let total_pairs: i64 = build.interface_counts.iter().sum();
        assert_eq!(total_pairs as usize, build.interface_array.len() - 1);
    }

    #[test]
    fn post_correction_counts_match_minerals_n() {
        let minerals_n = vec![17u64, 41, 9];
        let mut rng = interface_rng();
        let build = build_interfaces(&minerals_n, &mut rng);
        let mut actual = vec![0u64; 3];
        for &v in &build.interface_array {
            actual[v as usize] += 1;
        }
        assert_eq!(actual, minerals_n);
    }

    #[test]
    fn predicted_frequencies_sum_to_n_minus_1() {
        let minerals_n = vec![10u64, 10, 10];
        let f = predicted_frequencies(&minerals_n);
        let sum: i64 = f.iter().sum();
        assert_eq!(sum, 29);
    }
}
