//! Model construction and the per-step orchestrator (component C10).

use crate::analysis::probability::{constant_prob, size_weight, strength_weight, LocationWeightTable};
use crate::chemistry::mcg::chem_mcg;
use crate::chemistry::pcg::chem_pcg;
use crate::core::bins::Bins;
use crate::core::mineral::broadcast_or_validate;
use crate::core::state::{Pcg, ParentRockState};
use crate::error::{Result, SedGenError};
use crate::math::break_patterns::BreakPatternTable;
use crate::math::discretization::DiscretizationTables;
use crate::operators::inter_cb::inter_cb;
use crate::operators::intra_cb::intra_cb;
use crate::rng::interface_rng;
use crate::synthesis::csd::sample_crystals;
use crate::synthesis::interfaces::{
    build_interfaces, build_interfaces_from, predicted_frequencies_with_composition,
};
use ndarray::Array2;
use tracing::{info_span, warn};

/// The default operator order applied per step.
pub const DEFAULT_OPERATIONS: &[&str] = &["intra_cb", "inter_cb", "chem_mcg", "chem_pcg"];

/// All construction parameters for a weathering run.
#[derive(Debug, Clone)]
pub struct WeatheringConfig {
    pub minerals: Vec<String>,
    pub parent_rock_volume: f64,
    pub modal_mineralogy: Vec<f64>,
    pub csd_means: Vec<f64>,
    pub csd_stds: Vec<f64>,
    pub interfacial_composition: Option<Array2<f64>>,
    pub learning_rate: u32,
    pub n_timesteps: u32,
    pub n_standard_cases: u32,
    pub intra_cb_p: Vec<f64>,
    pub intra_cb_thresholds: Vec<f64>,
    pub chem_weath_rates: Vec<f64>,
    pub enable_interface_location_prob: bool,
    pub enable_multi_pcg_breakage: bool,
    pub enable_pcg_selection: bool,
}

impl WeatheringConfig {
    /// Constructs a config with reasonable default tuning parameters;
    /// override any of the `pub` fields afterward as needed.
    pub fn new(
        minerals: Vec<String>,
        parent_rock_volume: f64,
        modal_mineralogy: Vec<f64>,
        csd_means: Vec<f64>,
        csd_stds: Vec<f64>,
    ) -> Self {
        Self {
            minerals,
            parent_rock_volume,
            modal_mineralogy,
            csd_means,
            csd_stds,
            interfacial_composition: None,
            learning_rate: 1000,
            n_timesteps: 100,
            n_standard_cases: 2000,
            intra_cb_p: vec![0.5],
            intra_cb_thresholds: vec![1.0 / 256.0],
            chem_weath_rates: vec![0.01],
            enable_interface_location_prob: true,
            enable_multi_pcg_breakage: false,
            enable_pcg_selection: false,
        }
    }

    fn validate(&self) -> Result<()> {
        let m = self.minerals.len();
        if m == 0 {
            return Err(SedGenError::InvalidInput("minerals must be non-empty".into()));
        }
        if self.parent_rock_volume <= 0.0 || !self.parent_rock_volume.is_finite() {
            return Err(SedGenError::InvalidInput(
                "parent_rock_volume must be positive and finite".into(),
            ));
        }
        if self.modal_mineralogy.len() != m {
            return Err(SedGenError::InvalidInput(format!(
                "modal_mineralogy must have length {m}"
            )));
        }
        let modal_sum: f64 = self.modal_mineralogy.iter().sum();
        if (modal_sum - 1.0).abs() > 1e-6 {
            return Err(SedGenError::InvalidInput(format!(
                "modal_mineralogy must sum to 1.0, got {modal_sum}"
            )));
        }
        if self.csd_means.len() != m || self.csd_stds.len() != m {
            return Err(SedGenError::InvalidInput(
                "csd_means and csd_stds must have length equal to minerals".into(),
            ));
        }
        for (label, slice) in [("csd_means", &self.csd_means), ("csd_stds", &self.csd_stds)] {
            if slice.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err(SedGenError::InvalidInput(format!(
                    "{label} must be finite and positive"
                )));
            }
        }
        if let Some(matrix) = &self.interfacial_composition {
            if matrix.dim() != (m, m) {
                return Err(SedGenError::InvalidInput(
                    "interfacial_composition must be M x M".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Per-step evolution logs and per-mineral residue budgets.
#[derive(Debug, Clone, Default)]
pub struct WeatheringReport {
    pub steps_run: usize,
    pub stopped_early: bool,
    pub warnings: Vec<String>,
    /// Count of pcgs remaining after each step.
    pub pcg_comp_evolution: Vec<usize>,
    /// Total crystals held in pcgs after each step.
    pub pcg_size_evolution: Vec<u64>,
    /// Total crystals held in mcgs after each step.
    pub mcg_evolution: Vec<u64>,
    /// Per-mineral intra-CB residue volume added this step.
    pub residue_additions: Vec<Vec<f64>>,
    /// Per-mineral intra-CB broken-crystal counts this step.
    pub mcg_broken_additions: Vec<Vec<u64>>,
    /// Per-mineral chem-weathering residue added to mcgs this step.
    pub mcg_chem_residue_additions: Vec<Vec<f64>>,
    /// Per-mineral chem-weathering residue added to pcgs this step
    /// (dissolved + shrunk combined).
    pub pcg_chem_residue_additions: Vec<Vec<f64>>,
    pub mass_balance: Vec<f64>,
}

/// The weathering engine: validated configuration, precomputed
/// discretization tables, and the mutable parent-rock state.
pub struct WeatheringModel {
    pub config: WeatheringConfig,
    pub bins: Bins,
    pub discretization: DiscretizationTables,
    pub break_patterns: BreakPatternTable,
    pub location_table: Option<LocationWeightTable>,
    pub predicted_frequencies: Array2<i64>,
    pub state: ParentRockState,
    intra_cb_p: Vec<f64>,
}

impl WeatheringModel {
    pub fn new(config: WeatheringConfig) -> Result<Self> {
        config.validate()?;
        let n_minerals = config.minerals.len();
        let n_timesteps = config.n_timesteps as usize;

        let intra_cb_p = broadcast_or_validate(&config.intra_cb_p, n_minerals, "intra_cb_p")?;
        let intra_cb_thresholds =
            broadcast_or_validate(&config.intra_cb_thresholds, n_minerals, "intra_cb_thresholds")?;
        let chem_weath_rates =
            broadcast_or_validate(&config.chem_weath_rates, n_minerals, "chem_weath_rates")?;

        let init_span = info_span!("weathering_model_init", n_minerals, n_timesteps);
        let _enter = init_span.enter();

        let bins = Bins::new();
        let discretization = DiscretizationTables::new(
            &bins,
            n_timesteps,
            n_minerals,
            &chem_weath_rates,
            &intra_cb_thresholds,
        );
        let break_patterns = BreakPatternTable::new(&bins, &discretization, n_minerals, n_timesteps);
        let location_table = config
            .enable_interface_location_prob
            .then(|| LocationWeightTable::new(config.n_standard_cases as usize));

        let mut minerals_n = Vec::with_capacity(n_minerals);
        let mut crystal_sizes_per_mineral: Vec<Vec<u16>> = Vec::with_capacity(n_minerals);
        for m in 0..n_minerals {
            let modal_volume = config.modal_mineralogy[m] * config.parent_rock_volume;
            let result = sample_crystals(
                &bins,
                m,
                config.csd_means[m],
                config.csd_stds[m],
                modal_volume,
                config.modal_mineralogy[m],
                config.learning_rate,
            );
            minerals_n.push(result.count);
            crystal_sizes_per_mineral.push(result.bin_labels);
        }

        let predicted_frequencies = match &config.interfacial_composition {
            Some(matrix) => predicted_frequencies_with_composition(&minerals_n, matrix),
            None => crate::synthesis::interfaces::predicted_frequencies(&minerals_n),
        };

        let mut rng = interface_rng();
        let build = match &config.interfacial_composition {
            Some(_) => build_interfaces_from(predicted_frequencies.clone(), &minerals_n, &mut rng),
            None => build_interfaces(&minerals_n, &mut rng),
        };

        let mut cursors = vec![0usize; n_minerals];
        let crystal_sizes: Vec<u16> = build
            .interface_array
            .iter()
            .map(|&m| {
                let idx = &mut cursors[m as usize];
                let size = crystal_sizes_per_mineral[m as usize][*idx];
                *idx += 1;
                size
            })
            .collect();
        let chem_states = vec![0u16; build.interface_array.len()];

        let mut interface_probs = Vec::with_capacity(crystal_sizes.len().saturating_sub(1));
        for i in 0..crystal_sizes.len().saturating_sub(1) {
            let a = build.interface_array[i] as usize;
            let b = build.interface_array[i + 1] as usize;
            let s_w = strength_weight(&predicted_frequencies, a, b);
            let z_w = size_weight(&bins, crystal_sizes[i] as usize, crystal_sizes[i + 1] as usize);
            interface_probs.push(constant_prob(z_w, s_w));
        }

        let mut state = ParentRockState::new(n_minerals, n_timesteps, bins.n_bins);
        state.interface_counts = build.interface_counts;
        if !build.interface_array.is_empty() {
            state.pcgs.push(Pcg {
                minerals: build.interface_array,
                crystal_sizes,
                chem_states,
                interface_probs,
            });
        }

        Ok(Self {
            config,
            bins,
            discretization,
            break_patterns,
            location_table,
            predicted_frequencies,
            state,
            intra_cb_p,
        })
    }

    /// Current per-mineral volume fraction of the parent rock.
    pub fn calculate_actual_volumes(&self) -> Vec<f64> {
        calculate_volumes(
            &self.state,
            &self.discretization,
            self.config.minerals.len(),
            self.config.parent_rock_volume,
        )
    }

    /// Runs the step loop over `operations` (defaults to
    /// [`DEFAULT_OPERATIONS`]) for up to `timesteps` steps (defaults to
    /// `config.n_timesteps`), stopping early if `pcgs` empties.
    ///
    /// When `inplace` is `false`, the run operates on a clone of the
    /// model's state and `self` is left untouched; when `true`, `self`
    /// is advanced directly. Either way the returned report reflects the
    /// state that was actually evolved.
    pub fn weathering(
        &mut self,
        operations: Option<&[&str]>,
        timesteps: Option<u32>,
        inplace: bool,
    ) -> Result<WeatheringReport> {
        let n_timesteps = match timesteps {
            Some(0) => {
                return Err(SedGenError::InvalidInput(
                    "timesteps override must be positive".into(),
                ))
            }
            Some(t) if t > self.config.n_timesteps => {
                return Err(SedGenError::InvalidInput(format!(
                    "timesteps override {t} exceeds the {} steps the model was built for",
                    self.config.n_timesteps
                )))
            }
            Some(t) => t as usize,
            None => self.config.n_timesteps as usize,
        };
        let ops = operations.unwrap_or(DEFAULT_OPERATIONS);

        if inplace {
            Ok(run_steps(
                &mut self.state,
                ops,
                n_timesteps,
                self.config.parent_rock_volume,
                &self.break_patterns,
                &self.discretization,
                &self.intra_cb_p,
                self.location_table.as_ref(),
                self.config.enable_multi_pcg_breakage,
                &self.bins,
                &self.predicted_frequencies,
            ))
        } else {
            let mut state = self.state.clone();
            Ok(run_steps(
                &mut state,
                ops,
                n_timesteps,
                self.config.parent_rock_volume,
                &self.break_patterns,
                &self.discretization,
                &self.intra_cb_p,
                self.location_table.as_ref(),
                self.config.enable_multi_pcg_breakage,
                &self.bins,
                &self.predicted_frequencies,
            ))
        }
    }

    /// Per-step mass-balance deltas from the most recent [`weathering`]
    /// run; empty before any steps have run.
    pub fn calculate_mass_balance_difference(&self, report: &WeatheringReport) -> Vec<f64> {
        report.mass_balance.clone()
    }
}

fn calculate_volumes(
    state: &ParentRockState,
    discretization: &DiscretizationTables,
    n_minerals: usize,
    parent_rock_volume: f64,
) -> Vec<f64> {
    let mut volumes = vec![0.0f64; n_minerals];

    for pcg in &state.pcgs {
        for i in 0..pcg.len() {
            let s = pcg.chem_states[i] as usize;
            let m = pcg.minerals[i] as usize;
            let k = pcg.crystal_sizes[i] as usize;
            volumes[m] += discretization.volume_bins_medians_matrix[[s, m, k]];
        }
    }
    let (n_states, _, n_bins) = state.mcg.dim();
    for s in 0..n_states {
        for m in 0..n_minerals {
            for k in 0..n_bins {
                let count = state.mcg[[s, m, k]];
                if count > 0 {
                    volumes[m] += discretization.volume_bins_medians_matrix[[s, m, k]] * count as f64;
                }
            }
        }
    }

    volumes.iter().map(|v| v / parent_rock_volume).collect()
}

#[allow(clippy::too_many_arguments)]
fn run_steps(
    state: &mut ParentRockState,
    ops: &[&str],
    n_timesteps: usize,
    parent_rock_volume: f64,
    break_patterns: &BreakPatternTable,
    discretization: &DiscretizationTables,
    intra_cb_p: &[f64],
    location_table: Option<&LocationWeightTable>,
    enable_multi_pcg_breakage: bool,
    bins: &Bins,
    predicted_frequencies: &Array2<i64>,
) -> WeatheringReport {
    let n_minerals = intra_cb_p.len();
    let mut report = WeatheringReport::default();
    let mut cumulative_residue = vec![0.0f64; n_minerals];

    for step in 0..n_timesteps {
        if state.pcgs.is_empty() {
            report.stopped_early = true;
            break;
        }

        let mut step_residue = vec![0.0f64; n_minerals];
        let mut step_broken = vec![0u64; n_minerals];
        let mut step_mcg_chem_residue = vec![0.0f64; n_minerals];
        let mut step_pcg_chem_residue = vec![0.0f64; n_minerals];

        for &op in ops {
            match op {
                "intra_cb" => {
                    let result = intra_cb(
                        &mut state.mcg,
                        break_patterns,
                        discretization,
                        intra_cb_p,
                        step,
                        n_minerals,
                    );
                    for m in 0..n_minerals {
                        step_residue[m] += result.residue[m];
                        step_broken[m] += result.residue_count[m];
                    }
                }
                "inter_cb" => {
                    inter_cb(state, location_table, enable_multi_pcg_breakage, step);
                }
                "chem_mcg" => {
                    let result = chem_mcg(&mut state.mcg, discretization, n_minerals);
                    for m in 0..n_minerals {
                        step_mcg_chem_residue[m] += result.residue[m];
                    }
                    if result.exhausted {
                        let msg = format!("step {step}: mcg chem-state exhaustion, folded back");
                        warn!("{msg}");
                        report.warnings.push(msg);
                    }
                }
                "chem_pcg" => {
                    let result = chem_pcg(
                        state,
                        bins,
                        discretization,
                        predicted_frequencies,
                        step,
                        n_minerals,
                    );
                    for m in 0..n_minerals {
                        step_pcg_chem_residue[m] += result.residue_1[m] + result.residue_2[m];
                    }
                }
                other => {
                    let msg = format!("step {step}: unknown operation '{other}', skipped");
                    warn!("{msg}");
                    report.warnings.push(msg);
                }
            }
        }

        for m in 0..n_minerals {
            cumulative_residue[m] +=
                step_residue[m] + step_mcg_chem_residue[m] + step_pcg_chem_residue[m];
        }

        report.pcg_comp_evolution.push(state.pcgs.len());
        report.pcg_size_evolution.push(state.pcg_crystal_count());
        report.mcg_evolution.push(state.mcg_crystal_count());
        report.residue_additions.push(step_residue);
        report.mcg_broken_additions.push(step_broken);
        report.mcg_chem_residue_additions.push(step_mcg_chem_residue);
        report.pcg_chem_residue_additions.push(step_pcg_chem_residue);

        let current_volumes =
            calculate_volumes(state, discretization, n_minerals, parent_rock_volume);
        let accounted: f64 = current_volumes.iter().sum::<f64>() * parent_rock_volume
            + cumulative_residue.iter().sum::<f64>();
        report.mass_balance.push(parent_rock_volume - accounted);

        report.steps_run += 1;
    }

    report
}
