use thiserror::Error;

/// Errors that can abort model construction or a weathering step.
///
/// Only truly fatal conditions are represented here. `UnknownOperation`
/// and `ChemStateExhaustion` are recoverable-by-design and
/// are instead reported through `tracing::warn!` and surfaced on
/// [`crate::orchestrator::WeatheringReport::warnings`].
#[derive(Debug, Error)]
pub enum SedGenError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, SedGenError>;
