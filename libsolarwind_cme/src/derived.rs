//! Point-wise physical quantities derived from the cleaned plasma moments.
//!
//! Every function here returns `None` rather than an infinite or NaN value: a missing
//! input, a denominator within epsilon of zero, or a non-finite result all read as
//! "missing" downstream.
use serde::{Deserialize, Serialize};

use super::constants::{
    BOLTZMANN_CONSTANT, NANOTESLA_TO_TESLA, PER_CM3_TO_PER_M3, VACUUM_PERMEABILITY,
};
use super::criteria::Quantity;
use super::field::Field;
use super::sample::{Sample, Series};

/// Fit constants of the speed-temperature relation T_exp = a * v^b
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConstants {
    pub a: f64,
    pub b: f64,
}

impl FitConstants {
    /// Lopez (1987) style calibration
    pub fn lopez() -> Self {
        Self { a: 0.5, b: 1.58 }
    }

    /// Empirical calibration used for the CME parameter tables
    pub fn empirical() -> Self {
        Self { a: 5.8e4, b: 1.96 }
    }
}

impl Default for FitConstants {
    fn default() -> Self {
        Self::lopez()
    }
}

/// Weights and normalizations of the continuous CME score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub density: f64,
    pub temperature: f64,
    pub alpha: f64,
    pub speed_change: f64,
    pub density_scale: f64,
    pub alpha_scale: f64,
    pub speed_change_scale: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            density: 0.4,
            temperature: 0.3,
            alpha: 0.2,
            speed_change: 0.1,
            density_scale: 30.0,
            alpha_scale: 0.15,
            speed_change_scale: 100.0,
        }
    }
}

/// The derived parameters of one sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedParameters {
    pub t_exp: Option<f64>,
    pub t_ratio: Option<f64>,
    pub alpha_ratio: Option<f64>,
    pub dynamic_pressure: Option<f64>,
    pub speed_change: Option<f64>,
    pub beta: Option<f64>,
    pub score: Option<f64>,
}

/// Inputs of the derivation that come from configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivationConstants {
    pub fit: FitConstants,
    pub dynamic_pressure_constant: f64,
    pub epsilon: f64,
    pub score: ScoreWeights,
}

fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// numerator / denominator, missing when the denominator is missing or |den| <= epsilon
pub fn guarded_div(numerator: Option<f64>, denominator: Option<f64>, epsilon: f64) -> Option<f64> {
    let den = denominator?;
    if den.abs() <= epsilon {
        return None;
    }
    finite(numerator? / den)
}

pub fn expected_temperature(speed: Option<f64>, fit: &FitConstants) -> Option<f64> {
    let v = speed?;
    if v <= 0.0 {
        return None;
    }
    finite(fit.a * v.powf(fit.b))
}

pub fn temperature_ratio(thermal: Option<f64>, t_exp: Option<f64>, epsilon: f64) -> Option<f64> {
    guarded_div(thermal, t_exp, epsilon)
}

/// alpha / proton density; missing when the proton density is at or below epsilon
pub fn alpha_ratio(alpha: Option<f64>, proton: Option<f64>, epsilon: f64) -> Option<f64> {
    let np = proton?;
    if np <= epsilon {
        return None;
    }
    finite(alpha? / np)
}

pub fn dynamic_pressure(density: Option<f64>, speed: Option<f64>, constant: f64) -> Option<f64> {
    let v = speed?;
    finite(constant * density? * v * v)
}

/// β = 2 μ0 n k_B T / |B|², n in cm^-3, T in K, |B| in nT
pub fn plasma_beta(
    density: Option<f64>,
    temperature: Option<f64>,
    magnetic_field: Option<f64>,
    epsilon: f64,
) -> Option<f64> {
    let b = magnetic_field? * NANOTESLA_TO_TESLA;
    let b_sq = b * b;
    if b_sq <= epsilon * NANOTESLA_TO_TESLA * NANOTESLA_TO_TESLA {
        return None;
    }
    let n = density? * PER_CM3_TO_PER_M3;
    finite(2.0 * VACUUM_PERMEABILITY * n * BOLTZMANN_CONSTANT * temperature? / b_sq)
}

/// Sample-to-sample change of the proton bulk speed; missing for the first sample
pub fn speed_changes(series: &Series) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(series.len());
    let mut previous: Option<f64> = None;
    for (idx, sample) in series.samples().iter().enumerate() {
        let current = sample.get(Field::ProtonBulkSpeed);
        if idx == 0 {
            changes.push(None);
        } else {
            changes.push(match (current, previous) {
                (Some(c), Some(p)) => Some(c - p),
                _ => None,
            });
        }
        previous = current;
    }
    changes
}

/// Weighted sum of normalized density, temperature deficit, alpha ratio and |Δv|
pub fn cme_score(
    density: Option<f64>,
    t_ratio: Option<f64>,
    alpha_ratio: Option<f64>,
    speed_change: Option<f64>,
    weights: &ScoreWeights,
) -> Option<f64> {
    let density_term = density? / weights.density_scale;
    let temperature_term = 1.0 - t_ratio?;
    let alpha_term = alpha_ratio? / weights.alpha_scale;
    let speed_term = speed_change?.abs() / weights.speed_change_scale;
    finite(
        weights.density * density_term
            + weights.temperature * temperature_term
            + weights.alpha * alpha_term
            + weights.speed_change * speed_term,
    )
}

/// Derive every parameter for every sample of a cleaned series
pub fn derive_parameters(series: &Series, constants: &DerivationConstants) -> Vec<DerivedParameters> {
    let changes = speed_changes(series);
    series
        .samples()
        .iter()
        .zip(changes)
        .map(|(sample, speed_change)| derive_sample(sample, speed_change, constants))
        .collect()
}

fn derive_sample(
    sample: &Sample,
    speed_change: Option<f64>,
    constants: &DerivationConstants,
) -> DerivedParameters {
    let density = sample.get(Field::ProtonDensity);
    let speed = sample.get(Field::ProtonBulkSpeed);
    let thermal = sample.get(Field::ProtonThermal);

    let t_exp = expected_temperature(speed, &constants.fit);
    let t_ratio = temperature_ratio(thermal, t_exp, constants.epsilon);
    let alpha_ratio = alpha_ratio(
        sample.get(Field::AlphaDensity),
        density,
        constants.epsilon,
    );
    DerivedParameters {
        t_exp,
        t_ratio,
        alpha_ratio,
        dynamic_pressure: dynamic_pressure(density, speed, constants.dynamic_pressure_constant),
        speed_change,
        beta: plasma_beta(
            density,
            thermal,
            sample.get(Field::MagneticField),
            constants.epsilon,
        ),
        score: cme_score(density, t_ratio, alpha_ratio, speed_change, &constants.score),
    }
}

/// The value of a quantity for one sample
pub fn quantity_value(quantity: Quantity, sample: &Sample, derived: &DerivedParameters) -> Option<f64> {
    match quantity {
        Quantity::Raw(field) => sample.get(field),
        Quantity::ExpectedTemperature => derived.t_exp,
        Quantity::TemperatureRatio => derived.t_ratio,
        Quantity::AlphaRatio => derived.alpha_ratio,
        Quantity::DynamicPressure => derived.dynamic_pressure,
        Quantity::SpeedChange => derived.speed_change,
        Quantity::AbsSpeedChange => derived.speed_change.map(f64::abs),
        Quantity::Beta => derived.beta,
        Quantity::Score => derived.score,
    }
}
