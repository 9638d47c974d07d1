use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::constants::{DEFAULT_DENSITY_BOUNDS, DEFAULT_THERMAL_BOUNDS};
use super::field::Field;
use super::sample::Series;

/// Closed interval of physically plausible values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBound {
    pub min: f64,
    pub max: f64,
}

impl RangeBound {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// What happens to a value outside its interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Move the value to the nearest bound
    #[default]
    Clamp,
    /// Mark the value missing
    Null,
}

pub fn default_range_bounds() -> BTreeMap<Field, RangeBound> {
    let density = RangeBound::new(DEFAULT_DENSITY_BOUNDS.0, DEFAULT_DENSITY_BOUNDS.1);
    let thermal = RangeBound::new(DEFAULT_THERMAL_BOUNDS.0, DEFAULT_THERMAL_BOUNDS.1);
    BTreeMap::from([
        (Field::ProtonDensity, density),
        (Field::AlphaDensity, density),
        (Field::ProtonThermal, thermal),
        (Field::AlphaThermal, thermal),
    ])
}

/// PhysicsRangeValidator enforces per-field physical bounds
#[derive(Debug, Clone)]
pub struct PhysicsRangeValidator {
    bounds: BTreeMap<Field, RangeBound>,
    policy: RangePolicy,
}

impl PhysicsRangeValidator {
    pub fn new(bounds: &BTreeMap<Field, RangeBound>, policy: RangePolicy) -> Self {
        Self {
            bounds: bounds.clone(),
            policy,
        }
    }

    /// Returns the validated series and how many values were out of range
    pub fn validate(&self, series: Series) -> (Series, usize) {
        let (fields, mut samples) = series.into_parts();
        let mut adjusted = 0;
        for sample in samples.iter_mut() {
            for (field, bound) in self.bounds.iter() {
                let value = match sample.get(*field) {
                    Some(v) => v,
                    None => continue,
                };
                if bound.contains(value) {
                    continue;
                }
                adjusted += 1;
                match self.policy {
                    RangePolicy::Clamp => sample.set(*field, Some(value.clamp(bound.min, bound.max))),
                    RangePolicy::Null => sample.set(*field, None),
                }
            }
        }
        (Series::from_parts(fields, samples), adjusted)
    }
}
