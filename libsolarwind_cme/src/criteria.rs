//! Criteria and detection profiles.
//!
//! A criterion is a predicate over one sample's raw and derived values. A profile is a
//! named, ordered list of criteria that must all hold for a sample to be flagged.
//! Profiles live in the configuration, so switching between a lenient and a strict
//! detector is a configuration change only.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;
use super::field::Field;
use super::rolling::RollingWindow;

/// Anything a criterion can test: a raw field or one of the derived parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quantity {
    Raw(Field),
    ExpectedTemperature,
    TemperatureRatio,
    AlphaRatio,
    DynamicPressure,
    SpeedChange,
    AbsSpeedChange,
    Beta,
    Score,
}

impl Quantity {
    const DERIVED: [Quantity; 8] = [
        Quantity::ExpectedTemperature,
        Quantity::TemperatureRatio,
        Quantity::AlphaRatio,
        Quantity::DynamicPressure,
        Quantity::SpeedChange,
        Quantity::AbsSpeedChange,
        Quantity::Beta,
        Quantity::Score,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Quantity::Raw(field) => field.name(),
            Quantity::ExpectedTemperature => "t_exp",
            Quantity::TemperatureRatio => "t_ratio",
            Quantity::AlphaRatio => "alpha_ratio",
            Quantity::DynamicPressure => "dynamic_pressure",
            Quantity::SpeedChange => "speed_change",
            Quantity::AbsSpeedChange => "abs_speed_change",
            Quantity::Beta => "beta",
            Quantity::Score => "score",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Quantity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(quantity) = Quantity::DERIVED.iter().find(|q| q.name() == s) {
            return Ok(*quantity);
        }
        Field::from_str(s)
            .map(Quantity::Raw)
            .map_err(|_| format!("undefined quantity {s:?}"))
    }
}

impl TryFrom<String> for Quantity {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Quantity::from_str(&value)
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.name().to_string()
    }
}

/// How a criterion's variable is summarized across an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Max,
    Min,
}

impl Aggregate {
    pub fn combine(&self, current: Option<f64>, value: Option<f64>) -> Option<f64> {
        match (current, value) {
            (Some(c), Some(v)) => Some(match self {
                Aggregate::Max => c.max(v),
                Aggregate::Min => c.min(v),
            }),
            (None, v) => v,
            (c, None) => c,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Aggregate::Max => "max",
            Aggregate::Min => "min",
        }
    }
}

/// A single predicate of a detection profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    /// quantity > threshold
    Above { quantity: Quantity, threshold: f64 },
    /// quantity < threshold
    Below { quantity: Quantity, threshold: f64 },
    /// field > rolling mean * factor
    AboveRollingMean {
        field: Field,
        factor: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<RollingWindow>,
    },
    /// field > rolling mean + k * rolling std
    AboveRollingThreshold {
        field: Field,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        k: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<RollingWindow>,
    },
}

impl Criterion {
    /// The variable this criterion tests, which is also what events report for it
    pub fn quantity(&self) -> Quantity {
        match self {
            Criterion::Above { quantity, .. } | Criterion::Below { quantity, .. } => *quantity,
            Criterion::AboveRollingMean { field, .. }
            | Criterion::AboveRollingThreshold { field, .. } => Quantity::Raw(*field),
        }
    }

    pub fn aggregate(&self) -> Aggregate {
        match self {
            Criterion::Below { .. } => Aggregate::Min,
            _ => Aggregate::Max,
        }
    }

    /// The trailing window this criterion uses, if it overrides the configured one
    pub fn window_override(&self) -> Option<RollingWindow> {
        match self {
            Criterion::AboveRollingMean { window, .. }
            | Criterion::AboveRollingThreshold { window, .. } => *window,
            _ => None,
        }
    }

    fn validate(&self, profile: &str) -> Result<(), ConfigError> {
        let (name, value) = match self {
            Criterion::Above { threshold, .. } | Criterion::Below { threshold, .. } => {
                ("threshold", *threshold)
            }
            Criterion::AboveRollingMean { factor, .. } => ("factor", *factor),
            Criterion::AboveRollingThreshold { k, .. } => ("k", k.unwrap_or(0.0)),
        };
        if !value.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: format!("{profile}.{}.{name}", self.quantity()),
                value,
            });
        }
        if let Some(window) = self.window_override() {
            if !window.is_valid() {
                return Err(ConfigError::InvalidWindow(format!(
                    "{window:?} in profile {profile}"
                )));
            }
        }
        Ok(())
    }
}

/// A named, ordered set of criteria combined by logical AND
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionProfile {
    #[serde(default)]
    pub description: String,
    pub criteria: Vec<Criterion>,
}

impl DetectionProfile {
    pub fn new(description: &str, criteria: Vec<Criterion>) -> Self {
        Self {
            description: description.to_string(),
            criteria,
        }
    }

    /// Distinct (quantity, aggregate) pairs in criterion order
    pub fn variables(&self) -> Vec<(Quantity, Aggregate)> {
        let mut variables: Vec<(Quantity, Aggregate)> = Vec::new();
        for criterion in self.criteria.iter() {
            let variable = (criterion.quantity(), criterion.aggregate());
            if !variables.contains(&variable) {
                variables.push(variable);
            }
        }
        variables
    }

    pub fn uses_quantity(&self, quantity: Quantity) -> bool {
        self.criteria.iter().any(|c| c.quantity() == quantity)
    }
}

/// The profile library and the run-wide event settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub active_profile: String,
    pub minimum_duration: usize,
    pub profiles: BTreeMap<String, DetectionProfile>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            active_profile: String::from("halo_lenient"),
            minimum_duration: 1,
            profiles: builtin_profiles(),
        }
    }
}

impl DetectionConfig {
    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&DetectionProfile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    pub fn active(&self) -> Result<&DetectionProfile, ConfigError> {
        self.profile(&self.active_profile)
    }

    /// Check every profile, then return the active one
    pub fn validate(&self) -> Result<&DetectionProfile, ConfigError> {
        if self.minimum_duration < 1 {
            return Err(ConfigError::InvalidParameter {
                name: String::from("minimum_duration"),
                value: self.minimum_duration as f64,
            });
        }
        for (name, profile) in self.profiles.iter() {
            if profile.criteria.is_empty() {
                return Err(ConfigError::EmptyProfile(name.clone()));
            }
            for criterion in profile.criteria.iter() {
                criterion.validate(name)?;
            }
        }
        self.active()
    }
}

/// The detectors used in practice: two halo-CME variants differing only in their
/// thresholds, a pure density-spike detector, the ICME signature (needs a magnetic field
/// input), and the multi-parameter CME flag.
pub fn builtin_profiles() -> BTreeMap<String, DetectionProfile> {
    let halo = |speed: f64, jump: f64, alpha: f64, description: &str| {
        DetectionProfile::new(
            description,
            vec![
                Criterion::Above {
                    quantity: Quantity::Raw(Field::ProtonBulkSpeed),
                    threshold: speed,
                },
                Criterion::AboveRollingMean {
                    field: Field::ProtonDensity,
                    factor: jump,
                    window: Some(RollingWindow::Samples { count: 30 }),
                },
                Criterion::Above {
                    quantity: Quantity::AlphaRatio,
                    threshold: alpha,
                },
            ],
        )
    };

    let mut profiles = BTreeMap::new();
    profiles.insert(
        String::from("halo_lenient"),
        halo(420.0, 1.2, 0.12, "Halo CME, relaxed thresholds"),
    );
    profiles.insert(
        String::from("halo_strict"),
        halo(450.0, 1.3, 0.15, "Halo CME, nominal thresholds"),
    );
    profiles.insert(
        String::from("density_spike"),
        DetectionProfile::new(
            "Proton density above rolling mean + k std",
            vec![Criterion::AboveRollingThreshold {
                field: Field::ProtonDensity,
                k: Some(2.0),
                window: None,
            }],
        ),
    );
    profiles.insert(
        String::from("icme_signature"),
        DetectionProfile::new(
            "Shock density spike with low beta and cold plasma; needs magnetic_field",
            vec![
                Criterion::AboveRollingThreshold {
                    field: Field::ProtonDensity,
                    k: Some(4.0),
                    window: None,
                },
                Criterion::Below {
                    quantity: Quantity::Beta,
                    threshold: 0.3,
                },
                Criterion::Below {
                    quantity: Quantity::TemperatureRatio,
                    threshold: 0.5,
                },
            ],
        ),
    );
    profiles.insert(
        String::from("cme_parameters"),
        DetectionProfile::new(
            "Dense, cool, alpha-enhanced plasma with a sudden speed change",
            vec![
                Criterion::Above {
                    quantity: Quantity::Raw(Field::ProtonDensity),
                    threshold: 15.0,
                },
                Criterion::Below {
                    quantity: Quantity::TemperatureRatio,
                    threshold: 0.8,
                },
                Criterion::Above {
                    quantity: Quantity::AlphaRatio,
                    threshold: 0.08,
                },
                Criterion::Above {
                    quantity: Quantity::AbsSpeedChange,
                    threshold: 50.0,
                },
            ],
        ),
    );
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_names() {
        assert_eq!(Quantity::from_str("t_ratio"), Ok(Quantity::TemperatureRatio));
        assert_eq!(
            Quantity::from_str("proton_density"),
            Ok(Quantity::Raw(Field::ProtonDensity))
        );
        assert!(Quantity::from_str("magnetic_pressure").is_err());
    }

    #[test]
    fn test_criterion_yaml() {
        let yaml = "
- kind: above
  quantity: proton_bulk_speed
  threshold: 450.0
- kind: below
  quantity: beta
  threshold: 0.3
- kind: above_rolling_threshold
  field: proton_density
  k: 4.0
  window:
    kind: duration
    seconds: 1800.0
";
        let criteria: Vec<Criterion> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(criteria.len(), 3);
        assert_eq!(criteria[0].quantity(), Quantity::Raw(Field::ProtonBulkSpeed));
        assert_eq!(criteria[1].aggregate(), Aggregate::Min);
        assert_eq!(
            criteria[2].window_override(),
            Some(RollingWindow::Duration { seconds: 1800.0 })
        );
    }

    #[test]
    fn test_undefined_criterion_or_quantity_is_rejected() {
        let bad_kind = "- kind: between\n  quantity: beta\n  threshold: 0.3\n";
        assert!(serde_yaml::from_str::<Vec<Criterion>>(bad_kind).is_err());
        let bad_quantity = "- kind: above\n  quantity: b_field\n  threshold: 0.3\n";
        assert!(serde_yaml::from_str::<Vec<Criterion>>(bad_quantity).is_err());
    }

    #[test]
    fn test_unknown_profile() {
        let mut detection = DetectionConfig::default();
        assert!(detection.validate().is_ok());
        detection.active_profile = String::from("does_not_exist");
        assert!(matches!(
            detection.validate(),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_empty_profile() {
        let mut detection = DetectionConfig::default();
        detection
            .profiles
            .insert(String::from("nothing"), DetectionProfile::new("", vec![]));
        assert!(matches!(
            detection.validate(),
            Err(ConfigError::EmptyProfile(_))
        ));
    }

    #[test]
    fn test_variables_are_deduplicated() {
        let profile = DetectionProfile::new(
            "",
            vec![
                Criterion::Above {
                    quantity: Quantity::Raw(Field::ProtonDensity),
                    threshold: 15.0,
                },
                Criterion::AboveRollingThreshold {
                    field: Field::ProtonDensity,
                    k: None,
                    window: None,
                },
                Criterion::Below {
                    quantity: Quantity::TemperatureRatio,
                    threshold: 0.5,
                },
            ],
        );
        assert_eq!(
            profile.variables(),
            vec![
                (Quantity::Raw(Field::ProtonDensity), Aggregate::Max),
                (Quantity::TemperatureRatio, Aggregate::Min),
            ]
        );
    }

    #[test]
    fn test_aggregate_combine() {
        assert_eq!(Aggregate::Max.combine(None, Some(2.0)), Some(2.0));
        assert_eq!(Aggregate::Max.combine(Some(3.0), Some(2.0)), Some(3.0));
        assert_eq!(Aggregate::Min.combine(Some(3.0), Some(2.0)), Some(2.0));
        assert_eq!(Aggregate::Min.combine(Some(3.0), None), Some(3.0));
    }
}
